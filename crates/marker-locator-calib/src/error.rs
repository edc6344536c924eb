use marker_locator_core::ParameterError;

use crate::ParameterAxis;

/// Errors returned by the calibration search.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("calibration dataset is empty")]
    EmptyDataset,
    #[error("no parameter axes to search")]
    EmptyAxes,
    #[error("search schedule has no steps")]
    EmptySchedule,
    #[error("search step {index} is invalid (radius={radius}, granularity={granularity})")]
    InvalidStep {
        index: usize,
        radius: f64,
        granularity: f64,
    },
    #[error(
        "search step {index} spans {candidates} candidates over {axes} axes \
         (limit {limit})"
    )]
    GridTooLarge {
        index: usize,
        axes: usize,
        candidates: f64,
        limit: usize,
    },
    #[error("axis {axis} is listed more than once")]
    DuplicateAxis { axis: ParameterAxis },
    #[error("axis {axis} is searched but the initial guess does not set it")]
    UnsetAxis { axis: ParameterAxis },
    #[error("axis {axis} has invalid bounds")]
    InvalidBounds { axis: ParameterAxis },
    #[error("axis {axis} starts at {value}, outside its bounds")]
    InitialGuessOutOfBounds { axis: ParameterAxis, value: f64 },
    #[error("invalid initial guess: {0}")]
    InvalidInitialGuess(#[from] ParameterError),
    #[error("ground truth {payload:?} of sample {sample:?} never matched a detection")]
    MissingGroundTruth { sample: String, payload: String },
    #[error("checkpoint level {level} is outside the schedule")]
    InvalidCheckpoint { level: usize },
}
