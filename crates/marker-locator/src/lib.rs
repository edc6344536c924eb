//! Facade crate for the `marker-locator-*` workspace.
//!
//! Re-exports the projection model and the calibration search, and ships the
//! `marker-locator` binary (feature `cli`).
//!
//! ## API map
//! - `marker_locator::core`: detections, calibration parameters and the
//!   projection model.
//! - `marker_locator::calib`: ground truth, schedules, the grid search and
//!   the calibration record format.
//!
//! ## Quickstart
//!
//! ```no_run
//! use marker_locator::{CalibrationConfig, CalibrationRecord};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CalibrationConfig::load_json("calibration.json")?;
//! let result = config.run()?;
//! CalibrationRecord::from(&result).write(config.output_path())?;
//! println!("total error: {}", result.total_error);
//! # Ok(())
//! # }
//! ```

pub use marker_locator_calib as calib;
pub use marker_locator_core as core;

pub use marker_locator_calib::{
    AxisSpec, CalibrationConfig, CalibrationError, CalibrationRecord, CalibrationResult,
    CalibrationSample, CalibrationSearch, GroundTruth, LevelCheckpoint, ParameterAxis,
    SearchSchedule, SearchStep,
};
pub use marker_locator_core::{
    compute_location, CalibrationParameters, Detection, Extraction, Location, LocationExtractor,
};
