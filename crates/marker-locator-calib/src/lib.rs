//! Calibration of the marker-locator projection model.
//!
//! Given images with known marker positions ([`CalibrationSample`]), the
//! search fits [`CalibrationParameters`] by minimising the total absolute
//! positional error:
//!
//! - [`ParameterAxis`] / [`AxisSpec`] name the fields to fit and bound them,
//! - [`SearchSchedule`] lists the resolution levels, coarsest first,
//! - [`CalibrationSearch`] scans each level's grid around the previous
//!   optimum and reports a [`CalibrationResult`] with per-sample diagnostics,
//! - [`CalibrationRecord`] persists the result as a flat text record that
//!   reloads into the exact same parameters.
//!
//! ```
//! use marker_locator_calib::{
//!     run, AxisSpec, CalibrationSample, GroundTruth, ParameterAxis, SearchSchedule, SearchStep,
//! };
//! use marker_locator_core::synthetic::{detection_at, Frame};
//! use marker_locator_core::CalibrationParameters;
//!
//! let truth = CalibrationParameters::new(0.8, 1.0, 7.93).unwrap();
//! let frame = Frame::new(4000.0, 3000.0);
//! let samples = vec![CalibrationSample::new(
//!     "6ft.jpg",
//!     vec![detection_at("a", &truth, frame, 72.0, 0.0, 0.0)],
//! )
//! .with_truth("a", GroundTruth::new(72.0, 0.0))];
//!
//! let guess = CalibrationParameters::new(0.7, 1.0, 7.93).unwrap();
//! let schedule = SearchSchedule::new(vec![SearchStep::new(0.5, 0.1), SearchStep::new(0.1, 0.01)]);
//! let result = run(&samples, &[AxisSpec::new(ParameterAxis::FocalRatio)], guess, &schedule).unwrap();
//! assert!((result.parameters.focal_ratio - 0.8).abs() < 1e-9);
//! ```

mod axis;
mod error;
mod evaluate;
mod grid;
mod io;
mod record;
mod sample;
mod schedule;
mod search;

pub use axis::{AxisSpec, ParameterAxis, BOUND_EPS};
pub use error::CalibrationError;
pub use evaluate::{diagnose, total_error, EntryDiagnostic, SampleDiagnostic};
pub use io::{CalibrationConfig, ConfigIoError};
pub use record::{CalibrationRecord, RecordError};
pub use sample::{CalibrationSample, GroundTruth};
pub use schedule::{SearchSchedule, SearchStep, MAX_CANDIDATES_PER_LEVEL, MAX_VALUES_PER_AXIS};
pub use search::{
    run, CalibrationResult, CalibrationSearch, LevelCheckpoint, MissingGroundTruth,
    MissingTruthPolicy,
};

pub use marker_locator_core::CalibrationParameters;
