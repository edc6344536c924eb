//! JSON configuration and checkpoint helpers.

use std::{
    fs,
    path::{Path, PathBuf},
};

use marker_locator_core::CalibrationParameters;
use serde::{Deserialize, Serialize};

use crate::{
    AxisSpec, CalibrationError, CalibrationResult, CalibrationSample, CalibrationSearch,
    LevelCheckpoint, MissingTruthPolicy, SearchSchedule,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Everything a calibration run needs, as loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub samples: Vec<CalibrationSample>,
    pub axes: Vec<AxisSpec>,
    pub initial_guess: CalibrationParameters,
    #[serde(default)]
    pub schedule: SearchSchedule,
    #[serde(default)]
    pub missing_truth: MissingTruthPolicy,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl CalibrationConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the calibration record path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("calibration_results.txt"))
    }

    /// Build a search over the configured samples.
    pub fn build_search(&self) -> Result<CalibrationSearch<'_>, CalibrationError> {
        Ok(
            CalibrationSearch::new(&self.samples, self.axes.clone(), self.schedule.clone())?
                .with_missing_truth(self.missing_truth),
        )
    }

    /// Run the configured search from the initial guess.
    pub fn run(&self) -> Result<CalibrationResult, CalibrationError> {
        self.build_search()?.run(self.initial_guess)
    }
}

impl LevelCheckpoint {
    /// Load a checkpoint written by [`LevelCheckpoint::write_json`].
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this checkpoint to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
