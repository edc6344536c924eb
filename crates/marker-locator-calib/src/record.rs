//! Flat text record of a calibration run.
//!
//! ```text
//! focal_ratio = 0.7747762957960492
//! lateral_angle_scalar = 1.3069
//! vertical_angle_scalar = 0.513
//! marker_size = 7.93
//! total_error = 4.125
//!
//! [diagnostics]
//! sample "6ft.jpg" skipped=0 error=1.25
//!   "dock-3" predicted=(71.5, 0.2) known=(72, 0) error=0.7
//!   "dock-4" missing known=(72, 36)
//! ```
//!
//! The header holds one `key = value` line per field. Values are written with
//! the shortest representation that parses back to the same `f64`, so a
//! record reloads bit-exactly. The diagnostics section is informational:
//! [`CalibrationRecord::parse`] stops at its header.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use marker_locator_core::{CalibrationParameters, ParameterError};

use crate::evaluate::SampleDiagnostic;
use crate::{CalibrationResult, GroundTruth, ParameterAxis};

const TOTAL_ERROR: &str = "total_error";
const DIAGNOSTICS_HEADER: &str = "[diagnostics]";

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `key = value`")]
    MalformedLine { line: usize },
    #[error("line {line}: unknown field {key:?}")]
    UnknownField { line: usize, key: String },
    #[error("line {line}: duplicate field {key:?}")]
    DuplicateField { line: usize, key: String },
    #[error("line {line}: invalid value {value:?} for {key}")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Parameters(#[from] ParameterError),
}

/// Persisted calibration outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationRecord {
    pub parameters: CalibrationParameters,
    pub total_error: f64,
    /// Written after the header; empty after [`parse`](Self::parse).
    pub diagnostics: Vec<SampleDiagnostic>,
}

impl From<&CalibrationResult> for CalibrationRecord {
    fn from(result: &CalibrationResult) -> Self {
        Self {
            parameters: result.parameters,
            total_error: result.total_error,
            diagnostics: result.diagnostics.clone(),
        }
    }
}

impl CalibrationRecord {
    /// Parse the header of a record.
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let mut focal_ratio = None;
        let mut lateral_angle_scalar = None;
        let mut vertical_angle_scalar = None;
        let mut marker_size = None;
        let mut total_error = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed == DIAGNOSTICS_HEADER {
                break;
            }

            let (key, value) = trimmed
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or(RecordError::MalformedLine { line })?;
            let slot = match key {
                k if k == ParameterAxis::FocalRatio.name() => &mut focal_ratio,
                k if k == ParameterAxis::LateralAngleScalar.name() => &mut lateral_angle_scalar,
                k if k == ParameterAxis::VerticalAngleScalar.name() => &mut vertical_angle_scalar,
                k if k == ParameterAxis::MarkerSize.name() => &mut marker_size,
                TOTAL_ERROR => &mut total_error,
                _ => {
                    return Err(RecordError::UnknownField {
                        line,
                        key: key.to_string(),
                    })
                }
            };
            if slot.is_some() {
                return Err(RecordError::DuplicateField {
                    line,
                    key: key.to_string(),
                });
            }
            let parsed = f64::from_str(value).map_err(|_| RecordError::InvalidValue {
                line,
                key: key.to_string(),
                value: value.to_string(),
            })?;
            *slot = Some((line, parsed));
        }

        let value = |slot: Option<(usize, f64)>, name: &'static str| {
            slot.map(|(_, v)| v).ok_or(RecordError::MissingField(name))
        };
        let parameters = CalibrationParameters {
            focal_ratio: value(focal_ratio, ParameterAxis::FocalRatio.name())?,
            lateral_angle_scalar: value(
                lateral_angle_scalar,
                ParameterAxis::LateralAngleScalar.name(),
            )?,
            vertical_angle_scalar: vertical_angle_scalar.map(|(_, v)| v),
            marker_size: value(marker_size, ParameterAxis::MarkerSize.name())?,
        };
        parameters.validate()?;

        let (line, total) = total_error.ok_or(RecordError::MissingField(TOTAL_ERROR))?;
        // an overflowed error sum is written as `inf`
        if total.is_nan() || total < 0.0 {
            return Err(RecordError::InvalidValue {
                line,
                key: TOTAL_ERROR.to_string(),
                value: total.to_string(),
            });
        }

        Ok(Self {
            parameters,
            total_error: total,
            diagnostics: Vec::new(),
        })
    }

    /// Read and parse a record file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Write the full record (header and diagnostics).
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl FromStr for CalibrationRecord {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CalibrationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.parameters;
        writeln!(f, "{} = {}", ParameterAxis::FocalRatio.name(), p.focal_ratio)?;
        writeln!(
            f,
            "{} = {}",
            ParameterAxis::LateralAngleScalar.name(),
            p.lateral_angle_scalar
        )?;
        if let Some(scalar) = p.vertical_angle_scalar {
            writeln!(f, "{} = {}", ParameterAxis::VerticalAngleScalar.name(), scalar)?;
        }
        writeln!(f, "{} = {}", ParameterAxis::MarkerSize.name(), p.marker_size)?;
        writeln!(f, "{TOTAL_ERROR} = {}", self.total_error)?;

        if self.diagnostics.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "{DIAGNOSTICS_HEADER}")?;
        for sample in &self.diagnostics {
            writeln!(
                f,
                "sample {:?} skipped={} error={}",
                sample.sample, sample.skipped, sample.error
            )?;
            for entry in &sample.entries {
                match (&entry.predicted, entry.error) {
                    (Some(p), Some(error)) => writeln!(
                        f,
                        "  {:?} predicted={} known={} error={}",
                        entry.payload,
                        Triple(p.forward_distance, p.lateral_offset, p.vertical_offset),
                        Known(&entry.known),
                        error
                    )?,
                    _ => writeln!(
                        f,
                        "  {:?} missing known={}",
                        entry.payload,
                        Known(&entry.known)
                    )?,
                }
            }
        }
        Ok(())
    }
}

struct Triple(f64, f64, Option<f64>);

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.2 {
            Some(v) => write!(f, "({}, {}, {})", self.0, self.1, v),
            None => write!(f, "({}, {})", self.0, self.1),
        }
    }
}

struct Known<'a>(&'a GroundTruth);

impl fmt::Display for Known<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Triple(self.0.forward, self.0.lateral, self.0.vertical).fmt(f)
    }
}
