use serde::{Deserialize, Serialize};

/// Free parameters of the projection model.
///
/// This is a plain value: every evaluation takes it by value or shared
/// reference, and calibration builds a fresh instance per trial instead of
/// patching a shared one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameters {
    /// Focal length divided by sensor width (dimensionless).
    pub focal_ratio: f64,
    /// Multiplier applied to the lateral offset.
    pub lateral_angle_scalar: f64,
    /// Multiplier applied to the vertical offset. `None` disables the
    /// vertical axis entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_angle_scalar: Option<f64>,
    /// Physical marker edge length. Output distances use the same unit.
    pub marker_size: f64,
}

/// Parameter validation errors.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum ParameterError {
    #[error("{name} must be finite and > 0 (got {value})")]
    NotPositive { name: &'static str, value: f64 },
}

impl CalibrationParameters {
    /// Validated constructor for a 2-axis (lateral only) model.
    pub fn new(
        focal_ratio: f64,
        lateral_angle_scalar: f64,
        marker_size: f64,
    ) -> Result<Self, ParameterError> {
        let params = Self {
            focal_ratio,
            lateral_angle_scalar,
            vertical_angle_scalar: None,
            marker_size,
        };
        params.validate()?;
        Ok(params)
    }

    /// Enable the vertical axis with the given scalar.
    pub fn with_vertical_angle_scalar(self, scalar: f64) -> Result<Self, ParameterError> {
        let params = Self {
            vertical_angle_scalar: Some(scalar),
            ..self
        };
        params.validate()?;
        Ok(params)
    }

    /// Check that every ratio, scalar and size is finite and strictly positive.
    pub fn validate(&self) -> Result<(), ParameterError> {
        positive("focal_ratio", self.focal_ratio)?;
        positive("lateral_angle_scalar", self.lateral_angle_scalar)?;
        if let Some(scalar) = self.vertical_angle_scalar {
            positive("vertical_angle_scalar", scalar)?;
        }
        positive("marker_size", self.marker_size)?;
        Ok(())
    }

    /// Focal length in pixel units for a frame of the given width.
    #[inline]
    pub fn focal_length_px(&self, frame_width: f64) -> f64 {
        self.focal_ratio * frame_width
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::NotPositive { name, value })
    }
}
