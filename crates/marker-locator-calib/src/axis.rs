use std::fmt;

use marker_locator_core::CalibrationParameters;
use serde::{Deserialize, Serialize};

/// A calibratable field of [`CalibrationParameters`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterAxis {
    FocalRatio,
    LateralAngleScalar,
    VerticalAngleScalar,
    MarkerSize,
}

impl ParameterAxis {
    /// Field name, as used in the calibration record.
    pub const fn name(self) -> &'static str {
        match self {
            ParameterAxis::FocalRatio => "focal_ratio",
            ParameterAxis::LateralAngleScalar => "lateral_angle_scalar",
            ParameterAxis::VerticalAngleScalar => "vertical_angle_scalar",
            ParameterAxis::MarkerSize => "marker_size",
        }
    }

    /// Current value of this axis, `None` if the vertical axis is disabled.
    pub fn value(self, params: &CalibrationParameters) -> Option<f64> {
        match self {
            ParameterAxis::FocalRatio => Some(params.focal_ratio),
            ParameterAxis::LateralAngleScalar => Some(params.lateral_angle_scalar),
            ParameterAxis::VerticalAngleScalar => params.vertical_angle_scalar,
            ParameterAxis::MarkerSize => Some(params.marker_size),
        }
    }

    /// Copy of `params` with this axis set to `value`.
    pub fn with_value(self, params: CalibrationParameters, value: f64) -> CalibrationParameters {
        match self {
            ParameterAxis::FocalRatio => CalibrationParameters {
                focal_ratio: value,
                ..params
            },
            ParameterAxis::LateralAngleScalar => CalibrationParameters {
                lateral_angle_scalar: value,
                ..params
            },
            ParameterAxis::VerticalAngleScalar => CalibrationParameters {
                vertical_angle_scalar: Some(value),
                ..params
            },
            ParameterAxis::MarkerSize => CalibrationParameters {
                marker_size: value,
                ..params
            },
        }
    }
}

impl fmt::Display for ParameterAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relative slack when comparing grid values against axis bounds.
pub const BOUND_EPS: f64 = 1e-9;

/// One searched axis with optional inclusive bounds.
///
/// Candidates outside the bounds are skipped, not clamped. Non-positive
/// values are always skipped, bounds or not.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub axis: ParameterAxis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl AxisSpec {
    pub const fn new(axis: ParameterAxis) -> Self {
        Self {
            axis,
            min: None,
            max: None,
        }
    }

    pub const fn bounded(axis: ParameterAxis, min: f64, max: f64) -> Self {
        Self {
            axis,
            min: Some(min),
            max: Some(max),
        }
    }

    /// The value to evaluate for grid point `value`, or `None` if the axis
    /// rejects it.
    ///
    /// A value within rounding noise of a bound (relative slack
    /// [`BOUND_EPS`]) is snapped onto that bound, so `0.7 + 2 * 0.1` still
    /// reaches a `max` of `0.9`.
    pub fn admit(&self, value: f64) -> Option<f64> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        let slack = |bound: f64| BOUND_EPS * bound.abs().max(1.0);
        let value = match self.min {
            Some(min) if value < min - slack(min) => return None,
            Some(min) if value < min => min,
            _ => value,
        };
        match self.max {
            Some(max) if value > max + slack(max) => None,
            Some(max) if value > max => Some(max),
            _ => Some(value),
        }
    }

    /// Whether `value` may be evaluated on this axis.
    pub fn admits(&self, value: f64) -> bool {
        self.admit(value).is_some()
    }

    pub(crate) fn bounds_are_valid(&self) -> bool {
        let finite = self.min.is_none_or(f64::is_finite) && self.max.is_none_or(f64::is_finite);
        let ordered = match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };
        finite && ordered
    }
}

impl From<ParameterAxis> for AxisSpec {
    fn from(axis: ParameterAxis) -> Self {
        AxisSpec::new(axis)
    }
}
