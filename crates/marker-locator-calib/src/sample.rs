use std::collections::BTreeMap;

use marker_locator_core::{Detection, Location};
use serde::{Deserialize, Serialize};

/// Known real-world position of a marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub forward: f64,
    pub lateral: f64,
    /// Known height; only scored when the prediction has a vertical offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<f64>,
}

impl GroundTruth {
    pub const fn new(forward: f64, lateral: f64) -> Self {
        Self {
            forward,
            lateral,
            vertical: None,
        }
    }

    pub const fn with_vertical(self, vertical: f64) -> Self {
        Self {
            vertical: Some(vertical),
            ..self
        }
    }

    /// Sum of absolute coordinate differences between a prediction and this truth.
    pub fn error(&self, predicted: &Location) -> f64 {
        let planar = (predicted.forward_distance - self.forward).abs()
            + (predicted.lateral_offset - self.lateral).abs();
        match (predicted.vertical_offset, self.vertical) {
            (Some(p), Some(t)) => planar + (p - t).abs(),
            _ => planar,
        }
    }
}

/// One calibration image: its detections and the known marker positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    /// Image identifier, e.g. the file name.
    pub id: String,
    pub detections: Vec<Detection>,
    /// Ground truth keyed by payload.
    pub truth: BTreeMap<String, GroundTruth>,
}

impl CalibrationSample {
    pub fn new(id: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            id: id.into(),
            detections,
            truth: BTreeMap::new(),
        }
    }

    pub fn with_truth(mut self, payload: impl Into<String>, truth: GroundTruth) -> Self {
        self.truth.insert(payload.into(), truth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(forward: f64, lateral: f64, vertical: Option<f64>) -> Location {
        Location {
            payload: "m".to_string(),
            forward_distance: forward,
            lateral_offset: lateral,
            vertical_offset: vertical,
            lateral_angle: 0.0,
        }
    }

    #[test]
    fn error_sums_absolute_differences() {
        let truth = GroundTruth::new(72.0, -3.0);
        assert_eq!(truth.error(&location(70.0, -1.0, None)), 4.0);
        assert_eq!(truth.error(&location(72.0, -3.0, Some(8.0))), 0.0);
    }

    #[test]
    fn vertical_is_scored_only_when_both_sides_have_it() {
        let truth = GroundTruth::new(72.0, 0.0).with_vertical(5.0);
        assert_eq!(truth.error(&location(72.0, 0.0, Some(2.0))), 3.0);
        assert_eq!(truth.error(&location(72.0, 0.0, None)), 0.0);
    }
}
