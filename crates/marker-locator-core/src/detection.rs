use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One decoded marker as reported by the external decoder.
///
/// `polygon` holds the marker outline in pixel coordinates. Only the first
/// two points act as the width reference, so the decoder must report corners
/// in a consistent order (e.g. top-left, top-right, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Decoded payload text; used as the marker identity.
    pub payload: String,
    /// Ordered polygon corners in pixels.
    pub polygon: Vec<Point2<f64>>,
    /// Width of the source frame in pixels.
    pub frame_width: f64,
    /// Height of the source frame in pixels, if the decoder reports it.
    ///
    /// Used as the vertical image centre. When absent the horizontal centre
    /// (`frame_width / 2`) is used for both axes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_height: Option<f64>,
}

impl Detection {
    pub fn new(payload: impl Into<String>, polygon: Vec<Point2<f64>>, frame_width: f64) -> Self {
        Self {
            payload: payload.into(),
            polygon,
            frame_width,
            frame_height: None,
        }
    }

    pub fn with_frame_height(mut self, frame_height: f64) -> Self {
        self.frame_height = Some(frame_height);
        self
    }

    /// Pixel distance between the two reference corners.
    ///
    /// Returns `None` when the polygon has fewer than two points.
    pub fn apparent_width(&self) -> Option<f64> {
        match self.polygon.as_slice() {
            [a, b, ..] => Some(nalgebra::distance(a, b)),
            _ => None,
        }
    }

    /// Mean of all polygon corners, `None` for an empty polygon.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.polygon.is_empty() {
            return None;
        }
        let n = self.polygon.len() as f64;
        let (sx, sy) = self
            .polygon
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point2::new(sx / n, sy / n))
    }

    /// Vertical image centre used for the vertical offset.
    #[inline]
    pub fn vertical_center(&self) -> f64 {
        self.frame_height.unwrap_or(self.frame_width) / 2.0
    }
}
