//! Deterministic synthetic detections.
//!
//! Inverts the projection model: given parameters and a real-world position,
//! build the axis-aligned square polygon the decoder would report. Useful for
//! calibration fixtures where the true parameters are known.

use nalgebra::Point2;

use crate::{CalibrationParameters, Detection};

/// Frame geometry of a synthetic camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Build the detection of a marker at `forward` / `lateral` / `vertical`.
///
/// Corners are emitted top-left, top-right, bottom-right, bottom-left. The
/// vertical position is only honoured when `params` enables the vertical
/// axis; otherwise the marker sits on the horizontal centre line.
pub fn detection_at(
    payload: &str,
    params: &CalibrationParameters,
    frame: Frame,
    forward: f64,
    lateral: f64,
    vertical: f64,
) -> Detection {
    let side = params.marker_size * params.focal_length_px(frame.width) / forward;

    // tan(atan(d / w)) == d / w, so the offsets invert linearly.
    let delta_x = lateral * frame.width / (forward * params.lateral_angle_scalar);
    let delta_y = match params.vertical_angle_scalar {
        Some(scalar) => -vertical * frame.width / (forward * scalar),
        None => 0.0,
    };

    let cx = frame.width / 2.0 + delta_x;
    let cy = frame.height / 2.0 + delta_y;
    let h = side / 2.0;
    Detection::new(
        payload,
        vec![
            Point2::new(cx - h, cy - h),
            Point2::new(cx + h, cy - h),
            Point2::new(cx + h, cy + h),
            Point2::new(cx - h, cy + h),
        ],
        frame.width,
    )
    .with_frame_height(frame.height)
}
