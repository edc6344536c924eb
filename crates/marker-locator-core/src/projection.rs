//! Pinhole projection from a detection polygon to a real-world location.
//!
//! The model works with a focal ratio (focal length / sensor width) instead
//! of a focal length in physical units, so it needs no sensor geometry:
//!
//! ```text
//! focal_px         = focal_ratio * frame_width
//! forward          = marker_size * focal_px / apparent_width
//! lateral_angle    = atan((centroid_x - frame_width / 2) / frame_width)
//! lateral_offset   = tan(lateral_angle) * forward * lateral_angle_scalar
//! vertical_offset  = tan(-atan((centroid_y - cy) / frame_width)) * forward * vertical_angle_scalar
//! ```
//!
//! The angular scalars absorb lens distortion and mounting error; their
//! values come from calibration.

use crate::{CalibrationParameters, Detection, Location};

/// Reasons a detection cannot be turned into a [`Location`].
///
/// This is a recoverable, per-detection condition: the extractor skips the
/// detection and counts it.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InvalidDetection {
    #[error("polygon has {count} point(s), need at least 2")]
    TooFewPoints { count: usize },
    #[error("invalid frame size (width={width}, height={height:?})")]
    InvalidFrame { width: f64, height: Option<f64> },
    #[error("apparent width {width} is not positive")]
    DegenerateWidth { width: f64 },
    #[error("non-finite {quantity}")]
    NonFinite { quantity: &'static str },
    #[error("forward distance {distance} is not positive")]
    NonPositiveDistance { distance: f64 },
}

fn finite(quantity: &'static str, value: f64) -> Result<f64, InvalidDetection> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InvalidDetection::NonFinite { quantity })
    }
}

/// Estimate the real-world location of one detection.
///
/// Pure and deterministic. Every intermediate is checked, so the result never
/// carries `NaN` or infinities; such values surface as
/// [`InvalidDetection::NonFinite`].
pub fn compute_location(
    detection: &Detection,
    params: &CalibrationParameters,
) -> Result<Location, InvalidDetection> {
    let frame_width = detection.frame_width;
    let frame_ok = frame_width.is_finite()
        && frame_width > 0.0
        && detection
            .frame_height
            .is_none_or(|h| h.is_finite() && h > 0.0);
    if !frame_ok {
        return Err(InvalidDetection::InvalidFrame {
            width: frame_width,
            height: detection.frame_height,
        });
    }

    let apparent_width = detection
        .apparent_width()
        .ok_or(InvalidDetection::TooFewPoints {
            count: detection.polygon.len(),
        })?;
    let apparent_width = finite("apparent_width", apparent_width)?;
    if apparent_width <= 0.0 {
        return Err(InvalidDetection::DegenerateWidth {
            width: apparent_width,
        });
    }

    let focal_length_px = params.focal_length_px(frame_width);
    let forward_distance = finite(
        "forward_distance",
        params.marker_size * focal_length_px / apparent_width,
    )?;
    if forward_distance <= 0.0 {
        return Err(InvalidDetection::NonPositiveDistance {
            distance: forward_distance,
        });
    }

    // polygon has >= 2 points here
    let centroid = detection
        .centroid()
        .ok_or(InvalidDetection::TooFewPoints { count: 0 })?;

    let delta_x = centroid.x - frame_width / 2.0;
    let lateral_angle = finite("lateral_angle", (delta_x / frame_width).atan().to_degrees())?;
    let lateral_offset = finite(
        "lateral_offset",
        lateral_angle.to_radians().tan() * forward_distance * params.lateral_angle_scalar,
    )?;

    // Pixel rows grow downwards, so the vertical angle flips sign.
    let vertical_offset = params
        .vertical_angle_scalar
        .map(|scalar| {
            let delta_y = centroid.y - detection.vertical_center();
            let vertical_angle = finite(
                "vertical_angle",
                -(delta_y / frame_width).atan().to_degrees(),
            )?;
            finite(
                "vertical_offset",
                vertical_angle.to_radians().tan() * forward_distance * scalar,
            )
        })
        .transpose()?;

    Ok(Location {
        payload: detection.payload.clone(),
        forward_distance,
        lateral_offset,
        vertical_offset,
        lateral_angle,
    })
}
