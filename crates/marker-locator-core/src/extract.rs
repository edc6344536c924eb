use log::debug;
use serde::{Deserialize, Serialize};

use crate::{compute_location, CalibrationParameters, Detection, LocationSet};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Result of projecting every detection of one image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub locations: LocationSet,
    /// Detections rejected by the projection model.
    pub skipped: usize,
}

/// Applies the projection model to all detections of one image.
///
/// The extractor owns its parameter value, so calibration can build one per
/// trial and evaluate trials independently.
#[derive(Clone, Copy, Debug)]
pub struct LocationExtractor {
    params: CalibrationParameters,
}

impl LocationExtractor {
    pub fn new(params: CalibrationParameters) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &CalibrationParameters {
        &self.params
    }

    /// Project `detections`, skipping (and counting) invalid ones.
    ///
    /// Never fails as a whole. Detections sharing a payload overwrite each
    /// other in input order, so the last one wins; with unique payloads
    /// `locations.len() + skipped == detections.len()`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self, detections), fields(n = detections.len()))
    )]
    pub fn process(&self, detections: &[Detection]) -> Extraction {
        let mut out = Extraction::default();
        for detection in detections {
            match compute_location(detection, &self.params) {
                Ok(location) => {
                    if out.locations.insert(location).is_some() {
                        debug!(
                            "payload {:?} seen twice in one image, keeping the later detection",
                            detection.payload
                        );
                    }
                }
                Err(err) => {
                    debug!("skipping detection {:?}: {err}", detection.payload);
                    out.skipped += 1;
                }
            }
        }
        out
    }
}
