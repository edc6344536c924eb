//! Error of one parameter set against the calibration dataset.

use marker_locator_core::{CalibrationParameters, Location, LocationExtractor};
use serde::{Deserialize, Serialize};

use crate::{CalibrationSample, GroundTruth};

/// Outcome for one ground-truth entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryDiagnostic {
    pub payload: String,
    pub known: GroundTruth,
    /// `None` when no valid detection carried this payload.
    pub predicted: Option<Location>,
    pub error: Option<f64>,
}

/// Per-sample error breakdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleDiagnostic {
    pub sample: String,
    /// Detections rejected by the projection model.
    pub skipped: usize,
    /// Sum of the matched entry errors.
    pub error: f64,
    /// One entry per ground-truth payload, in payload order.
    pub entries: Vec<EntryDiagnostic>,
}

/// Total absolute error of `params` over `samples`.
///
/// Only payloads present in both the extraction and the ground truth
/// contribute; the result is never negative.
pub fn total_error(samples: &[CalibrationSample], params: &CalibrationParameters) -> f64 {
    let dataset = Dataset::new(samples);
    let mut matched = vec![false; dataset.entries()];
    dataset.score(params, &mut matched)
}

/// Full per-sample breakdown of `params` over `samples`.
pub fn diagnose(
    samples: &[CalibrationSample],
    params: &CalibrationParameters,
) -> Vec<SampleDiagnostic> {
    let extractor = LocationExtractor::new(*params);
    samples
        .iter()
        .map(|sample| {
            let extraction = extractor.process(&sample.detections);
            let entries: Vec<EntryDiagnostic> = sample
                .truth
                .iter()
                .map(|(payload, known)| {
                    let predicted = extraction.locations.get(payload).cloned();
                    let error = predicted.as_ref().map(|p| known.error(p));
                    EntryDiagnostic {
                        payload: payload.clone(),
                        known: *known,
                        predicted,
                        error,
                    }
                })
                .collect();
            SampleDiagnostic {
                sample: sample.id.clone(),
                skipped: extraction.skipped,
                error: entries.iter().filter_map(|e| e.error).sum(),
                entries,
            }
        })
        .collect()
}

/// Samples with their ground-truth entries flattened to global indices.
///
/// Entry `offsets[s] + k` is the `k`-th payload (in key order) of sample `s`.
pub(crate) struct Dataset<'a> {
    samples: &'a [CalibrationSample],
    offsets: Vec<usize>,
    entries: usize,
}

impl<'a> Dataset<'a> {
    pub(crate) fn new(samples: &'a [CalibrationSample]) -> Self {
        let mut offsets = Vec::with_capacity(samples.len());
        let mut entries = 0;
        for sample in samples {
            offsets.push(entries);
            entries += sample.truth.len();
        }
        Self {
            samples,
            offsets,
            entries,
        }
    }

    #[inline]
    pub(crate) fn samples(&self) -> &'a [CalibrationSample] {
        self.samples
    }

    #[inline]
    pub(crate) fn entries(&self) -> usize {
        self.entries
    }

    /// Total error of `params`; sets `matched[i]` for every entry that found
    /// a location. Samples and entries are summed in a fixed order, so the
    /// result is reproducible bit for bit.
    pub(crate) fn score(&self, params: &CalibrationParameters, matched: &mut [bool]) -> f64 {
        let extractor = LocationExtractor::new(*params);
        let mut total = 0.0;
        for (sample, &offset) in self.samples.iter().zip(&self.offsets) {
            let extraction = extractor.process(&sample.detections);
            for (k, (payload, known)) in sample.truth.iter().enumerate() {
                if let Some(predicted) = extraction.locations.get(payload) {
                    total += known.error(predicted);
                    matched[offset + k] = true;
                }
            }
        }
        total
    }

    /// `(sample id, payload)` of a flattened entry index.
    pub(crate) fn entry(&self, index: usize) -> Option<(&'a str, &'a str)> {
        self.samples
            .iter()
            .zip(&self.offsets)
            .find_map(|(sample, &offset)| {
                let k = index.checked_sub(offset)?;
                let payload = sample.truth.keys().nth(k)?;
                Some((sample.id.as_str(), payload.as_str()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marker_locator_core::synthetic::{detection_at, Frame};

    const FRAME: Frame = Frame::new(4000.0, 3000.0);

    fn truth_params() -> CalibrationParameters {
        CalibrationParameters::new(0.775, 1.2, 7.93).expect("valid")
    }

    fn sample(id: &str, markers: &[(&str, f64, f64)]) -> CalibrationSample {
        let params = truth_params();
        let detections = markers
            .iter()
            .map(|&(p, f, l)| detection_at(p, &params, FRAME, f, l, 0.0))
            .collect();
        markers
            .iter()
            .fold(CalibrationSample::new(id, detections), |s, &(p, f, l)| {
                s.with_truth(p, GroundTruth::new(f, l))
            })
    }

    #[test]
    fn true_parameters_score_near_zero() {
        let samples = vec![
            sample("6ft", &[("a", 72.0, 0.0), ("b", 72.0, 10.0)]),
            sample("9ft", &[("a", 108.0, -5.0)]),
        ];
        assert!(total_error(&samples, &truth_params()) < 1e-9);

        let off = CalibrationParameters {
            focal_ratio: 0.7,
            ..truth_params()
        };
        assert!(total_error(&samples, &off) > 1.0);
    }

    #[test]
    fn missing_payloads_show_up_in_diagnostics() {
        let samples = vec![sample("6ft", &[("a", 72.0, 0.0)])
            .with_truth("ghost", GroundTruth::new(72.0, 0.0))];
        let diagnostics = diagnose(&samples, &truth_params());
        assert_eq!(diagnostics.len(), 1);
        let entries = &diagnostics[0].entries;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].payload, "a");
        assert!(entries[0].predicted.is_some());
        assert_eq!(entries[1].payload, "ghost");
        assert!(entries[1].predicted.is_none());
        assert_eq!(entries[1].error, None);
    }

    #[test]
    fn score_marks_matched_entries() {
        let samples = vec![
            sample("empty", &[]),
            sample("6ft", &[("a", 72.0, 0.0)]).with_truth("ghost", GroundTruth::new(1.0, 0.0)),
            sample("9ft", &[("b", 108.0, 0.0)]),
        ];
        let dataset = Dataset::new(&samples);
        assert_eq!(dataset.entries(), 3);
        let mut matched = vec![false; 3];
        dataset.score(&truth_params(), &mut matched);
        assert_eq!(matched, vec![true, false, true]);

        assert_eq!(dataset.entry(0), Some(("6ft", "a")));
        assert_eq!(dataset.entry(1), Some(("6ft", "ghost")));
        assert_eq!(dataset.entry(2), Some(("9ft", "b")));
        assert_eq!(dataset.entry(3), None);
    }
}
