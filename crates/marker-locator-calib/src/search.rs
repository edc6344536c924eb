//! Multi-resolution coordinate grid search over [`CalibrationParameters`].
//!
//! Every level of the [`SearchSchedule`] scans the Cartesian grid of all
//! configured axes around the current best parameters, then recentres on the
//! level's winner before the next, finer level. Candidates are compared by
//! total error; on exact ties the earliest-enumerated candidate wins, so a
//! run is fully reproducible (with or without the `rayon` feature).

use std::cmp::Ordering;
use std::collections::HashSet;

use log::{info, warn};
use marker_locator_core::CalibrationParameters;
use serde::{Deserialize, Serialize};

use crate::evaluate::{diagnose, Dataset, SampleDiagnostic};
use crate::grid::CandidateGrid;
use crate::schedule::MAX_CANDIDATES_PER_LEVEL;
use crate::{AxisSpec, CalibrationError, CalibrationSample, SearchSchedule, SearchStep};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How ground truth that never matched a location is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTruthPolicy {
    /// Log a warning and list the entry in [`CalibrationResult::missing_ground_truth`].
    #[default]
    Report,
    /// Fail the run with [`CalibrationError::MissingGroundTruth`].
    Fail,
}

/// A ground-truth entry no evaluated candidate ever located.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingGroundTruth {
    pub sample: String,
    pub payload: String,
}

/// State after one finished search level.
///
/// Enough to resume the search with [`CalibrationSearch::resume`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelCheckpoint {
    /// Index of the finished level in the schedule.
    pub level: usize,
    pub step: SearchStep,
    pub best_parameters: CalibrationParameters,
    pub best_error: f64,
    pub candidates_evaluated: usize,
    /// Grid points dropped by axis bounds or positivity.
    pub candidates_skipped: usize,
    /// Whether this level moved the centre.
    pub improved: bool,
}

/// Outcome of a calibration run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub parameters: CalibrationParameters,
    /// Minimal total error reached; never negative.
    pub total_error: f64,
    /// Total error of the starting parameters.
    pub initial_error: f64,
    /// Per-sample breakdown at `parameters`.
    pub diagnostics: Vec<SampleDiagnostic>,
    /// One checkpoint per level, in schedule order.
    pub levels: Vec<LevelCheckpoint>,
    pub missing_ground_truth: Vec<MissingGroundTruth>,
}

/// Configured calibration search over a fixed dataset.
pub struct CalibrationSearch<'a> {
    dataset: Dataset<'a>,
    axes: Vec<AxisSpec>,
    schedule: SearchSchedule,
    missing_truth: MissingTruthPolicy,
}

impl<'a> CalibrationSearch<'a> {
    /// Validate the inputs and build a search.
    ///
    /// An empty dataset is rejected first, before anything else is checked.
    pub fn new(
        samples: &'a [CalibrationSample],
        axes: Vec<AxisSpec>,
        schedule: SearchSchedule,
    ) -> Result<Self, CalibrationError> {
        if samples.is_empty() {
            return Err(CalibrationError::EmptyDataset);
        }
        if axes.is_empty() {
            return Err(CalibrationError::EmptyAxes);
        }
        let mut seen = HashSet::new();
        for spec in &axes {
            if !seen.insert(spec.axis) {
                return Err(CalibrationError::DuplicateAxis { axis: spec.axis });
            }
            if !spec.bounds_are_valid() {
                return Err(CalibrationError::InvalidBounds { axis: spec.axis });
            }
        }
        if schedule.is_empty() {
            return Err(CalibrationError::EmptySchedule);
        }
        for (index, step) in schedule.steps().iter().enumerate() {
            if !step.is_valid() {
                return Err(CalibrationError::InvalidStep {
                    index,
                    radius: step.radius,
                    granularity: step.granularity,
                });
            }
            let candidates = (step.value_count() as f64).powi(axes.len() as i32);
            if candidates > MAX_CANDIDATES_PER_LEVEL as f64 {
                return Err(CalibrationError::GridTooLarge {
                    index,
                    axes: axes.len(),
                    candidates,
                    limit: MAX_CANDIDATES_PER_LEVEL,
                });
            }
        }

        Ok(Self {
            dataset: Dataset::new(samples),
            axes,
            schedule,
            missing_truth: MissingTruthPolicy::default(),
        })
    }

    pub fn with_missing_truth(mut self, policy: MissingTruthPolicy) -> Self {
        self.missing_truth = policy;
        self
    }

    #[inline]
    pub fn axes(&self) -> &[AxisSpec] {
        &self.axes
    }

    #[inline]
    pub fn schedule(&self) -> &SearchSchedule {
        &self.schedule
    }

    /// Run the full schedule starting from `initial_guess`.
    pub fn run(
        &self,
        initial_guess: CalibrationParameters,
    ) -> Result<CalibrationResult, CalibrationError> {
        self.run_with_observer(initial_guess, |_| {})
    }

    /// Like [`run`](Self::run), calling `observer` after every level.
    ///
    /// The observer sees each checkpoint once, in order; persisting them is
    /// what makes a long run resumable.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, initial_guess, observer),
            fields(samples = self.dataset.samples().len(), axes = self.axes.len(), levels = self.schedule.len())
        )
    )]
    pub fn run_with_observer(
        &self,
        initial_guess: CalibrationParameters,
        mut observer: impl FnMut(&LevelCheckpoint),
    ) -> Result<CalibrationResult, CalibrationError> {
        self.check_center(&initial_guess)?;
        self.search_from(0, initial_guess, &mut observer)
    }

    /// Continue after `checkpoint`, centred on its best parameters.
    ///
    /// The checkpoint's parameters must lie within the axis bounds, like an
    /// initial guess.
    ///
    /// Missing-ground-truth tracking restarts with the resumed levels.
    pub fn resume(
        &self,
        checkpoint: &LevelCheckpoint,
        mut observer: impl FnMut(&LevelCheckpoint),
    ) -> Result<CalibrationResult, CalibrationError> {
        if checkpoint.level >= self.schedule.len() {
            return Err(CalibrationError::InvalidCheckpoint {
                level: checkpoint.level,
            });
        }
        self.check_center(&checkpoint.best_parameters)?;
        self.search_from(checkpoint.level + 1, checkpoint.best_parameters, &mut observer)
    }

    fn check_center(&self, center: &CalibrationParameters) -> Result<(), CalibrationError> {
        center.validate()?;
        for spec in &self.axes {
            let Some(value) = spec.axis.value(center) else {
                return Err(CalibrationError::UnsetAxis { axis: spec.axis });
            };
            if !spec.admits(value) {
                return Err(CalibrationError::InitialGuessOutOfBounds {
                    axis: spec.axis,
                    value,
                });
            }
        }
        Ok(())
    }

    fn search_from(
        &self,
        first_level: usize,
        center: CalibrationParameters,
        observer: &mut dyn FnMut(&LevelCheckpoint),
    ) -> Result<CalibrationResult, CalibrationError> {
        let mut matched = vec![false; self.dataset.entries()];
        let initial_error = self.dataset.score(&center, &mut matched);
        let mut best_parameters = center;
        let mut best_error = initial_error;
        info!("initial error {initial_error:.6} at {center:?}");

        let mut levels = Vec::with_capacity(self.schedule.len().saturating_sub(first_level));
        for (level, step) in self
            .schedule
            .steps()
            .iter()
            .enumerate()
            .skip(first_level)
        {
            let grid = CandidateGrid::new(&self.axes, &best_parameters, step);
            let scan = self.scan_level(&grid);
            for (slot, hit) in matched.iter_mut().zip(&scan.matched) {
                *slot |= *hit;
            }

            let mut improved = false;
            if let Some(winner) = scan.best {
                if winner.error < best_error {
                    best_parameters = grid.candidate(winner.index);
                    best_error = winner.error;
                    improved = true;
                }
            }

            info!(
                "level {}/{} (radius={}, granularity={}): {} candidates, {} skipped, best error {:.6}",
                level + 1,
                self.schedule.len(),
                step.radius,
                step.granularity,
                grid.len(),
                grid.rejected(),
                best_error
            );

            let checkpoint = LevelCheckpoint {
                level,
                step: *step,
                best_parameters,
                best_error,
                candidates_evaluated: grid.len(),
                candidates_skipped: grid.rejected(),
                improved,
            };
            observer(&checkpoint);
            levels.push(checkpoint);
        }

        let missing_ground_truth = self.collect_missing(&matched)?;

        Ok(CalibrationResult {
            parameters: best_parameters,
            total_error: best_error,
            initial_error,
            diagnostics: diagnose(self.dataset.samples(), &best_parameters),
            levels,
            missing_ground_truth,
        })
    }

    fn collect_missing(&self, matched: &[bool]) -> Result<Vec<MissingGroundTruth>, CalibrationError> {
        let mut missing = Vec::new();
        for (index, _) in matched.iter().enumerate().filter(|(_, hit)| !**hit) {
            let Some((sample, payload)) = self.dataset.entry(index) else {
                continue;
            };
            if self.missing_truth == MissingTruthPolicy::Fail {
                return Err(CalibrationError::MissingGroundTruth {
                    sample: sample.to_string(),
                    payload: payload.to_string(),
                });
            }
            warn!("ground truth {payload:?} of sample {sample:?} never matched a detection");
            missing.push(MissingGroundTruth {
                sample: sample.to_string(),
                payload: payload.to_string(),
            });
        }
        Ok(missing)
    }

    #[cfg(not(feature = "rayon"))]
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, grid), fields(candidates = grid.len()))
    )]
    fn scan_level(&self, grid: &CandidateGrid) -> LevelScan {
        (0..grid.len()).fold(LevelScan::new(self.dataset.entries()), |mut scan, index| {
            let error = self.dataset.score(&grid.candidate(index), &mut scan.matched);
            scan.observe(index, error);
            scan
        })
    }

    #[cfg(feature = "rayon")]
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, grid), fields(candidates = grid.len()))
    )]
    fn scan_level(&self, grid: &CandidateGrid) -> LevelScan {
        use rayon::prelude::*;

        let entries = self.dataset.entries();
        (0..grid.len())
            .into_par_iter()
            .fold(
                || LevelScan::new(entries),
                |mut scan, index| {
                    let error = self.dataset.score(&grid.candidate(index), &mut scan.matched);
                    scan.observe(index, error);
                    scan
                },
            )
            .reduce(|| LevelScan::new(entries), LevelScan::merge)
    }
}

/// Run a calibration search in one call.
pub fn run(
    samples: &[CalibrationSample],
    axes: &[AxisSpec],
    initial_guess: CalibrationParameters,
    schedule: &SearchSchedule,
) -> Result<CalibrationResult, CalibrationError> {
    CalibrationSearch::new(samples, axes.to_vec(), schedule.clone())?.run(initial_guess)
}

#[derive(Clone, Copy, Debug)]
struct Scored {
    index: usize,
    error: f64,
}

impl Scored {
    /// Lower error first, then lower enumeration index.
    fn cmp(&self, other: &Scored) -> Ordering {
        self.error
            .total_cmp(&other.error)
            .then(self.index.cmp(&other.index))
    }
}

/// Partial reduction of one level: the best candidate seen so far and the
/// union of matched ground-truth entries.
struct LevelScan {
    best: Option<Scored>,
    matched: Vec<bool>,
}

impl LevelScan {
    fn new(entries: usize) -> Self {
        Self {
            best: None,
            matched: vec![false; entries],
        }
    }

    fn observe(&mut self, index: usize, error: f64) {
        let scored = Scored { index, error };
        self.best = Some(match self.best {
            Some(best) if best.cmp(&scored).is_le() => best,
            _ => scored,
        });
    }

    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    fn merge(mut self, other: LevelScan) -> LevelScan {
        if let Some(best) = other.best {
            self.observe(best.index, best.error);
        }
        for (slot, hit) in self.matched.iter_mut().zip(other.matched) {
            *slot |= hit;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GroundTruth, ParameterAxis};
    use marker_locator_core::synthetic::{detection_at, Frame};

    const FRAME: Frame = Frame::new(4000.0, 3000.0);

    fn guess() -> CalibrationParameters {
        CalibrationParameters::new(0.7, 1.0, 7.93).expect("valid")
    }

    fn one_sample() -> Vec<CalibrationSample> {
        let truth = CalibrationParameters::new(0.8, 1.0, 7.93).expect("valid");
        vec![CalibrationSample::new(
            "6ft",
            vec![detection_at("a", &truth, FRAME, 72.0, 0.0, 0.0)],
        )
        .with_truth("a", GroundTruth::new(72.0, 0.0))]
    }

    #[test]
    fn empty_dataset_is_rejected_first() {
        let err = CalibrationSearch::new(&[], Vec::new(), SearchSchedule::new(Vec::new()))
            .err()
            .expect("empty dataset");
        assert_eq!(err, CalibrationError::EmptyDataset);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let samples = one_sample();
        let focal = AxisSpec::new(ParameterAxis::FocalRatio);

        let err = CalibrationSearch::new(&samples, Vec::new(), SearchSchedule::default()).err();
        assert_eq!(err, Some(CalibrationError::EmptyAxes));

        let err =
            CalibrationSearch::new(&samples, vec![focal, focal], SearchSchedule::default()).err();
        assert_eq!(
            err,
            Some(CalibrationError::DuplicateAxis {
                axis: ParameterAxis::FocalRatio
            })
        );

        let err = CalibrationSearch::new(&samples, vec![focal], SearchSchedule::new(Vec::new()))
            .err();
        assert_eq!(err, Some(CalibrationError::EmptySchedule));

        let schedule = SearchSchedule::new(vec![SearchStep::new(1.0, 0.1), SearchStep::new(0.1, 0.0)]);
        let err = CalibrationSearch::new(&samples, vec![focal], schedule).err();
        assert_eq!(
            err,
            Some(CalibrationError::InvalidStep {
                index: 1,
                radius: 0.1,
                granularity: 0.0
            })
        );
    }

    #[test]
    fn oversized_grids_are_rejected() {
        let samples = one_sample();
        let focal = AxisSpec::new(ParameterAxis::FocalRatio);

        let tiny = SearchSchedule::new(vec![SearchStep::new(1.0, 1e-300)]);
        let err = CalibrationSearch::new(&samples, vec![focal], tiny).err();
        assert_eq!(
            err,
            Some(CalibrationError::InvalidStep {
                index: 0,
                radius: 1.0,
                granularity: 1e-300
            })
        );

        // 20_000 values per axis is fine alone but not cubed
        let wide = SearchSchedule::new(vec![SearchStep::new(0.5, 0.1), SearchStep::new(1000.0, 0.1)]);
        let axes = vec![
            focal,
            AxisSpec::new(ParameterAxis::LateralAngleScalar),
            AxisSpec::new(ParameterAxis::MarkerSize),
        ];
        let err = CalibrationSearch::new(&samples, vec![focal], wide.clone()).err();
        assert_eq!(err, None);
        match CalibrationSearch::new(&samples, axes, wide).err() {
            Some(CalibrationError::GridTooLarge { index, axes, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(axes, 3);
            }
            other => panic!("expected GridTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn initial_guess_outside_bounds_is_rejected() {
        let samples = one_sample();
        let search = CalibrationSearch::new(
            &samples,
            vec![AxisSpec::bounded(ParameterAxis::FocalRatio, 0.9, 1.0)],
            SearchSchedule::new(vec![SearchStep::new(0.5, 0.1)]),
        )
        .expect("valid search");
        assert_eq!(
            search.run(guess()).err(),
            Some(CalibrationError::InitialGuessOutOfBounds {
                axis: ParameterAxis::FocalRatio,
                value: 0.7
            })
        );

        let checkpoint = LevelCheckpoint {
            level: 0,
            step: SearchStep::new(0.5, 0.1),
            best_parameters: guess(),
            best_error: 1.0,
            candidates_evaluated: 1,
            candidates_skipped: 0,
            improved: false,
        };
        assert!(matches!(
            search.resume(&checkpoint, |_| {}),
            Err(CalibrationError::InitialGuessOutOfBounds { .. })
        ));
    }

    #[test]
    fn results_stay_within_bounds() {
        let samples = one_sample();
        let result = run(
            &samples,
            &[AxisSpec::bounded(ParameterAxis::FocalRatio, 0.5, 0.75)],
            guess(),
            &SearchSchedule::new(vec![SearchStep::new(0.5, 0.1), SearchStep::new(0.1, 0.01)]),
        )
        .expect("calibration");
        // the optimum 0.8 lies above the bound, so the bound itself wins
        assert_eq!(result.parameters.focal_ratio, 0.75);
    }

    #[test]
    fn grid_values_next_to_bounds_are_kept() {
        let samples = one_sample();
        let result = run(
            &samples,
            &[AxisSpec::bounded(ParameterAxis::FocalRatio, 0.5, 0.9)],
            guess(),
            &SearchSchedule::new(vec![SearchStep::new(0.5, 0.1)]),
        )
        .expect("calibration");
        // 0.7 - 2 * 0.1 and 0.7 + 2 * 0.1 land a rounding error outside the bounds
        assert_eq!(result.levels[0].candidates_evaluated, 5);
        assert_eq!(result.levels[0].candidates_skipped, 5);
        let focal = result.parameters.focal_ratio;
        assert!((0.5..=0.9).contains(&focal), "focal_ratio {focal}");
    }

    #[test]
    fn level_scan_matches_sequential_fold() {
        let samples = one_sample();
        let axes = vec![
            AxisSpec::new(ParameterAxis::FocalRatio),
            AxisSpec::new(ParameterAxis::LateralAngleScalar),
            AxisSpec::new(ParameterAxis::MarkerSize),
        ];
        let search = CalibrationSearch::new(&samples, axes.clone(), SearchSchedule::default())
            .expect("valid search");
        let grid = CandidateGrid::new(&axes, &guess(), &SearchStep::new(0.5, 0.05));
        assert_eq!(grid.len(), 20 * 20 * 20);

        let sequential = (0..grid.len()).fold(
            LevelScan::new(search.dataset.entries()),
            |mut scan, index| {
                let error = search.dataset.score(&grid.candidate(index), &mut scan.matched);
                scan.observe(index, error);
                scan
            },
        );
        // parallel under the `rayon` feature
        let scanned = search.scan_level(&grid);

        let (a, b) = (
            scanned.best.expect("best"),
            sequential.best.expect("best"),
        );
        assert_eq!(a.index, b.index);
        assert_eq!(a.error.to_bits(), b.error.to_bits());
        assert_eq!(scanned.matched, sequential.matched);
    }

    #[test]
    fn searching_an_unset_vertical_axis_fails() {
        let samples = one_sample();
        let search = CalibrationSearch::new(
            &samples,
            vec![AxisSpec::new(ParameterAxis::VerticalAngleScalar)],
            SearchSchedule::default(),
        )
        .expect("valid search");
        assert_eq!(
            search.run(guess()).err(),
            Some(CalibrationError::UnsetAxis {
                axis: ParameterAxis::VerticalAngleScalar
            })
        );
    }

    #[test]
    fn finds_focal_ratio_of_a_single_marker() {
        let samples = one_sample();
        let schedule = SearchSchedule::new(vec![
            SearchStep::new(0.5, 0.1),
            SearchStep::new(0.1, 0.01),
        ]);
        let result = run(
            &samples,
            &[AxisSpec::new(ParameterAxis::FocalRatio)],
            guess(),
            &schedule,
        )
        .expect("calibration");
        assert!((result.parameters.focal_ratio - 0.8).abs() < 1e-9);
        assert!(result.total_error < 1e-9);
        assert!(result.initial_error > result.total_error);
        assert_eq!(result.levels.len(), 2);
        assert!(result.levels[0].improved);
        assert!(result.missing_ground_truth.is_empty());
    }

    #[test]
    fn ties_keep_the_earliest_candidate() {
        let mut scan = LevelScan::new(0);
        scan.observe(4, 1.0);
        scan.observe(2, 1.0);
        scan.observe(7, 1.0);
        scan.observe(9, 3.0);
        let best = scan.best.expect("best");
        assert_eq!(best.index, 2);

        let mut other = LevelScan::new(0);
        other.observe(1, 1.0);
        let merged = scan.merge(other);
        assert_eq!(merged.best.map(|b| b.index), Some(1));
    }

    #[test]
    fn missing_truth_is_reported_or_fatal() {
        let samples: Vec<_> = one_sample()
            .into_iter()
            .map(|s| s.with_truth("ghost", GroundTruth::new(10.0, 0.0)))
            .collect();
        let axes = vec![AxisSpec::new(ParameterAxis::FocalRatio)];
        let schedule = SearchSchedule::new(vec![SearchStep::new(0.2, 0.1)]);

        let search = CalibrationSearch::new(&samples, axes.clone(), schedule.clone())
            .expect("valid search");
        let result = search.run(guess()).expect("report policy");
        assert_eq!(
            result.missing_ground_truth,
            vec![MissingGroundTruth {
                sample: "6ft".to_string(),
                payload: "ghost".to_string()
            }]
        );

        let strict = CalibrationSearch::new(&samples, axes, schedule)
            .expect("valid search")
            .with_missing_truth(MissingTruthPolicy::Fail);
        assert_eq!(
            strict.run(guess()).err(),
            Some(CalibrationError::MissingGroundTruth {
                sample: "6ft".to_string(),
                payload: "ghost".to_string()
            })
        );
    }
}
