use marker_locator_core::CalibrationParameters;

use crate::{AxisSpec, SearchStep};

/// Cartesian candidate grid of one search level.
///
/// Enumeration order is lexicographic in axis declaration order (first axis
/// varies slowest), ascending within each axis. Values rejected by an axis'
/// bounds are dropped per axis, which keeps the relative order of the
/// remaining candidates intact.
pub(crate) struct CandidateGrid {
    center: CalibrationParameters,
    axes: Vec<(AxisSpec, Vec<f64>)>,
    len: usize,
    rejected: usize,
}

impl CandidateGrid {
    /// `center` must carry a value for every axis (checked by the search).
    pub(crate) fn new(axes: &[AxisSpec], center: &CalibrationParameters, step: &SearchStep) -> Self {
        let mut full = 1usize;
        let axes: Vec<(AxisSpec, Vec<f64>)> = axes
            .iter()
            .map(|spec| {
                let value = spec.axis.value(center).unwrap_or(f64::NAN);
                let all = step.values_around(value);
                full = full.saturating_mul(all.len());
                let kept = all.into_iter().filter_map(|v| spec.admit(v)).collect();
                (*spec, kept)
            })
            .collect();
        let len = axes
            .iter()
            .fold(1usize, |acc, (_, values)| acc.saturating_mul(values.len()));
        Self {
            center: *center,
            axes,
            len,
            rejected: full - len,
        }
    }

    /// Number of candidates that will be evaluated.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Number of grid points dropped by axis bounds or positivity.
    #[inline]
    pub(crate) fn rejected(&self) -> usize {
        self.rejected
    }

    /// Parameters of the `index`-th candidate (`index < len`).
    pub(crate) fn candidate(&self, index: usize) -> CalibrationParameters {
        let mut rest = index;
        let mut params = self.center;
        for (spec, values) in self.axes.iter().rev() {
            let n = values.len();
            params = spec.axis.with_value(params, values[rest % n]);
            rest /= n;
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParameterAxis;

    fn center() -> CalibrationParameters {
        CalibrationParameters::new(0.8, 1.0, 7.93).expect("valid")
    }

    #[test]
    fn enumerates_first_axis_slowest() {
        let axes = [
            AxisSpec::new(ParameterAxis::FocalRatio),
            AxisSpec::new(ParameterAxis::LateralAngleScalar),
        ];
        let grid = CandidateGrid::new(&axes, &center(), &SearchStep::new(0.5, 0.25));
        assert_eq!(grid.len(), 16);
        assert_eq!(grid.rejected(), 0);

        let pairs: Vec<(f64, f64)> = (0..grid.len())
            .map(|i| grid.candidate(i))
            .map(|p| (p.focal_ratio, p.lateral_angle_scalar))
            .collect();
        assert_eq!(pairs[0], (0.30000000000000004, 0.5));
        assert_eq!(pairs[1], (0.30000000000000004, 0.75));
        assert_eq!(pairs[4].0, 0.55);
        assert_eq!(pairs[4].1, 0.5);
        assert_eq!(pairs[15], (1.05, 1.25));
        for pair in pairs.windows(2) {
            assert!(pair[0] < pair[1], "not lexicographic: {pair:?}");
        }
    }

    #[test]
    fn drops_non_positive_and_out_of_bounds_values() {
        let axes = [
            AxisSpec::new(ParameterAxis::FocalRatio),
            AxisSpec::bounded(ParameterAxis::LateralAngleScalar, 1.0, 2.0),
        ];
        let grid = CandidateGrid::new(&axes, &center(), &SearchStep::new(1.0, 0.5));
        // focal: 0.3, 0.8, 1.3 (-0.2 dropped); lateral: 1.0, 1.5 (0.0, 0.5 dropped)
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.rejected(), 16 - 6);
        let first = grid.candidate(0);
        assert_eq!(first.lateral_angle_scalar, 1.0);
        assert!(first.focal_ratio > 0.0);
    }

    #[test]
    fn centre_is_reproduced_exactly() {
        let axes = [AxisSpec::new(ParameterAxis::MarkerSize)];
        let grid = CandidateGrid::new(&axes, &center(), &SearchStep::new(0.3, 0.1));
        assert!((0..grid.len()).any(|i| grid.candidate(i) == center()));
    }
}
