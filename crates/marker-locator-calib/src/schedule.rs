use serde::{Deserialize, Serialize};

/// One resolution level of the search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchStep {
    /// Half-width of the scanned window around the current best value.
    pub radius: f64,
    /// Spacing between neighbouring candidates.
    pub granularity: f64,
}

/// Relative slack used when deciding whether a window edge lands on the grid.
const GRID_EPS: f64 = 1e-9;

/// Largest number of values a single step may place on one axis.
pub const MAX_VALUES_PER_AXIS: usize = 100_000;

/// Largest Cartesian grid a single level may evaluate.
pub const MAX_CANDIDATES_PER_LEVEL: usize = 50_000_000;

impl SearchStep {
    pub const fn new(radius: f64, granularity: f64) -> Self {
        Self {
            radius,
            granularity,
        }
    }

    /// Finite, positive, and at most [`MAX_VALUES_PER_AXIS`] values wide.
    pub fn is_valid(&self) -> bool {
        self.offsets().is_some()
    }

    /// Number of grid values per axis, `0` for an invalid step.
    pub fn value_count(&self) -> usize {
        self.offsets()
            .map_or(0, |(below, above)| (below + above + 1) as usize)
    }

    /// Candidate values `center + k * granularity` inside
    /// `[center - radius, center + radius)`, ascending.
    ///
    /// `k = 0` is always present, so `center` itself is reproduced exactly.
    /// The lower edge is included and the upper edge excluded even when
    /// `radius / granularity` carries rounding noise. An invalid step yields
    /// no values.
    pub fn values_around(&self, center: f64) -> Vec<f64> {
        let Some((below, above)) = self.offsets() else {
            return Vec::new();
        };
        (-below..=above)
            .map(|k| center + k as f64 * self.granularity)
            .collect()
    }

    /// `(below, above)` integer offset counts of the window.
    fn offsets(&self) -> Option<(i64, i64)> {
        if !(self.radius.is_finite()
            && self.radius > 0.0
            && self.granularity.is_finite()
            && self.granularity > 0.0)
        {
            return None;
        }
        let ratio = self.radius / self.granularity;
        // an overflowed ratio is +inf
        if ratio > (MAX_VALUES_PER_AXIS / 2) as f64 {
            return None;
        }
        let below = (ratio + GRID_EPS).floor() as i64;
        let above = ((ratio - GRID_EPS).ceil() as i64 - 1).max(0);
        Some((below, above))
    }
}

/// Ordered resolution levels, coarsest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchSchedule {
    steps: Vec<SearchStep>,
}

impl SearchSchedule {
    pub fn new(steps: Vec<SearchStep>) -> Self {
        Self { steps }
    }

    #[inline]
    pub fn steps(&self) -> &[SearchStep] {
        &self.steps
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for SearchSchedule {
    fn default() -> Self {
        Self::new(vec![
            SearchStep::new(0.5, 0.1),
            SearchStep::new(0.1, 0.01),
            SearchStep::new(0.01, 0.001),
        ])
    }
}

impl From<Vec<SearchStep>> for SearchSchedule {
    fn from(steps: Vec<SearchStep>) -> Self {
        Self::new(steps)
    }
}
