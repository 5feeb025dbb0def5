use crate::util::Rng;
use rand::Rng as _;

/// A distribution of row-to-row distances used when randomizing where
/// successive aggressors, or successive AAPs, land within a bank.
#[derive(Debug, Clone, Copy)]
pub struct RowDistance {
    /// Inclusive lower bound on the sampled distance.
    pub min: i64,
    /// Inclusive upper bound on the sampled distance.
    pub max: i64,
}

impl RowDistance {
    /// Builds a uniform distance distribution over `[min, max]`.
    pub fn new(min: i64, max: i64) -> Self {
        assert!(min <= max, "distance range must be non-empty");
        RowDistance { min, max }
    }

    /// Samples one distance from the distribution.
    pub fn sample(&self, rng: &mut Rng) -> i64 {
        rng.random_range(self.min..=self.max)
    }
}
