use crate::jitter::{FencingStrategy, FlushingStrategy};
use crate::mapper::RowDistance;
use crate::pattern::AapSpec;
use crate::util::Rng;
use rand::Rng as _;
use serde::{Deserialize, Serialize};

/// Knobs that stay fixed across an entire run and are printed once at
/// startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFuzzingParams {
    /// Inclusive range `base_period` is drawn from.
    pub base_period_range: (u32, u32),
    /// Multiplier range applied to `base_period` to obtain `total_acts`.
    pub total_acts_multiplier_range: (u32, u32),
    /// Inclusive range for the number of AAPs per pattern.
    pub num_aaps_range: (u32, u32),
    /// Inclusive range for each AAP's aggressor-sequence length.
    pub aap_length_range: (u32, u32),
    /// Inclusive range for each AAP's amplitude.
    pub amplitude_range: (u32, u32),
    /// Row-distance distribution between aggressors of the same AAP.
    pub inter_aggressor_distance: RowDistance,
    /// Row-distance distribution between successive AAPs.
    pub inter_pattern_distance: RowDistance,
    /// Number of distinct addresses used for refresh synchronization.
    pub num_aggs_for_sync: usize,
    /// Number of DRAM locations probed per mapping during sweeping/probing.
    ///
    /// Left as configuration rather than a hardcoded default: real
    /// deployments have used both 1 and 3 depending on the device under
    /// test.
    pub num_dram_locations_per_mapping: usize,
    /// Mappers created per pattern before moving on to a new pattern.
    pub probes_per_pattern: usize,
}

/// The randomized knobs for one [`crate::pattern::HammeringPattern`];
/// rerolled before every pattern is generated.
#[derive(Debug, Clone)]
pub struct FuzzingParameterSet {
    pub base_period: u32,
    pub total_acts: u32,
    pub aap_specs: Vec<AapSpec>,
    pub flushing_strategy: FlushingStrategy,
    pub fencing_strategy: FencingStrategy,
    pub sync_at_each_ref: bool,
}

impl FuzzingParameterSet {
    /// Draws a fresh parameter set from the static ranges in `statics`.
    pub fn randomize(statics: &StaticFuzzingParams, rng: &mut Rng) -> Self {
        let base_period = pow2_in_range(rng, statics.base_period_range);
        let multiplier = rng.random_range(statics.total_acts_multiplier_range.0..=statics.total_acts_multiplier_range.1);
        let total_acts = base_period * multiplier.max(1);

        let num_aaps = rng.random_range(statics.num_aaps_range.0..=statics.num_aaps_range.1).max(1);
        let mut aap_specs = Vec::with_capacity(num_aaps as usize);
        for _ in 0..num_aaps {
            let frequency = divisor_of(rng, base_period);
            let length = rng
                .random_range(statics.aap_length_range.0..=statics.aap_length_range.1)
                .max(1);
            let max_amplitude = (base_period / frequency / length).max(1);
            let amplitude = rng
                .random_range(statics.amplitude_range.0..=statics.amplitude_range.1.min(max_amplitude))
                .max(1);
            let sub_period = base_period / frequency;
            let start_offset = if sub_period > 0 { rng.random_range(0..sub_period) } else { 0 };
            aap_specs.push(AapSpec { frequency, amplitude, start_offset, length });
        }

        let flushing_strategy = if rng.random_bool(0.5) {
            FlushingStrategy::EarliestPossible
        } else {
            FlushingStrategy::LatestPossible
        };
        let fencing_strategy = if rng.random_bool(0.5) {
            FencingStrategy::OmitFencing
        } else {
            FencingStrategy::LatestPossible
        };
        let sync_at_each_ref = rng.random_bool(0.5);

        FuzzingParameterSet {
            base_period,
            total_acts,
            aap_specs,
            flushing_strategy,
            fencing_strategy,
            sync_at_each_ref,
        }
    }
}

/// Draws a divisor of `n` uniformly among the divisors actually present.
fn divisor_of(rng: &mut Rng, n: u32) -> u32 {
    let divisors: Vec<u32> = (1..=n).filter(|d| n % d == 0).collect();
    divisors[rng.random_range(0..divisors.len())]
}

/// Draws a power-of-two base period within `range`, so that every AAP
/// frequency that must divide it has a reasonable pool of divisors.
fn pow2_in_range(rng: &mut Rng, range: (u32, u32)) -> u32 {
    let mut candidates = Vec::new();
    let mut p = 1u32;
    while p < range.0 {
        p *= 2;
    }
    while p <= range.1 {
        candidates.push(p);
        p *= 2;
    }
    if candidates.is_empty() {
        candidates.push(range.0.max(1));
    }
    candidates[rng.random_range(0..candidates.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statics() -> StaticFuzzingParams {
        StaticFuzzingParams {
            base_period_range: (8, 64),
            total_acts_multiplier_range: (2, 8),
            num_aaps_range: (1, 3),
            aap_length_range: (1, 3),
            amplitude_range: (1, 4),
            inter_aggressor_distance: RowDistance::new(1, 2),
            inter_pattern_distance: RowDistance::new(2, 16),
            num_aggs_for_sync: 2,
            num_dram_locations_per_mapping: 3,
            probes_per_pattern: 3,
        }
    }

    #[test]
    fn randomized_params_respect_aap_bounds() {
        let statics = statics();
        let mut rng = Rng::from_seed(7);
        for _ in 0..50 {
            let params = FuzzingParameterSet::randomize(&statics, &mut rng);
            assert_eq!(params.total_acts % params.base_period, 0);
            for spec in &params.aap_specs {
                assert!(spec.frequency * spec.amplitude * spec.length <= params.base_period);
                assert_eq!(params.base_period % spec.frequency, 0);
            }
        }
    }
}
