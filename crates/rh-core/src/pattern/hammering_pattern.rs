use crate::pattern::aap::{AapSpec, AggressorAccessPattern};
use crate::pattern::Aggressor;
use serde::{Deserialize, Serialize};

/// A frequency-based hammering pattern: an ordered sequence of `total_acts`
/// aggressor-row activations, built from a set of
/// [`AggressorAccessPattern`]s layered at different frequencies within a
/// repeating `base_period`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HammeringPattern {
    /// Unique identifier for this pattern, stable across serialization.
    pub instance_id: String,
    /// Length, in activations, of one repeating unit of the pattern.
    pub base_period: u32,
    /// Total number of activations in the full pattern (a multiple of `base_period`).
    pub total_acts: u32,
    /// The full activation sequence: `aggressors[i]` is the aggressor accessed
    /// at slot `i`.
    pub aggressors: Vec<Aggressor>,
    /// The access patterns this sequence was assembled from, including the
    /// synthetic single-use ones filling any slots the explicit AAPs left open.
    pub agg_access_patterns: Vec<AggressorAccessPattern>,
}

impl HammeringPattern {
    /// Assembles a pattern from `aap_specs` following the frequency-domain
    /// slot-filling algorithm: specs are laid down from lowest to highest
    /// frequency (i.e. longest window first), each writing its sequence into
    /// every slot range it covers that isn't already claimed by an
    /// earlier (lower-frequency) spec. Any slot left unclaimed after all
    /// specs are placed gets a fresh, single-use, frequency-1 aggressor.
    pub fn build(
        base_period: u32,
        total_acts: u32,
        mut aap_specs: Vec<AapSpec>,
        next_aggressor_id: &mut u64,
    ) -> HammeringPattern {
        assert!(total_acts % base_period == 0, "total_acts must be a multiple of base_period");
        assert!(base_period > 0, "base_period must be positive");

        // Lower-frequency (longer-window) specs are placed first so that
        // higher-frequency specs fill in around them rather than the reverse;
        // ties keep their relative input order.
        aap_specs.sort_by_key(|s| s.frequency);

        let total = total_acts as usize;
        let mut slots: Vec<Option<Aggressor>> = vec![None; total];
        let mut agg_access_patterns = Vec::with_capacity(aap_specs.len());

        let num_periods = total_acts / base_period;

        for spec in &aap_specs {
            assert!(
                spec.frequency * spec.amplitude * spec.length <= base_period,
                "AAP of frequency {} would overflow its own window",
                spec.frequency
            );
            let ids: Vec<Aggressor> = (0..spec.length)
                .map(|_| {
                    let id = Aggressor(*next_aggressor_id);
                    *next_aggressor_id += 1;
                    id
                })
                .collect();

            let sub_len = (base_period / spec.frequency) as usize;
            let local_start = (spec.start_offset as usize) % sub_len;

            for p in 0..num_periods {
                let period_base = (p * base_period) as usize;
                for win in 0..spec.frequency {
                    let win_base = period_base + (win as usize) * sub_len;
                    for rep in 0..spec.amplitude {
                        for (j, id) in ids.iter().enumerate() {
                            let local_slot = local_start + (rep as usize) * (spec.length as usize) + j;
                            if local_slot >= sub_len {
                                continue;
                            }
                            let abs = win_base + local_slot;
                            if slots[abs].is_none() {
                                slots[abs] = Some(*id);
                            }
                        }
                    }
                }
            }

            agg_access_patterns.push(AggressorAccessPattern {
                frequency: spec.frequency,
                amplitude: spec.amplitude,
                start_offset: spec.start_offset,
                aggressors: ids,
            });
        }

        for (slot, entry) in slots.iter_mut().enumerate() {
            if entry.is_none() {
                let id = Aggressor(*next_aggressor_id);
                *next_aggressor_id += 1;
                *entry = Some(id);
                agg_access_patterns.push(AggressorAccessPattern {
                    frequency: 1,
                    amplitude: 1,
                    start_offset: (slot as u32) % base_period,
                    aggressors: vec![id],
                });
            }
        }

        HammeringPattern {
            instance_id: uuid::Uuid::new_v4().to_string(),
            base_period,
            total_acts,
            aggressors: slots.into_iter().map(|s| s.expect("every slot filled")).collect(),
            agg_access_patterns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Matches the worked example: B=16, T=32, AAP1=(f=2,a=2,s=0,n=2),
    /// AAP2=(f=1,a=1,s=3,n=1). After placing the lower-frequency AAP2 first,
    /// AAP1 fills around the slot AAP2 already claimed.
    #[test]
    fn scenario_s2_slot_filling() {
        let specs = vec![
            AapSpec { frequency: 2, amplitude: 2, start_offset: 0, length: 2 },
            AapSpec { frequency: 1, amplitude: 1, start_offset: 3, length: 1 },
        ];
        let mut next_id = 0;
        let pattern = HammeringPattern::build(16, 32, specs, &mut next_id);

        // aggressor at slot 3 is the frequency-1 AAP's single aggressor, and
        // it must equal the aggressor placed at slot 0 and slot 2 (the "A"
        // and "A" occurrences) only in terms of NOT being overwritten: slot 3
        // must differ from slot 1 (which is "B").
        assert_ne!(pattern.aggressors[3], pattern.aggressors[1]);
        assert_eq!(pattern.aggressors[3], pattern.aggressors[19]);

        // slots 0,1,2 repeat the two-element AAP1 sequence.
        assert_eq!(pattern.aggressors[0], pattern.aggressors[2]);
        assert_eq!(pattern.aggressors[0], pattern.aggressors[8]);
        assert_eq!(pattern.aggressors[1], pattern.aggressors[9]);

        // every aggressor referenced by an AAP appears in the flat sequence.
        for aap in &pattern.agg_access_patterns {
            for agg in &aap.aggressors {
                assert!(pattern.aggressors.contains(agg));
            }
        }
    }

    #[test]
    fn leftover_slots_get_singleton_aggressors() {
        let specs = vec![AapSpec { frequency: 1, amplitude: 1, start_offset: 0, length: 1 }];
        let mut next_id = 0;
        let pattern = HammeringPattern::build(8, 8, specs, &mut next_id);
        // slot 0 explicit, slots 1..8 must be filled by singleton AAPs.
        let singleton_aaps = pattern
            .agg_access_patterns
            .iter()
            .filter(|a| a.frequency == 1 && a.amplitude == 1 && a.aggressors.len() == 1)
            .count();
        assert_eq!(singleton_aaps, 8);
    }

    #[test]
    #[should_panic]
    fn total_acts_must_be_multiple_of_base_period() {
        let mut next_id = 0;
        HammeringPattern::build(10, 25, vec![], &mut next_id);
    }
}
