use crate::mapper::distribution::RowDistance;
use crate::memory::{AggressorPtr, BitFlip, DRAMAddr, MemConfiguration};
use crate::pattern::{Aggressor, AggressorAccessPattern};
use crate::util::Rng;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::collections::{HashMap, HashSet};

/// Binds the abstract aggressor IDs of a [`crate::pattern::HammeringPattern`]
/// to concrete DRAM rows within one bank, and accumulates the bit flips
/// observed while that binding was hammered.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternAddressMapper {
    /// Unique identifier for this mapping.
    pub id: String,
    /// Bank every aggressor in this mapping is placed in.
    pub bank: usize,
    /// Aggressor ID -> DRAM row within `bank`.
    #[serde_as(as = "Vec<(_, _)>")]
    pub agg_id_to_row: HashMap<Aggressor, usize>,
    /// Bit flips observed across every DRAM-location probe of this mapping;
    /// one inner list per probe.
    pub bit_flips: Vec<Vec<BitFlip>>,
}

impl PatternAddressMapper {
    /// Draws a fresh random binding of every aggressor referenced by `aaps`
    /// to a row within a randomly chosen bank, spacing aggressors within an
    /// AAP by `inter_aggressor_distance` and successive AAPs by
    /// `inter_pattern_distance`.
    pub fn randomize_addresses(
        aaps: &[AggressorAccessPattern],
        mem_config: MemConfiguration,
        inter_aggressor_distance: RowDistance,
        inter_pattern_distance: RowDistance,
        rng: &mut Rng,
    ) -> Self {
        use rand::Rng as _;
        let bank = rng.random_range(0..mem_config.get_bank_count());
        let row_count = mem_config.get_row_count();
        let mut cursor: i64 = rng.random_range(0..row_count as i64);

        let mut agg_id_to_row = HashMap::new();
        for aap in aaps {
            cursor += inter_pattern_distance.sample(rng);
            for agg in &aap.aggressors {
                cursor += inter_aggressor_distance.sample(rng);
                let row = cursor.rem_euclid(row_count as i64) as usize;
                agg_id_to_row.insert(*agg, row);
            }
        }

        PatternAddressMapper {
            id: uuid::Uuid::new_v4().to_string(),
            bank,
            agg_id_to_row,
            bit_flips: Vec::new(),
        }
    }

    /// Translates an ordered aggressor sequence to virtual addresses using
    /// this mapping.
    pub fn export_pattern(
        &self,
        aggressors: &[Aggressor],
        base_msb: AggressorPtr,
        mem_config: MemConfiguration,
    ) -> Vec<AggressorPtr> {
        aggressors
            .iter()
            .map(|agg| {
                let row = self.agg_id_to_row[agg];
                DRAMAddr::new(self.bank, row, 0).to_virt(base_msb, mem_config)
            })
            .collect()
    }

    /// Translates every mapped aggressor to its row's victim window: rows
    /// `row - radius ..= row + radius` excluding the aggressor row itself.
    pub fn victim_rows(&self, radius: usize, mem_config: MemConfiguration) -> HashSet<usize> {
        let row_count = mem_config.get_row_count();
        let mut victims = HashSet::new();
        for &row in self.agg_id_to_row.values() {
            for delta in 1..=radius as i64 {
                victims.insert(((row as i64 + delta).rem_euclid(row_count as i64)) as usize);
                victims.insert(((row as i64 - delta).rem_euclid(row_count as i64)) as usize);
            }
        }
        for &row in self.agg_id_to_row.values() {
            victims.remove(&row);
        }
        victims
    }

    /// Shifts every mapped row by `delta` rows (wrapping at the bank's row
    /// count), except aggressors belonging to an AAP named in `excluded`.
    ///
    /// Used to probe a pattern/mapping pair against several different DRAM
    /// locations without re-randomizing the geometry of the mapping itself.
    pub fn shift_mapping(
        &mut self,
        delta: i64,
        excluded: &HashSet<Aggressor>,
        mem_config: MemConfiguration,
    ) {
        let row_count = mem_config.get_row_count() as i64;
        for (agg, row) in self.agg_id_to_row.iter_mut() {
            if excluded.contains(agg) {
                continue;
            }
            *row = ((*row as i64 + delta).rem_euclid(row_count)) as usize;
        }
    }

    /// Picks `n` rows in `bank` that are not currently assigned to any
    /// aggressor in this mapping.
    pub fn get_random_nonaccessed_rows(&self, n: usize, mem_config: MemConfiguration, rng: &mut Rng) -> Vec<usize> {
        use rand::Rng as _;
        let row_count = mem_config.get_row_count();
        let used: HashSet<usize> = self.agg_id_to_row.values().copied().collect();
        let mut out = Vec::with_capacity(n);
        let mut attempts = 0;
        while out.len() < n && attempts < row_count * 4 {
            attempts += 1;
            let row = rng.random_range(0..row_count);
            if !used.contains(&row) && !out.contains(&row) {
                out.push(row);
            }
        }
        out
    }

    /// Total number of bit flips observed across every probe of this mapping.
    pub fn count_bitflips(&self) -> usize {
        self.bit_flips.iter().map(|b| b.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BitDef;
    use crate::pattern::{AapSpec, HammeringPattern};

    fn sample_config() -> MemConfiguration {
        let bank_bits = vec![BitDef::Single(20)];
        let row_bits = vec![BitDef::Single(21), BitDef::Single(22), BitDef::Single(23)];
        let col_bits: Vec<BitDef> = (0..26).map(BitDef::Single).collect();
        MemConfiguration::from_bitdefs(bank_bits, row_bits, col_bits)
    }

    #[test]
    fn randomize_binds_every_aggressor() {
        let mem_config = sample_config();
        let mut next_id = 0;
        let specs = vec![AapSpec { frequency: 1, amplitude: 1, start_offset: 0, length: 2 }];
        let pattern = HammeringPattern::build(4, 4, specs, &mut next_id);
        let mut rng = Rng::from_seed(1);
        let mapping = PatternAddressMapper::randomize_addresses(
            &pattern.agg_access_patterns,
            mem_config,
            RowDistance::new(1, 2),
            RowDistance::new(1, 2),
            &mut rng,
        );
        for agg in &pattern.aggressors {
            assert!(mapping.agg_id_to_row.contains_key(agg));
        }
    }

    #[test]
    fn shift_mapping_preserves_relative_geometry() {
        let mem_config = sample_config();
        let mut next_id = 0;
        let specs = vec![AapSpec { frequency: 1, amplitude: 1, start_offset: 0, length: 2 }];
        let pattern = HammeringPattern::build(4, 4, specs, &mut next_id);
        let mut rng = Rng::from_seed(2);
        let mut mapping = PatternAddressMapper::randomize_addresses(
            &pattern.agg_access_patterns,
            mem_config,
            RowDistance::new(2, 2),
            RowDistance::new(2, 2),
            &mut rng,
        );
        let before: Vec<usize> = pattern.aggressors.iter().map(|a| mapping.agg_id_to_row[a]).collect();
        mapping.shift_mapping(5, &HashSet::new(), mem_config);
        let after: Vec<usize> = pattern.aggressors.iter().map(|a| mapping.agg_id_to_row[a]).collect();
        let row_count = mem_config.get_row_count() as i64;
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(((*b as i64 + 5).rem_euclid(row_count)) as usize, *a);
        }
    }
}
