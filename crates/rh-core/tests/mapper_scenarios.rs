//! S5: shifting a mapper by a fixed delta preserves every aggressor's
//! relative row offset and keeps both mappers in the same bank.

use rh_core::mapper::{PatternAddressMapper, RowDistance};
use rh_core::memory::{BitDef, MemConfiguration};
use rh_core::pattern::{AapSpec, HammeringPattern};
use rh_core::util::Rng;
use std::collections::HashSet;

fn sample_config() -> MemConfiguration {
    let bank_bits = vec![BitDef::Single(20)];
    let row_bits = vec![BitDef::Single(21), BitDef::Single(22), BitDef::Single(23), BitDef::Single(24)];
    let col_bits: Vec<BitDef> = (0..26).map(BitDef::Single).collect();
    MemConfiguration::from_bitdefs(bank_bits, row_bits, col_bits)
}

#[test]
fn shifted_mapper_preserves_offsets_and_bank() {
    let mem_config = sample_config();
    let mut next_id = 0;
    let specs = vec![
        AapSpec { frequency: 2, amplitude: 2, start_offset: 0, length: 2 },
        AapSpec { frequency: 1, amplitude: 1, start_offset: 3, length: 1 },
    ];
    let pattern = HammeringPattern::build(16, 16, specs, &mut next_id);

    let mut rng = Rng::from_seed(42);
    let m = PatternAddressMapper::randomize_addresses(
        &pattern.agg_access_patterns,
        mem_config,
        RowDistance::new(1, 2),
        RowDistance::new(2, 4),
        &mut rng,
    );

    let mut m_prime = m.clone();
    m_prime.shift_mapping(5, &HashSet::new(), mem_config);

    assert_eq!(m.bank, m_prime.bank, "shifting must not move the mapping to a different bank");

    let row_count = mem_config.get_row_count() as i64;
    for agg in &pattern.aggressors {
        let original = m.agg_id_to_row[agg] as i64;
        let shifted = m_prime.agg_id_to_row[agg] as i64;
        assert_eq!(shifted, (original + 5).rem_euclid(row_count));
    }
}
