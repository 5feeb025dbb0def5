//! S6: a fuzz-summary written after a run with no flips round-trips with
//! `hammering_patterns == []` and `metadata.num_patterns == 0`.

use rh_bin::summary::{load_summary, write_summary};
use rh_core::fuzzing::{FuzzSummary, FuzzSummaryMetadata};
use rh_core::memory::{BitDef, MemConfiguration};

fn sample_config() -> MemConfiguration {
    let bank_bits = vec![BitDef::Single(20)];
    let row_bits = vec![BitDef::Single(21), BitDef::Single(22)];
    let col_bits: Vec<BitDef> = (0..20).map(BitDef::Single).collect();
    MemConfiguration::from_bitdefs(bank_bits, row_bits, col_bits)
}

#[test]
fn empty_run_summary_round_trips() {
    let summary = FuzzSummary {
        metadata: FuzzSummaryMetadata {
            start: "2026-07-27T00:00:00+00:00".to_string(),
            end: "2026-07-27T00:00:01+00:00".to_string(),
            num_patterns: 0,
            memory_config: sample_config(),
            name: "test-device".to_string(),
        },
        hammering_patterns: Vec::new(),
    };

    let mut path = std::env::temp_dir();
    path.push(format!("rh-fuzz-test-summary-{}.json", std::process::id()));

    write_summary(&summary, &path).expect("writing an empty summary must succeed");
    let loaded = load_summary(&path).expect("loading it back must succeed");

    assert!(loaded.hammering_patterns.is_empty());
    assert_eq!(loaded.metadata.num_patterns, 0);

    let _ = std::fs::remove_file(&path);
}
