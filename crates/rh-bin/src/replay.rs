use anyhow::Result;
use log::info;
use rh_core::fuzzing::EffectivePattern;
use rh_core::jitter::{CodeJitter, FencingStrategy, FlushingStrategy};
use rh_core::memory::{DataPattern, DramAnalyzer, MemConfiguration, Memory};
use std::collections::HashSet;

/// Re-executes a previously recorded pattern against fresh DRAM rows,
/// sweeping across `sweep_locations` row offsets and reporting how many
/// flips each offset reproduces.
pub fn replay(pattern: &EffectivePattern, memory: &mut Memory, mem_config: MemConfiguration, sweep_locations: usize) -> Result<()> {
    let base = memory.ptr() as *const u8;
    let analyzer = DramAnalyzer::new(base, mem_config);
    let threshold = analyzer.measure_threshold(1000);
    let acts_per_tref = analyzer.count_acts_per_trefi(200)?;

    let Some(mut mapping) = pattern.address_mappings.first().cloned() else {
        info!("pattern {} has no recorded mapping to replay", pattern.pattern.instance_id);
        return Ok(());
    };

    let jitter = CodeJitter {
        flushing_strategy: FlushingStrategy::EarliestPossible,
        fencing_strategy: FencingStrategy::LatestPossible,
        sync_at_each_ref: true,
        num_aggs_for_sync: 2,
        threshold,
    };

    memory.initialize(DataPattern::Random, mem_config);

    for location in 0..sweep_locations {
        let addrs = mapping.export_pattern(&pattern.pattern.aggressors, base, mem_config);
        let program = jitter.jit(acts_per_tref, pattern.pattern.base_period, &addrs, pattern.pattern.total_acts as u64)?;
        let _cycles = program.call();

        let victim_rows: Vec<usize> = mapping.victim_rows(1, mem_config).into_iter().collect();
        let flips = memory.check_memory(mapping.bank, &victim_rows, DataPattern::Random, mem_config, false);
        info!("replay location {}/{}: {} flips", location + 1, sweep_locations, flips.len());

        mapping.shift_mapping(8, &HashSet::new(), mem_config);
    }

    Ok(())
}
