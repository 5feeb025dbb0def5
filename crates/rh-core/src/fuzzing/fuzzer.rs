use crate::fuzzing::params::{FuzzingParameterSet, StaticFuzzingParams};
use crate::fuzzing::summary::EffectivePattern;
use crate::jitter::CodeJitter;
use crate::mapper::PatternAddressMapper;
use crate::memory::{AggressorPtr, DataPattern, DramAnalyzer, Memory, MemConfiguration};
use crate::pattern::HammeringPattern;
use crate::ras::RasObserver;
use crate::util::Rng;
use log::{info, warn};
use rand::Rng as _;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};

/// How often, in patterns generated, `acts_per_tREFI` is re-measured to
/// track thermal/firmware drift.
const REMEASURE_EVERY_N_PATTERNS: u64 = 100;

/// Random row range swept between DRAM locations of the same pattern, per §4.7.
const SHIFT_RANGE: (i64, i64) = (1, 32);

/// Approximate wait, doing warm-up reads, between probing different DRAM
/// locations for the same pattern.
const BETWEEN_LOCATIONS_WAIT: Duration = Duration::from_millis(64);

/// Outcome of one fuzzing run.
pub struct FuzzRunResult {
    pub effective_patterns: Vec<EffectivePattern>,
    pub num_patterns_tried: usize,
}

/// Drives the generate/probe/rank/record loop described for the fuzzing
/// engine: build candidate patterns, bind them to DRAM rows, jit and
/// execute them, and keep whatever produced bit flips.
pub struct Fuzzer<'a> {
    memory: &'a mut Memory,
    mem_config: MemConfiguration,
    statics: StaticFuzzingParams,
    base: AggressorPtr,
    ras: RasObserver,
}

impl<'a> Fuzzer<'a> {
    pub fn new(memory: &'a mut Memory, mem_config: MemConfiguration, statics: StaticFuzzingParams, ras: RasObserver) -> Self {
        let base = memory.ptr() as AggressorPtr;
        Fuzzer { memory, mem_config, statics, base, ras }
    }

    /// Runs the fuzzing loop until `runtime_limit` elapses or `max_effective_patterns`
    /// effective patterns have been accumulated (whichever comes first; `None`
    /// disables the pattern-count end condition).
    pub fn run(&mut self, runtime_limit: Duration, max_effective_patterns: Option<usize>, rng: &mut Rng) -> FuzzRunResult {
        let deadline = Instant::now() + runtime_limit;
        let analyzer = DramAnalyzer::new(self.base, self.mem_config);
        let mut acts_per_tref = analyzer.count_acts_per_trefi(200).unwrap_or_else(|e| {
            warn!("initial acts-per-tREFI measurement failed ({}), assuming 64", e);
            64
        });
        info!("measured {} activations per tREFI", acts_per_tref);

        self.memory.initialize(DataPattern::Random, self.mem_config);

        let mut next_aggressor_id = 0u64;
        let mut effective_patterns = Vec::new();
        let mut num_patterns_tried = 0usize;

        while Instant::now() < deadline {
            if let Some(limit) = max_effective_patterns {
                if effective_patterns.len() >= limit {
                    break;
                }
            }

            let params = FuzzingParameterSet::randomize(&self.statics, rng);
            let mut pattern = HammeringPattern::build(
                params.base_period,
                params.total_acts,
                params.aap_specs.clone(),
                &mut next_aggressor_id,
            );
            pattern.agg_access_patterns.shuffle(rng);
            num_patterns_tried += 1;

            let mut kept_mappings = Vec::new();
            for _ in 0..self.statics.probes_per_pattern {
                if let Some(mapping) = self.probe_pattern(&pattern, &params, acts_per_tref, rng) {
                    kept_mappings.push(mapping);
                }
            }

            if !kept_mappings.is_empty() {
                info!(
                    "pattern {} produced flips across {} mapping(s)",
                    pattern.instance_id,
                    kept_mappings.len()
                );
                effective_patterns.push(EffectivePattern { pattern, address_mappings: kept_mappings });
            }

            if num_patterns_tried as u64 % REMEASURE_EVERY_N_PATTERNS == 0 {
                match analyzer.count_acts_per_trefi(acts_per_tref.saturating_sub(100).max(50)) {
                    Ok(fresh) => acts_per_tref = fresh,
                    Err(e) => warn!("mid-run acts-per-tREFI re-measurement failed, keeping previous value: {}", e),
                }
            }
        }

        FuzzRunResult { effective_patterns, num_patterns_tried }
    }

    /// Creates one mapping for `pattern`, hammers it across
    /// `num_dram_locations_per_mapping` DRAM locations, and returns it if any
    /// location produced flips.
    fn probe_pattern(
        &mut self,
        pattern: &HammeringPattern,
        params: &FuzzingParameterSet,
        acts_per_tref: u64,
        rng: &mut Rng,
    ) -> Option<PatternAddressMapper> {
        let mut mapping = PatternAddressMapper::randomize_addresses(
            &pattern.agg_access_patterns,
            self.mem_config,
            self.statics.inter_aggressor_distance,
            self.statics.inter_pattern_distance,
            rng,
        );

        let analyzer = DramAnalyzer::new(self.base, self.mem_config);
        let threshold = analyzer.measure_threshold(1000);
        let jitter = CodeJitter {
            flushing_strategy: params.flushing_strategy,
            fencing_strategy: params.fencing_strategy,
            sync_at_each_ref: params.sync_at_each_ref,
            num_aggs_for_sync: self.statics.num_aggs_for_sync,
            threshold,
        };

        for location in 0..self.statics.num_dram_locations_per_mapping {
            let addrs = mapping.export_pattern(&pattern.aggressors, self.base, self.mem_config);
            let program = match jitter.jit(acts_per_tref, pattern.base_period, &addrs, pattern.total_acts as u64) {
                Ok(p) => p,
                Err(e) => {
                    warn!("jit failed for mapping {}: {}", mapping.id, e);
                    continue;
                }
            };
            let _cycles = program.call();

            let victim_rows: Vec<usize> = mapping.victim_rows(1, self.mem_config).into_iter().collect();
            let flips = self.memory.check_memory(mapping.bank, &victim_rows, DataPattern::Random, self.mem_config, false);
            let _corrected = self.ras.report_corrected_bitflips();
            let found_flips = !flips.is_empty();
            mapping.bit_flips.push(flips);

            if location + 1 < self.statics.num_dram_locations_per_mapping {
                let delta = rng.random_range(SHIFT_RANGE.0..=SHIFT_RANGE.1);
                mapping.shift_mapping(delta, &Default::default(), self.mem_config);
                self.warm_up(&mapping, rng);
            }
            let _ = found_flips;
        }

        if mapping.count_bitflips() > 0 {
            Some(mapping)
        } else {
            None
        }
    }

    /// Reads a handful of rows outside the mapping for `BETWEEN_LOCATIONS_WAIT`
    /// to avoid leaving the memory bus idle between probes.
    fn warm_up(&self, mapping: &PatternAddressMapper, rng: &mut Rng) {
        use crate::memory::DRAMAddr;
        let rows = mapping.get_random_nonaccessed_rows(4, self.mem_config, rng);
        let addrs: Vec<AggressorPtr> = rows
            .iter()
            .map(|&row| DRAMAddr::new(mapping.bank, row, 0).to_virt(self.base, self.mem_config))
            .collect();
        let start = Instant::now();
        while start.elapsed() < BETWEEN_LOCATIONS_WAIT {
            for &addr in &addrs {
                let _ = unsafe { std::ptr::read_volatile(addr) };
            }
        }
    }
}
