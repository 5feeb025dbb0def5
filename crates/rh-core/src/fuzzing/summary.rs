use crate::mapper::PatternAddressMapper;
use crate::memory::MemConfiguration;
use crate::pattern::HammeringPattern;
use serde::{Deserialize, Serialize};

/// One retained pattern and the mappings that produced flips with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectivePattern {
    #[serde(flatten)]
    pub pattern: HammeringPattern,
    pub address_mappings: Vec<PatternAddressMapper>,
}

/// Run-level metadata recorded alongside the effective patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzSummaryMetadata {
    pub start: String,
    pub end: String,
    pub num_patterns: usize,
    pub memory_config: MemConfiguration,
    pub name: String,
}

/// The full persisted output of a fuzzing run, written as `fuzz-summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzSummary {
    pub metadata: FuzzSummaryMetadata,
    pub hammering_patterns: Vec<EffectivePattern>,
}
