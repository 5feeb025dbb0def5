use crate::pattern::Aggressor;
use serde::{Deserialize, Serialize};

/// An aggressor access pattern (AAP): a group of aggressor rows accessed
/// together at a given frequency, amplitude and phase within a pattern's
/// base period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggressorAccessPattern {
    /// How many equal-length windows the base period is divided into for
    /// this AAP (higher frequency = more, shorter windows per base period).
    pub frequency: u32,
    /// How many times the aggressor sequence repeats back-to-back within
    /// each window.
    pub amplitude: u32,
    /// Phase offset of this AAP's sequence within its window.
    pub start_offset: u32,
    /// The aggressor rows accessed, in order, once per repetition.
    pub aggressors: Vec<Aggressor>,
}

/// The parameters used to instantiate one [`AggressorAccessPattern`] while
/// building a [`crate::pattern::HammeringPattern`]; the concrete `aggressors`
/// are assigned fresh IDs by the builder.
#[derive(Debug, Clone)]
pub struct AapSpec {
    /// See [`AggressorAccessPattern::frequency`].
    pub frequency: u32,
    /// See [`AggressorAccessPattern::amplitude`].
    pub amplitude: u32,
    /// See [`AggressorAccessPattern::start_offset`].
    pub start_offset: u32,
    /// Number of distinct aggressor rows in this AAP's sequence.
    pub length: u32,
}
