use serde::{Deserialize, Serialize};

/// Identifies one aggressor row within a [`crate::pattern::HammeringPattern`],
/// abstractly, before it is bound to a concrete DRAM row by a
/// [`crate::mapper::PatternAddressMapper`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggressor(pub u64);

impl Aggressor {
    /// Returns the raw numeric identifier.
    pub fn id(&self) -> u64 {
        self.0
    }
}
