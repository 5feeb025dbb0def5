use anyhow::{Context, Result};
use rh_core::memory::{BitDef, MemConfiguration};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// The on-disk JSON device configuration: the DIMM topology and the linear
/// bit functions that define bank/row/column addressing.
#[derive(Debug, Clone, Deserialize)]
pub struct FuzzerConfig {
    /// Human-readable device name, carried through to the fuzz summary.
    pub name: String,
    pub channels: u32,
    pub dimms: u32,
    pub ranks: u32,
    pub total_banks: u32,
    pub row_bits: Vec<BitDef>,
    pub col_bits: Vec<BitDef>,
    pub bank_bits: Vec<BitDef>,
}

impl FuzzerConfig {
    /// Loads and parses a device configuration file.
    pub fn from_jsonfile(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: FuzzerConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Derives the DRAM addressing configuration from this device's bit functions.
    pub fn mem_configuration(&self) -> MemConfiguration {
        MemConfiguration::from_bitdefs(self.bank_bits.clone(), self.row_bits.clone(), self.col_bits.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_and_multi_bit_defs() {
        let json = r#"{
            "name": "test-dimm",
            "channels": 1, "dimms": 1, "ranks": 1, "total_banks": 2,
            "row_bits": [21, 22],
            "col_bits": [0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26],
            "bank_bits": [[20, 23]]
        }"#;
        let config: FuzzerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.row_bits.len(), 2);
        assert!(matches!(config.bank_bits[0], BitDef::Multi(_)));
    }
}
