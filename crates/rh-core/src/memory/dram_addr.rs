use crate::memory::AggressorPtr;
use crate::memory::MemConfiguration;
use std::fmt::{self, Display, Formatter};

/// A DRAM address given as (bank, row, column) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DRAMAddr {
    /// Bank number.
    pub bank: usize,
    /// Row number.
    pub row: usize,
    /// Column number.
    pub col: usize,
}

impl Display for DRAMAddr {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "({}, {}, {})", self.bank, self.row, self.col)
    }
}

impl DRAMAddr {
    /// Creates a new DRAM address.
    pub fn new(bank: usize, row: usize, col: usize) -> Self {
        DRAMAddr { bank, row, col }
    }

    /// Decodes a virtual address into DRAM coordinates using the linear bit
    /// functions in `mem_config`.
    pub fn from_virt(addr: AggressorPtr, mem_config: &MemConfiguration) -> DRAMAddr {
        let p = addr as usize;
        let mut res = 0;

        for &i in mem_config.dram_mtx.iter() {
            res <<= 1;
            res |= (p & i).count_ones() as usize & 1;
        }
        let bank = (res >> mem_config.bk_shift) & mem_config.bk_mask;
        let row = (res >> mem_config.row_shift) & mem_config.row_mask;
        let col = (res >> mem_config.col_shift) & mem_config.col_mask;

        DRAMAddr { bank, row, col }
    }

    /// Linearizes the (bank, row, column) triple into a single value using
    /// the configuration's shifts.
    pub fn linearize(&self, mem_config: MemConfiguration) -> usize {
        (self.bank << mem_config.bk_shift)
            | (self.row << mem_config.row_shift)
            | (self.col << mem_config.col_shift)
    }

    /// Converts this DRAM address back to a virtual address, assuming a
    /// single physically-contiguous region starting at `base_msb`.
    pub fn to_virt(&self, base_msb: AggressorPtr, mem_config: MemConfiguration) -> AggressorPtr {
        let mut res = 0;
        let l = self.linearize(mem_config);
        for &i in mem_config.addr_mtx.iter() {
            res <<= 1;
            res |= (l & i).count_ones() as usize % 2;
        }
        let base_msb_usize = (base_msb as usize) & !((1 << MTX_SIZE_BITS) - 1);
        (base_msb_usize | res) as AggressorPtr
    }

    /// Adds bank/row/column offsets, wrapping around at each component's
    /// addressable range as defined by `mem_config`.
    pub fn add(&self, mem_config: &MemConfiguration, d_bank: i64, d_row: i64, d_col: i64) -> DRAMAddr {
        DRAMAddr {
            bank: wrap_add(self.bank, d_bank, mem_config.get_bank_count()),
            row: wrap_add(self.row, d_row, mem_config.get_row_count()),
            col: wrap_add(self.col, d_col, mem_config.get_col_count()),
        }
    }

    /// Subtracts bank/row/column offsets, wrapping around like [`Self::add`].
    pub fn sub(&self, mem_config: &MemConfiguration, d_bank: i64, d_row: i64, d_col: i64) -> DRAMAddr {
        self.add(mem_config, -d_bank, -d_row, -d_col)
    }
}

const MTX_SIZE_BITS: usize = 30;

fn wrap_add(value: usize, delta: i64, modulus: usize) -> usize {
    let m = modulus as i64;
    let v = value as i64;
    (((v + delta) % m + m) % m) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mem_configuration::BitDef;

    fn sample_config() -> MemConfiguration {
        let bank_bits = vec![BitDef::Single(20)];
        let row_bits = vec![BitDef::Single(21), BitDef::Single(22)];
        let col_bits: Vec<BitDef> = (0..27).map(BitDef::Single).collect();
        MemConfiguration::from_bitdefs(bank_bits, row_bits, col_bits)
    }

    #[test]
    fn virt_round_trip_is_identity() {
        let cfg = sample_config();
        let base = crate::util::BASE_MSB as AggressorPtr;
        for row in 0..cfg.get_row_count() {
            for bank in 0..cfg.get_bank_count() {
                let addr = DRAMAddr::new(bank, row, 0);
                let virt = addr.to_virt(base, cfg);
                let decoded = DRAMAddr::from_virt(virt, &cfg);
                assert_eq!(addr, decoded);
            }
        }
    }

    #[test]
    fn row_add_wraps_at_row_count() {
        let cfg = sample_config();
        let row_count = cfg.get_row_count();
        let addr = DRAMAddr::new(0, row_count - 1, 0);
        let next = addr.add(&cfg, 0, 1, 0);
        assert_eq!(next.row, 0);
    }

    #[test]
    fn sub_is_inverse_of_add() {
        let cfg = sample_config();
        let addr = DRAMAddr::new(1, 2, 3);
        let shifted = addr.add(&cfg, 0, 2, 0);
        let back = shifted.sub(&cfg, 0, 2, 0);
        assert_eq!(addr.row, back.row);
    }
}
