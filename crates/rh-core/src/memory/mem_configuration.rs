use crate::util::ROW_SHIFT;
use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};

/// Size of the DRAM addressing matrices: the number of physical address bits
/// spanning the bank, row and column functions together.
pub const MTX_SIZE: usize = 30;

/// A single DRAM addressing bit function.
///
/// A function can reference either one physical address bit, or the XOR of
/// several bits (a "linear" bit function, as used by real DDR4 addressing).
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum BitDef {
    /// Single bit function.
    Single(u64),
    /// XOR of multiple bits.
    Multi(Vec<u64>),
}

impl BitDef {
    /// Converts this bit definition to a bitmask over physical address bits.
    pub fn to_bitstr(&self) -> usize {
        let mut res: usize = 0;
        match self {
            BitDef::Single(bit) => res |= 1 << bit,
            BitDef::Multi(bits) => bits.iter().for_each(|bit| res |= 1 << bit),
        }
        res
    }
}

/// Derived DRAM addressing configuration.
///
/// Holds the linear bit-function matrices that translate between a virtual
/// address and its (bank, row, column) decomposition, plus the shifts/masks
/// needed to pick the bank/row/column fields back out of the linearized form.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MemConfiguration {
    /// Bit shift for bank extraction.
    pub bk_shift: usize,
    /// Bit mask for bank extraction.
    pub bk_mask: usize,
    /// Bit shift for row extraction.
    pub row_shift: usize,
    /// Bit mask for row extraction.
    pub row_mask: usize,
    /// Bit shift for column extraction.
    pub col_shift: usize,
    /// Bit mask for column extraction.
    pub col_mask: usize,
    /// DRAM addressing matrix (virtual address -> DRAM coordinates).
    pub dram_mtx: [usize; MTX_SIZE],
    /// Address reconstruction matrix (DRAM coordinates -> virtual address).
    pub addr_mtx: [usize; MTX_SIZE],
    /// Highest physical address bit referenced by any bank bit function.
    pub max_bank_bit: u64,
}

impl MemConfiguration {
    /// Builds a configuration from the bank/row/column bit functions found in
    /// a device configuration file.
    ///
    /// # Panics
    ///
    /// Panics if the three bit function lists don't add up to [`MTX_SIZE`]
    /// bits, or if the resulting matrix is not invertible (i.e. the
    /// configured bit functions don't actually determine a unique DRAM
    /// address for every virtual address).
    pub fn from_bitdefs(bank_bits: Vec<BitDef>, row_bits: Vec<BitDef>, col_bits: Vec<BitDef>) -> Self {
        let mut out = MemConfiguration::default();
        let mut i = 0;

        assert_eq!(
            MTX_SIZE,
            bank_bits.len() + col_bits.len() + row_bits.len(),
            "bank/row/col bit functions must cover exactly MTX_SIZE={} physical bits",
            MTX_SIZE
        );

        out.bk_shift = MTX_SIZE - bank_bits.len();
        out.bk_mask = (1 << bank_bits.len()) - 1;
        out.col_shift = MTX_SIZE - bank_bits.len() - col_bits.len();
        out.col_mask = (1 << col_bits.len()) - 1;
        out.row_shift = MTX_SIZE - bank_bits.len() - col_bits.len() - row_bits.len();
        out.row_mask = (1 << row_bits.len()) - 1;
        out.max_bank_bit = bank_bits
            .iter()
            .map(|b| match b {
                BitDef::Single(bit) => *bit,
                BitDef::Multi(bits) => *bits.iter().max().unwrap(),
            })
            .max()
            .expect("at least one bank bit function is required");

        let mut dram_mtx: [usize; MTX_SIZE] = [0; MTX_SIZE];
        let mut update_dram_mtx = |def: &BitDef| {
            dram_mtx[i] = def.to_bitstr();
            i += 1;
        };
        bank_bits.iter().for_each(&mut update_dram_mtx);
        col_bits.iter().for_each(&mut update_dram_mtx);
        row_bits.iter().for_each(&mut update_dram_mtx);
        out.dram_mtx = dram_mtx;

        let mut matrix = SMatrix::<u8, 30, 30>::zeros();
        for row in 0..MTX_SIZE {
            for col in 0..MTX_SIZE {
                matrix[(row, col)] = ((dram_mtx[row] >> (MTX_SIZE - col - 1)) & 1) as u8;
            }
        }
        let matrix_inv = matrix
            .cast::<f64>()
            .try_inverse()
            .expect("the bit functions in the DRAM configuration do not form an invertible matrix")
            .try_cast::<i8>()
            .expect("inverse cast to i8 failed")
            .map(|e| e.abs());

        let mut addr_mtx: [usize; MTX_SIZE] = [0; MTX_SIZE];
        for row in 0..MTX_SIZE {
            for col in 0..MTX_SIZE {
                if matrix_inv[(row, col)] != 0 && matrix_inv[(row, col)] != 1 {
                    panic!(
                        "expected inverted matrix entry to be 0 or 1, got {}",
                        matrix_inv[(row, col)]
                    );
                }
                addr_mtx[row] |= (matrix_inv[(row, col)] as usize) << (MTX_SIZE - col - 1);
            }
        }
        out.addr_mtx = addr_mtx;
        out
    }

    /// Returns the periodicity of the bank function, in rows.
    pub fn bank_function_period(&self) -> u64 {
        1 << (self.max_bank_bit + 1 - ROW_SHIFT as u64)
    }

    /// Returns the number of distinct banks addressable by this configuration.
    pub fn get_bank_count(&self) -> usize {
        1_usize << self.bk_mask.count_ones()
    }

    /// Returns the number of distinct rows addressable by this configuration.
    pub fn get_row_count(&self) -> usize {
        1_usize << self.row_mask.count_ones()
    }

    /// Returns the number of distinct columns addressable by this configuration.
    pub fn get_col_count(&self) -> usize {
        1_usize << self.col_mask.count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> MemConfiguration {
        // 1 bank bit, 2 row bits, 27 col bits: a tiny, easy-to-check geometry.
        let bank_bits = vec![BitDef::Single(20)];
        let row_bits = vec![BitDef::Single(21), BitDef::Single(22)];
        let col_bits: Vec<BitDef> = (0..27).map(BitDef::Single).collect();
        MemConfiguration::from_bitdefs(bank_bits, row_bits, col_bits)
    }

    #[test]
    fn bit_counts_round_trip() {
        let cfg = sample_config();
        assert_eq!(cfg.get_bank_count(), 2);
        assert_eq!(cfg.get_row_count(), 4);
        assert_eq!(cfg.get_col_count(), 1 << 27);
    }

    #[test]
    #[should_panic]
    fn wrong_total_bit_count_panics() {
        MemConfiguration::from_bitdefs(vec![BitDef::Single(0)], vec![BitDef::Single(1)], vec![]);
    }
}
