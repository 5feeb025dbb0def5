use crate::memory::{BitFlip, DRAMAddr, MemConfiguration};
use crate::util::{BASE_MSB, Rng};
use libc::{MAP_POPULATE, MAP_SHARED, O_CREAT, O_RDWR, c_void};
use log::{debug, info};
use rand::RngCore;
use std::ffi::CString;
use std::fmt;
use std::path::Path;

/// Pointer type for aggressor/victim row addresses.
pub type AggressorPtr = *const u8;

/// Errors that can occur while allocating or accessing the hugepage-backed
/// memory region.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Opening or sizing the hugetlbfs-backed file failed.
    #[error("failed to open hugepage file at {path}: {source}")]
    OpenFailed {
        /// Path that was opened.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The `mmap` call itself failed.
    #[error("mmap failed: {0}")]
    MmapFailed(std::io::Error),
}

/// The data pattern a memory region is filled with before hammering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataPattern {
    /// All-zero bytes.
    Zero,
    /// All-one (0xFF) bytes.
    One,
    /// Bytes drawn from a PRNG seeded per DRAM row, so the expected value at
    /// any address can be regenerated later from the row number alone.
    Random,
}

impl fmt::Display for DataPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataPattern::Zero => write!(f, "zero"),
            DataPattern::One => write!(f, "one"),
            DataPattern::Random => write!(f, "random"),
        }
    }
}

impl DataPattern {
    /// The expected byte value at `(row, col)` under this pattern.
    fn expected_byte(&self, row: usize, col: usize) -> u8 {
        match self {
            DataPattern::Zero => 0x00,
            DataPattern::One => 0xFF,
            DataPattern::Random => {
                let mut rng = Rng::from_seed(row as u64);
                // advance the stream deterministically so every column in the
                // row gets a distinct, reproducible byte.
                let mut byte = 0u8;
                for _ in 0..=col {
                    byte = (rng.next_u32() & 0xFF) as u8;
                }
                byte
            }
        }
    }
}

/// A managed hugepage-backed memory region used both as the aggressor rows a
/// pattern hammers and as the victim rows that get scanned for bit flips.
pub struct Memory {
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for Memory {}
unsafe impl Sync for Memory {}

impl Memory {
    /// Allocates `size` bytes of hugepage-backed memory at the fixed
    /// [`BASE_MSB`] virtual address, mounted under `mount_point`.
    ///
    /// `mount_point` is expected to already be a mounted hugetlbfs
    /// filesystem; mounting it is an operating-system administration step
    /// performed outside this crate.
    pub fn allocate_memory(mount_point: &Path, size: usize) -> Result<Memory, MemoryError> {
        let path = mount_point.join("rh-fuzz-buf");
        let path_str = path.to_string_lossy().to_string();
        let cpath = CString::new(path_str.clone()).expect("path must not contain NUL bytes");

        let fd = unsafe { libc::open(cpath.as_ptr(), O_RDWR | O_CREAT, 0o666) };
        if fd == -1 {
            return Err(MemoryError::OpenFailed {
                path: path_str,
                source: std::io::Error::last_os_error(),
            });
        }
        if unsafe { libc::ftruncate(fd, size as libc::off_t) } == -1 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(MemoryError::OpenFailed {
                path: path_str,
                source: err,
            });
        }

        let p = unsafe {
            libc::mmap(
                BASE_MSB,
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                MAP_SHARED | MAP_POPULATE,
                fd,
                0,
            )
        };
        unsafe { libc::close(fd) };
        if p == libc::MAP_FAILED {
            return Err(MemoryError::MmapFailed(std::io::Error::last_os_error()));
        }

        info!("allocated {} bytes of hugepage memory at {:p}", size, p);
        Ok(Memory {
            ptr: p as *mut u8,
            len: size,
        })
    }

    /// Pointer to the first byte of the region.
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Size of the region in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the region is empty (never true for an allocated region).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writes `pattern` to every DRAM cell in the region.
    pub fn initialize(&self, pattern: DataPattern, mem_config: MemConfiguration) {
        info!("initializing buffer with pattern {}", pattern);
        for bank in 0..mem_config.get_bank_count() {
            for row in 0..mem_config.get_row_count() {
                for col in 0..mem_config.get_col_count() {
                    let addr = DRAMAddr::new(bank, row, col).to_virt(self.ptr as AggressorPtr, mem_config);
                    let byte = pattern.expected_byte(row, col);
                    unsafe { std::ptr::write_volatile(addr as *mut u8, byte) };
                }
            }
        }
        debug!("memory init done");
    }

    /// Scans `rows` (within `bank`) for bit flips against `pattern`,
    /// flushing each cell from the cache before comparing so reads come from
    /// DRAM rather than a stale cache line.
    ///
    /// When `reproducibility` is set, mismatched cells are left untouched
    /// (not rewritten to the expected value) so a follow-up scan can confirm
    /// the flip persists.
    pub fn check_memory(
        &self,
        bank: usize,
        rows: &[usize],
        pattern: DataPattern,
        mem_config: MemConfiguration,
        reproducibility: bool,
    ) -> Vec<BitFlip> {
        let mut flips = Vec::new();
        for &row in rows {
            for col in 0..mem_config.get_col_count() {
                let addr = DRAMAddr::new(bank, row, col).to_virt(self.ptr as AggressorPtr, mem_config);
                unsafe { std::arch::x86_64::_mm_clflush(addr as *const u8) };
                unsafe { std::arch::x86_64::_mm_mfence() };
                let expected = pattern.expected_byte(row, col);
                let actual = unsafe { std::ptr::read_volatile(addr) };
                if actual != expected {
                    flips.push(BitFlip::new(addr as usize, row, expected, actual));
                    if !reproducibility {
                        unsafe { std::ptr::write_volatile(addr as *mut u8, expected) };
                    }
                }
            }
        }
        flips
    }
}

impl Drop for Memory {
    fn drop(&mut self) {
        unsafe {
            let _ = crate::util::munmap(self.ptr, self.len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_pattern_reproducible_from_row() {
        let a = DataPattern::Random.expected_byte(5, 3);
        let b = DataPattern::Random.expected_byte(5, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn random_pattern_varies_by_row() {
        let a = DataPattern::Random.expected_byte(1, 0);
        let b = DataPattern::Random.expected_byte(2, 0);
        assert_ne!(a, b, "rows should (overwhelmingly likely) differ");
    }

    #[test]
    fn zero_and_one_are_constant() {
        assert_eq!(DataPattern::Zero.expected_byte(9, 100), 0x00);
        assert_eq!(DataPattern::One.expected_byte(9, 100), 0xFF);
    }
}
