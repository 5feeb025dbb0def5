//! Small helpers shared across the DRAM addressing, pattern and fuzzing modules.
//!
//! - [`Size`] - Memory size representation
//! - Constants for memory operations ([`PAGE_SIZE`], [`ROW_SIZE`], etc.)
//! - [`Rng`] - seedable, reproducible random number generation
//! - [`mmap`]/[`munmap`] - anonymous memory mapping helpers used by the code jitter

mod constants;
mod mmap_util;
mod rng;
mod size;

pub use self::constants::*;
pub use self::mmap_util::{mmap, munmap};
pub use self::rng::Rng;
pub use self::size::Size;
