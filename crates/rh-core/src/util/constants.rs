/// Page shift value (12 bits) for 4KB pages.
pub const PAGE_SHIFT: usize = 12;
/// Standard page size (4096 bytes).
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
/// Mask for extracting the page offset.
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Row shift value (13 bits) for 8KB DRAM rows.
pub const ROW_SHIFT: usize = 13;
/// Standard DRAM row size (8192 bytes).
pub const ROW_SIZE: usize = 1 << ROW_SHIFT;
/// Mask for extracting the row offset.
pub const ROW_MASK: usize = ROW_SIZE - 1;

/// Cache line size (64 bytes) on x86_64.
pub const CL_SIZE: usize = 64;

/// Fixed virtual base address the hugepage-backed memory region is mapped at.
///
/// The analyzer and address mapper assume all cells are equally vulnerable, so the
/// region is always placed at the same address rather than wherever the allocator
/// happens to put it.
pub const BASE_MSB: *mut libc::c_void = 0x2000000000 as *mut libc::c_void;

/// Nominal length of one DRAM refresh interval (tREFI) in microseconds.
pub const REF_INTERVAL_LEN_US: f32 = 7.8;
