/// Maps anonymous memory at a specific address, or wherever the kernel chooses if `addr` is null.
///
/// Used by the code jitter to obtain a writable-then-executable buffer for freshly
/// assembled hammering code.
///
/// # Safety
///
/// Caller must ensure `addr` is null or a valid, suitably aligned target address.
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub fn mmap<P>(addr: *mut libc::c_void, len: usize) -> *mut P {
    use libc::{MAP_ANONYMOUS, MAP_PRIVATE, PROT_READ, PROT_WRITE};

    let v = unsafe {
        libc::mmap(
            addr,
            len,
            PROT_READ | PROT_WRITE,
            MAP_PRIVATE | MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    assert_ne!(
        v,
        libc::MAP_FAILED,
        "mmap: {}",
        std::io::Error::last_os_error()
    );
    v as *mut P
}

/// Unmaps memory previously obtained from [`mmap`].
///
/// # Safety
///
/// * `addr` must be a valid pointer to a region previously returned by [`mmap`].
/// * `len` must not exceed the length of that region.
pub unsafe fn munmap<P>(addr: *mut P, len: usize) {
    let r = unsafe { libc::munmap(addr as *mut libc::c_void, len) };
    assert_eq!(
        r,
        0,
        "munmap({:x}, {}): {}",
        addr as usize,
        len,
        std::io::Error::last_os_error()
    );
}
