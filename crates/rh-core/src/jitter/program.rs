use libc::{MAP_ANONYMOUS, MAP_PRIVATE, PROT_EXEC, PROT_READ, PROT_WRITE, c_void};
use std::io;
use std::mem;

/// A hammering routine assembled by [`crate::jitter::CodeJitter`] and mapped
/// into an executable page, ready to be called directly.
pub struct Program {
    ptr: *mut u8,
    len: usize,
    bytes: Vec<u8>,
}

impl Program {
    /// Maps `bytes` into a fresh executable buffer.
    pub fn new(bytes: Vec<u8>) -> io::Result<Self> {
        let len = bytes.len();
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                PROT_READ | PROT_WRITE | PROT_EXEC,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr as *mut u8, len);
        }
        Ok(Program { ptr: ptr as *mut u8, len, bytes })
    }

    /// Invokes the jitted routine and returns its `rax` result, conventionally
    /// the elapsed cycle count measured by the emitted preamble/body.
    ///
    /// # Safety
    ///
    /// Calls into raw machine code assembled by [`crate::jitter::CodeJitter`].
    /// Correctness relies entirely on that code being well-formed.
    pub fn call(&self) -> u64 {
        let func: extern "C" fn() -> u64 = unsafe { mem::transmute(self.ptr) };
        func()
    }

    /// Writes the raw assembled bytes to `path`, for offline disassembly.
    pub fn write(&self, path: &str) -> io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut c_void, self.len);
        }
    }
}

// SAFETY: the buffer is executable machine code with no interior mutability
// shared across threads; `Program` owns it exclusively.
unsafe impl Send for Program {}
