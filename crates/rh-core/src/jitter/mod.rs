//! The code jitter: compiles a concrete aggressor access sequence into a
//! self-timing, executable hammering routine.

mod code_jitter;
mod program;

pub use self::code_jitter::{CodeJitter, FencingStrategy, FlushingStrategy, JitterError};
pub use self::program::Program;
