//! orbit - a tiny JIT for complex-register fractal bytecode
//!
//! Translates three-opcode programs over a file of complex-number registers
//! into native SSE2 code at runtime and drives the result through an
//! escape-time renderer. A reference interpreter with identical semantics
//! serves as the cross-validation oracle and as the engine on platforms
//! without a native backend.

pub mod bytecode;
pub mod config;
pub mod interp;
#[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
pub mod jit;
pub mod render;
pub mod value;

// Re-export commonly used types
pub use bytecode::{Inst, Op, ParseError, Program};
pub use config::{EngineMode, RenderConfig, jit_supported};
pub use render::Engine;
pub use value::Complex;
