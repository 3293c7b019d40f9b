//! Just-in-time compilation of register bytecode to native code.
//!
//! The pipeline: a validated [`Program`](crate::bytecode::Program) walks
//! through the template compiler, which drives the SSE2 encoder into an
//! append-only code buffer; the finished byte stream is copied into a
//! read+write mapping and flipped to read+execute, yielding a
//! [`CompiledRoutine`] callable against a register file.
//!
//! Only built on x86-64 unix targets: the encoder emits SSE2 with System V
//! AMD64 operand conventions. Elsewhere the interpreter is the only engine.

mod codebuf;
pub mod compiler;
pub mod memory;
pub mod x86_64;

pub use compiler::{CompileError, MAX_INST_BYTES, compile, compile_to_bytes};
pub use memory::{CompiledRoutine, MemoryError};
