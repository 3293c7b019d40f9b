//! Template JIT compiler: a bytecode program in, a native routine out.
//!
//! Each bytecode operation expands to a fixed instruction template over a
//! handful of XMM scratch registers; the templates match the reference
//! interpreter operation for operation, so compiled and interpreted results
//! are bit-identical.

use super::codebuf::CodeBuffer;
use super::memory::{CompiledRoutine, MemoryError};
use super::x86_64::{EncodeError, Sse2Assembler, Xmm};
use crate::bytecode::{Op, Program};
use crate::value::{IM_OFFSET, MAX_REGISTERS, RE_OFFSET, register_disp};

/// Scratch-register conventions for the emitted templates.
///
/// All scratch registers are caller-saved under System V AMD64, so the
/// routine saves and restores nothing.
mod regs {
    use super::Xmm;

    /// Whole-value transfer in the assign and add templates.
    pub const PACKED: Xmm = Xmm::Xmm0;

    // Multiply template: the four loaded fields...
    pub const SRC_RE: Xmm = Xmm::Xmm0;
    pub const SRC_IM: Xmm = Xmm::Xmm1;
    pub const DST_RE: Xmm = Xmm::Xmm2;
    pub const DST_IM: Xmm = Xmm::Xmm3;
    // ...and the two cross products, held separately so the loaded dst
    // fields stay live until both result terms are formed.
    pub const PROD_A: Xmm = Xmm::Xmm4;
    pub const PROD_B: Xmm = Xmm::Xmm5;
}

/// Upper bound on emitted bytes for one bytecode instruction: the multiply
/// template's four scalar loads, six register ops, and two scalar stores.
pub const MAX_INST_BYTES: usize = 62;

/// Error type for compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileError {
    /// The register count puts some field displacement outside the
    /// signed-byte addressing range.
    OffsetOverflow { register_count: usize },
    /// The instruction at `position` names a register outside the
    /// program's register file.
    RegisterOutOfRange { position: usize, register: u8 },
    /// An instruction failed to encode.
    Encode(EncodeError),
    /// The executable mapping could not be obtained or protected.
    Memory(MemoryError),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::OffsetOverflow { register_count } => {
                write!(
                    f,
                    "{} registers cannot be addressed with single-byte displacements (max {})",
                    register_count, MAX_REGISTERS
                )
            }
            CompileError::RegisterOutOfRange { position, register } => {
                write!(
                    f,
                    "instruction {} references register {} outside the register file",
                    position, register
                )
            }
            CompileError::Encode(e) => write!(f, "encoding failed: {}", e),
            CompileError::Memory(e) => write!(f, "executable memory failed: {}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<EncodeError> for CompileError {
    fn from(e: EncodeError) -> Self {
        CompileError::Encode(e)
    }
}

/// Compile `program` into a callable native routine.
///
/// Compilation is atomic: on any error the emitted bytes are discarded and
/// nothing reaches the executable memory manager.
pub fn compile(program: &Program) -> Result<CompiledRoutine, CompileError> {
    let code = compile_to_bytes(program)?;
    CompiledRoutine::finalize(&code, program.register_count).map_err(CompileError::Memory)
}

/// Emit the machine code for `program` without mapping it executable.
///
/// Validation happens here, before any byte becomes callable: the register
/// count must fit the displacement range, and every instruction's operands
/// must lie inside the register file.
pub fn compile_to_bytes(program: &Program) -> Result<Vec<u8>, CompileError> {
    if program.register_count > MAX_REGISTERS {
        return Err(CompileError::OffsetOverflow {
            register_count: program.register_count,
        });
    }

    let mut buf = CodeBuffer::with_capacity(program.insts.len() * MAX_INST_BYTES + 1);
    for (position, inst) in program.insts.iter().enumerate() {
        for register in [inst.src, inst.dst] {
            if register as usize >= program.register_count {
                return Err(CompileError::RegisterOutOfRange { position, register });
            }
        }

        let src = register_disp(inst.src);
        let dst = register_disp(inst.dst);
        let re = RE_OFFSET as i32;
        let im = IM_OFFSET as i32;

        let mut asm = Sse2Assembler::new(&mut buf);
        match inst.op {
            // dst := src
            Op::Assign => {
                asm.movupd_load(src, regs::PACKED)?;
                asm.movupd_store(regs::PACKED, dst)?;
            }

            // dst += src; there is no memory+memory add, so src goes
            // through a register
            Op::Add => {
                asm.movupd_load(src, regs::PACKED)?;
                asm.addpd_load(dst, regs::PACKED)?;
                asm.movupd_store(regs::PACKED, dst)?;
            }

            // dst := dst * src (complex). The cross products are formed in
            // PROD_A/PROD_B before anything is stored; writing dst.re first
            // would corrupt the operands of the imaginary term.
            Op::Mul => {
                asm.movsd_load(src + re, regs::SRC_RE)?;
                asm.movsd_load(src + im, regs::SRC_IM)?;
                asm.movsd_load(dst + re, regs::DST_RE)?;
                asm.movsd_load(dst + im, regs::DST_IM)?;

                asm.movsd_rr(regs::PROD_A, regs::DST_RE);
                asm.mulsd(regs::PROD_A, regs::SRC_RE); // dst.re * src.re
                asm.movsd_rr(regs::PROD_B, regs::DST_IM);
                asm.mulsd(regs::PROD_B, regs::SRC_IM); // dst.im * src.im
                asm.subsd(regs::PROD_A, regs::PROD_B);
                asm.movsd_store(regs::PROD_A, dst + re)?;

                asm.mulsd(regs::DST_IM, regs::SRC_RE); // dst.im * src.re
                asm.mulsd(regs::DST_RE, regs::SRC_IM); // dst.re * src.im
                asm.addsd(regs::DST_RE, regs::DST_IM);
                asm.movsd_store(regs::DST_RE, dst + im)?;
            }
        }
    }

    // Every routine returns to the caller, including the empty program.
    Sse2Assembler::new(&mut buf).ret();

    Ok(buf.into_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Inst, Program};

    #[test]
    fn test_assign_bytes() {
        let program = Program::parse("=ab", 4).unwrap();
        let code = compile_to_bytes(&program).unwrap();
        assert_eq!(
            code,
            vec![
                0x66, 0x0F, 0x10, 0x47, 0x00, // MOVUPD XMM0, [RDI+0]
                0x66, 0x0F, 0x11, 0x47, 0x10, // MOVUPD [RDI+16], XMM0
                0xC3, // RET
            ]
        );
    }

    #[test]
    fn test_add_bytes() {
        let program = Program::parse("+cb", 4).unwrap();
        let code = compile_to_bytes(&program).unwrap();
        assert_eq!(
            code,
            vec![
                0x66, 0x0F, 0x10, 0x47, 0x20, // MOVUPD XMM0, [RDI+32]
                0x66, 0x0F, 0x58, 0x47, 0x10, // ADDPD XMM0, [RDI+16]
                0x66, 0x0F, 0x11, 0x47, 0x10, // MOVUPD [RDI+16], XMM0
                0xC3, // RET
            ]
        );
    }

    #[test]
    fn test_empty_program_is_ret_only() {
        let program = Program::parse("", 4).unwrap();
        assert_eq!(compile_to_bytes(&program).unwrap(), vec![0xC3]);
    }

    #[test]
    fn test_mul_template_fills_the_budget() {
        let program = Program::parse("*ab", 4).unwrap();
        let code = compile_to_bytes(&program).unwrap();
        assert_eq!(code.len(), MAX_INST_BYTES + 1);
    }

    #[test]
    fn test_offset_overflow() {
        // 8 registers still fit disp8; 9 do not.
        let program = Program::parse("=ah", 8).unwrap();
        assert!(compile_to_bytes(&program).is_ok());

        let program = Program::parse("=ai", 9).unwrap();
        assert_eq!(
            compile_to_bytes(&program),
            Err(CompileError::OffsetOverflow { register_count: 9 })
        );
    }

    #[test]
    fn test_highest_register_displacements() {
        let program = Program::parse("=hh", 8).unwrap();
        let code = compile_to_bytes(&program).unwrap();
        // register 7 sits at displacement 112 = 0x70
        assert_eq!(
            code,
            vec![
                0x66, 0x0F, 0x10, 0x47, 0x70, // MOVUPD XMM0, [RDI+112]
                0x66, 0x0F, 0x11, 0x47, 0x70, // MOVUPD [RDI+112], XMM0
                0xC3,
            ]
        );
    }

    #[test]
    fn test_hand_built_register_out_of_range() {
        // Program::parse can't produce this; a hand-built program can.
        let program = Program {
            insts: vec![Inst {
                op: Op::Assign,
                src: 0,
                dst: 5,
            }],
            register_count: 4,
        };
        assert_eq!(
            compile_to_bytes(&program),
            Err(CompileError::RegisterOutOfRange {
                position: 0,
                register: 5
            })
        );
    }
}
