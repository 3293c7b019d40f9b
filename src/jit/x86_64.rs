//! SSE2 instruction encoding for the complex-register JIT.
//!
//! The compiled routine receives the register-file pointer in RDI (first
//! integer argument under the System V AMD64 ABI), so every memory operand
//! here is `[rdi + disp8]`. Displacements outside the signed-byte range are
//! rejected, never truncated.

use super::codebuf::CodeBuffer;

/// XMM registers available to the compiler as scratch space.
///
/// All of XMM0-XMM15 are caller-saved under System V AMD64; only the low
/// eight are encodable without a REX prefix, and the templates never need
/// more than six.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Xmm {
    Xmm0 = 0,
    Xmm1 = 1,
    Xmm2 = 2,
    Xmm3 = 3,
    Xmm4 = 4,
    Xmm5 = 5,
    Xmm6 = 6,
    Xmm7 = 7,
}

impl Xmm {
    /// The register code (ModR/M reg or rm field).
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Error type for instruction encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// Displacement does not fit the signed-byte addressing mode.
    DispOutOfRange { disp: i32 },
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::DispOutOfRange { disp } => {
                write!(f, "displacement {} outside [-128, 127]", disp)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// ModR/M byte for `[rdi + disp8]`: mod=01 (disp8 follows), rm=111 (RDI).
const fn modrm_rdi_disp8(reg: u8) -> u8 {
    0x47 | (reg & 0x7) << 3
}

/// ModR/M byte for register-register operands: mod=11.
const fn modrm_rr(reg: u8, rm: u8) -> u8 {
    0xC0 | (reg & 0x7) << 3 | (rm & 0x7)
}

/// SSE2 assembler over a code buffer.
///
/// Each primitive appends one fixed-length instruction; the same arguments
/// always produce the same bytes.
pub struct Sse2Assembler<'a> {
    buf: &'a mut CodeBuffer,
}

impl<'a> Sse2Assembler<'a> {
    pub fn new(buf: &'a mut CodeBuffer) -> Self {
        Self { buf }
    }

    fn disp8(disp: i32) -> Result<u8, EncodeError> {
        if (-128..=127).contains(&disp) {
            Ok(disp as i8 as u8)
        } else {
            Err(EncodeError::DispOutOfRange { disp })
        }
    }

    // ==================== Packed (128-bit) ====================

    /// MOVUPD xmm, [rdi + disp] (load a whole complex value)
    pub fn movupd_load(&mut self, disp: i32, dst: Xmm) -> Result<(), EncodeError> {
        // 66 0F 10 /r
        let disp = Self::disp8(disp)?;
        self.buf
            .emit_bytes(&[0x66, 0x0F, 0x10, modrm_rdi_disp8(dst.code()), disp]);
        Ok(())
    }

    /// MOVUPD [rdi + disp], xmm (store a whole complex value)
    pub fn movupd_store(&mut self, src: Xmm, disp: i32) -> Result<(), EncodeError> {
        // 66 0F 11 /r
        let disp = Self::disp8(disp)?;
        self.buf
            .emit_bytes(&[0x66, 0x0F, 0x11, modrm_rdi_disp8(src.code()), disp]);
        Ok(())
    }

    /// ADDPD xmm, [rdi + disp] (add a whole complex value into a register)
    pub fn addpd_load(&mut self, disp: i32, dst: Xmm) -> Result<(), EncodeError> {
        // 66 0F 58 /r
        let disp = Self::disp8(disp)?;
        self.buf
            .emit_bytes(&[0x66, 0x0F, 0x58, modrm_rdi_disp8(dst.code()), disp]);
        Ok(())
    }

    // ==================== Scalar (64-bit) ====================

    /// MOVSD xmm, [rdi + disp] (load one field)
    pub fn movsd_load(&mut self, disp: i32, dst: Xmm) -> Result<(), EncodeError> {
        // F2 0F 10 /r
        let disp = Self::disp8(disp)?;
        self.buf
            .emit_bytes(&[0xF2, 0x0F, 0x10, modrm_rdi_disp8(dst.code()), disp]);
        Ok(())
    }

    /// MOVSD [rdi + disp], xmm (store one field)
    pub fn movsd_store(&mut self, src: Xmm, disp: i32) -> Result<(), EncodeError> {
        // F2 0F 11 /r
        let disp = Self::disp8(disp)?;
        self.buf
            .emit_bytes(&[0xF2, 0x0F, 0x11, modrm_rdi_disp8(src.code()), disp]);
        Ok(())
    }

    /// MOVSD xmm, xmm
    pub fn movsd_rr(&mut self, dst: Xmm, src: Xmm) {
        // F2 0F 10 /r
        self.buf
            .emit_bytes(&[0xF2, 0x0F, 0x10, modrm_rr(dst.code(), src.code())]);
    }

    /// ADDSD xmm, xmm (dst += src)
    pub fn addsd(&mut self, dst: Xmm, src: Xmm) {
        // F2 0F 58 /r
        self.buf
            .emit_bytes(&[0xF2, 0x0F, 0x58, modrm_rr(dst.code(), src.code())]);
    }

    /// SUBSD xmm, xmm (dst -= src)
    pub fn subsd(&mut self, dst: Xmm, src: Xmm) {
        // F2 0F 5C /r
        self.buf
            .emit_bytes(&[0xF2, 0x0F, 0x5C, modrm_rr(dst.code(), src.code())]);
    }

    /// MULSD xmm, xmm (dst *= src)
    pub fn mulsd(&mut self, dst: Xmm, src: Xmm) {
        // F2 0F 59 /r
        self.buf
            .emit_bytes(&[0xF2, 0x0F, 0x59, modrm_rr(dst.code(), src.code())]);
    }

    // ==================== Control ====================

    /// RET (return to caller)
    pub fn ret(&mut self) {
        self.buf.emit_u8(0xC3);
    }
}
