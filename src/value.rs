//! Complex values and register-file layout.
//!
//! Generated code addresses the register file as `[rdi + disp8]`, so the
//! layout of [`Complex`] is part of the ABI between host and generated code:
//! a 16-byte stride per register with the imaginary field at offset 8.

use std::mem::{offset_of, size_of};

/// A complex number as both the interpreter and generated code see it:
/// two contiguous 64-bit floating-point fields.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex { re: 0.0, im: 0.0 };

    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Squared magnitude, the escape test used by the render driver.
    pub fn norm_sqr(self) -> f64 {
        self.re * self.re + self.im * self.im
    }
}

/// Byte stride between consecutive registers in the register file.
pub const REGISTER_STRIDE: usize = size_of::<Complex>();

/// Byte offset of the real field within a register.
pub const RE_OFFSET: usize = offset_of!(Complex, re);

/// Byte offset of the imaginary field within a register.
pub const IM_OFFSET: usize = offset_of!(Complex, im);

/// Highest register count the JIT can address: register `i`'s imaginary
/// field sits at displacement `i * 16 + 8`, which must fit in a signed byte.
/// Register 7's is at 120; register 8's would be at 136.
pub const MAX_REGISTERS: usize = 8;

const _: () = assert!(size_of::<Complex>() == 16);
const _: () = assert!(RE_OFFSET == 0 && IM_OFFSET == 8);
const _: () = assert!((MAX_REGISTERS - 1) * REGISTER_STRIDE + IM_OFFSET <= i8::MAX as usize);

/// Displacement of register `index`'s base within the register file.
pub fn register_disp(index: u8) -> i32 {
    index as i32 * REGISTER_STRIDE as i32
}
