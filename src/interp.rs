//! Reference interpreter for the complex-register bytecode.
//!
//! Semantically identical to the code the JIT emits, operation for
//! operation; it serves as the cross-validation oracle for the JIT and as
//! the engine on platforms without a native backend.

use crate::bytecode::{Op, Program};
use crate::value::Complex;

/// Execute one pass of `program` over `regs`, mutating registers in place.
///
/// Panics if `regs` does not match the program's register count.
pub fn step(program: &Program, regs: &mut [Complex]) {
    assert_eq!(
        regs.len(),
        program.register_count,
        "register file size mismatch"
    );
    for inst in &program.insts {
        let src = regs[inst.src as usize];
        let dst = &mut regs[inst.dst as usize];
        match inst.op {
            Op::Assign => *dst = src,
            Op::Add => {
                dst.re += src.re;
                dst.im += src.im;
            }
            Op::Mul => {
                // Both terms are formed from the incoming dst value before
                // either field is written back.
                let re = dst.re * src.re - dst.im * src.im;
                let im = dst.re * src.im + dst.im * src.re;
                dst.re = re;
                dst.im = im;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Program;

    fn regs4() -> Vec<Complex> {
        vec![Complex::ZERO; 4]
    }

    #[test]
    fn test_assign() {
        let program = Program::parse("=ab", 4).unwrap();
        let mut regs = regs4();
        regs[0] = Complex::new(3.0, 4.0);
        regs[1] = Complex::new(9.0, -1.0);
        step(&program, &mut regs);
        assert_eq!(regs[1], Complex::new(3.0, 4.0));
        // source untouched
        assert_eq!(regs[0], Complex::new(3.0, 4.0));
    }

    #[test]
    fn test_add_accumulates() {
        let program = Program::parse("+ab", 4).unwrap();
        let mut regs = regs4();
        regs[0] = Complex::new(1.0, 2.0);
        step(&program, &mut regs);
        step(&program, &mut regs);
        assert_eq!(regs[1], Complex::new(2.0, 4.0));
    }

    #[test]
    fn test_mul() {
        let program = Program::parse("*ab", 4).unwrap();
        let mut regs = regs4();
        regs[0] = Complex::new(2.0, 3.0);
        regs[1] = Complex::new(4.0, -1.0);
        step(&program, &mut regs);
        // (4 - i)(2 + 3i) = 11 + 10i
        assert_eq!(regs[1], Complex::new(11.0, 10.0));
    }

    #[test]
    fn test_mul_aliased_squares() {
        let program = Program::parse("*bb", 4).unwrap();
        let mut regs = regs4();
        regs[1] = Complex::new(1.0, 2.0);
        step(&program, &mut regs);
        // (1 + 2i)^2 = -3 + 4i
        assert_eq!(regs[1], Complex::new(-3.0, 4.0));
    }

    #[test]
    #[should_panic(expected = "register file size mismatch")]
    fn test_wrong_register_file_size() {
        let program = Program::parse("=ab", 4).unwrap();
        let mut regs = vec![Complex::ZERO; 3];
        step(&program, &mut regs);
    }
}
