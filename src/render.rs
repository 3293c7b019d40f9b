//! Escape-time rendering driven by a compiled routine or the interpreter.
//!
//! The driver owns the register file: for each pixel it seeds register 0
//! with the plane coordinate, zeroes the rest, and iterates the engine
//! until the watched register escapes or the iteration cap is reached. The
//! iteration-count grid is emitted as binary PGM (P5).

use crate::bytecode::Program;
use crate::config::{EngineMode, RenderConfig, TimingsFormat, jit_supported};
use crate::interp;
#[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
use crate::jit::{self, CompiledRoutine};
use crate::value::Complex;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Instant;

/// One iteration step of a bytecode program, native or interpreted.
pub enum Engine {
    #[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
    Jit(CompiledRoutine),
    Interp(Program),
}

impl Engine {
    /// Build the engine selected by `mode`, compiling when the JIT is
    /// picked.
    pub fn build(program: Program, mode: EngineMode) -> Result<Engine, String> {
        let want_jit = match mode {
            EngineMode::Off => false,
            EngineMode::On => {
                if !jit_supported() {
                    return Err("JIT is not available on this platform; use --jit off".to_string());
                }
                true
            }
            EngineMode::Auto => jit_supported(),
        };
        if want_jit {
            #[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
            {
                return jit::compile(&program)
                    .map(Engine::Jit)
                    .map_err(|e| format!("JIT compilation failed: {}", e));
            }
        }
        Ok(Engine::Interp(program))
    }

    /// Run the program once over `regs`.
    pub fn step(&self, regs: &mut [Complex]) {
        match self {
            #[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
            Engine::Jit(routine) => routine.invoke(regs),
            Engine::Interp(program) => interp::step(program, regs),
        }
    }

    pub fn is_jit(&self) -> bool {
        match self {
            #[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
            Engine::Jit(_) => true,
            Engine::Interp(_) => false,
        }
    }

    /// The engine's register-file size.
    pub fn register_count(&self) -> usize {
        match self {
            #[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
            Engine::Jit(routine) => routine.register_count(),
            Engine::Interp(program) => program.register_count,
        }
    }
}

/// Iterate `engine` at plane point `c` until escape or the iteration cap.
/// Returns the number of steps taken.
pub fn iterations(engine: &Engine, config: &RenderConfig, c: Complex, regs: &mut [Complex]) -> u32 {
    regs.fill(Complex::ZERO);
    regs[0] = c;
    let watched = config.escape_register as usize;
    let mut count = 0;
    while count < config.max_iter && regs[watched].norm_sqr() < config.escape {
        engine.step(regs);
        count += 1;
    }
    count
}

/// Render the full frame as binary PGM (P5, maxval 255).
///
/// Escaped pixels carry their iteration count; pixels that never escape
/// render black.
pub fn render_pgm<W: Write>(engine: &Engine, config: &RenderConfig, out: &mut W) -> io::Result<()> {
    write!(out, "P5\n{} {}\n255\n", config.width, config.height)?;
    let mut regs = vec![Complex::ZERO; engine.register_count()];
    let mut line = vec![0u8; config.width];
    for y in 0..config.height {
        for x in 0..config.width {
            let c = config.plane_point(x, y);
            let count = iterations(engine, config, c, &mut regs);
            line[x] = if count >= config.max_iter {
                0
            } else {
                count.min(255) as u8
            };
        }
        out.write_all(&line)?;
    }
    out.flush()
}

/// Wall-clock timings for one render.
#[derive(Debug, Serialize)]
pub struct Timings {
    pub engine: &'static str,
    pub compile_us: u64,
    pub render_ms: u64,
    pub pixels: usize,
}

impl Timings {
    pub fn report(&self, format: TimingsFormat) -> String {
        match format {
            TimingsFormat::Human => format!(
                "engine: {}, compile: {}us, render: {}ms ({} pixels)",
                self.engine, self.compile_us, self.render_ms, self.pixels
            ),
            TimingsFormat::Json => {
                serde_json::to_string(self).expect("timings serialize cannot fail")
            }
        }
    }
}

/// Build the engine, render the frame, and collect timings.
pub fn render_frame<W: Write>(
    program: Program,
    mode: EngineMode,
    config: &RenderConfig,
    out: &mut W,
) -> Result<Timings, String> {
    if config.register_count == 0 {
        return Err("register file must hold at least one register".to_string());
    }
    if config.escape_register as usize >= config.register_count {
        return Err(format!(
            "escape register {} outside the register file",
            config.escape_register
        ));
    }

    let build_start = Instant::now();
    let engine = Engine::build(program, mode)?;
    let compile_us = build_start.elapsed().as_micros() as u64;

    let render_start = Instant::now();
    render_pgm(&engine, config, out).map_err(|e| format!("failed to write image: {}", e))?;
    let render_ms = render_start.elapsed().as_millis() as u64;

    Ok(Timings {
        engine: if engine.is_jit() { "jit" } else { "interp" },
        compile_us,
        render_ms,
        pixels: config.width * config.height,
    })
}

/// Sample coordinates for cross-validation: zero, negative zero, values of
/// both signs, and a subnormal magnitude.
pub const SAMPLE_VALUES: [f64; 9] = [
    0.0,
    -0.0,
    1.0,
    -1.0,
    0.5,
    -1.5,
    2.0,
    1.0e-310,
    -3.25,
];

/// Cross-validate the JIT against the interpreter: every pair of sample
/// coordinates seeds register 0, and both engines run `steps` iterations
/// with their register files compared bit-for-bit after every step.
/// Returns the number of sample inputs checked.
#[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
pub fn cross_validate(program: &Program, steps: u32) -> Result<usize, String> {
    if program.register_count == 0 {
        return Err("program has no registers to seed".to_string());
    }
    let routine = jit::compile(program).map_err(|e| e.to_string())?;
    let mut checked = 0;
    for &re in &SAMPLE_VALUES {
        for &im in &SAMPLE_VALUES {
            let mut jit_regs = vec![Complex::ZERO; program.register_count];
            jit_regs[0] = Complex::new(re, im);
            let mut interp_regs = jit_regs.clone();

            for step in 0..steps {
                routine.invoke(&mut jit_regs);
                interp::step(program, &mut interp_regs);
                for (index, (a, b)) in jit_regs.iter().zip(&interp_regs).enumerate() {
                    if a.re.to_bits() != b.re.to_bits() || a.im.to_bits() != b.im.to_bits() {
                        return Err(format!(
                            "divergence for input ({}, {}) at step {}, register {}: \
                             jit ({}, {}) vs interp ({}, {})",
                            re, im, step, index, a.re, a.im, b.re, b.im
                        ));
                    }
                }
            }
            checked += 1;
        }
    }
    Ok(checked)
}
