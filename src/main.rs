use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

mod bytecode;
mod config;
mod interp;
#[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
mod jit;
mod render;
mod value;

use bytecode::Program;
use config::{EngineMode, RenderConfig, Scene, TimingsFormat};

// Wrapper types for clap ValueEnum support
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum EngineModeArg {
    Off,
    On,
    #[default]
    Auto,
}

impl From<EngineModeArg> for EngineMode {
    fn from(arg: EngineModeArg) -> Self {
        match arg {
            EngineModeArg::Off => EngineMode::Off,
            EngineModeArg::On => EngineMode::On,
            EngineModeArg::Auto => EngineMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum TimingsFormatArg {
    #[default]
    Human,
    Json,
}

impl From<TimingsFormatArg> for TimingsFormat {
    fn from(arg: TimingsFormatArg) -> Self {
        match arg {
            TimingsFormatArg::Human => TimingsFormat::Human,
            TimingsFormatArg::Json => TimingsFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(name = "orbit")]
#[command(about = "A tiny JIT for complex-register fractal bytecode", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a bytecode program as a binary PGM image
    Render {
        /// The program, e.g. "*bb+ab" (may come from the scene file instead)
        program: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Image width in pixels
        #[arg(long)]
        width: Option<usize>,

        /// Image height in pixels
        #[arg(long)]
        height: Option<usize>,

        /// Iteration cap per pixel
        #[arg(long)]
        max_iter: Option<u32>,

        /// Number of complex registers
        #[arg(long)]
        registers: Option<usize>,

        /// JIT mode (off, on, auto)
        #[arg(long, value_enum, default_value = "auto")]
        jit: EngineModeArg,

        /// Scene file (TOML) supplying the program and view geometry
        #[arg(long)]
        scene: Option<PathBuf>,

        /// Print timings to stderr after rendering
        #[arg(long, value_enum)]
        timings: Option<TimingsFormatArg>,
    },
    /// Cross-validate the JIT against the interpreter
    Verify {
        /// The program, e.g. "*bb+ab"
        program: String,

        /// Number of complex registers
        #[arg(long, default_value = "4")]
        registers: usize,

        /// Iterations applied to every sample input
        #[arg(long, default_value = "16")]
        steps: u32,
    },
    /// Print the machine code emitted for a program
    Dump {
        /// The program, e.g. "*bb+ab"
        program: String,

        /// Number of complex registers
        #[arg(long, default_value = "4")]
        registers: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            program,
            output,
            width,
            height,
            max_iter,
            registers,
            jit,
            scene,
            timings,
        } => {
            let mut config = RenderConfig::default();
            let mut source = program;

            if let Some(path) = scene {
                match Scene::load(&path) {
                    Ok(scene) => {
                        scene.apply(&mut config);
                        if source.is_none() {
                            source = scene.program;
                        }
                    }
                    Err(e) => {
                        eprintln!("error: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            // explicit flags win over the scene file
            if let Some(width) = width {
                config.width = width;
            }
            if let Some(height) = height {
                config.height = height;
            }
            if let Some(max_iter) = max_iter {
                config.max_iter = max_iter;
            }
            if let Some(registers) = registers {
                config.register_count = registers;
            }

            let Some(source) = source else {
                eprintln!("error: no program given (pass one, or use --scene)");
                return ExitCode::FAILURE;
            };
            let program = match Program::parse(&source, config.register_count) {
                Ok(program) => program,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            let result = match output {
                Some(path) => match File::create(&path) {
                    Ok(mut file) => render::render_frame(program, jit.into(), &config, &mut file),
                    Err(e) => {
                        eprintln!("error: failed to create {}: {}", path.display(), e);
                        return ExitCode::FAILURE;
                    }
                },
                None => {
                    let mut stdout = std::io::stdout().lock();
                    render::render_frame(program, jit.into(), &config, &mut stdout)
                }
            };

            match result {
                Ok(report) => {
                    if let Some(format) = timings {
                        eprintln!("{}", report.report(format.into()));
                    }
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        Commands::Verify {
            program,
            registers,
            steps,
        } => {
            let program = match Program::parse(&program, registers) {
                Ok(program) => program,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            #[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
            {
                match render::cross_validate(&program, steps) {
                    Ok(checked) => {
                        println!(
                            "ok: {} sample inputs, {} steps each, jit and interpreter bit-identical",
                            checked, steps
                        );
                    }
                    Err(e) => {
                        eprintln!("verify failed: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            #[cfg(not(all(feature = "jit", target_arch = "x86_64", unix)))]
            {
                let _ = (program, steps);
                eprintln!("error: JIT is not available on this platform");
                return ExitCode::FAILURE;
            }
        }
        Commands::Dump { program, registers } => {
            let program = match Program::parse(&program, registers) {
                Ok(program) => program,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            #[cfg(all(feature = "jit", target_arch = "x86_64", unix))]
            {
                match jit::compile_to_bytes(&program) {
                    Ok(code) => {
                        for (row, chunk) in code.chunks(16).enumerate() {
                            print!("{:04x}:", row * 16);
                            for byte in chunk {
                                print!(" {:02x}", byte);
                            }
                            println!();
                        }
                        println!("{} bytes", code.len());
                    }
                    Err(e) => {
                        eprintln!("error: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            #[cfg(not(all(feature = "jit", target_arch = "x86_64", unix)))]
            {
                let _ = program;
                eprintln!("error: JIT is not available on this platform");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
