//! usharp command line: compile behaviour classes to Udon assembly, dump
//! compiled programs and run them on the reference interpreter.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use usharp_asm::{dump, Interpreter};
use usharp_compiler::{compile, CompilerContext, ProgramAsset};

#[derive(Parser)]
#[command(name = "usharp", version, about = "Behaviour-class compiler for the Udon heap VM")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON file with additional extern definitions.
    #[arg(long, global = true)]
    externs: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source class to assembly text and a program blob.
    Compile {
        input: PathBuf,
        /// Assembly output path (defaults to the input with `.uasm`).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the serialized program blob next to the assembly.
        #[arg(long)]
        blob: bool,
    },
    /// Compile and print the program disassembly.
    Dump { input: PathBuf },
    /// Compile and run an entry point on the reference interpreter.
    Run {
        input: PathBuf,
        /// Entry point to dispatch.
        #[arg(long, default_value = "_start")]
        event: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("invalid extern definitions: {0}")]
    Externs(#[from] usharp_core::ExternError),

    #[error("compilation failed")]
    Compile,

    #[error("program did not assemble")]
    NoProgram,

    #[error("execution failed: {0}")]
    Run(#[from] usharp_asm::InterpError),

    #[error("could not serialize program: {0}")]
    Blob(#[from] usharp_asm::BlobError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut ctx = CompilerContext::new();
    if let Some(path) = &cli.externs {
        let json = read(path)?;
        ctx.externs_mut().load_extensions(&json)?;
    }

    match cli.command {
        Command::Compile {
            input,
            output,
            blob,
        } => {
            let asset = compile_input(&mut ctx, &input)?;
            let assembly = asset.export_assembly().ok_or(CliError::NoProgram)?;

            let out_path = output.unwrap_or_else(|| input.with_extension("uasm"));
            write(&out_path, assembly.as_bytes())?;
            println!("wrote {}", out_path.display());

            if blob {
                let program = asset.program().ok_or(CliError::NoProgram)?;
                let bytes = program.store()?;
                let blob_path = out_path.with_extension("uspa");
                write(&blob_path, &bytes)?;
                println!("wrote {}", blob_path.display());
            }
            Ok(())
        }

        Command::Dump { input } => {
            let asset = compile_input(&mut ctx, &input)?;
            let program = asset.program().ok_or(CliError::NoProgram)?;
            print!("{}", dump(program));
            Ok(())
        }

        Command::Run { input, event } => {
            let asset = compile_input(&mut ctx, &input)?;
            let program = asset.program().ok_or(CliError::NoProgram)?;

            let mut interp = Interpreter::new(program);
            interp.run_event(&event)?;

            for name in program.symbols.exported_symbols() {
                if let Some(value) = interp.symbol_value(name) {
                    println!("{name} = {}", value.display_string());
                }
            }
            Ok(())
        }
    }
}

fn compile_input(ctx: &mut CompilerContext, input: &Path) -> Result<ProgramAsset, CliError> {
    let source = read(input)?;
    let mut asset = ProgramAsset::new(source);

    if compile(ctx, &mut asset).is_err() {
        for message in &asset.compile_errors {
            eprintln!("{message}");
        }
        if let Some(message) = asset.assembly_error() {
            eprintln!("assembly error: {message}");
        }
        return Err(CliError::Compile);
    }
    Ok(asset)
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io(path.to_path_buf(), e))
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, bytes).map_err(|e| CliError::Io(path.to_path_buf(), e))
}
