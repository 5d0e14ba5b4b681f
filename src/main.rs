use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;

use aquila::{
    Chunk, Vm, VmConfig,
    bytecode::disasm::print_chunk,
    frontend::{lexer::Lexer, token_dumper::TokenDumper},
};

/// Extension of compiled chunk artifacts.
const ARTIFACT_EXTENSION: &str = "aqb";

/// Compile and run an aquila program.
#[derive(Parser)]
#[clap(version)]
struct Args {
    /// Source file, or a compiled `.aqb` artifact
    path: PathBuf,

    /// Print the disassembled chunk instead of running it
    #[clap(short = 'C', long)]
    compile_only: bool,

    /// Print the token stream and stop
    #[clap(long)]
    tokens: bool,

    /// Disable colors in the token dump
    #[clap(long)]
    no_color: bool,

    /// Write the compiled chunk to FILE
    #[clap(long, value_name = "FILE")]
    emit: Option<PathBuf>,

    /// Maximum call depth
    #[clap(long, default_value_t = VmConfig::default().max_frames)]
    max_frames: usize,

    /// Abort after this many executed instructions
    #[clap(long)]
    max_steps: Option<u64>,
}

fn main() {
    env_logger::builder().format_timestamp(None).init();

    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    check_args(&args)?;

    let chunk = if is_artifact(&args.path) {
        load_artifact(&args.path)?
    } else {
        let source = fs::read_to_string(&args.path)
            .with_context(|| format!("failed to read '{}'", args.path.display()))?;

        if args.tokens {
            let mut dumper = TokenDumper::new();
            if args.no_color {
                dumper = dumper.no_color();
            }
            dumper.dump(&Lexer::new(&source).tokenize());
            return Ok(());
        }

        aquila::compile_source(&source).map_err(aquila::Error::from)?
    };

    if let Some(emit) = &args.emit {
        let bytes = chunk.to_bytes().context("failed to encode chunk")?;
        fs::write(emit, bytes)
            .with_context(|| format!("failed to write '{}'", emit.display()))?;
        log::info!("wrote {} words to {}", chunk.len(), emit.display());
    }

    if args.compile_only {
        print_chunk(&chunk);
        return Ok(());
    }

    let config = VmConfig {
        max_frames: args.max_frames,
        max_steps: args.max_steps,
        ..VmConfig::default()
    };
    let mut vm = Vm::with_config(config);
    let mut out = io::stdout().lock();
    vm.run(&chunk, &mut out).map_err(aquila::Error::from)?;
    out.flush()?;

    Ok(())
}

/// Rejects flag combinations clap cannot express on its own.
fn check_args(args: &Args) -> anyhow::Result<()> {
    if args.tokens && is_artifact(&args.path) {
        anyhow::bail!(
            "--tokens needs a source file, but '{}' is a compiled chunk",
            args.path.display()
        );
    }
    Ok(())
}

fn is_artifact(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_EXTENSION)
}

fn load_artifact(path: &Path) -> anyhow::Result<Chunk> {
    let bytes = fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    Chunk::from_bytes(&bytes)
        .with_context(|| format!("'{}' is not a compiled chunk", path.display()))
}
