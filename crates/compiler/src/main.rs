//! `bplc`: the BPL compiler CLI.
//!
//! Per spec.md §6: `bpl <file.bpl> [file2.bpl …]`. Each input is compiled
//! independently; a failure in one file is reported and does not stop the
//! others from being attempted, but the process exits non-zero if any
//! file failed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use bplc::CompilerConfig;

#[derive(ClapParser)]
#[command(name = "bplc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "BPL compiler - compile .bpl programs to native executables", long_about = None)]
struct Cli {
    /// One or more .bpl source files to compile
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// C compiler driver to invoke for assembling and linking
    #[arg(long, default_value = "cc")]
    cc: String,

    /// Discard the emitted .s file after a successful build
    #[arg(long)]
    no_keep_assembly: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bplc=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = CompilerConfig::new().with_cc(cli.cc);
    if cli.no_keep_assembly {
        config = config.without_assembly();
    }

    let mut any_failed = false;
    for input in &cli.inputs {
        match bplc::compile_file(input, &config) {
            Ok(output) => {
                tracing::info!(file = %input.display(), output = %output.display(), "compiled");
            }
            Err(err) => {
                any_failed = true;
                eprintln!("{err}");
            }
        }
    }

    if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
