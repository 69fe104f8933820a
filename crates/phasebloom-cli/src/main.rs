//! Phasebloom CLI
//!
//! Thin runner around the proof-of-coherence engine: loads configuration,
//! runs consensus attempts, and prints the outcome. The chain, mempool, and
//! gossip layers that consume certificates live elsewhere; this binary
//! exists for demos and for poking at the dynamics.
//!
//! # Commands
//!
//! - `run`: one consensus attempt, outcome and certificate to stdout
//! - `diagnose`: step an ensemble and report the measurement trace

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

/// Phasebloom - Kuramoto proof-of-coherence engine
#[derive(Parser)]
#[command(name = "phasebloom")]
#[command(version = "0.1.0")]
#[command(about = "Run Kuramoto proof-of-coherence consensus attempts")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single consensus attempt
    Run(commands::run::RunArgs),
    /// Step an ensemble and print per-round measurements
    Diagnose(commands::diagnose::DiagnoseArgs),
}

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Run(args) => commands::run::handle_run(args),
        Commands::Diagnose(args) => commands::diagnose::handle_diagnose(args),
    };

    std::process::exit(exit_code);
}
