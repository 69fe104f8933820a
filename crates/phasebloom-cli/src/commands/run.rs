//! `run` command: one consensus attempt.

use std::path::PathBuf;

use clap::Args;
use tracing::error;

use phasebloom_core::config::EngineConfig;
use phasebloom_core::driver::ConsensusDriver;
use phasebloom_core::ensemble::OscillatorEnsemble;
use phasebloom_core::error::EngineResult;

/// Arguments for the `run` command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Configuration file (falls back to config/ discovery and environment)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// RNG seed override
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Ensemble size override
    #[arg(short = 'n', long)]
    pub oscillators: Option<usize>,

    /// Round budget override
    #[arg(short, long)]
    pub max_rounds: Option<u32>,

    /// Disable adaptive coupling
    #[arg(long)]
    pub no_adapt: bool,

    /// Emit the outcome as pretty-printed JSON
    #[arg(long)]
    pub json: bool,
}

fn load_config(args: &RunArgs) -> EngineResult<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::load()?,
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(n) = args.oscillators {
        config.oscillators = n;
    }
    if let Some(max_rounds) = args.max_rounds {
        config.max_rounds = max_rounds;
    }
    if args.no_adapt {
        config.adaptive_coupling = false;
    }
    config.validate()?;
    Ok(config)
}

fn attempt(args: &RunArgs) -> EngineResult<i32> {
    let config = load_config(args)?;
    let mut ensemble = OscillatorEnsemble::initialize(config.oscillators, config.seed)?;
    ensemble.set_coupling_strength(config.initial_coupling);
    let mut driver = ConsensusDriver::new(config)?;
    let outcome = driver.run(&mut ensemble)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if let Some(certificate) = &outcome.certificate {
        println!(
            "bloom at round {} (r = {:.6}, K_eff = {:.6})",
            certificate.achieving_round, certificate.final_r, certificate.coupling_strength
        );
        println!("phase digest:   {}", certificate.phase_digest);
        println!("content hash:   {}", certificate.content_hash());
    } else {
        println!(
            "no bloom after {} rounds (last r = {:.6})",
            outcome.rounds_completed, outcome.final_r
        );
    }

    Ok(0)
}

/// Handle the `run` command. Returns the process exit code.
pub fn handle_run(args: RunArgs) -> i32 {
    match attempt(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("consensus attempt failed: {}", e);
            eprintln!("error: {}", e);
            1
        }
    }
}
