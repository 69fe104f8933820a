//! `diagnose` command: per-round measurement trace.
//!
//! Steps a seeded ensemble without the threshold gate and prints r, q, and
//! the histogram diagnostics at a fixed sampling interval. Useful for
//! eyeballing how a parameter change moves the dynamics.

use clap::Args;
use tracing::error;

use phasebloom_core::config::EngineConfig;
use phasebloom_core::ensemble::OscillatorEnsemble;
use phasebloom_core::error::EngineResult;
use phasebloom_core::order;

/// Histogram resolution for the diagnostic measures.
const DIAGNOSTIC_BINS: usize = 32;

/// Arguments for the `diagnose` command.
#[derive(Debug, Args)]
pub struct DiagnoseArgs {
    /// RNG seed
    #[arg(short, long, default_value_t = 42)]
    pub seed: u64,

    /// Ensemble size
    #[arg(short = 'n', long, default_value_t = 63)]
    pub oscillators: usize,

    /// Rounds to simulate
    #[arg(short, long, default_value_t = 2000)]
    pub rounds: u32,

    /// Print every k-th round
    #[arg(long, default_value_t = 50)]
    pub sample: u32,
}

fn trace_run(args: &DiagnoseArgs) -> EngineResult<()> {
    let config = EngineConfig::default();
    let mut ensemble = OscillatorEnsemble::initialize(args.oscillators, args.seed)?;
    let mut previous = ensemble.phases().to_vec();

    println!("round\tr\tq\tnegentropy\tfisher\tK_eff");
    for _ in 0..args.rounds {
        ensemble.step(config.dt);
        ensemble.check_stability()?;
        let m = order::measure_with_persistence(ensemble.phases(), &previous)?;

        if ensemble.round_number() % args.sample.max(1) == 0 {
            let negentropy = order::negentropy(ensemble.phases(), DIAGNOSTIC_BINS)?;
            let fisher = order::fisher_information(ensemble.phases(), DIAGNOSTIC_BINS)?;
            println!(
                "{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
                ensemble.round_number(),
                m.r,
                m.q.unwrap_or(f64::NAN),
                negentropy,
                fisher,
                ensemble.coupling_strength()
            );
        }

        ensemble.adapt_coupling(m.r, config.coupling_gain);
        previous.copy_from_slice(ensemble.phases());
    }
    Ok(())
}

/// Handle the `diagnose` command. Returns the process exit code.
pub fn handle_diagnose(args: DiagnoseArgs) -> i32 {
    match trace_run(&args) {
        Ok(()) => 0,
        Err(e) => {
            error!("diagnostic run failed: {}", e);
            eprintln!("error: {}", e);
            1
        }
    }
}
