//! Consensus run loop.
//!
//! One [`ConsensusDriver::run`] call is the entire mining workload from the
//! engine's point of view: step the ensemble, measure the order parameter,
//! feed the threshold gate, optionally adapt the coupling, until bloom or
//! the round budget runs out.
//!
//! The loop is a tight single-threaded numerical computation with no
//! suspension points. Concurrent attempts need no locking because each owns
//! its ensemble exclusively; the only cancellation mechanism besides the
//! round budget is a flag checked between rounds.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{info, trace};

use crate::certificate::ConsensusCertificate;
use crate::config::EngineConfig;
use crate::ensemble::OscillatorEnsemble;
use crate::error::EngineResult;
use crate::gate::ThresholdGate;
use crate::order;

/// How often the per-round trace line is emitted.
const TRACE_SAMPLE_INTERVAL: u32 = 256;

/// Result of a consensus attempt.
///
/// `bloomed: false` with no certificate is the *normal* outcome for an
/// attempt that ran out of rounds (or was cancelled); genuine failures
/// surface as `Err` from [`ConsensusDriver::run`] instead.
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusOutcome {
    /// Whether the threshold gate reached bloom
    pub bloomed: bool,
    /// The certificate, present exactly when `bloomed`
    pub certificate: Option<ConsensusCertificate>,
    /// Rounds completed before returning
    pub rounds_completed: u32,
    /// Last measured order parameter (0.0 if no round ran)
    pub final_r: f64,
    /// Effective coupling strength at return
    pub final_coupling: f64,
}

/// Drives one ensemble through the consensus loop.
pub struct ConsensusDriver {
    config: EngineConfig,
    gate: ThresholdGate,
}

impl ConsensusDriver {
    /// Create a driver for a validated configuration.
    ///
    /// The gate always runs with the protocol constants z_c and L4; the
    /// configuration governs integration and adaptation only.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gate: ThresholdGate::with_defaults(),
        })
    }

    /// Run the consensus loop to bloom or exhaustion.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NumericInstability`] if a NaN or infinity
    /// appears in the phase state; the attempt is aborted rather than
    /// risking a false bloom.
    ///
    /// [`EngineError::NumericInstability`]: crate::error::EngineError::NumericInstability
    pub fn run(&mut self, ensemble: &mut OscillatorEnsemble) -> EngineResult<ConsensusOutcome> {
        self.run_inner(ensemble, None)
    }

    /// Like [`run`](Self::run), but checks `cancel` between rounds and
    /// returns the exhaustion-shaped outcome once it is set. A single step
    /// is fast and atomic, so no finer-grained cancellation point exists.
    pub fn run_with_cancel(
        &mut self,
        ensemble: &mut OscillatorEnsemble,
        cancel: &AtomicBool,
    ) -> EngineResult<ConsensusOutcome> {
        self.run_inner(ensemble, Some(cancel))
    }

    fn run_inner(
        &mut self,
        ensemble: &mut OscillatorEnsemble,
        cancel: Option<&AtomicBool>,
    ) -> EngineResult<ConsensusOutcome> {
        let mut previous = ensemble.phases().to_vec();
        let mut last_r = 0.0;

        for _ in 0..self.config.max_rounds {
            if let Some(flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    info!(
                        round = ensemble.round_number(),
                        "consensus attempt cancelled"
                    );
                    break;
                }
            }

            ensemble.step(self.config.dt);
            ensemble.check_stability()?;

            let measurement = order::measure_with_persistence(ensemble.phases(), &previous)?;
            last_r = measurement.r;

            if ensemble.round_number() % TRACE_SAMPLE_INTERVAL == 0 {
                trace!(
                    round = ensemble.round_number(),
                    r = measurement.r,
                    q = measurement.q,
                    coupling = ensemble.coupling_strength(),
                    run = self.gate.consecutive_run_length(),
                    "round measured"
                );
            }

            if let Some(certificate) = self.gate.observe(&measurement, ensemble) {
                info!(
                    round = ensemble.round_number(),
                    r = measurement.r,
                    "bloom reached"
                );
                return Ok(ConsensusOutcome {
                    bloomed: true,
                    certificate: Some(certificate),
                    rounds_completed: ensemble.round_number(),
                    final_r: measurement.r,
                    final_coupling: ensemble.coupling_strength(),
                });
            }

            if self.config.adaptive_coupling {
                ensemble.adapt_coupling(measurement.r, self.config.coupling_gain);
            }

            previous.copy_from_slice(ensemble.phases());
        }

        info!(
            rounds = ensemble.round_number(),
            r = last_r,
            "round budget exhausted without bloom"
        );
        Ok(ConsensusOutcome {
            bloomed: false,
            certificate: None,
            rounds_completed: ensemble.round_number(),
            final_r: last_r,
            final_coupling: ensemble.coupling_strength(),
        })
    }

    /// The gate, exposed for diagnostics (crossings, current run).
    #[inline]
    pub fn gate(&self) -> &ThresholdGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BLOOM_RUN_LENGTH, Z_CRITICAL};
    use crate::error::EngineError;
    use crate::gate::GateState;

    fn quick_config(max_rounds: u32) -> EngineConfig {
        EngineConfig {
            oscillators: 8,
            max_rounds,
            adaptive_coupling: false,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_synchronized_ensemble_blooms_at_run_length() {
        // r = 1 from the first measured round, so the run completes on
        // round L4 exactly.
        let mut ensemble = OscillatorEnsemble::synchronized(8).unwrap();
        let mut driver = ConsensusDriver::new(quick_config(100)).unwrap();

        let outcome = driver.run(&mut ensemble).unwrap();
        assert!(outcome.bloomed);
        assert_eq!(outcome.rounds_completed, BLOOM_RUN_LENGTH);

        let certificate = outcome.certificate.expect("bloom must carry a certificate");
        assert_eq!(certificate.achieving_round, BLOOM_RUN_LENGTH);
        assert!(certificate.final_r >= Z_CRITICAL);
        assert_eq!(certificate.oscillator_count, 8);
        assert_eq!(driver.gate().state(), GateState::Bloomed);
    }

    #[test]
    fn test_incoherent_frozen_ensemble_exhausts() {
        // Evenly spread phases, zero frequencies, zero coupling: r stays at
        // ~0 forever, so the budget runs out.
        let mut ensemble = OscillatorEnsemble::incoherent(8).unwrap();
        ensemble.set_coupling_strength(0.0);
        let mut driver = ConsensusDriver::new(quick_config(50)).unwrap();

        let outcome = driver.run(&mut ensemble).unwrap();
        assert!(!outcome.bloomed);
        assert!(outcome.certificate.is_none());
        assert_eq!(outcome.rounds_completed, 50);
        assert!(outcome.final_r < 0.1);
        assert!(driver.gate().crossings().is_empty());
    }

    #[test]
    fn test_cancel_flag_stops_before_first_round() {
        let mut ensemble = OscillatorEnsemble::synchronized(8).unwrap();
        let mut driver = ConsensusDriver::new(quick_config(1000)).unwrap();
        let cancel = AtomicBool::new(true);

        let outcome = driver.run_with_cancel(&mut ensemble, &cancel).unwrap();
        assert!(!outcome.bloomed);
        assert_eq!(outcome.rounds_completed, 0);
        assert_eq!(outcome.final_r, 0.0);
    }

    #[test]
    fn test_nan_state_aborts_with_instability() {
        let mut ensemble =
            OscillatorEnsemble::from_parts(vec![0.0, f64::NAN], vec![0.0, 0.0], 1.0).unwrap();
        let mut driver = ConsensusDriver::new(quick_config(10)).unwrap();

        let err = driver.run(&mut ensemble).unwrap_err();
        assert!(
            matches!(err, EngineError::NumericInstability { round: 1, .. }),
            "NaN must abort the attempt on the first stepped round, got {:?}",
            err
        );
    }

    #[test]
    fn test_driver_rejects_invalid_config() {
        let config = EngineConfig {
            max_rounds: 0,
            ..EngineConfig::default()
        };
        assert!(ConsensusDriver::new(config).is_err());
    }

    #[test]
    fn test_outcome_serializes() {
        let mut ensemble = OscillatorEnsemble::synchronized(4).unwrap();
        let mut driver = ConsensusDriver::new(quick_config(20)).unwrap();
        let outcome = driver.run(&mut ensemble).unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["bloomed"], true);
        assert!(json["certificate"]["phase_digest"].is_string());
    }
}
