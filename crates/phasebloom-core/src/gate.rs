//! Threshold gate: the bloom-detection state machine.
//!
//! After every round the gate is fed the measured order parameter r. Rounds
//! with r ≥ z_c extend the current consecutive run; any round below the
//! threshold resets the run to zero. The first time the run reaches the
//! required length the gate transitions once to [`GateState::Bloomed`] and
//! emits the [`ConsensusCertificate`]. Exhausting the round budget while
//! still accumulating is the driver's verdict, not a gate state.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::certificate::ConsensusCertificate;
use crate::constants::{BLOOM_RUN_LENGTH, Z_CRITICAL};
use crate::ensemble::OscillatorEnsemble;
use crate::error::{EngineError, EngineResult};
use crate::order::OrderMeasurement;

/// Gate state. `Bloomed` is terminal; there is no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    /// Counting consecutive qualifying rounds
    Accumulating,
    /// Consensus achieved; certificate emitted
    Bloomed,
}

/// Tracks threshold crossings and detects bloom.
#[derive(Debug, Clone)]
pub struct ThresholdGate {
    threshold: f64,
    run_length: u32,
    state: GateState,
    consecutive: u32,
    crossings: Vec<u32>,
}

impl ThresholdGate {
    /// Create a gate with an explicit threshold and required run length.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] unless the threshold lies
    /// in (0, 1] and the run length is at least 1.
    pub fn new(threshold: f64, run_length: u32) -> EngineResult<Self> {
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            return Err(EngineError::InvalidParameter {
                field: "threshold".to_string(),
                message: format!("threshold must lie in (0, 1], got {}", threshold),
            });
        }
        if run_length == 0 {
            return Err(EngineError::InvalidParameter {
                field: "run_length".to_string(),
                message: "required run length must be at least 1".to_string(),
            });
        }
        Ok(Self {
            threshold,
            run_length,
            state: GateState::Accumulating,
            consecutive: 0,
            crossings: Vec::new(),
        })
    }

    /// Create a gate with the protocol constants z_c and L4.
    pub fn with_defaults() -> Self {
        Self {
            threshold: Z_CRITICAL,
            run_length: BLOOM_RUN_LENGTH,
            state: GateState::Accumulating,
            consecutive: 0,
            crossings: Vec::new(),
        }
    }

    /// Feed one round's order parameter into the state machine.
    ///
    /// r equal to the threshold qualifies (`≥`, not `>`). Once bloomed the
    /// gate is inert and further calls return [`GateState::Bloomed`]
    /// unchanged.
    pub fn register(&mut self, round: u32, r: f64) -> GateState {
        if self.state == GateState::Bloomed {
            return self.state;
        }

        if r >= self.threshold {
            self.crossings.push(round);
            self.consecutive += 1;
            debug!(
                round,
                r,
                run = self.consecutive,
                needed = self.run_length,
                "threshold crossing"
            );
            if self.consecutive == self.run_length {
                self.state = GateState::Bloomed;
            }
        } else {
            self.consecutive = 0;
        }
        self.state
    }

    /// Feed a full measurement and build the certificate at the exact
    /// transition round.
    ///
    /// Returns `Some` exactly once, on the round that completes the required
    /// run. The certificate snapshots the ensemble at that instant; the gate
    /// keeps no reference to it afterwards.
    pub fn observe(
        &mut self,
        measurement: &OrderMeasurement,
        ensemble: &OscillatorEnsemble,
    ) -> Option<ConsensusCertificate> {
        let before = self.state;
        let after = self.register(ensemble.round_number(), measurement.r);
        if before == GateState::Accumulating && after == GateState::Bloomed {
            Some(ConsensusCertificate::issue(ensemble, measurement.r))
        } else {
            None
        }
    }

    /// Current gate state.
    #[inline]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Length of the current unbroken qualifying run.
    #[inline]
    pub fn consecutive_run_length(&self) -> u32 {
        self.consecutive
    }

    /// Every round index where the instantaneous test r ≥ z_c held,
    /// regardless of run continuity. Diagnostic only; the transition rule
    /// uses the consecutive run alone.
    #[inline]
    pub fn crossings(&self) -> &[u32] {
        &self.crossings
    }

    /// Configured threshold.
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for ThresholdGate {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(gate: &mut ThresholdGate, values: &[f64]) -> Vec<GateState> {
        values
            .iter()
            .enumerate()
            .map(|(round, &r)| gate.register(round as u32, r))
            .collect()
    }

    #[test]
    fn test_new_validates_parameters() {
        assert!(ThresholdGate::new(0.0, 7).is_err());
        assert!(ThresholdGate::new(1.1, 7).is_err());
        assert!(ThresholdGate::new(f64::NAN, 7).is_err());
        assert!(ThresholdGate::new(0.9, 0).is_err());
        assert!(ThresholdGate::new(1.0, 1).is_ok());
    }

    #[test]
    fn test_bloom_fires_exactly_on_seventh_value() {
        let mut gate = ThresholdGate::with_defaults();
        let states = feed(&mut gate, &[Z_CRITICAL; 7]);

        for state in &states[..6] {
            assert_eq!(*state, GateState::Accumulating, "must not fire early");
        }
        assert_eq!(states[6], GateState::Bloomed, "must fire on the 7th value");
    }

    #[test]
    fn test_near_miss_never_fires() {
        let mut gate = ThresholdGate::with_defaults();
        let mut sequence = vec![Z_CRITICAL; 6];
        sequence.push(Z_CRITICAL - 0.001);
        let states = feed(&mut gate, &sequence);

        assert!(states.iter().all(|s| *s == GateState::Accumulating));
        assert_eq!(gate.consecutive_run_length(), 0, "run must reset on the miss");
    }

    #[test]
    fn test_exact_threshold_qualifies() {
        let mut gate = ThresholdGate::with_defaults();
        gate.register(0, Z_CRITICAL);
        assert_eq!(gate.consecutive_run_length(), 1, "r == z_c must qualify");

        // A value just below must not.
        let mut gate = ThresholdGate::with_defaults();
        gate.register(0, Z_CRITICAL - f64::EPSILON);
        assert_eq!(gate.consecutive_run_length(), 0);
    }

    #[test]
    fn test_run_resets_to_zero_immediately() {
        let mut gate = ThresholdGate::with_defaults();
        feed(&mut gate, &[0.9, 0.9, 0.9]);
        assert_eq!(gate.consecutive_run_length(), 3);

        gate.register(3, 0.1);
        assert_eq!(
            gate.consecutive_run_length(),
            0,
            "run must be exactly 0 the round after a sub-threshold value"
        );

        // A fresh streak counts from one again.
        gate.register(4, 0.95);
        assert_eq!(gate.consecutive_run_length(), 1);
    }

    #[test]
    fn test_run_length_one_fires_on_first_value() {
        let mut gate = ThresholdGate::new(0.5, 1).unwrap();
        assert_eq!(gate.register(0, 0.5), GateState::Bloomed);
    }

    #[test]
    fn test_bloom_is_one_shot() {
        let mut gate = ThresholdGate::new(0.5, 2).unwrap();
        feed(&mut gate, &[0.9, 0.9]);
        assert_eq!(gate.state(), GateState::Bloomed);
        let run_at_bloom = gate.consecutive_run_length();

        // Later values, above or below threshold, change nothing.
        assert_eq!(gate.register(2, 0.1), GateState::Bloomed);
        assert_eq!(gate.register(3, 0.99), GateState::Bloomed);
        assert_eq!(gate.consecutive_run_length(), run_at_bloom);
    }

    #[test]
    fn test_crossings_retain_broken_runs() {
        let mut gate = ThresholdGate::with_defaults();
        feed(&mut gate, &[0.9, 0.9, 0.1, 0.9, 0.1, 0.9]);
        assert_eq!(
            gate.crossings(),
            &[0, 1, 3, 5],
            "crossings must record every qualifying round regardless of continuity"
        );
        assert_eq!(gate.consecutive_run_length(), 1);
    }

    #[test]
    fn test_observe_emits_certificate_exactly_once() {
        let ensemble = OscillatorEnsemble::synchronized(8).unwrap();
        let measurement = crate::order::measure(ensemble.phases()).unwrap();

        let mut gate = ThresholdGate::new(0.5, 2).unwrap();
        assert!(gate.observe(&measurement, &ensemble).is_none());
        let certificate = gate.observe(&measurement, &ensemble);
        assert!(certificate.is_some(), "second qualifying round completes the run");

        let certificate = certificate.unwrap();
        assert_eq!(certificate.oscillator_count, 8);
        assert!((certificate.final_r - 1.0).abs() < 1e-9);

        // One-shot: no further certificates.
        assert!(gate.observe(&measurement, &ensemble).is_none());
    }
}
