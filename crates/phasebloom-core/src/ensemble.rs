//! Oscillator ensemble state and the Kuramoto evolution step.
//!
//! An [`OscillatorEnsemble`] owns N phases θ_i ∈ [0, 2π) and N fixed natural
//! frequencies ω_i drawn from a Lorentzian (Cauchy) distribution. One
//! ensemble exists per consensus attempt; it is mutated in place by
//! [`OscillatorEnsemble::step`] and discarded when the attempt ends.
//!
//! The discrete-time update rule is Euler integration of the Kuramoto model:
//!
//! ```text
//! θᵢ(t+1) = θᵢ(t) + Δt · [ωᵢ + (K_eff/N) · Σⱼ sin(θⱼ(t) − θᵢ(t))]
//! ```
//!
//! All N updates within one step read the same pre-step phase snapshot
//! (simultaneous update). A sequential in-place update computes a different
//! trajectory and is a correctness bug; see the regression test at the
//! bottom of this module.

use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Cauchy, Distribution};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::constants::{
    COUPLING_K, COUPLING_MAX, COUPLING_MIN, DAMPING_TAU, FREQUENCY_SCALE, Z_CRITICAL,
};
use crate::error::{EngineError, EngineResult};

/// The sole mutable state of a consensus attempt.
///
/// Index i identifies a specific oscillator for the ensemble's lifetime;
/// `phases` and `natural_frequencies` always have the same length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscillatorEnsemble {
    /// Phase angles θᵢ in [0, 2π)
    phases: Vec<f64>,
    /// Natural frequencies ωᵢ, fixed at creation
    natural_frequencies: Vec<f64>,
    /// Effective coupling strength K_eff
    coupling_strength: f64,
    /// Rounds completed since creation
    round_number: u32,
}

impl OscillatorEnsemble {
    /// Create an ensemble with seeded random initial conditions.
    ///
    /// Phases are uniform on [0, 2π); natural frequencies are Cauchy(0, γ)
    /// with γ = [`FREQUENCY_SCALE`]. The same `(n, seed)` pair always
    /// produces the same ensemble, on every platform (ChaCha8 is a portable
    /// stream cipher RNG).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] if `n` is zero.
    pub fn initialize(n: usize, seed: u64) -> EngineResult<Self> {
        if n == 0 {
            return Err(EngineError::InvalidParameter {
                field: "oscillators".to_string(),
                message: "ensemble size must be positive".to_string(),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let phases: Vec<f64> = (0..n).map(|_| rng.gen::<f64>() * 2.0 * PI).collect();

        let lorentzian =
            Cauchy::new(0.0, FREQUENCY_SCALE).map_err(|e| EngineError::InvalidParameter {
                field: "frequency_scale".to_string(),
                message: e.to_string(),
            })?;
        let natural_frequencies: Vec<f64> =
            (0..n).map(|_| lorentzian.sample(&mut rng)).collect();

        Ok(Self {
            phases,
            natural_frequencies,
            coupling_strength: COUPLING_K,
            round_number: 0,
        })
    }

    /// Create a perfectly synchronized, zero-frequency ensemble.
    ///
    /// All phases at 0 and all ωᵢ = 0: a fixed point of the dynamics with
    /// r = 1 at every round. Used by tests and diagnostics.
    pub fn synchronized(n: usize) -> EngineResult<Self> {
        if n == 0 {
            return Err(EngineError::InvalidParameter {
                field: "oscillators".to_string(),
                message: "ensemble size must be positive".to_string(),
            });
        }
        Ok(Self {
            phases: vec![0.0; n],
            natural_frequencies: vec![0.0; n],
            coupling_strength: COUPLING_K,
            round_number: 0,
        })
    }

    /// Create a maximally incoherent, zero-frequency ensemble.
    ///
    /// Phases evenly spread over [0, 2π), so r ≈ 0 at round 0.
    pub fn incoherent(n: usize) -> EngineResult<Self> {
        if n == 0 {
            return Err(EngineError::InvalidParameter {
                field: "oscillators".to_string(),
                message: "ensemble size must be positive".to_string(),
            });
        }
        let phases = (0..n)
            .map(|i| (i as f64 / n as f64) * 2.0 * PI)
            .collect();
        Ok(Self {
            phases,
            natural_frequencies: vec![0.0; n],
            coupling_strength: COUPLING_K,
            round_number: 0,
        })
    }

    /// Reconstruct an ensemble from explicit parts, e.g. a phase array
    /// received from a peer.
    ///
    /// Lengths must match and be non-zero. Finiteness is *not* validated
    /// here; non-finite values are caught by [`check_stability`] during the
    /// run so that wire-corrupted state surfaces as
    /// [`EngineError::NumericInstability`] rather than a false bloom.
    ///
    /// [`check_stability`]: OscillatorEnsemble::check_stability
    pub fn from_parts(
        phases: Vec<f64>,
        natural_frequencies: Vec<f64>,
        coupling_strength: f64,
    ) -> EngineResult<Self> {
        if phases.is_empty() {
            return Err(EngineError::InvalidParameter {
                field: "phases".to_string(),
                message: "phase array must be non-empty".to_string(),
            });
        }
        if phases.len() != natural_frequencies.len() {
            return Err(EngineError::InvalidParameter {
                field: "natural_frequencies".to_string(),
                message: format!(
                    "length {} does not match phase array length {}",
                    natural_frequencies.len(),
                    phases.len()
                ),
            });
        }
        Ok(Self {
            phases,
            natural_frequencies,
            coupling_strength: coupling_strength.clamp(COUPLING_MIN, COUPLING_MAX),
            round_number: 0,
        })
    }

    /// Number of oscillators N.
    #[inline]
    pub fn size(&self) -> usize {
        self.phases.len()
    }

    /// Current phases as a slice.
    #[inline]
    pub fn phases(&self) -> &[f64] {
        &self.phases
    }

    /// Natural frequencies as a slice.
    #[inline]
    pub fn natural_frequencies(&self) -> &[f64] {
        &self.natural_frequencies
    }

    /// Effective coupling strength K_eff.
    #[inline]
    pub fn coupling_strength(&self) -> f64 {
        self.coupling_strength
    }

    /// Set the coupling strength, clamped to [`COUPLING_MIN`, `COUPLING_MAX`].
    pub fn set_coupling_strength(&mut self, k: f64) {
        self.coupling_strength = k.clamp(COUPLING_MIN, COUPLING_MAX);
    }

    /// Rounds completed since creation.
    #[inline]
    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    /// Advance all phases one discrete time step.
    ///
    /// Increments `round_number` exactly once per call. The Σⱼ coupling sum
    /// is evaluated over all N² pairs (sin(0) contributes nothing for j = i).
    pub fn step(&mut self, dt: f64) {
        let n = self.phases.len() as f64;
        let k = self.coupling_strength;

        // Simultaneous-update invariant: every derivative is computed from
        // the pre-step snapshot before any phase is written.
        let mut d_phases = vec![0.0; self.phases.len()];
        for i in 0..self.phases.len() {
            let theta_i = self.phases[i];
            let coupling_sum: f64 = self
                .phases
                .iter()
                .map(|&theta_j| (theta_j - theta_i).sin())
                .sum();
            d_phases[i] = self.natural_frequencies[i] + (k / n) * coupling_sum;
        }

        for (phase, d_phase) in self.phases.iter_mut().zip(&d_phases) {
            *phase = (*phase + d_phase * dt).rem_euclid(2.0 * PI);
        }

        self.round_number += 1;
        trace!(round = self.round_number, coupling = k, "ensemble stepped");
    }

    /// Adapt the coupling strength toward the critical threshold.
    ///
    /// Applies K_eff ← clamp(K_eff + λ_t·(z_c − r)) with the round-damped
    /// gain λ_t = gain·(1 + round)^(−τ), τ = [`DAMPING_TAU`]. Called by the
    /// driver between steps, never inside the integration itself.
    pub fn adapt_coupling(&mut self, r: f64, gain: f64) {
        let damped_gain = gain * (1.0 + f64::from(self.round_number)).powf(-DAMPING_TAU);
        let next = self.coupling_strength + damped_gain * (Z_CRITICAL - r);
        self.coupling_strength = next.clamp(COUPLING_MIN, COUPLING_MAX);
    }

    /// Verify that all phases and the coupling strength are finite.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NumericInstability`] naming the first
    /// offending value.
    pub fn check_stability(&self) -> EngineResult<()> {
        if !self.coupling_strength.is_finite() {
            return Err(EngineError::NumericInstability {
                round: self.round_number,
                detail: format!("coupling strength is {}", self.coupling_strength),
            });
        }
        if let Some(i) = self.phases.iter().position(|p| !p.is_finite()) {
            return Err(EngineError::NumericInstability {
                round: self.round_number,
                detail: format!("phase {} is {}", i, self.phases[i]),
            });
        }
        Ok(())
    }
}
