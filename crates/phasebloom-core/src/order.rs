//! Order-parameter analysis for phase ensembles.
//!
//! The synchronization level of an ensemble is summarized by the complex
//! order parameter:
//!
//! ```text
//! r · e^(iψ) = (1/N) Σⱼ e^(iθⱼ)
//! ```
//!
//! r ∈ [0, 1] measures spatial coherence (r = 1 fully aligned, r ≈ 0
//! incoherent) and ψ is the mean phase. The Edwards-Anderson overlap
//!
//! ```text
//! q = |(1/N) Σᵢ e^(i(θᵢ(t) − θᵢ(t−1)))|
//! ```
//!
//! measures temporal persistence: how little the configuration moved
//! relative to itself between rounds, independent of instantaneous
//! alignment.
//!
//! Everything in this module is a pure function of its inputs. The
//! histogram diagnostics (negentropy, Fisher information) are informational
//! only and never gate consensus.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// One round's synchronization measurements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderMeasurement {
    /// Kuramoto order parameter r ∈ [0, 1]
    pub r: f64,
    /// Mean phase ψ ∈ (−π, π]
    pub psi: f64,
    /// Edwards-Anderson overlap q ∈ [0, 1]; `None` when no prior snapshot
    /// exists (round 0)
    pub q: Option<f64>,
}

/// Compute the complex mean of unit vectors e^(iθ) as (re, im).
fn complex_mean(phases: &[f64]) -> (f64, f64) {
    let n = phases.len() as f64;
    let mut sum_cos = 0.0;
    let mut sum_sin = 0.0;
    for &phase in phases {
        sum_cos += phase.cos();
        sum_sin += phase.sin();
    }
    (sum_cos / n, sum_sin / n)
}

fn validate_phases(field: &str, phases: &[f64]) -> EngineResult<()> {
    if phases.is_empty() {
        return Err(EngineError::InvalidParameter {
            field: field.to_string(),
            message: "phase array must be non-empty".to_string(),
        });
    }
    if let Some(i) = phases.iter().position(|p| !p.is_finite()) {
        return Err(EngineError::InvalidParameter {
            field: field.to_string(),
            message: format!("phase {} is non-finite ({})", i, phases[i]),
        });
    }
    Ok(())
}

/// Measure spatial coherence (r, ψ) of a phase snapshot.
///
/// By construction r is the magnitude of a mean of unit vectors, so
/// r ∈ [0, 1] up to floating-point rounding. ψ is reported in (−π, π].
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] for an empty or non-finite
/// phase array.
pub fn measure(phases: &[f64]) -> EngineResult<OrderMeasurement> {
    validate_phases("phases", phases)?;
    let (avg_cos, avg_sin) = complex_mean(phases);
    Ok(OrderMeasurement {
        r: (avg_cos * avg_cos + avg_sin * avg_sin).sqrt(),
        psi: avg_sin.atan2(avg_cos),
        q: None,
    })
}

/// Measure spatial coherence plus the Edwards-Anderson overlap against the
/// previous round's snapshot.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParameter`] if either array is empty or
/// non-finite, or the lengths differ (oscillator identity is positional).
pub fn measure_with_persistence(
    phases: &[f64],
    previous: &[f64],
) -> EngineResult<OrderMeasurement> {
    validate_phases("previous", previous)?;
    if phases.len() != previous.len() {
        return Err(EngineError::InvalidParameter {
            field: "previous".to_string(),
            message: format!(
                "snapshot length {} does not match current length {}",
                previous.len(),
                phases.len()
            ),
        });
    }
    let mut measurement = measure(phases)?;

    let n = phases.len() as f64;
    let mut sum_cos = 0.0;
    let mut sum_sin = 0.0;
    for (&now, &prev) in phases.iter().zip(previous) {
        let delta = now - prev;
        sum_cos += delta.cos();
        sum_sin += delta.sin();
    }
    let (avg_cos, avg_sin) = (sum_cos / n, sum_sin / n);
    measurement.q = Some((avg_cos * avg_cos + avg_sin * avg_sin).sqrt());
    Ok(measurement)
}

/// Build a normalized histogram of phases over `bins` equal arcs of [0, 2π).
fn phase_histogram(phases: &[f64], bins: usize) -> Vec<f64> {
    let n = phases.len() as f64;
    let mut counts = vec![0.0; bins];
    let width = 2.0 * std::f64::consts::PI / bins as f64;
    for &phase in phases {
        let idx = ((phase.rem_euclid(2.0 * std::f64::consts::PI) / width) as usize).min(bins - 1);
        counts[idx] += 1.0;
    }
    for count in counts.iter_mut() {
        *count /= n;
    }
    counts
}

fn validate_bins(bins: usize) -> EngineResult<()> {
    if bins < 2 {
        return Err(EngineError::InvalidParameter {
            field: "bins".to_string(),
            message: format!("histogram needs at least 2 bins, got {}", bins),
        });
    }
    Ok(())
}

/// Negentropy of the phase distribution: J = ln(bins) − H(histogram).
///
/// Zero for a uniform spread, approaching ln(bins) as all mass collects in
/// one bin. Diagnostic only.
pub fn negentropy(phases: &[f64], bins: usize) -> EngineResult<f64> {
    validate_phases("phases", phases)?;
    validate_bins(bins)?;

    let histogram = phase_histogram(phases, bins);
    let entropy: f64 = histogram
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.ln())
        .sum();
    Ok(((bins as f64).ln() - entropy).max(0.0))
}

/// Discrete Fisher information of the phase distribution.
///
/// Approximated as Σ (Δp/Δθ)²/p · Δθ over occupied bins with a circular
/// forward difference. Sharply peaked distributions score high; the uniform
/// distribution scores zero. Diagnostic only.
pub fn fisher_information(phases: &[f64], bins: usize) -> EngineResult<f64> {
    validate_phases("phases", phases)?;
    validate_bins(bins)?;

    let histogram = phase_histogram(phases, bins);
    let width = 2.0 * std::f64::consts::PI / bins as f64;
    let mut information = 0.0;
    for i in 0..bins {
        let p = histogram[i];
        if p <= 0.0 {
            continue;
        }
        let dp = (histogram[(i + 1) % bins] - p) / width;
        information += dp * dp / p * width;
    }
    Ok(information)
}
