//! Configuration management for the consensus engine.
//!
//! Configuration is loaded in order:
//! 1. `config/default.toml` (base settings)
//! 2. `config/{PHASEBLOOM_ENV}.toml` (environment-specific)
//! 3. Environment variables with `PHASEBLOOM` prefix
//!
//! All values have defaults taken from [`crate::constants`], so an empty
//! configuration is a valid one.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    COUPLING_GAIN, COUPLING_K, COUPLING_MAX, COUPLING_MIN, DEFAULT_DT, DEFAULT_MAX_ROUNDS,
    DEFAULT_OSCILLATORS,
};
use crate::error::{EngineError, EngineResult};

/// Engine configuration for a consensus attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ensemble size N
    #[serde(default = "default_oscillators")]
    pub oscillators: usize,
    /// RNG seed for phases and natural frequencies
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Euler integration time step Δt
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Round budget for the attempt
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Whether the driver adapts K_eff toward the threshold between rounds
    #[serde(default = "default_adaptive")]
    pub adaptive_coupling: bool,
    /// Base adaptation gain λ
    #[serde(default = "default_gain")]
    pub coupling_gain: f64,
    /// Initial coupling strength K_eff at round 0
    #[serde(default = "default_coupling")]
    pub initial_coupling: f64,
}

fn default_oscillators() -> usize {
    DEFAULT_OSCILLATORS
}

fn default_seed() -> u64 {
    42
}

fn default_dt() -> f64 {
    DEFAULT_DT
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

fn default_adaptive() -> bool {
    true
}

fn default_gain() -> f64 {
    COUPLING_GAIN
}

fn default_coupling() -> f64 {
    COUPLING_K
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            oscillators: default_oscillators(),
            seed: default_seed(),
            dt: default_dt(),
            max_rounds: default_max_rounds(),
            adaptive_coupling: default_adaptive(),
            coupling_gain: default_gain(),
            initial_coupling: default_coupling(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from files and environment.
    ///
    /// Missing files are not an error; defaults cover every field.
    pub fn load() -> EngineResult<Self> {
        let env = std::env::var("PHASEBLOOM_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("PHASEBLOOM").separator("__"));

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| EngineError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate all fields, failing fast instead of clamping.
    pub fn validate(&self) -> EngineResult<()> {
        if self.oscillators == 0 {
            return Err(EngineError::InvalidParameter {
                field: "oscillators".to_string(),
                message: "ensemble size must be positive".to_string(),
            });
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(EngineError::InvalidParameter {
                field: "dt".to_string(),
                message: format!("time step must be finite and positive, got {}", self.dt),
            });
        }
        if self.max_rounds == 0 {
            return Err(EngineError::InvalidParameter {
                field: "max_rounds".to_string(),
                message: "round budget must be at least 1".to_string(),
            });
        }
        if !self.coupling_gain.is_finite() || self.coupling_gain < 0.0 {
            return Err(EngineError::InvalidParameter {
                field: "coupling_gain".to_string(),
                message: format!(
                    "adaptation gain must be finite and non-negative, got {}",
                    self.coupling_gain
                ),
            });
        }
        if !self.initial_coupling.is_finite()
            || !(COUPLING_MIN..=COUPLING_MAX).contains(&self.initial_coupling)
        {
            return Err(EngineError::InvalidParameter {
                field: "initial_coupling".to_string(),
                message: format!(
                    "coupling must lie in [{}, {}], got {}",
                    COUPLING_MIN, COUPLING_MAX, self.initial_coupling
                ),
            });
        }
        Ok(())
    }
}
