//! Error types for phasebloom-core.
//!
//! This module defines the central error type [`EngineError`] used throughout
//! the engine, along with the [`EngineResult<T>`] type alias.
//!
//! All engine errors are local and fatal to the current consensus attempt:
//! ensembles are never shared between attempts, so an error cannot corrupt
//! another attempt's state. Running out of rounds without synchronizing is
//! *not* an error; the driver reports it as a normal non-bloom outcome.

use thiserror::Error;

/// Top-level error type for consensus engine operations.
///
/// # Examples
///
/// ```rust
/// use phasebloom_core::error::EngineError;
///
/// let err = EngineError::InvalidParameter {
///     field: "oscillators".to_string(),
///     message: "must be positive".to_string(),
/// };
/// assert!(err.to_string().contains("oscillators"));
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// A construction or configuration parameter failed validation.
    ///
    /// # When This Occurs
    ///
    /// - Ensemble size N of zero
    /// - Non-finite or non-positive time step
    /// - Threshold outside (0, 1] or a zero run length
    /// - Mismatched phase/frequency array lengths
    ///
    /// Invalid parameters fail fast at construction and are never silently
    /// clamped.
    #[error("Invalid parameter: {field} - {message}")]
    InvalidParameter {
        /// Name of the offending parameter
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// A NaN or infinity was detected in the phase state or a derived
    /// measurement.
    ///
    /// # When This Occurs
    ///
    /// - Phases diverged under a pathological coupling/time-step combination
    /// - An externally reconstructed ensemble carried non-finite values
    ///
    /// The attempt is aborted rather than risking a plausible-looking but
    /// wrong certificate.
    #[error("Numeric instability at round {round}: {detail}")]
    NumericInstability {
        /// Round at which the instability was detected
        round: u32,
        /// Description of the offending value
        detail: String,
    },

    /// Configuration is invalid or missing.
    ///
    /// # When This Occurs
    ///
    /// - Unreadable or malformed configuration file
    /// - Environment variable parsing failure
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::SerializationError(err.to_string())
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
