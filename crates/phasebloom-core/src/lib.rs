//! Phasebloom Core Library
//!
//! Proof-of-Coherence consensus engine: a population of Kuramoto phase
//! oscillators is driven toward synchronization, the order parameter r is
//! measured every round, and consensus ("bloom") is declared once r holds at
//! or above the critical threshold for a required number of consecutive
//! rounds. The terminal artifact is an immutable [`ConsensusCertificate`]
//! that the surrounding block-construction layer serializes into a header.
//!
//! # Architecture
//!
//! This crate defines:
//! - Golden-ratio parameter set (`constants`)
//! - Oscillator state and the evolution step (`ensemble`)
//! - Order-parameter analysis (`order`)
//! - Threshold gate state machine (`gate`)
//! - Certificate construction and canonical encoding (`certificate`)
//! - The consensus run loop (`driver`)
//! - Error types and result aliases (`error`)
//! - Configuration structures (`config`)
//!
//! # Example
//!
//! ```
//! use phasebloom_core::config::EngineConfig;
//! use phasebloom_core::driver::ConsensusDriver;
//! use phasebloom_core::ensemble::OscillatorEnsemble;
//!
//! let config = EngineConfig::default();
//! let mut ensemble = OscillatorEnsemble::initialize(config.oscillators, config.seed).unwrap();
//! let mut driver = ConsensusDriver::new(config).unwrap();
//! let outcome = driver.run(&mut ensemble).unwrap();
//! assert!(outcome.rounds_completed > 0);
//! ```

pub mod certificate;
pub mod config;
pub mod constants;
pub mod driver;
pub mod ensemble;
pub mod error;
pub mod gate;
pub mod order;

// Re-exports for convenience
pub use certificate::ConsensusCertificate;
pub use config::EngineConfig;
pub use driver::{ConsensusDriver, ConsensusOutcome};
pub use ensemble::OscillatorEnsemble;
pub use error::{EngineError, EngineResult};
pub use gate::{GateState, ThresholdGate};
pub use order::OrderMeasurement;
