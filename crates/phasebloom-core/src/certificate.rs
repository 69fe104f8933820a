//! Consensus certificate: the engine's terminal artifact.
//!
//! Produced exactly once per successful attempt, at the round that completes
//! the required consecutive run. The certificate is a value snapshot built
//! from copies; stepping the ensemble afterwards cannot alter an issued
//! certificate. The block-construction layer owns it after emission.
//!
//! The phase snapshot is carried in compact form: a SHA-256 digest of the
//! phase array rather than the array itself. See [`phase_digest_of`] for the
//! exact encoding.
//!
//! [`phase_digest_of`]: ConsensusCertificate::phase_digest_of

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::ensemble::OscillatorEnsemble;

/// Immutable proof that the synchronization process completed.
///
/// Fields are listed in canonical serialization order; see
/// [`canonical_bytes`](Self::canonical_bytes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusCertificate {
    /// Ensemble size N
    pub oscillator_count: u32,
    /// Round at which the consecutive run completed
    pub achieving_round: u32,
    /// Order parameter r at the achieving round
    pub final_r: f64,
    /// Effective coupling strength at the achieving round
    pub coupling_strength: f64,
    /// SHA-256 digest of the phase snapshot, lowercase hex
    pub phase_digest: String,
    /// Issuance time, seconds since the Unix epoch
    pub timestamp: u64,
}

impl ConsensusCertificate {
    /// Snapshot the ensemble into a certificate.
    ///
    /// Called by the threshold gate at the exact bloom transition.
    pub(crate) fn issue(ensemble: &OscillatorEnsemble, final_r: f64) -> Self {
        let certificate = Self {
            oscillator_count: ensemble.size() as u32,
            achieving_round: ensemble.round_number(),
            final_r,
            coupling_strength: ensemble.coupling_strength(),
            phase_digest: Self::phase_digest_of(ensemble.phases()),
            timestamp: Utc::now().timestamp().max(0) as u64,
        };
        info!(
            round = certificate.achieving_round,
            r = certificate.final_r,
            coupling = certificate.coupling_strength,
            "consensus certificate issued"
        );
        certificate
    }

    /// SHA-256 digest of a phase snapshot.
    ///
    /// Each phase is encoded as its little-endian f64 bytes, concatenated in
    /// oscillator order, then hashed. Same snapshot, same digest.
    pub fn phase_digest_of(phases: &[f64]) -> String {
        let mut hasher = Sha256::new();
        for &phase in phases {
            hasher.update(phase.to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Serialize the fields in canonical order for hashing and storage.
    ///
    /// Layout: `oscillator_count` (u32 LE), `achieving_round` (u32 LE),
    /// `final_r` (f64 LE), `coupling_strength` (f64 LE), `phase_digest`
    /// (64 lowercase-hex ASCII bytes), `timestamp` (u64 LE).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(4 + 4 + 8 + 8 + self.phase_digest.len() + 8);
        bytes.extend_from_slice(&self.oscillator_count.to_le_bytes());
        bytes.extend_from_slice(&self.achieving_round.to_le_bytes());
        bytes.extend_from_slice(&self.final_r.to_le_bytes());
        bytes.extend_from_slice(&self.coupling_strength.to_le_bytes());
        bytes.extend_from_slice(self.phase_digest.as_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes
    }

    /// SHA-256 hex digest of [`canonical_bytes`](Self::canonical_bytes),
    /// suitable for inclusion in a block header.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_certificate() -> ConsensusCertificate {
        ConsensusCertificate {
            oscillator_count: 63,
            achieving_round: 1234,
            final_r: 0.91,
            coupling_strength: 0.924,
            phase_digest: ConsensusCertificate::phase_digest_of(&[0.1, 2.2, 4.4]),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_phase_digest_is_deterministic() {
        let phases = vec![0.25, 1.5, 3.75];
        let a = ConsensusCertificate::phase_digest_of(&phases);
        let b = ConsensusCertificate::phase_digest_of(&phases);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64, "SHA-256 hex digest is 64 characters");

        let c = ConsensusCertificate::phase_digest_of(&[0.25, 1.5, 3.76]);
        assert_ne!(a, c, "different snapshots must digest differently");
    }

    #[test]
    fn test_canonical_bytes_layout() {
        let certificate = sample_certificate();
        let bytes = certificate.canonical_bytes();
        assert_eq!(bytes.len(), 4 + 4 + 8 + 8 + 64 + 8);
        assert_eq!(&bytes[0..4], &63u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1234u32.to_le_bytes());
        assert_eq!(&bytes[8..16], &0.91f64.to_le_bytes());
        assert_eq!(&bytes[88..96], &1_700_000_000u64.to_le_bytes());
    }

    #[test]
    fn test_content_hash_tracks_fields() {
        let certificate = sample_certificate();
        let hash = certificate.content_hash();

        let mut tampered = certificate.clone();
        tampered.achieving_round += 1;
        assert_ne!(hash, tampered.content_hash());
    }

    #[test]
    fn test_serde_roundtrip() {
        let certificate = sample_certificate();
        let json = serde_json::to_string(&certificate).unwrap();
        let back: ConsensusCertificate = serde_json::from_str(&json).unwrap();
        assert_eq!(certificate, back);
    }

    #[test]
    fn test_issue_snapshots_ensemble() {
        let mut ensemble = OscillatorEnsemble::synchronized(16).unwrap();
        for _ in 0..5 {
            ensemble.step(0.05);
        }
        let certificate = ConsensusCertificate::issue(&ensemble, 1.0);
        assert_eq!(certificate.oscillator_count, 16);
        assert_eq!(certificate.achieving_round, 5);
        assert_eq!(
            certificate.phase_digest,
            ConsensusCertificate::phase_digest_of(ensemble.phases())
        );

        // Stepping on after issuance must not touch the certificate.
        let frozen = certificate.clone();
        for _ in 0..10 {
            ensemble.step(0.05);
        }
        assert_eq!(certificate, frozen);
    }
}
