//! Integrity hashing of plaintext record metadata.
//!
//! The status and timestamp are stored in the clear so records can be
//! listed and filtered without decryption. The unkeyed hash catches
//! corruption of those fields. It does not stop a deliberate edit, since
//! anyone can recompute it; for encrypted records the same
//! [`metadata_binding`] string is also the AEAD associated data, so an
//! edited status fails authentication even with a recomputed hash.

use crate::record::DetectionStatus;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, widely deployed, default.
    #[default]
    Sha256,
    /// BLAKE3, faster.
    Blake3,
}

/// The `id:timestamp_ms:STATUS` string covered by both the integrity hash
/// and the ciphertext authentication.
pub fn metadata_binding(id: &str, timestamp_ms: i64, status: DetectionStatus) -> String {
    format!("{id}:{timestamp_ms}:{status}")
}

/// Hex digest over `id:timestamp_ms:status`.
pub fn integrity_hash(
    algorithm: HashAlgorithm,
    id: &str,
    timestamp_ms: i64,
    status: DetectionStatus,
) -> String {
    let input = metadata_binding(id, timestamp_ms, status);
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(input.as_bytes());
            hex::encode(hasher.finalize())
        }
        HashAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            hasher.update(input.as_bytes());
            hasher.finalize().to_hex().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // sha256("abc:1:PENDING")
        let expected = {
            let mut h = Sha256::new();
            h.update(b"abc:1:PENDING");
            hex::encode(h.finalize())
        };
        assert_eq!(
            integrity_hash(HashAlgorithm::Sha256, "abc", 1, DetectionStatus::Pending),
            expected
        );
    }

    #[test]
    fn test_status_change_changes_hash() {
        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            let a = integrity_hash(algorithm, "r1", 1_700_000_000_000, DetectionStatus::Pending);
            let b = integrity_hash(algorithm, "r1", 1_700_000_000_000, DetectionStatus::Confirmed);
            assert_ne!(a, b);
            assert_eq!(a.len(), 64);
        }
    }

    #[test]
    fn test_algorithms_differ() {
        let sha = integrity_hash(HashAlgorithm::Sha256, "r", 5, DetectionStatus::Cleared);
        let b3 = integrity_hash(HashAlgorithm::Blake3, "r", 5, DetectionStatus::Cleared);
        assert_ne!(sha, b3);
    }
}
