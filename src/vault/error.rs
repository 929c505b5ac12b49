//! Vault errors.

use thiserror::Error;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Filesystem failure.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Ciphertext did not authenticate under this key.
    #[error("record {id} could not be decrypted: {reason}")]
    Decryption {
        /// Record id.
        id: String,
        /// What went wrong.
        reason: String,
    },

    /// Clear-text metadata does not match its hash.
    #[error("record {id} failed integrity verification")]
    Integrity {
        /// Record id.
        id: String,
    },

    /// The file is structurally invalid.
    #[error("record {id} is malformed: {reason}")]
    Malformed {
        /// Record id.
        id: String,
        /// What is missing or wrong.
        reason: String,
    },

    /// No record with this id.
    #[error("record {0} not found")]
    NotFound(String),

    /// Insert of an id already stored.
    #[error("record {0} already exists")]
    AlreadyExists(String),

    /// The key could not be loaded or created.
    #[error("encryption key unavailable: {0}")]
    Key(String),
}
