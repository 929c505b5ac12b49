//! Encrypted-at-rest evidence persistence.
//!
//! Each record is sealed with AES-256-GCM under a device key and written
//! atomically to its own file. Plaintext metadata needed for listing
//! (id, timestamp, status, sync state) stays in the clear; id, timestamp
//! and status are bound to the ciphertext as associated data and covered
//! by an integrity hash.
//!
//! ```text
//! DetectionRecord ──seal──► StoredRecord ──json──► <data_dir>/<hash(id)>.json
//!                 ◄─open───              ◄─read───
//! ```
//!
//! Records written before encryption was introduced carry no encryption
//! marker and are still readable.

mod cipher;
mod error;
mod format;
mod integrity;
mod key;
mod store;

pub use cipher::{RecordCipher, SealedBytes, NONCE_LEN};
pub use error::VaultError;
pub use format::StoredRecord;
pub use integrity::{integrity_hash, metadata_binding, HashAlgorithm};
pub use key::{EncryptionKey, FileKeyProvider, KeyProvider, StaticKeyProvider, KEY_LEN};
pub use store::{CorruptedRecord, EvidenceVault, RecordEntry, VaultStats};
