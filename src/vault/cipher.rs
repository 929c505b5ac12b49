//! AES-256-GCM record sealing.

use super::error::VaultError;
use super::key::EncryptionKey;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand_core::{OsRng, RngCore};

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Ciphertext and the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBytes {
    /// Random per-seal nonce.
    pub iv: [u8; NONCE_LEN],
    /// Ciphertext with the GCM tag appended.
    pub ciphertext: Vec<u8>,
}

/// Authenticated encryption bound to a single device key.
pub struct RecordCipher {
    cipher: Aes256Gcm,
    fingerprint: String,
}

impl RecordCipher {
    /// Cipher bound to `key`.
    pub fn new(key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Self {
            cipher,
            fingerprint: key.fingerprint(),
        }
    }

    /// Fingerprint of the key this cipher uses.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Encrypts `plaintext` under a fresh random nonce, authenticating `aad`.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<SealedBytes, VaultError> {
        let mut iv = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad })
            .map_err(|_| VaultError::Key("encryption failed".to_string()))?;

        Ok(SealedBytes { iv, ciphertext })
    }

    /// Decrypts and authenticates. Any tampering, wrong key or wrong `aad` fails.
    ///
    /// `record_id` is only used to label the error.
    pub fn open(&self, sealed: &SealedBytes, aad: &[u8], record_id: &str) -> Result<Vec<u8>, VaultError> {
        self.cipher
            .decrypt(
                Nonce::from_slice(&sealed.iv),
                Payload {
                    msg: &sealed.ciphertext,
                    aad,
                },
            )
            .map_err(|_| VaultError::Decryption {
                id: record_id.to_string(),
                reason: "authentication failed: data or metadata altered, or key mismatch".to_string(),
            })
    }
}

impl std::fmt::Debug for RecordCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCipher")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}
