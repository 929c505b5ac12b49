//! Device encryption key lifecycle.
//!
//! The key is generated once from the OS entropy source, persisted, and
//! reused for every subsequent session. Providers are injected into the
//! vault so tests can supply fixed keys.
//!
//! A new key file is written in full under a private name and then linked
//! into place, which fails if the file already exists. Two processes racing
//! on first use therefore agree on whichever key was linked first.

use super::error::VaultError;
use rand_core::{OsRng, RngCore};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Symmetric record-encryption key.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    bytes: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Generates a fresh key from the OS entropy source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Raw key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Short public identifier of the key.
    ///
    /// Stored alongside ciphertext so a wrong key can be told apart from
    /// corrupted data.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"skim-guard-key-fingerprint-v1");
        hasher.update(&self.bytes);
        hex::encode(&hasher.finalize().as_bytes()[..8])
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Supplies the vault key.
pub trait KeyProvider {
    /// Returns the persisted key, generating and persisting one on first use.
    fn load_or_generate(&self) -> Result<EncryptionKey, VaultError>;
}

/// Keeps the key as hex in a file on local storage.
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    /// Provider for the key file at `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the key file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<EncryptionKey, VaultError> {
        let content = fs::read_to_string(&self.path)?;
        let decoded =
            hex::decode(content.trim()).map_err(|e| VaultError::Key(format!("invalid key file: {e}")))?;
        let bytes: [u8; KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            VaultError::Key(format!("key file holds {} bytes, expected {KEY_LEN}", v.len()))
        })?;
        Ok(EncryptionKey::from_bytes(bytes))
    }

    /// Writes `key` unless a key file already exists. Returns whether this
    /// call created the file.
    fn persist(&self, key: &EncryptionKey) -> Result<bool, VaultError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        let result = (|| -> std::io::Result<bool> {
            let mut file = File::create(&tmp)?;
            restrict_permissions(&tmp)?;
            file.write_all(hex::encode(key.as_bytes()).as_bytes())?;
            file.sync_all()?;
            match fs::hard_link(&tmp, &self.path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e),
            }
        })();
        let _ = fs::remove_file(&tmp);
        Ok(result?)
    }
}

impl KeyProvider for FileKeyProvider {
    fn load_or_generate(&self) -> Result<EncryptionKey, VaultError> {
        match self.load() {
            Ok(key) => {
                tracing::debug!(fingerprint = %key.fingerprint(), "Loaded vault key");
                return Ok(key);
            }
            Err(VaultError::Io(e)) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let key = EncryptionKey::generate();
        if !self.persist(&key)? {
            let key = self.load()?;
            tracing::debug!(fingerprint = %key.fingerprint(), "Vault key created concurrently, loaded it");
            return Ok(key);
        }
        tracing::info!(
            fingerprint = %key.fingerprint(),
            path = %self.path.display(),
            "Generated new vault key"
        );
        Ok(key)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Hands out a fixed in-memory key.
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    key: EncryptionKey,
}

impl StaticKeyProvider {
    /// Provider that always returns `key`.
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn load_or_generate(&self) -> Result<EncryptionKey, VaultError> {
        Ok(self.key.clone())
    }
}
