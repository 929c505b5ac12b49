//! File configuration.
//!
//! Every section is optional; a missing file section falls back to the
//! defaults the engine ships with.
//!
//! ```toml
//! [classifier]
//! smart_filter = true
//!
//! [scoring]
//! hidden_camera = 50.0
//!
//! [vault]
//! data_dir = "/var/lib/skim-guard"
//! hash_algorithm = "blake3"
//!
//! [scan]
//! environment = "FUEL_PUMP"
//! ```

use crate::classify::{ClassifierConfig, ClassifierError};
use crate::risk::{ScoringWeights, WeightsError};
use crate::scan::Environment;
use crate::vault::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
    /// Classifier settings are inconsistent.
    #[error("invalid [classifier] section: {0}")]
    Classifier(#[from] ClassifierError),
    /// Scoring weights are out of range.
    #[error("invalid [scoring] section: {0}")]
    Scoring(#[from] WeightsError),
    /// Storage paths overlap or are empty.
    #[error("invalid [vault] section: {0}")]
    Vault(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[classifier]` section.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// `[scoring]` section.
    #[serde(default)]
    pub scoring: ScoringWeights,
    /// `[vault]` section.
    #[serde(default)]
    pub vault: VaultConfig,
    /// `[scan]` section.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Where and how evidence is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Directory holding one file per record.
    pub data_dir: PathBuf,
    /// Key file. Defaults to `vault.key` beside (not inside) the records.
    pub key_file: Option<PathBuf>,
    /// Digest used for record integrity hashes.
    pub hash_algorithm: HashAlgorithm,
    /// Directory that receives disclosures on sync.
    pub outbox_dir: Option<PathBuf>,
    /// Assessment and sync counters kept between runs. Defaults to
    /// `metrics.json` beside the records.
    pub metrics_file: Option<PathBuf>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("skim-guard-data/records"),
            key_file: None,
            hash_algorithm: HashAlgorithm::default(),
            outbox_dir: None,
            metrics_file: None,
        }
    }
}

impl VaultConfig {
    /// Resolved key file location.
    pub fn key_path(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| self.sibling_of_data_dir("vault.key"))
    }

    /// Resolved outbox directory.
    pub fn outbox_path(&self) -> PathBuf {
        self.outbox_dir
            .clone()
            .unwrap_or_else(|| self.sibling_of_data_dir("outbox"))
    }

    /// Resolved activity counter file.
    pub fn metrics_path(&self) -> PathBuf {
        self.metrics_file
            .clone()
            .unwrap_or_else(|| self.sibling_of_data_dir("metrics.json"))
    }

    fn sibling_of_data_dir(&self, name: &str) -> PathBuf {
        match self.data_dir.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Validates the storage paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Vault("data_dir is empty".to_string()));
        }
        // Record files are listed by extension; a key inside would be read as one.
        if self.key_path().starts_with(&self.data_dir) {
            return Err(ConfigError::Vault(
                "key_file must not live inside data_dir".to_string(),
            ));
        }
        if self.metrics_path().starts_with(&self.data_dir) {
            return Err(ConfigError::Vault(
                "metrics_file must not live inside data_dir".to_string(),
            ));
        }
        if self.outbox_path() == self.data_dir {
            return Err(ConfigError::Vault(
                "outbox_dir must differ from data_dir".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scan defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Deployment environment used when none is given on the command line.
    pub environment: Environment,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.classifier.validate()?;
        self.scoring.validate()?;
        self.vault.validate()?;
        Ok(())
    }
}
