//! Lifecycle and synchronization status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Custody lifecycle of a detection.
///
/// ```text
/// PENDING ──► CONFIRMED ──► PUBLISHED
///    │
///    └──────► CLEARED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionStatus {
    /// Awaiting review.
    Pending,
    /// Skimmer confirmed by a reviewer.
    Confirmed,
    /// Reviewed and found clean.
    Cleared,
    /// Confirmed and released to the authorities.
    Published,
}

impl DetectionStatus {
    /// Wire tag of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionStatus::Pending => "PENDING",
            DetectionStatus::Confirmed => "CONFIRMED",
            DetectionStatus::Cleared => "CLEARED",
            DetectionStatus::Published => "PUBLISHED",
        }
    }

    /// Confirmed or published: eligible to leave the device.
    pub fn is_disclosable(self) -> bool {
        matches!(self, DetectionStatus::Confirmed | DetectionStatus::Published)
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status tag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for DetectionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(DetectionStatus::Pending),
            "CONFIRMED" => Ok(DetectionStatus::Confirmed),
            "CLEARED" => Ok(DetectionStatus::Cleared),
            "PUBLISHED" => Ok(DetectionStatus::Published),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Upload state of a record. Recomputed by the vault, never taken from callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// Uploaded in its current form.
    Synced,
    /// Not yet uploaded, or changed since.
    #[default]
    Pending,
    /// Last upload failed.
    Failed,
}

impl SyncStatus {
    /// Still waiting in the upload queue.
    pub fn is_queued(self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Failed)
    }
}
