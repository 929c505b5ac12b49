//! The detection record.

use super::status::{DetectionStatus, SyncStatus};
use crate::risk::AnalysisResult;
use crate::scan::{CaptureResult, GeoLocation};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single inspection incident: evidence, verdict and custody state.
///
/// Once handed to the vault the vault owns it; callers work on copies
/// returned by reads.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    /// Random UUID assigned at creation.
    pub id: String,
    /// Creation time, millisecond precision.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Encoded snapshot. Required when the verdict is suspicious.
    #[serde(default)]
    pub image_data: String,
    /// Where the inspection took place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    /// The verdict this record preserves.
    pub analysis: AnalysisResult,
    /// Custody status.
    pub status: DetectionStatus,
    /// Upload state, managed by the vault.
    #[serde(default)]
    pub sync_status: SyncStatus,
    /// Operator notes. Never disclosed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Terminal model or label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

impl DetectionRecord {
    /// Creates a pending record with a fresh id and the current time.
    pub fn new(capture: CaptureResult, analysis: AnalysisResult) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().trunc_subsecs(3),
            image_data: capture.image_data,
            location: capture.location,
            analysis,
            status: DetectionStatus::Pending,
            sync_status: SyncStatus::Pending,
            notes: None,
            device_type: None,
        }
    }

    /// Sets the custody status.
    pub fn with_status(mut self, status: DetectionStatus) -> Self {
        self.status = status;
        self
    }

    /// Attaches operator notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Records the terminal model.
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    /// Milliseconds since the Unix epoch.
    #[inline]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Whether an image is attached.
    #[inline]
    pub fn has_image(&self) -> bool {
        !self.image_data.is_empty()
    }
}

impl std::fmt::Debug for DetectionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionRecord")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp)
            .field("status", &self.status)
            .field("sync_status", &self.sync_status)
            .field("risk_score", &self.analysis.risk_score)
            .field("is_suspicious", &self.analysis.is_suspicious)
            .field("image_bytes", &self.image_data.len())
            .finish_non_exhaustive()
    }
}
