//! What may leave the device, and in what shape.

use crate::record::{DetectionRecord, DetectionStatus};
use crate::risk::AnalysisResult;
use crate::scan::GeoLocation;
use serde::{Deserialize, Serialize};

/// The externally shareable subset of a record.
///
/// Internal notes and sync bookkeeping are not part of it. Any field added
/// to [`DetectionRecord`] stays local until it is listed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosedRecord {
    /// Record id.
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// CONFIRMED or PUBLISHED.
    pub status: DetectionStatus,
    /// Full verdict, emitters included.
    pub analysis: AnalysisResult,
    /// Encoded snapshot.
    pub image_data: String,
    /// Where the inspection took place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    /// Terminal model, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

/// Only confirmed or published records may be exported.
pub fn authorize_export(record: &DetectionRecord) -> bool {
    record.status.is_disclosable()
}

/// Projects a record onto its disclosable fields.
///
/// This does not check authorization; pair it with [`authorize_export`].
pub fn sanitize_for_disclosure(record: &DetectionRecord) -> DisclosedRecord {
    DisclosedRecord {
        id: record.id.clone(),
        timestamp: record.timestamp_ms(),
        status: record.status,
        analysis: record.analysis.clone(),
        image_data: record.image_data.clone(),
        location: record.location,
        device_type: record.device_type.clone(),
    }
}
