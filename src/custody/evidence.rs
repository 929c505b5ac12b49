//! Evidence completeness checks.

use super::error::ValidationError;
use crate::record::{DetectionRecord, DetectionStatus};
use crate::risk::ScoringWeights;

/// Checks that a record is well-formed evidence under the default
/// suspicion threshold.
///
/// Rejects records without an id or creation time, scores outside 0-100,
/// verdicts that disagree with their score, and suspicious verdicts that
/// carry no image.
pub fn validate_evidence(record: &DetectionRecord) -> Result<(), ValidationError> {
    validate_evidence_with_threshold(record, ScoringWeights::default().suspicion_threshold)
}

/// [`validate_evidence`] against the threshold the record was scored with.
pub fn validate_evidence_with_threshold(
    record: &DetectionRecord,
    threshold: u8,
) -> Result<(), ValidationError> {
    if record.id.trim().is_empty() {
        return Err(ValidationError::MissingId);
    }
    // An epoch timestamp is what a defaulted field deserializes to.
    if record.timestamp_ms() <= 0 {
        return Err(ValidationError::MissingTimestamp);
    }
    if record.analysis.risk_score > 100 {
        return Err(ValidationError::RiskScoreOutOfRange(record.analysis.risk_score));
    }
    // Suspicion is derived from the score; a record claiming otherwise
    // would dodge the image requirement.
    let risk_score = record.analysis.risk_score;
    if record.analysis.is_suspicious != (risk_score > threshold) {
        return Err(ValidationError::InconsistentVerdict {
            risk_score,
            is_suspicious: record.analysis.is_suspicious,
            threshold,
        });
    }
    if record.analysis.is_suspicious && !record.has_image() {
        return Err(ValidationError::MissingImageEvidence);
    }
    Ok(())
}

/// Boolean form of [`validate_evidence`].
pub fn is_valid_evidence(record: &DetectionRecord) -> bool {
    validate_evidence(record).is_ok()
}

/// Checks a record about to be stored for the first time.
pub(crate) fn validate_submission(
    record: &DetectionRecord,
    threshold: u8,
) -> Result<(), ValidationError> {
    validate_evidence_with_threshold(record, threshold)?;
    if record.status == DetectionStatus::Published {
        return Err(ValidationError::PublishedOnCreate);
    }
    Ok(())
}
