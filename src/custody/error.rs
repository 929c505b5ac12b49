//! Custody errors.
//!
//! Every rejection names the rule that fired so an operator can see why a
//! record was refused.

use crate::record::DetectionStatus;
use crate::vault::VaultError;
use thiserror::Error;

/// A record that cannot be accepted as evidence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Id is empty or blank.
    #[error("record has no id")]
    MissingId,

    /// Creation time is at or before the epoch.
    #[error("record has no creation timestamp")]
    MissingTimestamp,

    /// Score above 100.
    #[error("risk score {0} outside 0-100")]
    RiskScoreOutOfRange(u8),

    /// Suspicious verdict with no image attached.
    #[error("suspicious verdict without image evidence")]
    MissingImageEvidence,

    /// The suspicious flag disagrees with the score and threshold.
    #[error("verdict does not follow from score {risk_score} (suspicious: {is_suspicious}, threshold {threshold})")]
    InconsistentVerdict {
        /// Recorded score.
        risk_score: u8,
        /// Recorded verdict.
        is_suspicious: bool,
        /// Threshold the verdict was checked against.
        threshold: u8,
    },

    /// A new record claims PUBLISHED.
    #[error("records cannot be created as PUBLISHED")]
    PublishedOnCreate,
}

/// A status change the custody rules forbid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// CONFIRMED may only move on to PUBLISHED.
    #[error("irreversible confirmation rule: {from} cannot become {to}")]
    IrreversibleConfirmation {
        /// Persisted status.
        from: DetectionStatus,
        /// Requested status.
        to: DetectionStatus,
    },

    /// CLEARED records are closed.
    #[error("CLEARED records cannot change status")]
    ClearedIsTerminal,

    /// A new record claims PUBLISHED.
    #[error("records cannot be created as PUBLISHED")]
    PublishedOnCreate,

    /// Publishing skipped confirmation.
    #[error("only CONFIRMED records can be published, record is {from}")]
    PublishWithoutConfirmation {
        /// Persisted status.
        from: DetectionStatus,
    },

    /// PUBLISHED records are closed.
    #[error("PUBLISHED records cannot change status")]
    PublishedIsTerminal,
}

/// Errors surfaced by [`CustodyAuthority`](super::CustodyAuthority).
#[derive(Debug, Error)]
pub enum CustodyError {
    /// The record is not acceptable evidence.
    #[error("evidence rejected: {0}")]
    Validation(#[from] ValidationError),

    /// The status change is forbidden.
    #[error("transition rejected: {0}")]
    Transition(#[from] TransitionError),

    /// No record with this id.
    #[error("record {0} not found")]
    NotFound(String),

    /// Export of a record that is not disclosable.
    #[error("export of record {id} denied: status is {status}")]
    ExportDenied {
        /// Record id.
        id: String,
        /// Its current status.
        status: DetectionStatus,
    },

    /// Reading or writing the vault failed.
    #[error("storage failure: {0}")]
    Vault(#[source] VaultError),
}

impl From<VaultError> for CustodyError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::NotFound(id) => CustodyError::NotFound(id),
            other => CustodyError::Vault(other),
        }
    }
}
