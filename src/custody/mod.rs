//! Custody rules: what counts as evidence, how its status may change, and
//! what may leave the device.
//!
//! ```text
//! submit ──► validate_evidence ──► EvidenceVault::insert
//! update_status ──► (lock, read persisted) ──► validate_transition ──► write
//! export / sync ──► authorize_export ──► sanitize_for_disclosure
//! ```

mod authority;
mod disclosure;
mod error;
mod evidence;
mod sync;
mod transition;

pub use authority::CustodyAuthority;
pub use disclosure::{authorize_export, sanitize_for_disclosure, DisclosedRecord};
pub use error::{CustodyError, TransitionError, ValidationError};
pub use evidence::{is_valid_evidence, validate_evidence, validate_evidence_with_threshold};
pub use sync::{OutboxTransport, SyncError, SyncReport, SyncTransport};
pub use transition::{is_transition_allowed, validate_transition};
