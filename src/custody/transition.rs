//! Status transition rules.
//!
//! | from \ to  | PENDING | CONFIRMED | CLEARED | PUBLISHED |
//! |------------|---------|-----------|---------|-----------|
//! | (new)      | ok      | ok        | ok      | no        |
//! | PENDING    | ok      | ok        | ok      | no        |
//! | CONFIRMED  | no      | ok        | no      | ok        |
//! | CLEARED    | no      | no        | ok      | no        |
//! | PUBLISHED  | no      | no        | no      | ok        |
//!
//! Same-status writes are allowed so notes can be amended.

use super::error::TransitionError;
use crate::record::DetectionStatus;

/// Checks a status change. `current` is `None` for a record being created.
pub fn validate_transition(
    new: DetectionStatus,
    current: Option<DetectionStatus>,
) -> Result<(), TransitionError> {
    use DetectionStatus::*;

    match (current, new) {
        (None, Published) => Err(TransitionError::PublishedOnCreate),
        (None, _) => Ok(()),

        (Some(Pending), Published) => Err(TransitionError::PublishWithoutConfirmation { from: Pending }),
        (Some(Pending), _) => Ok(()),

        (Some(Confirmed), Confirmed | Published) => Ok(()),
        (Some(Confirmed), to) => Err(TransitionError::IrreversibleConfirmation {
            from: Confirmed,
            to,
        }),

        (Some(Cleared), Cleared) => Ok(()),
        (Some(Cleared), _) => Err(TransitionError::ClearedIsTerminal),

        (Some(Published), Published) => Ok(()),
        (Some(Published), _) => Err(TransitionError::PublishedIsTerminal),
    }
}

/// Boolean form of [`validate_transition`].
pub fn is_transition_allowed(new: DetectionStatus, current: Option<DetectionStatus>) -> bool {
    validate_transition(new, current).is_ok()
}
