//! Detection records and their lifecycle tags.

mod detection;
mod status;

pub use detection::DetectionRecord;
pub use status::{DetectionStatus, SyncStatus, UnknownStatus};
