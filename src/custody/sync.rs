//! Best-effort upload of disclosable records.
//!
//! Recording evidence never waits on the network. Records queue up locally
//! and a drain pass pushes whatever is authorized through a transport.

use super::disclosure::DisclosedRecord;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upload failures. All of them leave the record queued for the next drain.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Writing to the destination failed.
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The disclosure could not be encoded.
    #[error("disclosure serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The destination refused the record.
    #[error("upload rejected: {0}")]
    Rejected(String),
}

/// Destination for disclosed records.
pub trait SyncTransport {
    /// Delivers one record. Must be idempotent per record id.
    fn upload(&self, record: &DisclosedRecord) -> Result<(), SyncError>;
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records delivered and marked synced.
    pub uploaded: usize,
    /// Records whose upload failed; retried next pass.
    pub failed: usize,
    /// Queued but not authorized for export.
    pub withheld: usize,
    /// Uploaded, but modified meanwhile, so still queued.
    pub superseded: usize,
}

impl SyncReport {
    /// Uploads tried, successful or not.
    pub fn attempted(&self) -> usize {
        self.uploaded + self.failed + self.superseded
    }
}

/// Writes disclosures as JSON files into a local outbox directory.
///
/// An external courier (or a removable drive) picks them up from there.
/// Re-uploading a record overwrites its previous file.
#[derive(Debug, Clone)]
pub struct OutboxTransport {
    dir: PathBuf,
}

impl OutboxTransport {
    /// Outbox rooted at `dir`, created if missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The outbox directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        let name = blake3::hash(id.as_bytes()).to_hex();
        self.dir.join(format!("disclosure-{}.json", &name[..32]))
    }
}

impl SyncTransport for OutboxTransport {
    fn upload(&self, record: &DisclosedRecord) -> Result<(), SyncError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        let path = self.path_for(&record.id);
        let tmp = path.with_extension("json.tmp");

        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(id = %record.id, path = %path.display(), "Disclosure written to outbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::sanitize_for_disclosure;
    use crate::record::{DetectionRecord, DetectionStatus};
    use crate::risk::RiskEngine;
    use crate::scan::{CaptureResult, Environment, InspectionChecklist};

    #[test]
    fn test_outbox_writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxTransport::new(dir.path().join("outbox")).unwrap();

        let analysis =
            RiskEngine::default().score(InspectionChecklist::default(), vec![], Environment::Atm);
        let record = DetectionRecord::new(CaptureResult::new("img"), analysis)
            .with_status(DetectionStatus::Confirmed);
        let disclosed = sanitize_for_disclosure(&record);

        outbox.upload(&disclosed).unwrap();
        outbox.upload(&disclosed).unwrap();

        let files: Vec<_> = fs::read_dir(outbox.dir()).unwrap().collect();
        assert_eq!(files.len(), 1);

        let back: DisclosedRecord =
            serde_json::from_slice(&fs::read(outbox.path_for(&record.id)).unwrap()).unwrap();
        assert_eq!(back, disclosed);
    }
}
