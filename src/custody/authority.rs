//! The custody gate in front of the vault.

use super::disclosure::{authorize_export, sanitize_for_disclosure, DisclosedRecord};
use super::error::CustodyError;
use super::evidence::validate_submission;
use super::sync::{SyncReport, SyncTransport};
use super::transition::validate_transition;
use crate::record::{DetectionRecord, DetectionStatus, SyncStatus};
use crate::risk::ScoringWeights;
use crate::vault::{EvidenceVault, RecordEntry, VaultStats};

/// Validates, transitions and discloses records held in an [`EvidenceVault`].
///
/// All writes go through here. Status changes are checked against the
/// persisted status while the record is locked, so two concurrent reviewers
/// cannot slip a downgrade past a confirmation.
#[derive(Debug)]
pub struct CustodyAuthority {
    vault: EvidenceVault,
    suspicion_threshold: u8,
}

impl CustodyAuthority {
    /// Authority checking verdicts against the default suspicion threshold.
    pub fn new(vault: EvidenceVault) -> Self {
        Self {
            vault,
            suspicion_threshold: ScoringWeights::default().suspicion_threshold,
        }
    }

    /// Uses the threshold the engine scores with when checking verdicts.
    pub fn with_suspicion_threshold(mut self, threshold: u8) -> Self {
        self.suspicion_threshold = threshold;
        self
    }

    /// The underlying vault.
    pub fn vault(&self) -> &EvidenceVault {
        &self.vault
    }

    /// Validates and stores a new record, returning its id.
    ///
    /// On error nothing was stored.
    pub fn submit(&self, record: DetectionRecord) -> Result<String, CustodyError> {
        if let Err(e) = validate_submission(&record, self.suspicion_threshold) {
            tracing::warn!(id = %record.id, error = %e, "Submission rejected");
            return Err(e.into());
        }
        validate_transition(record.status, None)?;

        let id = record.id.clone();
        self.vault.insert(record)?;
        Ok(id)
    }

    /// Moves a record to `status`, optionally replacing its notes.
    pub fn update_status(
        &self,
        id: &str,
        status: DetectionStatus,
        notes: Option<String>,
    ) -> Result<DetectionRecord, CustodyError> {
        let updated = self.vault.update(id, |record| {
            if let Err(e) = validate_transition(status, Some(record.status)) {
                tracing::warn!(id, from = %record.status, to = %status, error = %e, "Transition rejected");
                return Err(CustodyError::from(e));
            }
            record.status = status;
            if let Some(notes) = notes {
                record.notes = Some(notes);
            }
            Ok(())
        })?;

        tracing::info!(id, status = %updated.status, "Status updated");
        Ok(updated)
    }

    /// Reads one record.
    pub fn get(&self, id: &str) -> Result<DetectionRecord, CustodyError> {
        Ok(self.vault.get(id)?)
    }

    /// All records, most recent first. Unreadable ones appear as placeholders.
    pub fn list_detections(&self) -> Result<Vec<RecordEntry>, CustodyError> {
        Ok(self.vault.list()?)
    }

    /// Only confirmed or published records may leave the device.
    pub fn authorize_export(&self, record: &DetectionRecord) -> bool {
        authorize_export(record)
    }

    /// Produces the shareable form of an authorized record.
    pub fn export(&self, id: &str) -> Result<DisclosedRecord, CustodyError> {
        let record = self.vault.get(id)?;
        if !authorize_export(&record) {
            tracing::warn!(id, status = %record.status, "Export denied");
            return Err(CustodyError::ExportDenied {
                id: record.id,
                status: record.status,
            });
        }
        Ok(sanitize_for_disclosure(&record))
    }

    /// Aggregate counts over the vault.
    pub fn stats(&self) -> Result<VaultStats, CustodyError> {
        Ok(self.vault.stats()?)
    }

    /// Pushes queued, authorized records through `transport`.
    ///
    /// Upload failures are recorded per record and do not stop the pass.
    /// Records that are not authorized for export stay queued untouched.
    pub fn drain_sync_queue(&self, transport: &dyn SyncTransport) -> Result<SyncReport, CustodyError> {
        let mut report = SyncReport::default();

        for record in self.vault.sync_queue()? {
            if !authorize_export(&record) {
                report.withheld += 1;
                continue;
            }

            let outcome = match transport.upload(&sanitize_for_disclosure(&record)) {
                Ok(()) => SyncStatus::Synced,
                Err(e) => {
                    tracing::warn!(id = %record.id, error = %e, "Upload failed");
                    SyncStatus::Failed
                }
            };

            let settled = self.vault.settle_sync(&record, outcome)?;
            match (settled, outcome) {
                (false, _) => report.superseded += 1,
                (true, SyncStatus::Synced) => report.uploaded += 1,
                (true, _) => report.failed += 1,
            }
        }

        tracing::info!(
            uploaded = report.uploaded,
            failed = report.failed,
            withheld = report.withheld,
            superseded = report.superseded,
            "Sync queue drained"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::{DisclosedRecord, SyncError, TransitionError, ValidationError};
    use crate::risk::RiskEngine;
    use crate::scan::{CaptureResult, Environment, InspectionChecklist};
    use crate::vault::{EncryptionKey, HashAlgorithm, StaticKeyProvider, KEY_LEN};
    use parking_lot::Mutex;
    use tempfile::TempDir;

    fn authority() -> (TempDir, CustodyAuthority) {
        let dir = tempfile::tempdir().unwrap();
        let keys = StaticKeyProvider::new(EncryptionKey::from_bytes([9u8; KEY_LEN]));
        let vault = EvidenceVault::open(dir.path(), &keys, HashAlgorithm::Sha256).unwrap();
        (dir, CustodyAuthority::new(vault))
    }

    fn suspicious_record(image: &str) -> DetectionRecord {
        let checklist = InspectionChecklist {
            hidden_camera: true,
            ..Default::default()
        };
        let analysis = RiskEngine::default().score(checklist, vec![], Environment::Atm);
        DetectionRecord::new(CaptureResult::new(image), analysis)
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<DisclosedRecord>>,
        fail: bool,
    }

    impl SyncTransport for RecordingTransport {
        fn upload(&self, record: &DisclosedRecord) -> Result<(), SyncError> {
            if self.fail {
                return Err(SyncError::Rejected("offline".into()));
            }
            self.sent.lock().push(record.clone());
            Ok(())
        }
    }

    #[test]
    fn test_submit_rejects_missing_image() {
        let (_dir, authority) = authority();
        let err = authority.submit(suspicious_record("")).unwrap_err();
        assert!(matches!(
            err,
            CustodyError::Validation(ValidationError::MissingImageEvidence)
        ));
        assert!(authority.list_detections().unwrap().is_empty());
    }

    #[test]
    fn test_submit_rejects_verdict_that_skips_image_requirement() {
        let (_dir, authority) = authority();
        let mut record = suspicious_record("");
        record.analysis.risk_score = 80;
        record.analysis.is_suspicious = false;
        assert!(matches!(
            authority.submit(record),
            Err(CustodyError::Validation(ValidationError::InconsistentVerdict { .. }))
        ));
        assert!(authority.list_detections().unwrap().is_empty());
    }

    #[test]
    fn test_submit_uses_configured_threshold() {
        let (_dir, authority) = authority();
        let authority = authority.with_suspicion_threshold(60);
        // Scores 50: clear under a threshold of 60, so no image is needed.
        let mut record = suspicious_record("");
        record.analysis.is_suspicious = false;
        assert!(authority.submit(record).is_ok());

        let flagged = suspicious_record("");
        assert!(matches!(
            authority.submit(flagged),
            Err(CustodyError::Validation(ValidationError::InconsistentVerdict { .. }))
        ));
    }

    #[test]
    fn test_submit_rejects_published() {
        let (_dir, authority) = authority();
        let record = suspicious_record("img").with_status(DetectionStatus::Published);
        assert!(matches!(
            authority.submit(record),
            Err(CustodyError::Validation(ValidationError::PublishedOnCreate))
        ));
    }

    #[test]
    fn test_confirmed_cannot_revert_but_can_publish() {
        let (_dir, authority) = authority();
        let id = authority
            .submit(suspicious_record("img").with_status(DetectionStatus::Confirmed))
            .unwrap();

        let err = authority
            .update_status(&id, DetectionStatus::Pending, None)
            .unwrap_err();
        assert!(matches!(
            err,
            CustodyError::Transition(TransitionError::IrreversibleConfirmation { .. })
        ));
        assert_eq!(authority.get(&id).unwrap().status, DetectionStatus::Confirmed);

        let published = authority
            .update_status(&id, DetectionStatus::Published, Some("sent to bank".into()))
            .unwrap();
        assert_eq!(published.status, DetectionStatus::Published);
        assert_eq!(published.notes.as_deref(), Some("sent to bank"));
    }

    #[test]
    fn test_update_missing_record() {
        let (_dir, authority) = authority();
        assert!(matches!(
            authority.update_status("ghost", DetectionStatus::Confirmed, None),
            Err(CustodyError::NotFound(_))
        ));
    }

    #[test]
    fn test_notes_kept_when_not_supplied() {
        let (_dir, authority) = authority();
        let id = authority
            .submit(suspicious_record("img").with_notes("first"))
            .unwrap();
        let updated = authority
            .update_status(&id, DetectionStatus::Cleared, None)
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("first"));
    }

    #[test]
    fn test_export_gate() {
        let (_dir, authority) = authority();
        let pending = authority.submit(suspicious_record("img")).unwrap();
        let confirmed = authority
            .submit(suspicious_record("img").with_status(DetectionStatus::Confirmed))
            .unwrap();

        assert!(matches!(
            authority.export(&pending),
            Err(CustodyError::ExportDenied { .. })
        ));
        assert_eq!(authority.export(&confirmed).unwrap().id, confirmed);
    }

    #[test]
    fn test_drain_uploads_only_authorized() {
        let (_dir, authority) = authority();
        authority.submit(suspicious_record("img")).unwrap();
        let confirmed = authority
            .submit(suspicious_record("img").with_status(DetectionStatus::Confirmed))
            .unwrap();

        let transport = RecordingTransport::default();
        let report = authority.drain_sync_queue(&transport).unwrap();
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.withheld, 1);
        assert_eq!(transport.sent.lock()[0].id, confirmed);
        assert_eq!(
            authority.get(&confirmed).unwrap().sync_status,
            SyncStatus::Synced
        );

        // Synced records are not sent again.
        let again = authority.drain_sync_queue(&transport).unwrap();
        assert_eq!(again.uploaded, 0);
        assert_eq!(again.withheld, 1);
    }

    #[test]
    fn test_failed_upload_marks_failed_and_retries() {
        let (_dir, authority) = authority();
        let id = authority
            .submit(suspicious_record("img").with_status(DetectionStatus::Confirmed))
            .unwrap();

        let offline = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let report = authority.drain_sync_queue(&offline).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(authority.get(&id).unwrap().sync_status, SyncStatus::Failed);
        assert_eq!(authority.stats().unwrap().pending_sync, 1);

        let online = RecordingTransport::default();
        assert_eq!(authority.drain_sync_queue(&online).unwrap().uploaded, 1);
    }

    #[test]
    fn test_status_change_requeues_synced_record() {
        let (_dir, authority) = authority();
        let id = authority
            .submit(suspicious_record("img").with_status(DetectionStatus::Confirmed))
            .unwrap();
        authority
            .drain_sync_queue(&RecordingTransport::default())
            .unwrap();

        let updated = authority
            .update_status(&id, DetectionStatus::Published, None)
            .unwrap();
        assert_eq!(updated.sync_status, SyncStatus::Pending);
    }
}
