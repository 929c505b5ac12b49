//! File-backed evidence vault.
//!
//! One JSON file per record, named by a hash of the record id so that
//! arbitrary ids never reach the filesystem. Writes go to a temporary
//! file that is synced and renamed over the target, so a reader sees
//! either the previous or the new version of a record, never a torn one.
//! Writers to the same id are serialized by a fixed table of striped locks
//! keyed by the same hash, so lock memory stays bounded however many ids
//! are touched.

use super::cipher::RecordCipher;
use super::error::VaultError;
use super::format::StoredRecord;
use super::integrity::HashAlgorithm;
use super::key::KeyProvider;
use crate::record::{DetectionRecord, DetectionStatus, SyncStatus};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "json";

/// Number of lock stripes. Ids hashing to the same stripe share a lock.
const LOCK_STRIPES: usize = 64;

/// Id given to listing placeholders for directory entries that could not
/// be read at all.
const UNREADABLE_ENTRY_ID: &str = "<unreadable entry>";

/// Scores strictly above this count as high risk in statistics.
const HIGH_RISK_SCORE: u8 = 70;

/// A record that could not be read back intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptedRecord {
    /// Record id, or the file stem if the file could not be parsed at all.
    pub id: String,
    /// Creation time from the clear-text metadata, when it could be parsed.
    pub timestamp_ms: Option<i64>,
    /// Status from the clear-text metadata, when it could be parsed.
    pub status: Option<DetectionStatus>,
    /// Why the record could not be read.
    pub reason: String,
}

/// One entry of a vault listing.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEntry {
    /// Decrypted and verified record.
    Intact(DetectionRecord),
    /// Placeholder for a record that failed decryption or verification.
    Corrupted(CorruptedRecord),
}

impl RecordEntry {
    /// Record id, or a file stem for unparseable files.
    pub fn id(&self) -> &str {
        match self {
            RecordEntry::Intact(r) => &r.id,
            RecordEntry::Corrupted(c) => &c.id,
        }
    }

    fn sort_key(&self) -> i64 {
        match self {
            RecordEntry::Intact(r) => r.timestamp_ms(),
            RecordEntry::Corrupted(c) => c.timestamp_ms.unwrap_or(i64::MIN),
        }
    }

    /// The record, if it was read intact.
    pub fn as_intact(&self) -> Option<&DetectionRecord> {
        match self {
            RecordEntry::Intact(r) => Some(r),
            RecordEntry::Corrupted(_) => None,
        }
    }

    /// Whether this entry is a placeholder.
    pub fn is_corrupted(&self) -> bool {
        matches!(self, RecordEntry::Corrupted(_))
    }
}

/// Aggregate counts over the vault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultStats {
    /// Every listing entry, corrupted ones included.
    pub total: usize,
    /// Intact records scoring above 70.
    pub high_risk: usize,
    /// Confirmed or published.
    pub confirmed: usize,
    /// Intact records waiting for upload or retry.
    pub pending_sync: usize,
    /// Placeholders.
    pub corrupted: usize,
}

/// Encrypted record store rooted at a directory.
pub struct EvidenceVault {
    dir: PathBuf,
    cipher: RecordCipher,
    hash_algorithm: HashAlgorithm,
    locks: Box<[Mutex<()>]>,
}

impl EvidenceVault {
    /// Opens (creating if needed) a vault directory using the provided key.
    pub fn open(
        dir: impl Into<PathBuf>,
        keys: &dyn KeyProvider,
        hash_algorithm: HashAlgorithm,
    ) -> Result<Self, VaultError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let key = keys.load_or_generate()?;
        let cipher = RecordCipher::new(&key);

        tracing::info!(
            dir = %dir.display(),
            key = %cipher.fingerprint(),
            "Evidence vault opened"
        );

        Ok(Self {
            dir,
            cipher,
            hash_algorithm,
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    /// Directory holding the record files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores a new record. Fails if the id is already present.
    ///
    /// The sync status is reset to pending regardless of the caller's value.
    pub fn insert(&self, mut record: DetectionRecord) -> Result<(), VaultError> {
        let _guard = self.lock_for(&record.id).lock();

        let path = self.path_for(&record.id);
        if path.exists() {
            return Err(VaultError::AlreadyExists(record.id));
        }

        record.sync_status = SyncStatus::Pending;
        self.write(&path, &record)?;

        tracing::info!(
            id = %record.id,
            status = %record.status,
            risk_score = record.analysis.risk_score,
            "Record stored"
        );
        Ok(())
    }

    /// Reads and decrypts a single record.
    pub fn get(&self, id: &str) -> Result<DetectionRecord, VaultError> {
        self.read(&self.path_for(id), id)
    }

    /// Read-modify-write of one record under its lock.
    ///
    /// `apply` sees the persisted state, not a cached copy. If it returns an
    /// error nothing is written. If it changes the record content, the sync
    /// status is reset to pending.
    pub fn update<F, E>(&self, id: &str, apply: F) -> Result<DetectionRecord, E>
    where
        F: FnOnce(&mut DetectionRecord) -> Result<(), E>,
        E: From<VaultError>,
    {
        let _guard = self.lock_for(id).lock();

        let path = self.path_for(id);
        let current = self.read(&path, id)?;
        let mut updated = current.clone();
        apply(&mut updated)?;

        // Identity and creation time are fixed.
        updated.id = current.id.clone();
        updated.timestamp = current.timestamp;

        updated.sync_status = if content_changed(&current, &updated) {
            SyncStatus::Pending
        } else {
            current.sync_status
        };

        self.write(&path, &updated)?;
        Ok(updated)
    }

    /// Records the outcome of an upload attempt without touching content.
    pub fn set_sync_status(&self, id: &str, sync_status: SyncStatus) -> Result<(), VaultError> {
        let _guard = self.lock_for(id).lock();

        let path = self.path_for(id);
        let mut record = self.read(&path, id)?;
        if record.sync_status != sync_status {
            record.sync_status = sync_status;
            self.write(&path, &record)?;
        }
        Ok(())
    }

    /// Records an upload outcome for the version of the record that was sent.
    ///
    /// If the record was modified after `sent` was read, the outcome no longer
    /// describes what is on disk; it stays pending and `false` is returned.
    pub fn settle_sync(
        &self,
        sent: &DetectionRecord,
        outcome: SyncStatus,
    ) -> Result<bool, VaultError> {
        let _guard = self.lock_for(&sent.id).lock();

        let path = self.path_for(&sent.id);
        let mut current = self.read(&path, &sent.id)?;
        if content_changed(sent, &current) {
            tracing::debug!(id = %sent.id, "Record changed during upload, left queued");
            return Ok(false);
        }
        if current.sync_status != outcome {
            current.sync_status = outcome;
            self.write(&path, &current)?;
        }
        Ok(true)
    }

    /// Lists every record, most recent first.
    ///
    /// Records that fail to parse, verify or decrypt are returned as
    /// [`RecordEntry::Corrupted`] placeholders; they never abort the listing.
    pub fn list(&self) -> Result<Vec<RecordEntry>, VaultError> {
        let mut entries = Vec::new();

        for dir_entry in fs::read_dir(&self.dir)? {
            let path = match dir_entry {
                Ok(dir_entry) => dir_entry.path(),
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Unreadable directory entry");
                    entries.push(unreadable_entry(&e));
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            entries.push(self.read_entry(&path));
        }

        entries.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        Ok(entries)
    }

    /// Intact records whose sync status is pending or failed, oldest first.
    pub fn sync_queue(&self) -> Result<Vec<DetectionRecord>, VaultError> {
        let mut queue: Vec<_> = self
            .list()?
            .into_iter()
            .filter_map(|entry| match entry {
                RecordEntry::Intact(r) if r.sync_status.is_queued() => Some(r),
                _ => None,
            })
            .collect();
        queue.reverse();
        Ok(queue)
    }

    /// Aggregate counts for dashboards and metrics.
    pub fn stats(&self) -> Result<VaultStats, VaultError> {
        let mut stats = VaultStats::default();
        for entry in self.list()? {
            stats.total += 1;
            match entry {
                RecordEntry::Intact(r) => {
                    if r.analysis.risk_score > HIGH_RISK_SCORE {
                        stats.high_risk += 1;
                    }
                    if r.status.is_disclosable() {
                        stats.confirmed += 1;
                    }
                    if r.sync_status.is_queued() {
                        stats.pending_sync += 1;
                    }
                }
                RecordEntry::Corrupted(_) => stats.corrupted += 1,
            }
        }
        Ok(stats)
    }

    fn read_entry(&self, path: &Path) -> RecordEntry {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let stored = match fs::read(path)
            .map_err(VaultError::from)
            .and_then(|bytes| serde_json::from_slice::<StoredRecord>(&bytes).map_err(VaultError::from))
        {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(file = %stem, error = %e, "Unreadable record file");
                return RecordEntry::Corrupted(CorruptedRecord {
                    id: stem,
                    timestamp_ms: None,
                    status: None,
                    reason: e.to_string(),
                });
            }
        };

        let (id, timestamp_ms, status) = (stored.id.clone(), stored.timestamp, stored.status);
        match stored.open(&self.cipher) {
            Ok(record) => RecordEntry::Intact(record),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Record failed verification");
                RecordEntry::Corrupted(CorruptedRecord {
                    id,
                    timestamp_ms: Some(timestamp_ms),
                    status: Some(status),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn read(&self, path: &Path, id: &str) -> Result<DetectionRecord, VaultError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredRecord = serde_json::from_slice(&bytes)?;
        if stored.id != id {
            return Err(VaultError::Malformed {
                id: id.to_string(),
                reason: format!("file holds record {}", stored.id),
            });
        }
        stored.open(&self.cipher)
    }

    fn write(&self, path: &Path, record: &DetectionRecord) -> Result<(), VaultError> {
        let stored = StoredRecord::seal(record, &self.cipher, self.hash_algorithm)?;
        let bytes = serde_json::to_vec(&stored)?;

        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        let result = (|| -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        let name = blake3::hash(id.as_bytes()).to_hex();
        self.dir.join(format!("{}.{RECORD_EXTENSION}", &name[..32]))
    }

    fn lock_for(&self, id: &str) -> &Mutex<()> {
        let hash = blake3::hash(id.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        &self.locks[(u64::from_le_bytes(prefix) % self.locks.len() as u64) as usize]
    }
}

impl std::fmt::Debug for EvidenceVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceVault")
            .field("dir", &self.dir)
            .field("cipher", &self.cipher)
            .field("hash_algorithm", &self.hash_algorithm)
            .finish_non_exhaustive()
    }
}

fn unreadable_entry(error: &std::io::Error) -> RecordEntry {
    RecordEntry::Corrupted(CorruptedRecord {
        id: UNREADABLE_ENTRY_ID.to_string(),
        timestamp_ms: None,
        status: None,
        reason: error.to_string(),
    })
}

fn content_changed(before: &DetectionRecord, after: &DetectionRecord) -> bool {
    before.status != after.status
        || before.notes != after.notes
        || before.device_type != after.device_type
        || before.image_data != after.image_data
        || before.location != after.location
        || before.analysis != after.analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskEngine;
    use crate::scan::{CaptureResult, Environment, InspectionChecklist};
    use crate::vault::{integrity_hash, EncryptionKey, StaticKeyProvider, KEY_LEN};
    use std::sync::Arc;

    fn open_vault(dir: &Path) -> EvidenceVault {
        let keys = StaticKeyProvider::new(EncryptionKey::from_bytes([1u8; KEY_LEN]));
        EvidenceVault::open(dir, &keys, HashAlgorithm::Sha256).unwrap()
    }

    fn record_at(offset_ms: i64, score_flags: bool) -> DetectionRecord {
        let checklist = InspectionChecklist {
            hidden_camera: score_flags,
            loose_parts: score_flags,
            ..Default::default()
        };
        let analysis = RiskEngine::default().score(checklist, vec![], Environment::Atm);
        let mut record = DetectionRecord::new(CaptureResult::new("img"), analysis);
        record.timestamp = record.timestamp + chrono::Duration::milliseconds(offset_ms);
        record
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());

        let mut record = record_at(0, true);
        record.sync_status = SyncStatus::Synced;
        vault.insert(record.clone()).unwrap();

        let loaded = vault.get(&record.id).unwrap();
        assert_eq!(loaded.analysis, record.analysis);
        // Caller-supplied sync status is never trusted.
        assert_eq!(loaded.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());
        let record = record_at(0, false);

        vault.insert(record.clone()).unwrap();
        assert!(matches!(
            vault.insert(record),
            Err(VaultError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());
        assert!(matches!(vault.get("nope"), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_list_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());

        let old = record_at(-10_000, false);
        let new = record_at(0, false);
        vault.insert(old.clone()).unwrap();
        vault.insert(new.clone()).unwrap();

        let ids: Vec<_> = vault.list().unwrap().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[test]
    fn test_corrupted_record_does_not_abort_listing() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());

        let good = record_at(0, false);
        let bad = record_at(-1, false);
        vault.insert(good.clone()).unwrap();
        vault.insert(bad.clone()).unwrap();

        // Flip a byte inside the ciphertext of the second record.
        let path = vault.path_for(&bad.id);
        let mut stored: StoredRecord =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let payload = stored.encrypted_payload.take().unwrap();
        let mut chars: Vec<char> = payload.chars().collect();
        chars[4] = if chars[4] == 'A' { 'B' } else { 'A' };
        stored.encrypted_payload = Some(chars.into_iter().collect());
        fs::write(&path, serde_json::to_vec(&stored).unwrap()).unwrap();

        // And drop a garbage file alongside.
        fs::write(dir.path().join("garbage.json"), b"{not json").unwrap();

        let entries = vault.list().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.iter().filter(|e| e.is_corrupted()).count(), 2);
        assert!(entries
            .iter()
            .any(|e| e.as_intact().map(|r| r.id == good.id).unwrap_or(false)));

        assert!(matches!(vault.get(&bad.id), Err(VaultError::Decryption { .. })));
    }

    #[test]
    fn test_metadata_edit_with_recomputed_hash_marks_record_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());
        let record = record_at(0, true).with_status(DetectionStatus::Confirmed);
        vault.insert(record.clone()).unwrap();

        // Downgrade the clear-text status and forge a matching hash.
        let path = vault.path_for(&record.id);
        let mut stored: StoredRecord =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        stored.status = DetectionStatus::Pending;
        stored.integrity_hash = Some(integrity_hash(
            HashAlgorithm::Sha256,
            &stored.id,
            stored.timestamp,
            stored.status,
        ));
        fs::write(&path, serde_json::to_vec(&stored).unwrap()).unwrap();

        let entries = vault.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_corrupted());
        assert!(matches!(vault.get(&record.id), Err(VaultError::Decryption { .. })));
        assert!(vault
            .update::<_, VaultError>(&record.id, |r| {
                r.status = DetectionStatus::Cleared;
                Ok(())
            })
            .is_err());
    }

    #[test]
    fn test_unreadable_directory_entry_becomes_placeholder() {
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let entry = unreadable_entry(&error);
        assert!(entry.is_corrupted());
        assert_eq!(entry.id(), UNREADABLE_ENTRY_ID);
        assert_eq!(entry.sort_key(), i64::MIN);
    }

    #[test]
    fn test_unreadable_file_does_not_abort_listing() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());
        let good = record_at(0, false);
        vault.insert(good.clone()).unwrap();

        // A directory with a record extension cannot be read as a file.
        fs::create_dir(dir.path().join("stray.json")).unwrap();

        let entries = vault.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), good.id);
        assert!(entries[1].is_corrupted());
        assert_eq!(vault.stats().unwrap().corrupted, 1);
    }

    #[test]
    fn test_lock_table_does_not_grow_with_ids() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());

        for i in 0..1000 {
            let id = format!("missing-{i}");
            assert!(matches!(vault.get(&id), Err(VaultError::NotFound(_))));
            assert!(vault
                .update::<_, VaultError>(&id, |_| Ok(()))
                .is_err());
        }
        assert_eq!(vault.locks.len(), LOCK_STRIPES);
        assert!(std::ptr::eq(vault.lock_for("same-id"), vault.lock_for("same-id")));
    }

    #[test]
    fn test_update_resets_sync_only_on_content_change() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());
        let record = record_at(0, false);
        vault.insert(record.clone()).unwrap();

        vault.set_sync_status(&record.id, SyncStatus::Synced).unwrap();

        let unchanged = vault
            .update::<_, VaultError>(&record.id, |_| Ok(()))
            .unwrap();
        assert_eq!(unchanged.sync_status, SyncStatus::Synced);

        let changed = vault
            .update::<_, VaultError>(&record.id, |r| {
                r.notes = Some("second look".into());
                Ok(())
            })
            .unwrap();
        assert_eq!(changed.sync_status, SyncStatus::Pending);
        assert_eq!(vault.get(&record.id).unwrap().notes.as_deref(), Some("second look"));
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());
        let record = record_at(0, false);
        vault.insert(record.clone()).unwrap();

        let result = vault.update::<_, VaultError>(&record.id, |r| {
            r.status = DetectionStatus::Confirmed;
            Err(VaultError::NotFound("forced".into()))
        });
        assert!(result.is_err());
        assert_eq!(vault.get(&record.id).unwrap().status, DetectionStatus::Pending);
    }

    #[test]
    fn test_settle_sync_skips_modified_record() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());
        let record = record_at(0, false);
        vault.insert(record.clone()).unwrap();

        let sent = vault.get(&record.id).unwrap();
        vault
            .update::<_, VaultError>(&record.id, |r| {
                r.notes = Some("edited mid-upload".into());
                Ok(())
            })
            .unwrap();

        assert!(!vault.settle_sync(&sent, SyncStatus::Synced).unwrap());
        assert_eq!(vault.get(&record.id).unwrap().sync_status, SyncStatus::Pending);

        let fresh = vault.get(&record.id).unwrap();
        assert!(vault.settle_sync(&fresh, SyncStatus::Synced).unwrap());
        assert_eq!(vault.get(&record.id).unwrap().sync_status, SyncStatus::Synced);
    }

    #[test]
    fn test_stats_counts() {
        let dir = tempfile::tempdir().unwrap();
        let vault = open_vault(dir.path());

        // loose parts + hidden camera = 80 -> high risk
        let risky = record_at(0, true);
        let calm = record_at(-5, false).with_status(DetectionStatus::Confirmed);
        vault.insert(risky.clone()).unwrap();
        vault.insert(calm).unwrap();
        vault.set_sync_status(&risky.id, SyncStatus::Synced).unwrap();

        let stats = vault.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.high_risk, 1);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.pending_sync, 1);
        assert_eq!(stats.corrupted, 0);
    }

    #[test]
    fn test_reopen_with_other_key_marks_records_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        {
            let vault = open_vault(dir.path());
            vault.insert(record_at(0, false)).unwrap();
        }

        let keys = StaticKeyProvider::new(EncryptionKey::from_bytes([2u8; KEY_LEN]));
        let vault = EvidenceVault::open(dir.path(), &keys, HashAlgorithm::Sha256).unwrap();
        let entries = vault.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_corrupted());
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(open_vault(dir.path()));
        let record = record_at(0, false);
        vault.insert(record.clone()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let vault = Arc::clone(&vault);
                let id = record.id.clone();
                std::thread::spawn(move || {
                    vault
                        .update::<_, VaultError>(&id, |r| {
                            let mut notes = r.notes.clone().unwrap_or_default();
                            notes.push_str(&i.to_string());
                            r.notes = Some(notes);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // No lost updates: every writer's digit survived.
        let notes = vault.get(&record.id).unwrap().notes.unwrap();
        assert_eq!(notes.len(), 8);
    }
}
