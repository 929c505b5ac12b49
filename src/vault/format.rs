//! On-disk record layout.
//!
//! Encrypted records keep only listing metadata in the clear:
//!
//! ```json
//! { "id", "timestamp", "status", "syncStatus", "isEncrypted": true,
//!   "encryptedPayload", "iv", "keyFingerprint", "integrityHash", "hashAlgorithm" }
//! ```
//!
//! Legacy records have no `isEncrypted` marker and carry the full record
//! in plaintext, with wireless logs in the older flat device-log shape.

use super::cipher::{RecordCipher, SealedBytes, NONCE_LEN};
use super::error::VaultError;
use super::integrity::{integrity_hash, metadata_binding, HashAlgorithm};
use crate::classify::{Classification, ClassifiedEmitter, RiskTier};
use crate::record::{DetectionRecord, DetectionStatus, SyncStatus};
use crate::risk::AnalysisResult;
use crate::scan::{EmitterObservation, Environment, GeoLocation, InspectionChecklist};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serialized form of a record file.
///
/// Encrypted records authenticate `id:timestamp:status` as associated data,
/// so the clear-text listing fields cannot be edited without the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Record id.
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Custody status, bound by the hash and AEAD.
    pub status: DetectionStatus,
    /// Upload state. Not authenticated; only drives retries.
    #[serde(default)]
    pub sync_status: SyncStatus,

    /// False for records written before encryption.
    #[serde(default)]
    pub is_encrypted: bool,
    /// Base64 ciphertext of the sealed payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_payload: Option<String>,
    /// Base64 nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    /// Fingerprint of the sealing key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_fingerprint: Option<String>,
    /// Hex digest over id, timestamp and status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_hash: Option<String>,
    /// Digest used for `integrity_hash`.
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,

    // Legacy plaintext fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analysis: Option<LegacyAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<GeoLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device_type: Option<String>,
}

/// The encrypted part of a record.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealedPayload {
    analysis: AnalysisResult,
    image_data: String,
    #[serde(default)]
    location: Option<GeoLocation>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    device_type: Option<String>,
}

impl StoredRecord {
    /// Encrypts a record for storage.
    pub fn seal(
        record: &DetectionRecord,
        cipher: &RecordCipher,
        algorithm: HashAlgorithm,
    ) -> Result<Self, VaultError> {
        let payload = SealedPayload {
            analysis: record.analysis.clone(),
            image_data: record.image_data.clone(),
            location: record.location,
            notes: record.notes.clone(),
            device_type: record.device_type.clone(),
        };
        let plaintext = serde_json::to_vec(&payload)?;
        let timestamp = record.timestamp_ms();
        let aad = metadata_binding(&record.id, timestamp, record.status);
        let sealed = cipher.seal(&plaintext, aad.as_bytes())?;

        Ok(Self {
            id: record.id.clone(),
            timestamp,
            status: record.status,
            sync_status: record.sync_status,
            is_encrypted: true,
            encrypted_payload: Some(BASE64.encode(&sealed.ciphertext)),
            iv: Some(BASE64.encode(sealed.iv)),
            key_fingerprint: Some(cipher.fingerprint().to_string()),
            integrity_hash: Some(integrity_hash(algorithm, &record.id, timestamp, record.status)),
            hash_algorithm: algorithm,
            analysis: None,
            image_data: None,
            location: None,
            notes: None,
            device_type: None,
        })
    }

    /// Verifies and decrypts a stored record.
    pub fn open(self, cipher: &RecordCipher) -> Result<DetectionRecord, VaultError> {
        self.verify_integrity()?;
        let timestamp = self.parse_timestamp()?;

        if !self.is_encrypted {
            return self.open_legacy(timestamp);
        }

        if let Some(fingerprint) = &self.key_fingerprint {
            if fingerprint != cipher.fingerprint() {
                return Err(VaultError::Decryption {
                    id: self.id.clone(),
                    reason: format!(
                        "sealed under key {fingerprint}, vault key is {}",
                        cipher.fingerprint()
                    ),
                });
            }
        }

        let (Some(payload), Some(iv)) = (&self.encrypted_payload, &self.iv) else {
            return Err(self.malformed("encrypted record without payload or iv"));
        };
        let ciphertext = BASE64
            .decode(payload)
            .map_err(|e| self.malformed(format!("payload is not base64: {e}")))?;
        let iv: [u8; NONCE_LEN] = BASE64
            .decode(iv)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| self.malformed("iv is not a 12-byte base64 value"))?;

        let aad = metadata_binding(&self.id, self.timestamp, self.status);
        let plaintext = cipher.open(&SealedBytes { iv, ciphertext }, aad.as_bytes(), &self.id)?;
        let payload: SealedPayload =
            serde_json::from_slice(&plaintext).map_err(|e| VaultError::Decryption {
                id: self.id.clone(),
                reason: format!("decrypted payload unreadable: {e}"),
            })?;

        Ok(DetectionRecord {
            id: self.id,
            timestamp,
            image_data: payload.image_data,
            location: payload.location,
            analysis: payload.analysis,
            status: self.status,
            sync_status: self.sync_status,
            notes: payload.notes,
            device_type: payload.device_type,
        })
    }

    fn open_legacy(self, timestamp: DateTime<Utc>) -> Result<DetectionRecord, VaultError> {
        let Some(analysis) = self.analysis else {
            return Err(VaultError::Malformed {
                id: self.id,
                reason: "legacy record without analysis".to_string(),
            });
        };
        tracing::debug!(id = %self.id, "Read legacy unencrypted record");

        Ok(DetectionRecord {
            id: self.id,
            timestamp,
            image_data: self.image_data.unwrap_or_default(),
            location: self.location,
            analysis: analysis.into_analysis(),
            status: self.status,
            sync_status: self.sync_status,
            notes: self.notes,
            device_type: self.device_type,
        })
    }

    fn verify_integrity(&self) -> Result<(), VaultError> {
        match &self.integrity_hash {
            Some(stored) => {
                let expected =
                    integrity_hash(self.hash_algorithm, &self.id, self.timestamp, self.status);
                if *stored != expected {
                    return Err(VaultError::Integrity {
                        id: self.id.clone(),
                    });
                }
                Ok(())
            }
            // Encrypted records are always written with a hash.
            None if self.is_encrypted => Err(VaultError::Integrity {
                id: self.id.clone(),
            }),
            None => Ok(()),
        }
    }

    fn parse_timestamp(&self) -> Result<DateTime<Utc>, VaultError> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
            .ok_or_else(|| self.malformed(format!("timestamp {} out of range", self.timestamp)))
    }

    fn malformed(&self, reason: impl Into<String>) -> VaultError {
        VaultError::Malformed {
            id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

/// Analysis block as written by the plaintext format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAnalysis {
    is_suspicious: bool,
    risk_score: u8,
    checklist: InspectionChecklist,
    #[serde(default)]
    detected_devices: Vec<LegacyDeviceLog>,
    #[serde(default)]
    environment: Environment,
}

/// Flat device log of the plaintext format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDeviceLog {
    id: String,
    #[serde(default)]
    name: String,
    rssi: i32,
    #[serde(default)]
    threat_type: Option<String>,
    timestamp: i64,
    #[serde(default)]
    detection_method: Option<String>,
    #[serde(default)]
    matched_keyword: Option<String>,
}

impl LegacyAnalysis {
    fn into_analysis(self) -> AnalysisResult {
        AnalysisResult {
            checklist: self.checklist,
            detected_devices: self
                .detected_devices
                .into_iter()
                .map(LegacyDeviceLog::into_classified)
                .collect(),
            risk_score: self.risk_score,
            is_suspicious: self.is_suspicious,
            environment: self.environment,
        }
    }
}

impl LegacyDeviceLog {
    /// Maps the flat log onto a classification. The plaintext format kept no
    /// tier, so one is assigned per method.
    fn into_classified(self) -> ClassifiedEmitter {
        let classification = match (self.threat_type, self.detection_method.as_deref()) {
            (None, _) => Classification::Unverified,
            (Some(label), Some("REGEX") | Some("EXACT")) => Classification::Exact {
                label,
                tier: RiskTier::High,
            },
            (Some(label), Some("FUZZY")) => Classification::Fuzzy {
                label,
                tier: RiskTier::Med,
                keyword: self.matched_keyword.unwrap_or_default(),
                distance: 0,
            },
            (Some(label), Some("HEURISTIC")) => Classification::Heuristic {
                label,
                tier: RiskTier::Med,
            },
            (Some(label), _) => Classification::OperatorFlagged { label },
        };

        let timestamp = DateTime::<Utc>::from_timestamp_millis(self.timestamp).unwrap_or_default();
        ClassifiedEmitter::new(
            EmitterObservation {
                id: self.id,
                name: self.name,
                rssi: self.rssi,
                timestamp,
            },
            classification,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DetectionMethod;
    use crate::risk::RiskEngine;
    use crate::scan::CaptureResult;
    use crate::vault::{EncryptionKey, KEY_LEN};

    fn cipher() -> RecordCipher {
        RecordCipher::new(&EncryptionKey::from_bytes([3u8; KEY_LEN]))
    }

    fn record() -> DetectionRecord {
        let checklist = InspectionChecklist {
            hidden_camera: true,
            ..Default::default()
        };
        let analysis = RiskEngine::default().score(checklist, vec![], Environment::Atm);
        DetectionRecord::new(CaptureResult::new("data:image/jpeg;base64,/9j/"), analysis)
            .with_notes("reader wobbles")
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let c = cipher();
        let original = record();
        let stored = StoredRecord::seal(&original, &c, HashAlgorithm::Sha256).unwrap();

        assert!(stored.is_encrypted);
        let json = serde_json::to_string(&stored).unwrap();
        assert!(!json.contains("reader wobbles"));
        assert!(!json.contains("/9j/"));

        let reopened: StoredRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(reopened.open(&c).unwrap(), original);
    }

    #[test]
    fn test_status_tamper_detected() {
        let c = cipher();
        let mut stored = StoredRecord::seal(&record(), &c, HashAlgorithm::Blake3).unwrap();
        stored.status = DetectionStatus::Cleared;
        assert!(matches!(stored.open(&c), Err(VaultError::Integrity { .. })));
    }

    #[test]
    fn test_status_edit_with_recomputed_hash_detected() {
        let c = cipher();
        let original = record().with_status(DetectionStatus::Confirmed);
        let mut stored = StoredRecord::seal(&original, &c, HashAlgorithm::Sha256).unwrap();

        stored.status = DetectionStatus::Pending;
        stored.integrity_hash = Some(integrity_hash(
            HashAlgorithm::Sha256,
            &stored.id,
            stored.timestamp,
            stored.status,
        ));
        assert!(matches!(stored.open(&c), Err(VaultError::Decryption { .. })));
    }

    #[test]
    fn test_payload_swap_between_records_detected() {
        let c = cipher();
        let a = StoredRecord::seal(&record(), &c, HashAlgorithm::Sha256).unwrap();
        let mut b = StoredRecord::seal(&record(), &c, HashAlgorithm::Sha256).unwrap();
        b.encrypted_payload = a.encrypted_payload.clone();
        b.iv = a.iv.clone();
        assert!(matches!(b.open(&c), Err(VaultError::Decryption { .. })));
    }

    #[test]
    fn test_key_mismatch_reported() {
        let stored = StoredRecord::seal(&record(), &cipher(), HashAlgorithm::Sha256).unwrap();
        let other = RecordCipher::new(&EncryptionKey::from_bytes([4u8; KEY_LEN]));
        match stored.open(&other) {
            Err(VaultError::Decryption { reason, .. }) => assert!(reason.contains("sealed under key")),
            unexpected => panic!("expected decryption error, got {unexpected:?}"),
        }
    }

    #[test]
    fn test_legacy_record_readable() {
        let json = r#"{
            "id": "legacy-1",
            "timestamp": 1700000000000,
            "imageData": "data:image/jpeg;base64,AAAA",
            "analysis": {
                "isSuspicious": true,
                "riskScore": 75,
                "checklist": {
                    "looseParts": true, "mismatchedColors": false, "hiddenCamera": false,
                    "keypadObstruction": false, "bluetoothSignal": false
                },
                "detectedDevices": [
                    {"id": "d1", "name": "HC-05", "rssi": -45, "threatType": "Serial Bridge",
                     "timestamp": 1700000000000, "detectionMethod": "REGEX"},
                    {"id": "d2", "name": "Phone", "rssi": -70, "timestamp": 1700000000000}
                ],
                "environment": "FUEL_PUMP"
            },
            "status": "CONFIRMED",
            "syncStatus": "SYNCED",
            "notes": "found overlay"
        }"#;

        let stored: StoredRecord = serde_json::from_str(json).unwrap();
        assert!(!stored.is_encrypted);

        let record = stored.open(&cipher()).unwrap();
        assert_eq!(record.status, DetectionStatus::Confirmed);
        assert_eq!(record.analysis.risk_score, 75);
        assert_eq!(record.analysis.environment, Environment::FuelPump);
        assert_eq!(record.analysis.detected_devices[0].method(), DetectionMethod::Exact);
        assert!(!record.analysis.detected_devices[1].is_threat());
        assert_eq!(record.notes.as_deref(), Some("found overlay"));
    }

    #[test]
    fn test_encrypted_without_payload_is_malformed() {
        let c = cipher();
        let mut stored = StoredRecord::seal(&record(), &c, HashAlgorithm::Sha256).unwrap();
        stored.encrypted_payload = None;
        assert!(matches!(stored.open(&c), Err(VaultError::Malformed { .. })));
    }
}
