//! Skim Guard Library
//!
//! Offline threat assessment and evidence custody for payment-terminal
//! skimmer inspections. A field operator inspects a terminal, the device
//! listens for nearby wireless emitters, and the engine turns both into a
//! bounded risk score and an encrypted, tamper-evident evidence record.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! observations ─► signal ─► classify ─┐
//!                                     ├─► risk ─► custody ─► vault
//!                checklist ───────────┘              │
//!                                                    └─► disclosure / sync
//! ```
//!
//! # Design Principles
//!
//! - **Offline first**: recording evidence never waits on the network
//! - **Fail closed**: malformed evidence and illegal status changes are rejected before any write
//! - **Replayable**: scoring is a pure function of its inputs
//! - **Encrypted at rest**: AES-256-GCM per record, with the clear listing metadata authenticated alongside
//!
//! # Example
//!
//! ```no_run
//! use skim_guard::{
//!     classify::{ClassifierConfig, ThreatClassifier},
//!     custody::CustodyAuthority,
//!     record::DetectionRecord,
//!     risk::RiskEngine,
//!     scan::{CaptureResult, EmitterObservation, Environment, InspectionChecklist},
//!     signal::ObservationTracker,
//!     vault::{EvidenceVault, FileKeyProvider, HashAlgorithm},
//! };
//!
//! let classifier = ThreatClassifier::new(ClassifierConfig::default()).unwrap();
//! let engine = RiskEngine::default();
//!
//! let mut tracker = ObservationTracker::new();
//! tracker.observe(EmitterObservation::new("aa:bb", "HC-05", -42));
//!
//! let emitters = classifier.classify_all(&tracker.snapshot(), Environment::Atm);
//! let checklist = InspectionChecklist { loose_parts: true, ..Default::default() };
//! let analysis = engine.score(checklist, emitters, Environment::Atm);
//!
//! let keys = FileKeyProvider::new("data/vault.key");
//! let vault = EvidenceVault::open("data/records", &keys, HashAlgorithm::Sha256).unwrap();
//! let authority = CustodyAuthority::new(vault).with_suspicion_threshold(engine.weights().suspicion_threshold);
//!
//! let record = DetectionRecord::new(CaptureResult::new("data:image/jpeg;base64,..."), analysis);
//! authority.submit(record).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod classify;
pub mod config;
pub mod custody;
pub mod metrics;
pub mod record;
pub mod risk;
pub mod scan;
pub mod signal;
pub mod vault;

// Re-export commonly used types at crate root
pub use classify::{Classification, ClassifiedEmitter, ThreatClassifier};
pub use config::FileConfig;
pub use custody::{CustodyAuthority, CustodyError};
pub use record::{DetectionRecord, DetectionStatus, SyncStatus};
pub use risk::{compute_risk, AnalysisResult, RiskEngine};
pub use scan::{EmitterObservation, Environment, InspectionChecklist};
pub use signal::filter_signal;
pub use vault::{EvidenceVault, RecordEntry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
