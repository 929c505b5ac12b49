//! Prometheus metrics for the assessment engine.
//!
//! # Metrics Exposed
//!
//! ## Vault
//! - `skim_guard_records_total` - Records held in the vault
//! - `skim_guard_records_high_risk` - Records scoring above 70
//! - `skim_guard_records_confirmed` - Confirmed or published records
//! - `skim_guard_records_pending_sync` - Records waiting for upload
//! - `skim_guard_records_corrupted` - Records failing decryption or integrity checks
//!
//! ## Assessments
//! - `skim_guard_assessments_total` - Assessments performed
//! - `skim_guard_assessments_suspicious_total` - Suspicious verdicts
//! - `skim_guard_last_risk_score` - Score of the latest assessment
//! - `skim_guard_last_threat_count` - Threat emitters in the latest assessment
//!
//! ## Sync
//! - `skim_guard_sync_uploaded_total` - Records uploaded
//! - `skim_guard_sync_failed_total` - Failed uploads
//!
//! Assessment and sync totals are kept in an [`ActivityCounters`] file so
//! they survive between CLI runs.
//!
//! # Example
//!
//! ```no_run
//! use skim_guard::metrics::{MetricsRegistry, MetricsSnapshot};
//! use skim_guard::vault::VaultStats;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.update(&MetricsSnapshot::from(VaultStats::default()));
//! println!("{}", registry.encode().unwrap());
//! ```

mod activity;
mod collector;

pub use activity::ActivityCounters;
pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
