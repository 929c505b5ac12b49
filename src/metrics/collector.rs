//! Metrics collection and registry.

use super::activity::ActivityCounters;
use crate::vault::VaultStats;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    /// The counter file could not be read or written.
    #[error("metrics state I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The counter file is not valid JSON.
    #[error("metrics state is malformed: {0}")]
    State(#[from] serde_json::Error),
}

/// A snapshot of vault state for a gauge update.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    /// Records in the vault, corrupted ones included.
    pub total_records: usize,
    /// Records scoring above 70.
    pub high_risk: usize,
    /// Confirmed or published records.
    pub confirmed: usize,
    /// Records waiting for upload.
    pub pending_sync: usize,
    /// Records that failed decryption or verification.
    pub corrupted: usize,
}

impl From<VaultStats> for MetricsSnapshot {
    fn from(stats: VaultStats) -> Self {
        Self {
            total_records: stats.total,
            high_risk: stats.high_risk,
            confirmed: stats.confirmed,
            pending_sync: stats.pending_sync,
            corrupted: stats.corrupted,
        }
    }
}

/// Prometheus metrics registry for the assessment engine.
pub struct MetricsRegistry {
    registry: Registry,

    // Vault gauges
    records_total: IntGauge,
    high_risk: IntGauge,
    confirmed: IntGauge,
    pending_sync: IntGauge,
    corrupted: IntGauge,

    // Assessment metrics
    assessments_total: IntCounter,
    suspicious_total: IntCounter,
    last_risk_score: IntGauge,
    last_threat_count: IntGauge,

    // Sync counters
    sync_uploaded_total: IntCounter,
    sync_failed_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new registry with every metric registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let records_total = IntGauge::new(
            "skim_guard_records_total",
            "Records held in the evidence vault",
        )?;
        let high_risk = IntGauge::new(
            "skim_guard_records_high_risk",
            "Records with a risk score above 70",
        )?;
        let confirmed = IntGauge::new(
            "skim_guard_records_confirmed",
            "Records confirmed or published",
        )?;
        let pending_sync = IntGauge::new(
            "skim_guard_records_pending_sync",
            "Records waiting for upload",
        )?;
        let corrupted = IntGauge::new(
            "skim_guard_records_corrupted",
            "Records failing decryption or integrity checks",
        )?;

        let assessments_total = IntCounter::new(
            "skim_guard_assessments_total",
            "Risk assessments performed",
        )?;
        let suspicious_total = IntCounter::new(
            "skim_guard_assessments_suspicious_total",
            "Risk assessments with a suspicious verdict",
        )?;
        let last_risk_score = IntGauge::new(
            "skim_guard_last_risk_score",
            "Risk score of the most recent assessment",
        )?;
        let last_threat_count = IntGauge::new(
            "skim_guard_last_threat_count",
            "Threat emitters in the most recent assessment",
        )?;

        let sync_uploaded_total = IntCounter::new(
            "skim_guard_sync_uploaded_total",
            "Records uploaded by sync passes",
        )?;
        let sync_failed_total = IntCounter::new(
            "skim_guard_sync_failed_total",
            "Failed record uploads",
        )?;

        registry.register(Box::new(records_total.clone()))?;
        registry.register(Box::new(high_risk.clone()))?;
        registry.register(Box::new(confirmed.clone()))?;
        registry.register(Box::new(pending_sync.clone()))?;
        registry.register(Box::new(corrupted.clone()))?;
        registry.register(Box::new(assessments_total.clone()))?;
        registry.register(Box::new(suspicious_total.clone()))?;
        registry.register(Box::new(last_risk_score.clone()))?;
        registry.register(Box::new(last_threat_count.clone()))?;
        registry.register(Box::new(sync_uploaded_total.clone()))?;
        registry.register(Box::new(sync_failed_total.clone()))?;

        Ok(Self {
            registry,
            records_total,
            high_risk,
            confirmed,
            pending_sync,
            corrupted,
            assessments_total,
            suspicious_total,
            last_risk_score,
            last_threat_count,
            sync_uploaded_total,
            sync_failed_total,
        })
    }

    /// Sets the vault gauges from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.records_total.set(snapshot.total_records as i64);
        self.high_risk.set(snapshot.high_risk as i64);
        self.confirmed.set(snapshot.confirmed as i64);
        self.pending_sync.set(snapshot.pending_sync as i64);
        self.corrupted.set(snapshot.corrupted as i64);
    }

    /// Brings the assessment and sync metrics up to persisted totals.
    ///
    /// Counters only move forward, so applying the same totals twice is a
    /// no-op.
    pub fn update_activity(&self, counters: &ActivityCounters) {
        advance(&self.assessments_total, counters.assessments);
        advance(&self.suspicious_total, counters.suspicious);
        advance(&self.sync_uploaded_total, counters.sync_uploaded);
        advance(&self.sync_failed_total, counters.sync_failed);
        if let Some(score) = counters.last_risk_score {
            self.last_risk_score.set(i64::from(score));
        }
        self.last_threat_count.set(counters.last_threat_count as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    counter.inc_by(total.saturating_sub(counter.get()));
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("records_total", &self.records_total.get())
            .field("assessments_total", &self.assessments_total.get())
            .finish_non_exhaustive()
    }
}
