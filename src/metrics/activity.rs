//! Activity counters that outlive a single process.
//!
//! Each CLI invocation is short-lived, so counters kept only in a
//! Prometheus registry would reset on every run. The totals are instead
//! folded into a small JSON file after each assessment or sync pass and
//! loaded back when metrics are rendered.

use super::collector::MetricsError;
use crate::custody::SyncReport;
use crate::risk::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Running totals of assessments and sync passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityCounters {
    /// Assessments performed.
    pub assessments: u64,
    /// Assessments with a suspicious verdict.
    pub suspicious: u64,
    /// Score of the latest assessment.
    pub last_risk_score: Option<u8>,
    /// Threat emitters in the latest assessment.
    pub last_threat_count: u64,
    /// Records uploaded across all sync passes.
    pub sync_uploaded: u64,
    /// Failed uploads across all sync passes.
    pub sync_failed: u64,
}

impl ActivityCounters {
    /// Loads counters from `path`. A missing file means no activity yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MetricsError> {
        match fs::read(path.as_ref()) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes counters to `path` via a temporary file and rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MetricsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
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

    /// Loads, applies `change` and saves in one step.
    pub fn amend<F>(path: impl AsRef<Path>, change: F) -> Result<Self, MetricsError>
    where
        F: FnOnce(&mut Self),
    {
        let path = path.as_ref();
        let mut counters = Self::load(path)?;
        change(&mut counters);
        counters.save(path)?;
        Ok(counters)
    }

    /// Counts one assessment and remembers its score.
    pub fn record_assessment(&mut self, analysis: &AnalysisResult) {
        self.assessments += 1;
        if analysis.is_suspicious {
            self.suspicious += 1;
        }
        self.last_risk_score = Some(analysis.risk_score);
        self.last_threat_count = analysis.threat_count() as u64;
    }

    /// Adds the outcome of a sync pass.
    pub fn record_sync(&mut self, report: &SyncReport) {
        self.sync_uploaded += report.uploaded as u64;
        self.sync_failed += report.failed as u64;
    }
}
