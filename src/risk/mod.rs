//! Deterministic risk scoring.
//!
//! Combines the physical inspection checklist with classified wireless
//! emitters, weighted by deployment environment, into a bounded score.
//! Scoring is a pure function of its inputs so any stored verdict can be
//! replayed during an audit.

mod engine;
mod weights;

pub use engine::{compute_risk, AnalysisResult, RiskEngine};
pub use weights::{ScoringWeights, WeightsError};
