//! Risk score computation.

use super::weights::ScoringWeights;
use crate::classify::ClassifiedEmitter;
use crate::scan::{Environment, InspectionChecklist};
use serde::{Deserialize, Serialize};

/// Outcome of one scan. Computed once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Physical findings as entered.
    pub checklist: InspectionChecklist,
    /// Emitters considered, threats and unverified alike.
    #[serde(default)]
    pub detected_devices: Vec<ClassifiedEmitter>,
    /// Bounded to 0-100.
    pub risk_score: u8,
    /// Score above the suspicion threshold.
    pub is_suspicious: bool,
    /// Where the terminal is deployed.
    #[serde(default)]
    pub environment: Environment,
}

impl AnalysisResult {
    /// Number of emitters classified as threats.
    pub fn threat_count(&self) -> usize {
        self.detected_devices.iter().filter(|d| d.is_threat()).count()
    }
}

/// Scores scans with a fixed weight set.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    weights: ScoringWeights,
}

impl RiskEngine {
    /// Engine scoring with `weights`.
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Weights in use.
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Scores a checklist and classified emitters in the given environment.
    pub fn score(
        &self,
        checklist: InspectionChecklist,
        emitters: Vec<ClassifiedEmitter>,
        environment: Environment,
    ) -> AnalysisResult {
        compute_risk(&self.weights, checklist, emitters, environment)
    }
}

/// Pure risk function.
///
/// The wireless contribution is the strongest single device weight, not
/// the sum: one close exact match dominates a crowd of weak generic names.
pub fn compute_risk(
    weights: &ScoringWeights,
    checklist: InspectionChecklist,
    emitters: Vec<ClassifiedEmitter>,
    environment: Environment,
) -> AnalysisResult {
    let mut score = 0.0;

    if checklist.loose_parts {
        score += weights.loose_parts;
    }
    if checklist.mismatched_colors {
        score += weights.mismatched_colors;
    }
    if checklist.keypad_obstruction {
        score += weights.keypad_obstruction;
    }
    if checklist.hidden_camera {
        score += weights.hidden_camera;
    }

    let signal_score = emitters
        .iter()
        .filter(|e| e.is_threat())
        .map(|e| weights.method_weight(e.method()) * weights.proximity_multiplier(e.rssi()))
        .fold(0.0_f64, f64::max);

    score += signal_score * weights.environment_weight(environment);

    if checklist.bluetooth_signal {
        score += weights.manual_signal_bonus;
    }

    let risk_score = score.clamp(0.0, 100.0).round() as u8;
    let is_suspicious = risk_score > weights.suspicion_threshold;

    tracing::debug!(
        risk_score,
        is_suspicious,
        signal_score,
        environment = %environment,
        emitters = emitters.len(),
        "Risk computed"
    );

    AnalysisResult {
        checklist,
        detected_devices: emitters,
        risk_score,
        is_suspicious,
        environment,
    }
}
