//! Scoring weights.
//!
//! Passed explicitly to the engine. The defaults are the calibrated
//! field values; alternative sets exist for tests and trials.

use crate::classify::DetectionMethod;
use crate::scan::Environment;
use serde::{Deserialize, Serialize};

/// All tunable constants of the risk function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Points for loose or wobbling parts.
    pub loose_parts: f64,
    /// Points for parts that do not match the housing.
    pub mismatched_colors: f64,
    /// Points for an overlay or obstructed keypad.
    pub keypad_obstruction: f64,
    /// Points for a pinhole camera.
    pub hidden_camera: f64,
    /// Flat bonus when the operator flagged a wireless signal manually.
    pub manual_signal_bonus: f64,

    /// Base wireless weight of a signature hit.
    pub exact_match: f64,
    /// Base wireless weight of a fuzzy hit.
    pub fuzzy_match: f64,
    /// Base wireless weight of a generic name.
    pub heuristic_match: f64,
    /// Base wireless weight of an operator flag.
    pub manual_match: f64,

    /// Readings stronger than this (dBm) count as close.
    pub near_rssi: i32,
    /// Readings weaker than this (dBm) count as far.
    pub far_rssi: i32,
    /// Multiplier for close emitters.
    pub near_multiplier: f64,
    /// Multiplier for distant emitters.
    pub far_multiplier: f64,

    /// Wireless multiplier at ATMs.
    pub atm: f64,
    /// Wireless multiplier at fuel pumps.
    pub fuel_pump: f64,
    /// Wireless multiplier at retail checkouts.
    pub retail_pos: f64,
    /// Wireless multiplier in public spaces.
    pub public_space: f64,

    /// Scores strictly above this are suspicious.
    pub suspicion_threshold: u8,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            loose_parts: 30.0,
            mismatched_colors: 15.0,
            keypad_obstruction: 20.0,
            hidden_camera: 50.0,
            manual_signal_bonus: 20.0,

            exact_match: 50.0,
            fuzzy_match: 35.0,
            heuristic_match: 15.0,
            manual_match: 10.0,

            near_rssi: -50,
            far_rssi: -80,
            near_multiplier: 1.5,
            far_multiplier: 0.5,

            atm: 1.5,
            fuel_pump: 1.3,
            retail_pos: 0.8,
            public_space: 0.5,

            suspicion_threshold: 25,
        }
    }
}

impl ScoringWeights {
    /// Base weight for a classification method.
    pub fn method_weight(&self, method: DetectionMethod) -> f64 {
        match method {
            DetectionMethod::Exact => self.exact_match,
            DetectionMethod::Fuzzy => self.fuzzy_match,
            DetectionMethod::Heuristic => self.heuristic_match,
            DetectionMethod::Manual => self.manual_match,
        }
    }

    /// Proximity multiplier for a signal strength reading.
    pub fn proximity_multiplier(&self, rssi: i32) -> f64 {
        if rssi > self.near_rssi {
            self.near_multiplier
        } else if rssi < self.far_rssi {
            self.far_multiplier
        } else {
            1.0
        }
    }

    /// Environment multiplier applied to the wireless contribution.
    pub fn environment_weight(&self, environment: Environment) -> f64 {
        match environment {
            Environment::Atm => self.atm,
            Environment::FuelPump => self.fuel_pump,
            Environment::RetailPos => self.retail_pos,
            Environment::PublicSpace => self.public_space,
        }
    }

    /// Validates the weight set.
    pub fn validate(&self) -> Result<(), WeightsError> {
        let all = [
            self.loose_parts,
            self.mismatched_colors,
            self.keypad_obstruction,
            self.hidden_camera,
            self.manual_signal_bonus,
            self.exact_match,
            self.fuzzy_match,
            self.heuristic_match,
            self.manual_match,
            self.near_multiplier,
            self.far_multiplier,
            self.atm,
            self.fuel_pump,
            self.retail_pos,
            self.public_space,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(WeightsError::NegativeOrNonFinite);
        }
        if self.far_rssi > self.near_rssi {
            return Err(WeightsError::InvertedProximity {
                near: self.near_rssi,
                far: self.far_rssi,
            });
        }
        if self.suspicion_threshold > 100 {
            return Err(WeightsError::ThresholdOutOfRange(self.suspicion_threshold));
        }
        Ok(())
    }
}

/// Weight validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WeightsError {
    /// A weight is negative, NaN or infinite.
    #[error("weights must be finite and non-negative")]
    NegativeOrNonFinite,
    /// The far cutoff is not weaker than the near one.
    #[error("far threshold {far} dBm is stronger than near threshold {near} dBm")]
    InvertedProximity {
        /// Near cutoff in dBm.
        near: i32,
        /// Far cutoff in dBm.
        far: i32,
    },
    /// Threshold above 100.
    #[error("suspicion threshold {0} outside 0-100")]
    ThresholdOutOfRange(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_valid() {
        assert!(ScoringWeights::default().validate().is_ok());
    }

    #[test]
    fn test_proximity_bands() {
        let w = ScoringWeights::default();
        assert_eq!(w.proximity_multiplier(-40), 1.5);
        assert_eq!(w.proximity_multiplier(-50), 1.0);
        assert_eq!(w.proximity_multiplier(-80), 1.0);
        assert_eq!(w.proximity_multiplier(-81), 0.5);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let w = ScoringWeights {
            hidden_camera: -1.0,
            ..Default::default()
        };
        assert!(matches!(w.validate(), Err(WeightsError::NegativeOrNonFinite)));
    }

    #[test]
    fn test_inverted_proximity_rejected() {
        let w = ScoringWeights {
            near_rssi: -90,
            far_rssi: -40,
            ..Default::default()
        };
        assert!(matches!(
            w.validate(),
            Err(WeightsError::InvertedProximity { .. })
        ));
    }
}
