//! Classification outcome types.

use crate::scan::EmitterObservation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence tier attached to a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    /// Weak indication.
    Low,
    /// Plausible threat.
    Med,
    /// Likely skimmer hardware.
    High,
    /// Known skimmer component or campaign.
    Critical,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskTier::Low => "LOW",
            RiskTier::Med => "MED",
            RiskTier::High => "HIGH",
            RiskTier::Critical => "CRITICAL",
        })
    }
}

/// Which strategy produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionMethod {
    /// Signature table hit.
    Exact,
    /// Bounded edit distance to a known keyword.
    Fuzzy,
    /// Generic or default device name.
    Heuristic,
    /// Operator-supplied or unverified inventory item.
    Manual,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectionMethod::Exact => "EXACT",
            DetectionMethod::Fuzzy => "FUZZY",
            DetectionMethod::Heuristic => "HEURISTIC",
            DetectionMethod::Manual => "MANUAL",
        })
    }
}

/// Outcome of classifying a single emitter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Matched an entry of the signature table.
    Exact {
        /// Signature label.
        label: String,
        /// Signature tier.
        tier: RiskTier,
    },
    /// Within the edit-distance threshold of a known keyword.
    Fuzzy {
        /// Description naming the keyword's label.
        label: String,
        /// Derived from the edit distance.
        tier: RiskTier,
        /// Keyword that matched, kept for forensic traceability.
        keyword: String,
        /// Edit distance between the normalized name and the keyword.
        distance: usize,
    },
    /// Generic or factory-default name.
    Heuristic {
        /// Always the generic device label.
        label: String,
        /// Raised in strict environments.
        tier: RiskTier,
    },
    /// Flagged by the operator during inspection.
    OperatorFlagged {
        /// Operator-supplied label.
        label: String,
    },
    /// No match; surfaced only so the raw inventory can be audited.
    Unverified,
}

impl Classification {
    /// Strategy that produced this outcome.
    pub fn method(&self) -> DetectionMethod {
        match self {
            Classification::Exact { .. } => DetectionMethod::Exact,
            Classification::Fuzzy { .. } => DetectionMethod::Fuzzy,
            Classification::Heuristic { .. } => DetectionMethod::Heuristic,
            Classification::OperatorFlagged { .. } | Classification::Unverified => {
                DetectionMethod::Manual
            }
        }
    }

    /// Confidence tier. Operator flags rank MED, unverified LOW.
    pub fn tier(&self) -> RiskTier {
        match self {
            Classification::Exact { tier, .. }
            | Classification::Fuzzy { tier, .. }
            | Classification::Heuristic { tier, .. } => *tier,
            Classification::OperatorFlagged { .. } => RiskTier::Med,
            Classification::Unverified => RiskTier::Low,
        }
    }

    /// Whether this outcome counts toward the wireless risk contribution.
    pub fn is_threat(&self) -> bool {
        !matches!(self, Classification::Unverified)
    }

    /// Threat label. Present iff [`is_threat`](Self::is_threat).
    pub fn label(&self) -> Option<&str> {
        match self {
            Classification::Exact { label, .. }
            | Classification::Fuzzy { label, .. }
            | Classification::Heuristic { label, .. }
            | Classification::OperatorFlagged { label } => Some(label),
            Classification::Unverified => None,
        }
    }

    /// Matched keyword. Present iff the method is fuzzy.
    pub fn matched_keyword(&self) -> Option<&str> {
        match self {
            Classification::Fuzzy { keyword, .. } => Some(keyword),
            _ => None,
        }
    }
}

/// An observation paired with its classification. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedEmitter {
    /// The sighting as received.
    pub observation: EmitterObservation,
    /// What the classifier made of it.
    pub classification: Classification,
}

impl ClassifiedEmitter {
    /// Pairs an observation with its classification.
    pub fn new(observation: EmitterObservation, classification: Classification) -> Self {
        Self {
            observation,
            classification,
        }
    }

    /// Marks an observation as a threat on the operator's say-so.
    pub fn operator_flagged(observation: EmitterObservation, label: impl Into<String>) -> Self {
        Self::new(
            observation,
            Classification::OperatorFlagged {
                label: label.into(),
            },
        )
    }

    /// See [`Classification::is_threat`].
    #[inline]
    pub fn is_threat(&self) -> bool {
        self.classification.is_threat()
    }

    /// See [`Classification::method`].
    #[inline]
    pub fn method(&self) -> DetectionMethod {
        self.classification.method()
    }

    /// See [`Classification::tier`].
    #[inline]
    pub fn tier(&self) -> RiskTier {
        self.classification.tier()
    }

    /// Signal strength of the observation, in dBm.
    #[inline]
    pub fn rssi(&self) -> i32 {
        self.observation.rssi
    }
}
