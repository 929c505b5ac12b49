//! Classifier configuration.

use super::classifier::ClassifierError;
use super::outcome::RiskTier;
use serde::{Deserialize, Serialize};

/// An additional exact signature supplied through configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureSpec {
    /// Case-insensitive regular expression tested against the raw name.
    pub pattern: String,
    /// Threat label reported on a match.
    pub label: String,
    /// Confidence tier reported on a match.
    pub tier: RiskTier,
}

/// An additional fuzzy keyword supplied through configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSpec {
    /// Keyword as written; normalized before matching.
    pub keyword: String,
    /// Label used in the "Possible ... variant" description.
    pub label: String,
}

/// Settings passed to [`ThreatClassifier`](super::ThreatClassifier) at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Suppress names that match nothing instead of surfacing them as unverified.
    pub smart_filter: bool,
    /// Fuzzy matching runs only for normalized names strictly longer than this.
    pub fuzzy_min_len: usize,
    /// Fuzzy matching runs only for normalized names strictly shorter than this.
    pub fuzzy_max_len: usize,
    /// Signatures appended after the built-in table.
    pub extra_signatures: Vec<SignatureSpec>,
    /// Keywords appended after the built-in list.
    pub extra_keywords: Vec<KeywordSpec>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            smart_filter: true,
            fuzzy_min_len: 3,
            fuzzy_max_len: 15,
            extra_signatures: Vec::new(),
            extra_keywords: Vec::new(),
        }
    }
}

impl ClassifierConfig {
    /// Surfaces every emitter, including unmatched ones.
    pub fn audit_mode() -> Self {
        Self {
            smart_filter: false,
            ..Default::default()
        }
    }

    /// Returns true if a normalized name of this length is eligible for fuzzy matching.
    #[inline]
    pub fn fuzzy_eligible(&self, normalized_len: usize) -> bool {
        normalized_len > self.fuzzy_min_len && normalized_len < self.fuzzy_max_len
    }

    /// Rejects a fuzzy window that no length can fall into.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.fuzzy_min_len + 1 >= self.fuzzy_max_len {
            return Err(ClassifierError::EmptyFuzzyWindow {
                min: self.fuzzy_min_len,
                max: self.fuzzy_max_len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzy_window_bounds_are_exclusive() {
        let config = ClassifierConfig::default();
        assert!(!config.fuzzy_eligible(3));
        assert!(config.fuzzy_eligible(4));
        assert!(config.fuzzy_eligible(14));
        assert!(!config.fuzzy_eligible(15));
    }

    #[test]
    fn test_empty_window_rejected() {
        let config = ClassifierConfig {
            fuzzy_min_len: 5,
            fuzzy_max_len: 6,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ClassifierError::EmptyFuzzyWindow { min: 5, max: 6 })
        ));
        assert!(ClassifierConfig::audit_mode().validate().is_ok());
    }
}
