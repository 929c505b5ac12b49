//! Ranked threat classification of emitter names.

use super::config::ClassifierConfig;
use super::distance::{bounded_levenshtein, normalize_name};
use super::outcome::{Classification, ClassifiedEmitter, RiskTier};
use super::signatures::{Keyword, SignatureDatabase};
use crate::scan::{EmitterObservation, Environment};
use thiserror::Error;

const GENERIC_LABEL: &str = "Generic Device Name";

/// Errors raised while building a classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// A built-in or configured pattern does not compile.
    #[error("invalid signature pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    /// No name length satisfies the fuzzy bounds.
    #[error("empty fuzzy length window: names must be longer than {min} and shorter than {max}")]
    EmptyFuzzyWindow {
        /// Exclusive lower bound.
        min: usize,
        /// Exclusive upper bound.
        max: usize,
    },
}

/// Matches emitter names against the signature database.
#[derive(Debug, Clone)]
pub struct ThreatClassifier {
    config: ClassifierConfig,
    database: SignatureDatabase,
}

impl ThreatClassifier {
    /// Creates a classifier, compiling built-in and configured signatures.
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        config.validate()?;
        let database = SignatureDatabase::from_config(&config)?;
        tracing::debug!(
            signatures = database.signature_count(),
            keywords = database.keywords().len(),
            smart_filter = config.smart_filter,
            "Threat classifier ready"
        );
        Ok(Self { config, database })
    }

    /// Settings the classifier was built with.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies a name.
    ///
    /// Returns `None` only when nothing matched and `smart_filter` is set.
    pub fn classify(
        &self,
        name: &str,
        smart_filter: bool,
        environment: Environment,
    ) -> Option<Classification> {
        if let Some(signature) = self.database.exact_match(name) {
            return Some(Classification::Exact {
                label: signature.label.clone(),
                tier: signature.tier,
            });
        }

        let normalized = normalize_name(name);

        if self.config.fuzzy_eligible(normalized.chars().count()) {
            if let Some((keyword, distance)) = self.closest_keyword(&normalized) {
                let tier = match distance {
                    0 => RiskTier::Critical,
                    1 => RiskTier::High,
                    _ => RiskTier::Med,
                };
                return Some(Classification::Fuzzy {
                    label: format!("Possible {} variant", keyword.label),
                    tier,
                    keyword: keyword.normalized.clone(),
                    distance,
                });
            }
        }

        if self.database.is_generic(&normalized) {
            let tier = if environment.is_strict() {
                RiskTier::High
            } else {
                RiskTier::Med
            };
            return Some(Classification::Heuristic {
                label: GENERIC_LABEL.to_string(),
                tier,
            });
        }

        if smart_filter {
            None
        } else {
            Some(Classification::Unverified)
        }
    }

    /// Classifies an observation using the configured smart-filter setting.
    pub fn classify_observation(
        &self,
        observation: &EmitterObservation,
        environment: Environment,
    ) -> Option<ClassifiedEmitter> {
        self.classify(&observation.name, self.config.smart_filter, environment)
            .map(|classification| ClassifiedEmitter::new(observation.clone(), classification))
    }

    /// Classifies a batch, dropping suppressed emitters and preserving order.
    pub fn classify_all<'a, I>(&self, observations: I, environment: Environment) -> Vec<ClassifiedEmitter>
    where
        I: IntoIterator<Item = &'a EmitterObservation>,
    {
        observations
            .into_iter()
            .filter_map(|o| self.classify_observation(o, environment))
            .collect()
    }

    /// Keyword with the smallest distance within its threshold. Ties go to
    /// the earlier keyword.
    fn closest_keyword(&self, normalized: &str) -> Option<(&Keyword, usize)> {
        let mut best: Option<(&Keyword, usize)> = None;

        for keyword in self.database.keywords() {
            let Some(distance) =
                bounded_levenshtein(normalized, &keyword.normalized, keyword.threshold())
            else {
                continue;
            };
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((keyword, distance));
                if distance == 0 {
                    break;
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DetectionMethod;

    fn classifier() -> ThreatClassifier {
        ThreatClassifier::new(ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_exact_match_hc06() {
        let outcome = classifier().classify("HC-06", true, Environment::Atm).unwrap();
        assert_eq!(outcome.method(), DetectionMethod::Exact);
        assert_eq!(outcome.tier(), RiskTier::High);
    }

    #[test]
    fn test_fuzzy_match_variant() {
        let outcome = classifier().classify("HC06x", true, Environment::Atm).unwrap();
        assert_eq!(outcome.method(), DetectionMethod::Fuzzy);
        assert_eq!(outcome.matched_keyword(), Some("hc06"));
        assert_eq!(outcome.tier(), RiskTier::High);
    }

    #[test]
    fn test_fuzzy_distance_zero_is_critical() {
        // Separator variant that misses the anchored exact pattern.
        let outcome = classifier().classify("HC_06", true, Environment::Atm).unwrap();
        assert_eq!(outcome.method(), DetectionMethod::Fuzzy);
        assert_eq!(outcome.tier(), RiskTier::Critical);
    }

    #[test]
    fn test_fuzzy_distance_two_is_med() {
        let outcome = classifier().classify("magstrpe1", true, Environment::Atm).unwrap();
        assert_eq!(outcome.matched_keyword(), Some("magstripe"));
        assert_eq!(outcome.tier(), RiskTier::Med);
    }

    #[test]
    fn test_benign_suppressed_with_smart_filter() {
        assert!(classifier()
            .classify("Sony Headphones", true, Environment::Atm)
            .is_none());
    }

    #[test]
    fn test_word_containing_skim_is_not_a_campaign_hit() {
        assert!(classifier()
            .classify("Eskimo Speaker", true, Environment::Atm)
            .is_none());
        let outcome = classifier()
            .classify("Eskimo Speaker", false, Environment::Atm)
            .unwrap();
        assert_eq!(outcome, Classification::Unverified);
    }

    #[test]
    fn test_benign_surfaced_without_smart_filter() {
        let outcome = classifier()
            .classify("Sony Headphones", false, Environment::Atm)
            .unwrap();
        assert_eq!(outcome, Classification::Unverified);
        assert_eq!(outcome.method(), DetectionMethod::Manual);
        assert_eq!(outcome.tier(), RiskTier::Low);
    }

    #[test]
    fn test_generic_name_depends_on_environment() {
        let c = classifier();
        let atm = c.classify("Unnamed", true, Environment::Atm).unwrap();
        let public = c.classify("Unnamed", true, Environment::PublicSpace).unwrap();

        assert_eq!(atm.method(), DetectionMethod::Heuristic);
        assert_eq!(atm.tier(), RiskTier::High);
        assert_eq!(public.tier(), RiskTier::Med);
    }

    #[test]
    fn test_empty_name_is_generic() {
        let outcome = classifier().classify("", true, Environment::FuelPump).unwrap();
        assert_eq!(outcome.method(), DetectionMethod::Heuristic);
    }

    #[test]
    fn test_short_names_skip_fuzzy() {
        // "hc5" is 3 chars, outside the fuzzy window, and not generic.
        assert!(classifier().classify("HC5", true, Environment::Atm).is_none());
    }

    #[test]
    fn test_classification_is_order_independent() {
        let c = classifier();
        let names = ["HC06x", "Sony Headphones", "HC-05", "mouse"];
        let forward: Vec<_> = names
            .iter()
            .map(|n| c.classify(n, true, Environment::Atm))
            .collect();
        let mut backward: Vec<_> = names
            .iter()
            .rev()
            .map(|n| c.classify(n, true, Environment::Atm))
            .collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_classify_all_drops_suppressed() {
        let observations = vec![
            EmitterObservation::new("1", "HC-05", -45),
            EmitterObservation::new("2", "Galaxy Buds", -60),
        ];
        let classified = classifier().classify_all(&observations, Environment::Atm);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].observation.id, "1");
    }
}
