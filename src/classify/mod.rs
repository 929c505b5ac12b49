//! Wireless emitter classification.
//!
//! Decides whether an advertised device name matches a known or
//! suspected skimmer signature. Three strategies are tried in strict
//! priority order, first match wins:
//!
//! ```text
//! exact signature → fuzzy keyword → generic-name heuristic → (unverified | suppressed)
//! ```
//!
//! Classification is stateless: the same name in the same environment
//! always yields the same outcome, regardless of call order.

mod classifier;
mod config;
mod distance;
mod outcome;
mod signatures;

pub use classifier::{ClassifierError, ThreatClassifier};
pub use config::{ClassifierConfig, KeywordSpec, SignatureSpec};
pub use distance::{bounded_levenshtein, levenshtein, normalize_name};
pub use outcome::{Classification, ClassifiedEmitter, DetectionMethod, RiskTier};
pub use signatures::SignatureDatabase;
