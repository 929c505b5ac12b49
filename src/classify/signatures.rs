//! Built-in signature database.
//!
//! Exact patterns cover serial/BLE bridge chips commonly wired into
//! skimmer overlays, magstripe reader boards, named skimmer campaigns
//! and off-the-shelf wireless hacking tools.

use super::config::{ClassifierConfig, KeywordSpec, SignatureSpec};
use super::distance::normalize_name;
use super::outcome::RiskTier;
use regex::{Regex, RegexBuilder};

const BUILTIN_SIGNATURES: &[(&str, &str, RiskTier)] = &[
    (r"^HC-?0[5-9]$", "HC-0x Serial Bluetooth Bridge", RiskTier::High),
    (r"^(HM|AT)-?1[0-9]$", "HM-1x BLE Serial Module", RiskTier::High),
    (r"^JDY-?[0-9]{2}$", "JDY BLE Serial Module", RiskTier::High),
    (r"^(linvor|RNBT-[0-9A-F]{4})$", "Legacy SPP Serial Bridge", RiskTier::High),
    (r"^(MSR|MAGSTRIPE)[-_ ]?[0-9A-Z]*$", "Magstripe Reader Board", RiskTier::Critical),
    // Word-initial only, so ordinary words like "Eskimo" stay clear.
    (r"(^|[^a-z0-9])skim", "Known Skimmer Campaign", RiskTier::Critical),
    (r"^Flipper(\s|$)", "Flipper Zero Pentest Tool", RiskTier::High),
    (r"(ubertooth|btlejack|pwnagotchi|hackrf)", "Wireless Hacking Tool", RiskTier::High),
    (r"^ESP32[-_ ]?(SPP|BT|SERIAL)$", "ESP32 Serial Bridge", RiskTier::Med),
];

const BUILTIN_KEYWORDS: &[(&str, &str)] = &[
    ("HC-05", "Serial Bluetooth Bridge"),
    ("HC-06", "Serial Bluetooth Bridge"),
    ("HC-08", "Serial Bluetooth Bridge"),
    ("HM-10", "BLE Serial Module"),
    ("JDY-31", "BLE Serial Module"),
    ("linvor", "Legacy SPP Serial Bridge"),
    ("RN42", "Legacy SPP Serial Bridge"),
    ("skimmer", "Skimmer"),
    ("flipper", "Flipper Zero Pentest Tool"),
    ("magstripe", "Magstripe Reader Board"),
    ("MSR605", "Magstripe Reader Board"),
    ("cardreader", "Card Reader Module"),
    ("ubertooth", "Wireless Hacking Tool"),
];

/// Normalized names treated as generic or factory-default.
const GENERIC_NAMES: &[&str] = &[
    "",
    "unnamed",
    "unknown",
    "nameless",
    "device",
    "serial",
    "keyboard",
    "mouse",
    "bluetooth",
    "btdevice",
    "blemodule",
];

/// A compiled exact signature.
#[derive(Debug, Clone)]
pub struct Signature {
    pattern: Regex,
    /// Threat label reported on a match.
    pub label: String,
    /// Confidence tier reported on a match.
    pub tier: RiskTier,
}

impl Signature {
    fn compile(pattern: &str, label: &str, tier: RiskTier) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            pattern,
            label: label.to_string(),
            tier,
        })
    }

    /// Whether the raw device name matches, ignoring case.
    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}

/// A fuzzy keyword, stored pre-normalized.
#[derive(Debug, Clone)]
pub struct Keyword {
    /// Keyword after [`normalize_name`].
    pub normalized: String,
    /// Label of the hardware the keyword stands for.
    pub label: String,
}

impl Keyword {
    fn new(keyword: &str, label: &str) -> Self {
        Self {
            normalized: normalize_name(keyword),
            label: label.to_string(),
        }
    }

    /// Maximum edit distance accepted for this keyword.
    pub fn threshold(&self) -> usize {
        match self.normalized.chars().count() {
            n if n < 6 => 1,
            n if n < 10 => 2,
            _ => 3,
        }
    }
}

/// Exact signatures, fuzzy keywords and generic names, in priority order.
#[derive(Debug, Clone)]
pub struct SignatureDatabase {
    signatures: Vec<Signature>,
    keywords: Vec<Keyword>,
}

impl SignatureDatabase {
    /// Builds the database from the built-in tables plus configured extras.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, regex::Error> {
        let mut signatures = BUILTIN_SIGNATURES
            .iter()
            .map(|(pattern, label, tier)| Signature::compile(pattern, label, *tier))
            .collect::<Result<Vec<_>, _>>()?;

        for SignatureSpec {
            pattern,
            label,
            tier,
        } in &config.extra_signatures
        {
            signatures.push(Signature::compile(pattern, label, *tier)?);
        }

        let keywords = BUILTIN_KEYWORDS
            .iter()
            .map(|(keyword, label)| Keyword::new(keyword, label))
            .chain(
                config
                    .extra_keywords
                    .iter()
                    .map(|KeywordSpec { keyword, label }| Keyword::new(keyword, label)),
            )
            .collect();

        Ok(Self {
            signatures,
            keywords,
        })
    }

    /// First exact signature matching the raw name.
    pub fn exact_match(&self, raw_name: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.matches(raw_name))
    }

    /// Fuzzy keywords, built-in first.
    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    /// Returns true if the normalized name is a generic/default label.
    pub fn is_generic(&self, normalized: &str) -> bool {
        GENERIC_NAMES.contains(&normalized)
    }

    /// Number of compiled exact signatures.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }
}
