//! Deployment environment of the inspected terminal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the inspected terminal is deployed.
///
/// Stricter environments treat unexplained wireless peripherals as
/// anomalous; lenient ones expect printers, scanners and phones nearby.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    /// Automated teller machine. Strict isolation.
    #[default]
    Atm,
    /// Fuel pump. Strict, with industrial interference.
    FuelPump,
    /// Retail point of sale. Peripherals expected.
    RetailPos,
    /// Public space. High background noise.
    PublicSpace,
}

impl Environment {
    /// All environments, in declaration order.
    pub const ALL: [Environment; 4] = [
        Environment::Atm,
        Environment::FuelPump,
        Environment::RetailPos,
        Environment::PublicSpace,
    ];

    /// Returns true for environments where a generic device name is escalated.
    pub fn is_strict(self) -> bool {
        matches!(self, Environment::Atm | Environment::FuelPump)
    }

    /// Canonical upper-case tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Atm => "ATM",
            Environment::FuelPump => "FUEL_PUMP",
            Environment::RetailPos => "RETAIL_POS",
            Environment::PublicSpace => "PUBLIC_SPACE",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown environment tag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_uppercase().replace('-', "_");
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str() == tag)
            .ok_or_else(|| UnknownEnvironment(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_dashes_and_case() {
        assert_eq!("fuel-pump".parse::<Environment>().unwrap(), Environment::FuelPump);
        assert_eq!("ATM".parse::<Environment>().unwrap(), Environment::Atm);
        assert!("bank".parse::<Environment>().is_err());
    }

    #[test]
    fn test_strictness() {
        assert!(Environment::Atm.is_strict());
        assert!(Environment::FuelPump.is_strict());
        assert!(!Environment::RetailPos.is_strict());
        assert!(!Environment::PublicSpace.is_strict());
    }
}
