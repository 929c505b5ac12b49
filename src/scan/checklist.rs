//! Physical inspection checklist.

use serde::{Deserialize, Serialize};

/// Findings from the operator's hands-on inspection of a terminal.
///
/// Set before analysis and never modified once attached to a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionChecklist {
    /// Card reader moves, wobbles or sits proud of the fascia.
    pub loose_parts: bool,
    /// Overlay material or colour does not match the terminal body.
    pub mismatched_colors: bool,
    /// Pinhole or concealed camera aimed at the keypad.
    pub hidden_camera: bool,
    /// Keypad overlay or raised obstruction.
    pub keypad_obstruction: bool,
    /// Operator noticed a suspicious wireless signal independently of the classifier.
    pub bluetooth_signal: bool,
}

impl InspectionChecklist {
    /// Returns true if no finding is set.
    pub fn is_clear(&self) -> bool {
        !(self.loose_parts
            || self.mismatched_colors
            || self.hidden_camera
            || self.keypad_obstruction
            || self.bluetooth_signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_clear() {
        assert!(InspectionChecklist::default().is_clear());
    }

    #[test]
    fn test_serializes_camel_case() {
        let checklist = InspectionChecklist {
            hidden_camera: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&checklist).unwrap();
        assert!(json.contains("\"hiddenCamera\":true"));
        assert!(!checklist.is_clear());
    }
}
