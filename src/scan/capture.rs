//! Image and location capture handed over by the camera collaborator.

use serde::{Deserialize, Serialize};

/// Geolocation fix attached to a detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Horizontal accuracy in metres, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// Raw capture result: an opaque image blob plus optional coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureResult {
    /// Encoded snapshot (typically a base64 data URL).
    pub image_data: String,
    /// Position fix, if one was available.
    pub location: Option<GeoLocation>,
}

impl CaptureResult {
    /// Capture without a location.
    pub fn new(image_data: impl Into<String>) -> Self {
        Self {
            image_data: image_data.into(),
            location: None,
        }
    }

    /// Attaches a position fix.
    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }
}
