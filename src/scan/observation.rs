//! Raw wireless emitter observations.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A single sighting of a wireless emitter during an active scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitterObservation {
    /// Opaque identifier, stable per physical radio.
    pub id: String,
    /// Advertised name. May be empty or generic.
    #[serde(default)]
    pub name: String,
    /// Signal strength in dBm. More negative is weaker.
    pub rssi: i32,
    /// When the sighting was made.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl EmitterObservation {
    /// Creates an observation stamped with the current time, truncated to
    /// the millisecond precision it is persisted with.
    pub fn new(id: impl Into<String>, name: impl Into<String>, rssi: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rssi,
            timestamp: Utc::now().trunc_subsecs(3),
        }
    }
}
