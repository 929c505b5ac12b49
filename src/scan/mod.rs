//! Operator-supplied scan inputs.
//!
//! Everything the field operator or the device sensors hand to the
//! engine before analysis: the physical inspection checklist, raw
//! wireless observations, the deployment environment, and the image
//! and location capture.

mod capture;
mod checklist;
mod environment;
mod observation;

pub use capture::{CaptureResult, GeoLocation};
pub use checklist::InspectionChecklist;
pub use environment::Environment;
pub use observation::EmitterObservation;
