//! Wireless signal conditioning.
//!
//! Raw RSSI readings jitter by several dB between consecutive
//! advertisements from a stationary radio. This module smooths them
//! into stable estimates and keeps one entry per physical emitter
//! while a scan is running.

mod conditioner;
mod tracker;

pub use conditioner::{filter_signal, SignalConditioner};
pub use tracker::{ObservationTracker, TrackedEmitter};
