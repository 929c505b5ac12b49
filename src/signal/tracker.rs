//! Incremental per-emitter state for an active scan.
//!
//! Observations arrive one at a time, in no particular order, from a
//! channel fed by the radio collaborator. A repeat sighting of the same
//! identifier replaces the previous one; it never adds a second entry.
//! A sighting older than the one already held is stale and is dropped.

use super::conditioner::SignalConditioner;
use crate::scan::EmitterObservation;
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, TryRecvError};

/// Latest known state of one emitter.
#[derive(Debug, Clone)]
pub struct TrackedEmitter {
    /// Most recent raw observation.
    pub latest: EmitterObservation,
    conditioner: SignalConditioner,
}

impl TrackedEmitter {
    /// Smoothed signal strength, rounded to whole dBm.
    pub fn smoothed_rssi(&self) -> i32 {
        self.conditioner.rounded().unwrap_or(self.latest.rssi)
    }

    /// Number of sightings folded into this entry.
    pub fn sightings(&self) -> u64 {
        self.conditioner.samples()
    }

    /// The latest observation with its raw strength replaced by the smoothed one.
    pub fn conditioned(&self) -> EmitterObservation {
        EmitterObservation {
            rssi: self.smoothed_rssi(),
            ..self.latest.clone()
        }
    }
}

/// Keeps one [`TrackedEmitter`] per identifier, in first-seen order.
#[derive(Debug, Default)]
pub struct ObservationTracker {
    order: Vec<String>,
    emitters: HashMap<String, TrackedEmitter>,
}

impl ObservationTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a single observation into the tracker.
    ///
    /// Stale sightings (older than the held one) leave the entry untouched,
    /// including its smoothed strength.
    pub fn observe(&mut self, observation: EmitterObservation) -> &TrackedEmitter {
        let id = observation.id.clone();

        if !self.emitters.contains_key(&id) {
            self.order.push(id.clone());
        }

        let entry = self
            .emitters
            .entry(id)
            .or_insert_with(|| TrackedEmitter {
                latest: observation.clone(),
                conditioner: SignalConditioner::new(),
            });

        if observation.timestamp < entry.latest.timestamp {
            tracing::trace!(
                id = %observation.id,
                stale_by_ms = (entry.latest.timestamp - observation.timestamp).num_milliseconds(),
                "Stale observation dropped"
            );
            return entry;
        }

        entry.conditioner.update(observation.rssi);
        entry.latest = observation;

        tracing::trace!(
            id = %entry.latest.id,
            rssi = entry.latest.rssi,
            smoothed = entry.smoothed_rssi(),
            "Observation folded"
        );

        entry
    }

    /// Drains every observation currently queued on the channel without blocking.
    ///
    /// Returns the number of observations consumed and whether the sender
    /// side has disconnected.
    pub fn drain(&mut self, rx: &Receiver<EmitterObservation>) -> (usize, bool) {
        let mut consumed = 0;
        loop {
            match rx.try_recv() {
                Ok(observation) => {
                    self.observe(observation);
                    consumed += 1;
                }
                Err(TryRecvError::Empty) => return (consumed, false),
                Err(TryRecvError::Disconnected) => return (consumed, true),
            }
        }
    }

    /// Returns the tracked state for an identifier.
    pub fn get(&self, id: &str) -> Option<&TrackedEmitter> {
        self.emitters.get(id)
    }

    /// Number of distinct emitters seen.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing has been observed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Conditioned observations in first-seen order.
    pub fn snapshot(&self) -> Vec<EmitterObservation> {
        self.order
            .iter()
            .filter_map(|id| self.emitters.get(id))
            .map(TrackedEmitter::conditioned)
            .collect()
    }

    /// Clears all state (new scan).
    pub fn reset(&mut self) {
        self.order.clear();
        self.emitters.clear();
    }
}
