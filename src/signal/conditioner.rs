//! Adaptive exponential moving average for RSSI readings.
//!
//! Small differences are treated as jitter and barely move the
//! estimate. Large jumps are treated as genuine proximity changes
//! and are followed quickly.

/// Weight applied when the reading jumps by more than [`LARGE_JUMP_DB`].
const ALPHA_LARGE: f64 = 0.7;
/// Weight applied when the reading moves by more than [`MEDIUM_JUMP_DB`].
const ALPHA_MEDIUM: f64 = 0.4;
/// Weight applied to small jitter.
const ALPHA_SMALL: f64 = 0.1;

const LARGE_JUMP_DB: f64 = 10.0;
const MEDIUM_JUMP_DB: f64 = 5.0;

/// Produces a new strength estimate from the current reading and the
/// previous estimate.
///
/// `None` means no prior reading exists (cold start), in which case the
/// current reading is returned unchanged.
pub fn filter_signal(current: i32, previous: Option<f64>) -> f64 {
    let current = f64::from(current);
    let Some(previous) = previous else {
        return current;
    };

    let diff = (current - previous).abs();
    let alpha = if diff > LARGE_JUMP_DB {
        ALPHA_LARGE
    } else if diff > MEDIUM_JUMP_DB {
        ALPHA_MEDIUM
    } else {
        ALPHA_SMALL
    };

    alpha * current + (1.0 - alpha) * previous
}

/// Stateful wrapper around [`filter_signal`] for a single emitter.
#[derive(Debug, Clone, Default)]
pub struct SignalConditioner {
    estimate: Option<f64>,
    samples: u64,
}

impl SignalConditioner {
    /// Conditioner with no reading yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a reading and returns the updated estimate.
    pub fn update(&mut self, reading: i32) -> f64 {
        let estimate = filter_signal(reading, self.estimate);
        self.estimate = Some(estimate);
        self.samples += 1;
        estimate
    }

    /// Current estimate, if any reading has been seen.
    #[inline]
    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }

    /// Current estimate rounded to whole dBm.
    pub fn rounded(&self) -> Option<i32> {
        self.estimate.map(|e| e.round() as i32)
    }

    /// Number of readings processed.
    #[inline]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Forgets all history.
    pub fn reset(&mut self) {
        self.estimate = None;
        self.samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_cold_start_returns_current() {
        assert!(approx(filter_signal(-63, None), -63.0));
    }

    #[test]
    fn test_small_jitter_uses_low_weight() {
        // diff = 4 -> alpha 0.1
        assert!(approx(filter_signal(-60, Some(-64.0)), 0.1 * -60.0 + 0.9 * -64.0));
    }

    #[test]
    fn test_medium_jump_uses_medium_weight() {
        // diff = 8 -> alpha 0.4
        assert!(approx(filter_signal(-72, Some(-80.0)), 0.4 * -72.0 + 0.6 * -80.0));
    }

    #[test]
    fn test_large_jump_uses_high_weight() {
        // diff = 40 -> alpha 0.7
        assert!(approx(filter_signal(-40, Some(-80.0)), 0.7 * -40.0 + 0.3 * -80.0));
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        // diff exactly 10 is "medium", exactly 5 is "small"
        assert!(approx(filter_signal(-50, Some(-60.0)), 0.4 * -50.0 + 0.6 * -60.0));
        assert!(approx(filter_signal(-55, Some(-60.0)), 0.1 * -55.0 + 0.9 * -60.0));
    }

    #[test]
    fn test_conditioner_tracks_state() {
        let mut conditioner = SignalConditioner::new();
        assert!(conditioner.estimate().is_none());

        assert!(approx(conditioner.update(-70), -70.0));
        conditioner.update(-68);
        assert_eq!(conditioner.samples(), 2);
        assert_eq!(conditioner.rounded(), Some(-70));

        conditioner.reset();
        assert!(conditioner.estimate().is_none());
    }
}
