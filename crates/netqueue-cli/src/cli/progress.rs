//! Throttled progress lines for long transfers.

use std::time::{Duration, Instant};

/// Minimum gap between two progress lines for the same transfer.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Decides when a progress tick is worth printing: the first tick, the final
/// one (fraction >= 1.0), and otherwise at most once per interval.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn ready(&mut self, fraction: f32) -> bool {
        let now = Instant::now();
        let due = fraction >= 1.0
            || self
                .last
                .map_or(true, |t| now.duration_since(t) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(PROGRESS_INTERVAL)
    }
}

/// Fraction as a percentage for display.
pub fn percent(fraction: f32) -> f32 {
    fraction * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_and_final_ticks_always_print() {
        let mut throttle = Throttle::new(Duration::from_secs(3600));
        assert!(throttle.ready(0.0));
        assert!(!throttle.ready(0.4));
        assert!(!throttle.ready(0.9));
        assert!(throttle.ready(1.0));
    }

    #[test]
    fn zero_interval_prints_everything() {
        let mut throttle = Throttle::new(Duration::ZERO);
        assert!((0..5).all(|i| throttle.ready(i as f32 / 10.0)));
    }

    #[test]
    fn percent_scales() {
        assert_eq!(percent(0.25), 25.0);
        assert_eq!(percent(1.0), 100.0);
    }
}
