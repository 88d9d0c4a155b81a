//! General time utility functions

use chrono;
use std::time::{Duration, Instant};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Fixed-rate cycle timer.
///
/// Each call to [`Rate::sleep`] blocks until the next nominal cycle boundary, measured from the
/// previous boundary rather than from the end of the cycle body. If the body overran the period
/// the call returns immediately and reports the overrun. Overruns of more than one full period
/// restart the schedule from the current instant instead of trying to catch up.
#[derive(Debug, Clone)]
pub struct Rate {
    period: Duration,
    last_boundary: Instant
}

/// Result of sleeping to the end of a cycle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CycleEnd {
    /// The cycle finished early and the timer slept until the boundary.
    OnTime,

    /// The cycle body took longer than the period, by the given duration.
    Overrun(Duration)
}

impl Rate {
    /// Create a new timer running at `frequency_hz`, with the first boundary one period from now.
    ///
    /// # Panics
    /// - If `frequency_hz` is not finite and positive.
    pub fn new(frequency_hz: f64) -> Self {
        assert!(
            frequency_hz.is_finite() && frequency_hz > 0.0,
            "Rate frequency must be finite and positive, got {}",
            frequency_hz
        );

        Self {
            period: Duration::from_secs_f64(1.0 / frequency_hz),
            last_boundary: Instant::now()
        }
    }

    /// The nominal period of the cycle.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next cycle boundary.
    pub fn sleep(&mut self) -> CycleEnd {
        let deadline = self.last_boundary + self.period;
        let now = Instant::now();

        match deadline.checked_duration_since(now) {
            Some(remaining) => {
                std::thread::sleep(remaining);
                self.last_boundary = deadline;
                CycleEnd::OnTime
            },
            None => {
                let overrun = now - deadline;

                self.last_boundary = if overrun > self.period {
                    now
                }
                else {
                    deadline
                };

                CycleEnd::Overrun(overrun)
            }
        }
    }
}
