//! The wait schedule shared by every poll loop: a short ramp-up burst, then a
//! constant steady interval, optionally truncated by a cumulative ceiling.

use std::time::Duration;

/// Parameters for a polling loop's wait schedule.
///
/// Every loop builds a fresh [`PollingIntervals`] from the schedule, so the
/// schedule itself carries no iteration state and is safe to reuse.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    ramp: Vec<Duration>,
    steady: Duration,
    ceiling: Option<Duration>,
}

impl Default for PollSchedule {
    /// Ramp-up of 100/200/300/500 ms, then one second forever, no ceiling.
    fn default() -> Self {
        Self {
            ramp: vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(500),
            ],
            steady: Duration::from_secs(1),
            ceiling: None,
        }
    }
}

impl PollSchedule {
    pub fn new(ramp: Vec<Duration>, steady: Duration) -> Self {
        Self {
            ramp,
            steady,
            ceiling: None,
        }
    }

    /// Stop producing intervals once their running sum would exceed
    /// `ceiling`. Callers that exhaust a ceilinged schedule treat it as a
    /// timeout.
    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    pub fn ceiling(&self) -> Option<Duration> {
        self.ceiling
    }

    pub fn intervals(&self) -> PollingIntervals {
        PollingIntervals {
            ramp: self.ramp.clone().into_iter(),
            steady: self.steady,
            ceiling: self.ceiling,
            elapsed: Duration::ZERO,
        }
    }
}

/// Lazy sequence of wait durations: the ramp-up values in order, then the
/// steady value forever. With a ceiling, an interval is only emitted while
/// the running sum including it stays within the ceiling; the sequence
/// truncates rather than erroring.
#[derive(Debug)]
pub struct PollingIntervals {
    ramp: std::vec::IntoIter<Duration>,
    steady: Duration,
    ceiling: Option<Duration>,
    elapsed: Duration,
}

impl Iterator for PollingIntervals {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let interval = self.ramp.next().unwrap_or(self.steady);
        let cumulative = self.elapsed + interval;
        if let Some(ceiling) = self.ceiling {
            if cumulative > ceiling {
                return None;
            }
        }
        self.elapsed = cumulative;
        Some(interval)
    }
}
