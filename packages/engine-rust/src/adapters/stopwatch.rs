//! Monotonic stopwatch on the tokio clock, so paused-time tests can drive it.

use std::time::Duration;

use tokio::time::Instant;

use crate::traits::{Stopwatch, StopwatchSource};

#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicStopwatch {
    started_at: Option<Instant>,
}

impl MonotonicStopwatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

impl Stopwatch for MonotonicStopwatch {
    fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn elapsed(&self) -> Duration {
        self.started_at.map_or(Duration::ZERO, |at| at.elapsed())
    }

    fn reset(&mut self) {
        self.started_at = None;
    }
}

/// Hands out a fresh [`MonotonicStopwatch`] per invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicStopwatchSource;

impl StopwatchSource for MonotonicStopwatchSource {
    fn stopwatch(&self) -> Box<dyn Stopwatch> {
        Box::new(MonotonicStopwatch::new())
    }
}
