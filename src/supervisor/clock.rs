//! Ticks-per-second counter for the polling loop

use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Counts loop iterations and publishes the count once per second
#[derive(Debug, Clone)]
pub struct TickClock {
    window_start: Instant,
    counter: u32,
    last: u32,
}

impl TickClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        TickClock {
            window_start: now,
            counter: 0,
            last: 0,
        }
    }

    /// Record one iteration
    ///
    /// Returns the freshly published count when a window closes.
    pub fn tick(&mut self) -> Option<u32> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<u32> {
        if now.duration_since(self.window_start) >= WINDOW {
            self.last = self.counter;
            self.counter = 0;
            self.window_start = now;
            Some(self.last)
        } else {
            self.counter = self.counter.saturating_add(1);
            None
        }
    }

    /// Count published at the end of the last full window
    pub fn ticks_per_second(&self) -> u32 {
        self.last
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
