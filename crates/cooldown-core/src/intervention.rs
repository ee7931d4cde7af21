//! Looping "breathing cycle" counter shown while the intervention runs.
//!
//! Counts `cycle_secs, cycle_secs - 1, .., 1` once per second and wraps
//! back to `cycle_secs`.

use crate::config::InterventionConfig;

#[derive(Debug, Clone)]
pub struct InterventionCountdown {
    cycle_secs: u32,
    remaining: u32,
}

impl InterventionCountdown {
    #[must_use]
    pub fn new(config: &InterventionConfig) -> Self {
        let cycle_secs = config.cycle_secs.max(1);
        Self {
            cycle_secs,
            remaining: cycle_secs,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// One-second tick. Returns the new value.
    pub fn tick(&mut self) -> u32 {
        self.remaining = if self.remaining <= 1 {
            self.cycle_secs
        } else {
            self.remaining - 1
        };
        self.remaining
    }
}
