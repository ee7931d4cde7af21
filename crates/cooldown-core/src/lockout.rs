//! Lockout countdown state machine.
//!
//! The countdown is always recomputed from the absolute deadline
//! (`end_ms`), never decremented, so refresh jitter or a stalled timer
//! cannot stretch or shrink the lockout.
//!
//! Transitions:
//! - `inactive → active`: published BPM strictly above the threshold
//!   ([`LockoutController::observe_bpm`]) or an explicit
//!   [`LockoutController::start`].
//! - `active → active`: further crossings are ignored (debounce).
//! - `active → inactive`: [`LockoutController::refresh`] computes 0 remaining.

use serde::{Deserialize, Serialize};

use crate::config::LockoutConfig;

/// Observable lockout state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub active: bool,
    pub remaining_seconds: u32,
    /// Absolute deadline in epoch milliseconds; `None` while inactive.
    pub end_ms: Option<u64>,
}

/// Result of a countdown refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutRefresh {
    /// Not locked; nothing to do.
    Idle,
    /// Still locked with the given whole seconds remaining.
    Counting { remaining_seconds: u32 },
    /// The deadline passed on this refresh; lockout is now inactive.
    Ended,
}

#[derive(Debug, Clone)]
pub struct LockoutController {
    config: LockoutConfig,
    state: LockoutState,
}

impl LockoutController {
    #[must_use]
    pub fn new(config: LockoutConfig) -> Self {
        let state = LockoutState {
            active: false,
            remaining_seconds: config.duration_secs,
            end_ms: None,
        };
        Self { config, state }
    }

    #[must_use]
    pub fn state(&self) -> LockoutState {
        self.state
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.active
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.state.remaining_seconds
    }

    #[must_use]
    pub fn end_ms(&self) -> Option<u64> {
        self.state.end_ms
    }

    /// Threshold check for a freshly published BPM.
    ///
    /// Returns `true` only when this observation started a lockout.
    pub fn observe_bpm(&mut self, bpm: u32, now_ms: u64) -> bool {
        if bpm > self.config.threshold_bpm {
            self.start(now_ms)
        } else {
            false
        }
    }

    /// Enter lockout. No-op (returns `false`) while already locked.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.state.active {
            return false;
        }
        let duration_ms = u64::from(self.config.duration_secs) * 1_000;
        self.state = LockoutState {
            active: true,
            remaining_seconds: self.config.duration_secs,
            end_ms: Some(now_ms.saturating_add(duration_ms)),
        };
        true
    }

    /// Recompute the remaining seconds from the deadline.
    pub fn refresh(&mut self, now_ms: u64) -> LockoutRefresh {
        let Some(end_ms) = self.state.end_ms.filter(|_| self.state.active) else {
            return LockoutRefresh::Idle;
        };

        let remaining = remaining_seconds(end_ms, now_ms);
        self.state.remaining_seconds = remaining;

        if remaining == 0 {
            self.state.active = false;
            self.state.end_ms = None;
            LockoutRefresh::Ended
        } else {
            LockoutRefresh::Counting {
                remaining_seconds: remaining,
            }
        }
    }
}

/// `max(0, ceil((end - now) / 1000))`.
#[must_use]
pub fn remaining_seconds(end_ms: u64, now_ms: u64) -> u32 {
    let secs = end_ms.saturating_sub(now_ms).div_ceil(1_000);
    u32::try_from(secs).unwrap_or(u32::MAX)
}
