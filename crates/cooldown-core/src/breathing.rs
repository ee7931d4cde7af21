//! Box-breathing phase cycle.
//!
//! The cycle exists only while mounted. Mounting emits the initial phase
//! immediately; every subsequent [`PhaseCycle::advance`] (driven by the
//! runtime's phase timer) moves to the next phase. Unmounting is dropping
//! the value together with its timer.

use serde::{Deserialize, Serialize};

use crate::types::BreathPhase;

/// A phase change delivered to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub phase: BreathPhase,
    /// Epoch millisecond of the transition.
    pub at_ms: u64,
    /// Zero-based count of transitions since mount (0 = initial phase).
    pub sequence: u64,
}

#[derive(Debug, Clone)]
pub struct PhaseCycle {
    phase: BreathPhase,
    sequence: u64,
}

impl PhaseCycle {
    /// Mount the cycle at `now_ms`. Returns the cycle and the initial phase change.
    #[must_use]
    pub fn mount(now_ms: u64) -> (Self, PhaseChange) {
        let cycle = Self {
            phase: BreathPhase::Inhale,
            sequence: 0,
        };
        let initial = PhaseChange {
            phase: cycle.phase,
            at_ms: now_ms,
            sequence: 0,
        };
        (cycle, initial)
    }

    #[must_use]
    pub fn phase(&self) -> BreathPhase {
        self.phase
    }

    /// Move to the next phase.
    pub fn advance(&mut self, now_ms: u64) -> PhaseChange {
        self.phase = self.phase.next();
        self.sequence += 1;
        PhaseChange {
            phase: self.phase,
            at_ms: now_ms,
            sequence: self.sequence,
        }
    }
}
