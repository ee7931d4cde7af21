//! Audio arming state machine.
//!
//! Tracks whether cue playback is allowed. The asynchronous resume of a
//! suspended output races with `stop`; every resume is tagged with an
//! [`ArmToken`] and its outcome is applied only if that token is still the
//! pending one. `PermanentlyFailed` is terminal.
//!
//! ```text
//!  Unarmed ──request──▶ Arming{token} ──resolve(ok)──▶ Armed
//!     ▲  │                  │                         │
//!     │  └─ running ────────┼────────────────────────▶│
//!     │                     └─resolve(err)─▶ PermanentlyFailed
//!     └──────────── disarm ─────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// Identifies one arm request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArmToken(pub u64);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArmState {
    #[default]
    Unarmed,
    /// Waiting for the output resume tagged with `token`.
    Arming { token: ArmToken },
    Armed,
    /// Audio is unavailable for the rest of this player's life.
    PermanentlyFailed,
}

/// What the caller should do after [`ArmMachine::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmRequest {
    /// Open (if needed) and start the output.
    Proceed,
    /// Nothing to do; the machine is already in the given state.
    Skip(ArmState),
}

/// Outcome of applying a resume result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeResolution {
    Armed,
    Failed,
    /// The token no longer matches the pending request; result discarded.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct ArmMachine {
    state: ArmState,
    last_token: u64,
}

impl ArmMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> ArmState {
        self.state
    }

    /// Playback is allowed only in `Armed`.
    #[must_use]
    pub fn can_play(&self) -> bool {
        self.state == ArmState::Armed
    }

    /// Ask to arm. Idempotent: only `Unarmed` proceeds.
    pub fn request(&self) -> ArmRequest {
        match self.state {
            ArmState::Unarmed => ArmRequest::Proceed,
            other => ArmRequest::Skip(other),
        }
    }

    /// The output is suspended; wait for a resume tagged with the returned token.
    pub fn begin_resume(&mut self) -> ArmToken {
        self.last_token += 1;
        let token = ArmToken(self.last_token);
        self.state = ArmState::Arming { token };
        token
    }

    /// The output is already running.
    pub fn mark_armed(&mut self) {
        if self.state != ArmState::PermanentlyFailed {
            self.state = ArmState::Armed;
        }
    }

    /// Opening or starting the output failed.
    pub fn fail(&mut self) {
        self.state = ArmState::PermanentlyFailed;
    }

    /// Apply the outcome of the resume tagged with `token`.
    pub fn resolve(&mut self, token: ArmToken, succeeded: bool) -> ResumeResolution {
        match self.state {
            ArmState::Arming { token: pending } if pending == token => {
                if succeeded {
                    self.state = ArmState::Armed;
                    ResumeResolution::Armed
                } else {
                    self.state = ArmState::PermanentlyFailed;
                    ResumeResolution::Failed
                }
            }
            _ => ResumeResolution::Stale,
        }
    }

    /// Leave `Armed`/`Arming`. Returns whether the state changed.
    ///
    /// A pending resume becomes stale. `PermanentlyFailed` is kept.
    pub fn disarm(&mut self) -> bool {
        match self.state {
            ArmState::Armed | ArmState::Arming { .. } => {
                self.state = ArmState::Unarmed;
                true
            }
            ArmState::Unarmed | ArmState::PermanentlyFailed => false,
        }
    }
}
