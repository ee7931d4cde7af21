//! Vent shield: a scratch buffer the user can type into and "dissolve".
//!
//! Nothing is sent or stored. A dissolve holds the text for
//! `dissolve_ms` (the animation window) and then clears it. Input is
//! refused while the session is locked or a dissolve is in flight.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::VentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VentError {
    #[error("vent shield is disabled during lockout")]
    Disabled,
    #[error("nothing to dissolve")]
    Empty,
    #[error("a dissolve is already in progress")]
    Dissolving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VentState {
    Idle,
    Dissolving { until_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct VentShield {
    dissolve_ms: u64,
    text: String,
    state: VentState,
}

impl VentShield {
    #[must_use]
    pub fn new(config: &VentConfig) -> Self {
        Self {
            dissolve_ms: config.dissolve_ms,
            text: String::new(),
            state: VentState::Idle,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn state(&self) -> VentState {
        self.state
    }

    /// Append a line of text.
    pub fn write(&mut self, line: &str, locked: bool) -> Result<(), VentError> {
        self.check_writable(locked)?;
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);
        Ok(())
    }

    /// Start dissolving. Returns the epoch millisecond the text clears at.
    pub fn dissolve(&mut self, now_ms: u64, locked: bool) -> Result<u64, VentError> {
        self.check_writable(locked)?;
        if self.text.trim().is_empty() {
            return Err(VentError::Empty);
        }
        let until_ms = now_ms.saturating_add(self.dissolve_ms);
        self.state = VentState::Dissolving { until_ms };
        Ok(until_ms)
    }

    /// Finish a dissolve whose window has elapsed. Returns `true` if text was cleared.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.state {
            VentState::Dissolving { until_ms } if now_ms >= until_ms => {
                self.text.clear();
                self.state = VentState::Idle;
                true
            }
            _ => false,
        }
    }

    fn check_writable(&self, locked: bool) -> Result<(), VentError> {
        if locked {
            return Err(VentError::Disabled);
        }
        if matches!(self.state, VentState::Dissolving { .. }) {
            return Err(VentError::Dissolving);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shield() -> VentShield {
        VentShield::new(&VentConfig::default())
    }

    #[test]
    fn write_appends_lines() {
        let mut v = shield();
        v.write("first", false).unwrap();
        v.write("second", false).unwrap();
        assert_eq!(v.text(), "first\nsecond");
    }

    #[test]
    fn dissolve_clears_after_window() {
        let mut v = shield();
        v.write("argh", false).unwrap();
        assert_eq!(v.dissolve(1_000, false), Ok(2_500));
        assert!(!v.poll(2_499));
        assert_eq!(v.text(), "argh");
        assert!(v.poll(2_500));
        assert_eq!(v.text(), "");
        assert_eq!(v.state(), VentState::Idle);
    }

    #[test]
    fn input_refused_while_dissolving() {
        let mut v = shield();
        v.write("argh", false).unwrap();
        v.dissolve(0, false).unwrap();
        assert_eq!(v.write("more", false), Err(VentError::Dissolving));
        assert_eq!(v.dissolve(10, false), Err(VentError::Dissolving));
    }

    #[test]
    fn blank_text_cannot_dissolve() {
        let mut v = shield();
        assert_eq!(v.dissolve(0, false), Err(VentError::Empty));
        v.write("   ", false).unwrap();
        assert_eq!(v.dissolve(0, false), Err(VentError::Empty));
    }

    #[test]
    fn locked_session_disables_shield() {
        let mut v = shield();
        assert_eq!(v.write("x", true), Err(VentError::Disabled));
        v.write("x", false).unwrap();
        assert_eq!(v.dissolve(0, true), Err(VentError::Disabled));
    }

    #[test]
    fn poll_while_idle_is_noop() {
        let mut v = shield();
        assert!(!v.poll(10_000));
    }
}
