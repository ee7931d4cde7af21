//! Session configuration loaded from TOML.
//!
//! Every field has a default, so a config file only needs to name the
//! values it overrides:
//!
//! ```toml
//! [lockout]
//! threshold_bpm = 110
//!
//! [cue]
//! peak_gain = 0.1
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::BreathPhase;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value {field}: {detail}")]
    Invalid { field: &'static str, detail: String },
}

fn invalid(field: &'static str, detail: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        detail: detail.into(),
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Synthetic heart-rate generator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Tick period in milliseconds (default 500).
    pub update_interval_ms: u64,
    /// Retention window for the history buffer in milliseconds (default 30000).
    pub history_window_ms: u64,
    /// Resting rate (default 75).
    pub base_bpm: f64,
    /// Symmetric jitter half-width around `base_bpm` (default 5).
    pub variation: f64,
    /// Length of an injected spike in milliseconds (default 3000).
    pub spike_duration_ms: u64,
    /// Rate the spike eases toward (default 120).
    pub spike_target_bpm: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 500,
            history_window_ms: 30_000,
            base_bpm: 75.0,
            variation: 5.0,
            spike_duration_ms: 3_000,
            spike_target_bpm: 120.0,
        }
    }
}

/// Lockout trigger and countdown parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Lockout starts when the published BPM is strictly above this (default 100).
    pub threshold_bpm: u32,
    /// Lockout length in seconds (default 30).
    pub duration_secs: u32,
    /// Countdown refresh period in milliseconds (default 100).
    pub refresh_interval_ms: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            threshold_bpm: 100,
            duration_secs: 30,
            refresh_interval_ms: 100,
        }
    }
}

/// Breathing cycle cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathingConfig {
    /// Dwell time of every phase in milliseconds (default 4000).
    pub phase_duration_ms: u64,
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            phase_duration_ms: 4_000,
        }
    }
}

/// Per-phase tone frequencies in Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseFrequencies {
    pub inhale: f32,
    pub hold_after_inhale: f32,
    pub exhale: f32,
    pub hold_after_exhale: f32,
}

impl Default for PhaseFrequencies {
    fn default() -> Self {
        Self {
            inhale: 523.25,            // C5
            hold_after_inhale: 392.00, // G4
            exhale: 329.63,            // E4
            hold_after_exhale: 392.00, // G4
        }
    }
}

impl PhaseFrequencies {
    #[must_use]
    pub fn for_phase(&self, phase: BreathPhase) -> f32 {
        match phase {
            BreathPhase::Inhale => self.inhale,
            BreathPhase::HoldAfterInhale => self.hold_after_inhale,
            BreathPhase::Exhale => self.exhale,
            BreathPhase::HoldAfterExhale => self.hold_after_exhale,
        }
    }
}

/// Audio cue shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueConfig {
    /// Total tone length in milliseconds (default 150).
    pub duration_ms: u64,
    /// Attack and release ramp length in milliseconds (default 20).
    pub ramp_ms: u64,
    /// Sustain amplitude (default 0.15).
    pub peak_gain: f32,
    pub frequencies: PhaseFrequencies,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            duration_ms: 150,
            ramp_ms: 20,
            peak_gain: 0.15,
            frequencies: PhaseFrequencies::default(),
        }
    }
}

/// Looping "breathing cycle" counter shown during lockout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionConfig {
    /// Loop length in seconds (default 10).
    pub cycle_secs: u32,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self { cycle_secs: 10 }
    }
}

/// Vent shield timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VentConfig {
    /// Time between a dissolve request and the text being cleared (default 1500).
    pub dissolve_ms: u64,
}

impl Default for VentConfig {
    fn default() -> Self {
        Self { dissolve_ms: 1_500 }
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

/// Complete session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub signal: SignalConfig,
    pub lockout: LockoutConfig,
    pub breathing: BreathingConfig,
    pub cue: CueConfig,
    pub intervention: InterventionConfig,
    pub vent: VentConfig,
}

impl CooldownConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: CooldownConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject values that would stall a timer or produce a malformed cue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.signal;
        if s.update_interval_ms == 0 {
            return Err(invalid("signal.update_interval_ms", "must be > 0"));
        }
        if s.history_window_ms == 0 {
            return Err(invalid("signal.history_window_ms", "must be > 0"));
        }
        if s.spike_duration_ms == 0 {
            return Err(invalid("signal.spike_duration_ms", "must be > 0"));
        }
        if !s.variation.is_finite() || s.variation < 0.0 {
            return Err(invalid(
                "signal.variation",
                format!("must be a finite value >= 0, got {}", s.variation),
            ));
        }
        if !s.base_bpm.is_finite() || s.base_bpm - s.variation < 0.0 {
            return Err(invalid(
                "signal.base_bpm",
                format!("base - variation must be >= 0, got {}", s.base_bpm),
            ));
        }

        let l = &self.lockout;
        if l.duration_secs == 0 {
            return Err(invalid("lockout.duration_secs", "must be > 0"));
        }
        if l.refresh_interval_ms == 0 {
            return Err(invalid("lockout.refresh_interval_ms", "must be > 0"));
        }

        if self.breathing.phase_duration_ms == 0 {
            return Err(invalid("breathing.phase_duration_ms", "must be > 0"));
        }

        let c = &self.cue;
        if c.duration_ms == 0 {
            return Err(invalid("cue.duration_ms", "must be > 0"));
        }
        if c.duration_ms > self.breathing.phase_duration_ms {
            return Err(invalid(
                "cue.duration_ms",
                format!(
                    "cue ({} ms) outlasts its breathing phase ({} ms)",
                    c.duration_ms, self.breathing.phase_duration_ms
                ),
            ));
        }
        if c.ramp_ms.saturating_mul(2) > c.duration_ms {
            return Err(invalid(
                "cue.ramp_ms",
                format!(
                    "attack + release ({} ms) exceeds the cue length ({} ms)",
                    c.ramp_ms.saturating_mul(2),
                    c.duration_ms
                ),
            ));
        }
        if !(0.0..=1.0).contains(&c.peak_gain) {
            return Err(invalid(
                "cue.peak_gain",
                format!("must be within [0, 1], got {}", c.peak_gain),
            ));
        }
        for phase in BreathPhase::CYCLE {
            let hz = c.frequencies.for_phase(phase);
            if !hz.is_finite() || hz <= 0.0 {
                return Err(invalid(
                    "cue.frequencies",
                    format!("{phase} frequency must be > 0, got {hz}"),
                ));
            }
        }

        if self.intervention.cycle_secs == 0 {
            return Err(invalid("intervention.cycle_secs", "must be > 0"));
        }

        Ok(())
    }
}
