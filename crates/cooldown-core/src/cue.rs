//! Breathing cue tones: a sine oscillator shaped by a trapezoid envelope.
//!
//! ```text
//! gain
//! peak ┤   ┌───────────────┐
//!      │  /                 \
//!    0 ┼─┘                   └─
//!        0  ramp      dur-ramp  dur
//! ```
//!
//! The linear attack and release keep the tone click-free.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::config::CueConfig;
use crate::types::BreathPhase;

/// Fully specified cue tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_ms: u64,
    pub ramp_ms: u64,
    pub peak_gain: f32,
}

impl Tone {
    /// The cue tone for `phase`.
    #[must_use]
    pub fn for_phase(phase: BreathPhase, config: &CueConfig) -> Self {
        Self {
            frequency_hz: config.frequencies.for_phase(phase),
            duration_ms: config.duration_ms,
            ramp_ms: config.ramp_ms,
            peak_gain: config.peak_gain,
        }
    }

    /// Envelope gain `t_ms` milliseconds after the tone starts.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn gain_at(&self, t_ms: f32) -> f32 {
        let duration = self.duration_ms as f32;
        let ramp = (self.ramp_ms as f32).min(duration / 2.0);
        if !(0.0..duration).contains(&t_ms) {
            return 0.0;
        }
        if ramp <= 0.0 {
            return self.peak_gain;
        }
        if t_ms < ramp {
            self.peak_gain * (t_ms / ramp)
        } else if t_ms > duration - ramp {
            self.peak_gain * ((duration - t_ms) / ramp)
        } else {
            self.peak_gain
        }
    }

    /// Number of samples the tone spans at `sample_rate`.
    #[must_use]
    pub fn sample_count(&self, sample_rate: u32) -> usize {
        let n = u64::from(sample_rate).saturating_mul(self.duration_ms) / 1_000;
        usize::try_from(n).unwrap_or(usize::MAX)
    }

    /// Render the tone as mono `f32` samples.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let n = self.sample_count(sample_rate);
        let rate = sample_rate as f32;
        let mut buffer = Vec::with_capacity(n);
        let mut phase = 0.0f32;
        let step = self.frequency_hz / rate;

        for i in 0..n {
            let t_ms = i as f32 * 1_000.0 / rate;
            buffer.push((phase * TAU).sin() * self.gain_at(t_ms));
            // Wrap to keep precision over long tones
            phase = (phase + step).fract();
        }
        buffer
    }
}
