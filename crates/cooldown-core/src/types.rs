//! Shared value types: BPM samples and breathing phases.

use serde::{Deserialize, Serialize};

/// One generated heart-rate value.
///
/// `value` is the unrounded simulator output; the published BPM is its
/// rounded integer (see [`BpmSample::rounded`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpmSample {
    /// Epoch milliseconds at which the sample was generated.
    pub timestamp_ms: u64,
    pub value: f64,
}

impl BpmSample {
    #[must_use]
    pub fn new(timestamp_ms: u64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }

    /// Rounded BPM as published to observers.
    #[must_use]
    pub fn rounded(&self) -> u32 {
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bpm = self.value.max(0.0).round() as u32;
        bpm
    }
}

/// Box-breathing phase. Cyclic, fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathPhase {
    Inhale,
    HoldAfterInhale,
    Exhale,
    HoldAfterExhale,
}

impl BreathPhase {
    /// All phases in cycle order.
    pub const CYCLE: [BreathPhase; 4] = [
        BreathPhase::Inhale,
        BreathPhase::HoldAfterInhale,
        BreathPhase::Exhale,
        BreathPhase::HoldAfterExhale,
    ];

    /// The phase that follows `self` in the cycle.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            BreathPhase::Inhale => BreathPhase::HoldAfterInhale,
            BreathPhase::HoldAfterInhale => BreathPhase::Exhale,
            BreathPhase::Exhale => BreathPhase::HoldAfterExhale,
            BreathPhase::HoldAfterExhale => BreathPhase::Inhale,
        }
    }

    /// Instruction shown to the user during this phase.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BreathPhase::Inhale => "Breathe In",
            BreathPhase::HoldAfterInhale | BreathPhase::HoldAfterExhale => "Hold",
            BreathPhase::Exhale => "Breathe Out",
        }
    }

    /// Stable identifier used on the command line and in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BreathPhase::Inhale => "inhale",
            BreathPhase::HoldAfterInhale => "hold_after_inhale",
            BreathPhase::Exhale => "exhale",
            BreathPhase::HoldAfterExhale => "hold_after_exhale",
        }
    }
}

impl std::fmt::Display for BreathPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BreathPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "inhale" => Ok(BreathPhase::Inhale),
            "hold_after_inhale" | "hold1" => Ok(BreathPhase::HoldAfterInhale),
            "exhale" => Ok(BreathPhase::Exhale),
            "hold_after_exhale" | "hold2" => Ok(BreathPhase::HoldAfterExhale),
            other => Err(format!("unknown breath phase: {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_order_wraps() {
        let mut phase = BreathPhase::Inhale;
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(phase);
            phase = phase.next();
        }
        assert_eq!(
            seen,
            vec![
                BreathPhase::Inhale,
                BreathPhase::HoldAfterInhale,
                BreathPhase::Exhale,
                BreathPhase::HoldAfterExhale,
                BreathPhase::Inhale,
            ]
        );
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("inhale".parse::<BreathPhase>(), Ok(BreathPhase::Inhale));
        assert_eq!("hold1".parse::<BreathPhase>(), Ok(BreathPhase::HoldAfterInhale));
        assert_eq!(
            "Hold-After-Exhale".parse::<BreathPhase>(),
            Ok(BreathPhase::HoldAfterExhale)
        );
        assert!("sigh".parse::<BreathPhase>().is_err());
    }

    #[test]
    fn rounded_sample_uses_nearest_integer() {
        assert_eq!(BpmSample::new(0, 97.5).rounded(), 98);
        assert_eq!(BpmSample::new(0, 74.49).rounded(), 74);
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&BreathPhase::HoldAfterInhale).unwrap();
        assert_eq!(json, "\"hold_after_inhale\"");
    }
}
