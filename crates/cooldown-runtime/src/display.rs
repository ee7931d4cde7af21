//! Terminal presentation: status line, BPM sparkline and stdin intent parsing.

use cooldown_core::{ArmState, BpmSample, VentState};

use crate::session::{Intent, SessionSnapshot};

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render the last `width` samples as a sparkline.
///
/// The scale spans at least 20 BPM so baseline jitter does not fill the
/// whole bar range.
pub fn sparkline(history: &[BpmSample], width: usize) -> String {
    let start = history.len().saturating_sub(width);
    let window = &history[start..];
    if window.is_empty() {
        return String::new();
    }
    let lo = window.iter().map(|s| s.value).fold(f64::INFINITY, f64::min);
    let hi = window.iter().map(|s| s.value).fold(f64::NEG_INFINITY, f64::max);
    let span = (hi - lo).max(20.0);
    window
        .iter()
        .map(|s| {
            #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = (((s.value - lo) / span) * 7.0).round() as usize;
            BARS[idx.min(BARS.len() - 1)]
        })
        .collect()
}

fn audio_label(snapshot: &SessionSnapshot) -> &'static str {
    match (snapshot.audio_enabled, snapshot.audio) {
        (_, Some(ArmState::PermanentlyFailed)) => "unavailable",
        (false, _) => "off",
        (true, Some(ArmState::Armed)) => "on",
        (true, Some(ArmState::Arming { .. })) => "starting",
        (true, _) => "off",
    }
}

/// One-line summary of the session.
pub fn status_line(snapshot: &SessionSnapshot) -> String {
    let spark = sparkline(&snapshot.history, 30);
    if snapshot.lockout.active {
        let phase = snapshot.phase.map_or("", |p| p.label());
        let cycle = snapshot.intervention.unwrap_or(0);
        format!(
            "LOCKED {:>2}s | {:<11} | cycle {:>2} | audio {} | {:>3} bpm {spark}",
            snapshot.lockout.remaining_seconds,
            phase,
            cycle,
            audio_label(snapshot),
            snapshot.current_bpm,
        )
    } else {
        let vent = match snapshot.vent {
            VentState::Dissolving { .. } => "dissolving".to_string(),
            VentState::Idle if snapshot.vent_text.is_empty() => "empty".to_string(),
            VentState::Idle => format!("{} chars", snapshot.vent_text.chars().count()),
        };
        format!(
            "{:>3} bpm {spark} | vent: {vent}",
            snapshot.current_bpm
        )
    }
}

/// Parse one stdin line into an intent. Blank lines yield `Ok(None)`.
pub fn parse_intent(line: &str) -> Result<Option<Intent>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let intent = match (word.to_ascii_lowercase().as_str(), rest) {
        ("spike", "") => Intent::SimulateSpike,
        ("audio", "") => Intent::ToggleAudio,
        ("audio", "on") => Intent::SetAudioEnabled(true),
        ("audio", "off") => Intent::SetAudioEnabled(false),
        ("vent", text) if !text.is_empty() => Intent::VentText(text.to_string()),
        ("dissolve", "") => Intent::Dissolve,
        ("quit" | "exit", "") => Intent::Shutdown,
        _ => {
            return Err(format!(
                "unknown command {line:?} (spike, audio [on|off], vent <text>, dissolve, quit)"
            ));
        }
    };
    Ok(Some(intent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooldown_core::{BreathPhase, LockoutState};

    fn samples(values: &[f64]) -> Vec<BpmSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| BpmSample::new(500 * (i as u64 + 1), *v))
            .collect()
    }

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            now_ms: 0,
            current_bpm: 76,
            history: samples(&[74.0, 76.0]),
            lockout: LockoutState {
                active: false,
                remaining_seconds: 0,
                end_ms: None,
            },
            phase: None,
            intervention: None,
            audio_enabled: false,
            audio: None,
            vent_text: String::new(),
            vent: VentState::Idle,
        }
    }

    #[test]
    fn sparkline_scales_spike() {
        let line = sparkline(&samples(&[75.0, 85.0, 98.0, 110.0, 118.0]), 30);
        assert_eq!(line.chars().count(), 5);
        assert!(line.starts_with('▁'));
        assert!(line.ends_with('█'));
    }

    #[test]
    fn sparkline_keeps_last_width_samples() {
        let line = sparkline(&samples(&[70.0; 40]), 30);
        assert_eq!(line.chars().count(), 30);
        assert_eq!(sparkline(&[], 30), "");
    }

    #[test]
    fn status_line_unlocked() {
        let mut snap = snapshot();
        assert!(status_line(&snap).contains("vent: empty"));
        snap.vent_text = "grr".into();
        assert!(status_line(&snap).contains("vent: 3 chars"));
    }

    #[test]
    fn status_line_locked_shows_phase_and_audio() {
        let mut snap = snapshot();
        snap.lockout = LockoutState {
            active: true,
            remaining_seconds: 27,
            end_ms: Some(30_000),
        };
        snap.phase = Some(BreathPhase::Exhale);
        snap.intervention = Some(4);
        snap.audio_enabled = true;
        snap.audio = Some(ArmState::Armed);
        let line = status_line(&snap);
        assert!(line.starts_with("LOCKED 27s"));
        assert!(line.contains("Breathe Out"));
        assert!(line.contains("cycle  4"));
        assert!(line.contains("audio on"));

        snap.audio = Some(ArmState::PermanentlyFailed);
        assert!(status_line(&snap).contains("audio unavailable"));
    }

    #[test]
    fn parses_intents() {
        assert_eq!(parse_intent("spike"), Ok(Some(Intent::SimulateSpike)));
        assert_eq!(parse_intent(" audio "), Ok(Some(Intent::ToggleAudio)));
        assert_eq!(
            parse_intent("audio off"),
            Ok(Some(Intent::SetAudioEnabled(false)))
        );
        assert_eq!(
            parse_intent("vent  stuck in traffic"),
            Ok(Some(Intent::VentText("stuck in traffic".into())))
        );
        assert_eq!(parse_intent("QUIT"), Ok(Some(Intent::Shutdown)));
        assert_eq!(parse_intent(""), Ok(None));
        assert!(parse_intent("vent").is_err());
        assert!(parse_intent("audio loud").is_err());
    }
}
