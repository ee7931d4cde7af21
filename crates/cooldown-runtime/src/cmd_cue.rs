//! `cooldown cue`: render a single breathing cue to WAV.

use anyhow::Context;
use cooldown_audio::render_cue;
use cooldown_core::{CooldownConfig, Tone};

use crate::cli::CueOpts;

/// Entry point for `cooldown cue`.
pub fn cmd_cue(config: &CooldownConfig, opts: &CueOpts) -> anyhow::Result<()> {
    let tone = Tone::for_phase(opts.phase, &config.cue);
    let samples = render_cue(&tone, opts.sample_rate, &opts.out)
        .with_context(|| format!("writing {}", opts.out.display()))?;
    println!(
        "{} ({} Hz, {} ms, {samples} samples) -> {}",
        opts.phase.label(),
        tone.frequency_hz,
        tone.duration_ms,
        opts.out.display()
    );
    Ok(())
}
