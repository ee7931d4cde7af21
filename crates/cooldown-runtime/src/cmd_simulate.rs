//! `cooldown simulate`: scripted session on a virtual clock.
//!
//! Runs on a paused tokio runtime, so a 40 s session completes instantly
//! and the same seed always produces the same event stream.

use std::sync::Arc;
use std::time::Duration;

use cooldown_audio::{AudioBackend, OutputCall};
use cooldown_core::CooldownConfig;
use tokio::time::Instant;

use crate::cli::SimulateOpts;
use crate::context::SelectedBackend;
use crate::session::{Intent, Session, SessionEvent, SessionOptions, SessionSnapshot};

/// Scripted intents ordered by session offset. Ties keep the order
/// spike, audio on, audio off.
pub fn script(opts: &SimulateOpts) -> Vec<(u64, Intent)> {
    let mut steps: Vec<(u64, Intent)> = opts
        .spike_at
        .iter()
        .map(|&at| (at, Intent::SimulateSpike))
        .chain(opts.audio_on_at.iter().map(|&at| (at, Intent::SetAudioEnabled(true))))
        .chain(opts.audio_off_at.iter().map(|&at| (at, Intent::SetAudioEnabled(false))))
        .collect();
    steps.sort_by_key(|(at, _)| *at);
    steps
}

/// Run the scripted session to completion.
pub async fn simulate(
    config: CooldownConfig,
    backend: Arc<dyn AudioBackend>,
    opts: &SimulateOpts,
) -> anyhow::Result<(Vec<SessionEvent>, SessionSnapshot)> {
    let start = Instant::now();
    let options = SessionOptions {
        seed: Some(opts.seed),
        epoch_ms: Some(opts.epoch_ms),
    };
    let (session, mut handle) = Session::new(config, backend, options);
    let task = tokio::spawn(session.run());

    let end = Duration::from_secs(opts.duration_secs);
    for (at, intent) in script(opts) {
        let offset = Duration::from_millis(at);
        if offset > end {
            tracing::debug!(at, "scripted intent after end of simulation skipped");
            continue;
        }
        tokio::time::sleep_until(start + offset).await;
        handle.intents.send(intent)?;
    }
    tokio::time::sleep_until(start + end).await;
    handle.intents.send(Intent::Shutdown)?;
    let last = task.await?;

    let mut events = Vec::new();
    while let Some(event) = handle.events.recv().await {
        events.push(event);
    }
    Ok((events, last))
}

/// Final NDJSON line: the last snapshot, plus the output call log when the
/// memory backend recorded one.
fn final_line(last: &SessionSnapshot, calls: Option<Vec<OutputCall>>) -> serde_json::Value {
    let mut line = serde_json::json!({ "event": "final_snapshot", "snapshot": last });
    if let Some(calls) = calls {
        line["calls"] = serde_json::json!(calls);
    }
    line
}

/// Entry point for `cooldown simulate`.
pub async fn cmd_simulate(
    config: CooldownConfig,
    selected: &SelectedBackend,
    opts: &SimulateOpts,
) -> anyhow::Result<()> {
    let (events, last) = simulate(config, Arc::clone(&selected.backend), opts).await?;
    let mut lockouts = 0;
    for event in &events {
        match event {
            SessionEvent::Bpm { .. } if opts.quiet_ticks => continue,
            SessionEvent::LockoutStarted { .. } => lockouts += 1,
            _ => {}
        }
        println!("{}", serde_json::to_string(event)?);
    }
    println!("{}", final_line(&last, selected.call_log()));
    tracing::info!(events = events.len(), lockouts, "simulation finished");
    Ok(())
}
