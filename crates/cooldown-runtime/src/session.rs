//! Session: composes signal, lockout, breathing panel and vent shield in a
//! single tokio task.
//!
//! Every component and every timer is owned by [`Session`]. Handlers run to
//! completion between `select!` polls, so no component state is locked.
//! The only concurrent work is the audio resume, which runs in a spawned
//! task and reports back over a channel tagged with its mount id and arm
//! token.

use std::sync::Arc;
use std::time::Duration;

use cooldown_audio::{AudioBackend, AudioError, CuePlayer, PendingResume};
use cooldown_core::{
    ArmState, ArmToken, BpmSample, BreathPhase, CooldownConfig, InterventionCountdown,
    LockoutController, LockoutRefresh, LockoutState, PhaseChange, PhaseCycle, ResumeResolution,
    SignalSimulator, VentShield, VentState,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::clock::SessionClock;

// ---------------------------------------------------------------------------
// Interface types
// ---------------------------------------------------------------------------

/// User intents flowing into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SimulateSpike,
    SetAudioEnabled(bool),
    ToggleAudio,
    VentText(String),
    Dissolve,
    Shutdown,
}

impl Intent {
    fn name(&self) -> &'static str {
        match self {
            Intent::SimulateSpike => "spike",
            Intent::SetAudioEnabled(_) | Intent::ToggleAudio => "audio",
            Intent::VentText(_) => "vent",
            Intent::Dissolve => "dissolve",
            Intent::Shutdown => "shutdown",
        }
    }
}

/// Discrete session events, serialized as one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Bpm {
        at_ms: u64,
        bpm: u32,
        raw: f64,
    },
    SpikeStarted {
        at_ms: u64,
        until_ms: u64,
    },
    IntentRejected {
        at_ms: u64,
        intent: &'static str,
        reason: String,
    },
    LockoutStarted {
        at_ms: u64,
        end_ms: u64,
        remaining_seconds: u32,
    },
    Countdown {
        at_ms: u64,
        remaining_seconds: u32,
    },
    LockoutEnded {
        at_ms: u64,
    },
    Phase {
        at_ms: u64,
        phase: BreathPhase,
        label: &'static str,
        sequence: u64,
    },
    Cue {
        at_ms: u64,
        phase: BreathPhase,
        frequency_hz: f32,
    },
    Intervention {
        at_ms: u64,
        remaining: u32,
    },
    AudioEnabled {
        at_ms: u64,
        enabled: bool,
    },
    Audio {
        at_ms: u64,
        #[serde(flatten)]
        state: ArmState,
    },
    AudioFailed {
        at_ms: u64,
        reason: String,
    },
    VentDissolving {
        at_ms: u64,
        until_ms: u64,
    },
    VentCleared {
        at_ms: u64,
    },
    Shutdown {
        at_ms: u64,
    },
}

/// Everything a presentation layer needs to render the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub now_ms: u64,
    pub current_bpm: u32,
    pub history: Vec<BpmSample>,
    pub lockout: LockoutState,
    /// Current breathing phase; `None` while unlocked.
    pub phase: Option<BreathPhase>,
    /// Intervention loop counter; `None` while unlocked.
    pub intervention: Option<u32>,
    pub audio_enabled: bool,
    /// Arm state of the mounted player; `None` while unlocked.
    pub audio: Option<ArmState>,
    pub vent_text: String,
    pub vent: VentState,
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Epoch millisecond the session clock starts at; `None` uses wall time.
    pub epoch_ms: Option<u64>,
}

/// Caller side of a session.
pub struct SessionHandle {
    pub intents: mpsc::UnboundedSender<Intent>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub snapshots: watch::Receiver<SessionSnapshot>,
}

#[derive(Debug)]
struct ResumeOutcome {
    mount: u64,
    token: ArmToken,
    result: Result<(), AudioError>,
}

// ---------------------------------------------------------------------------
// Breathing panel
// ---------------------------------------------------------------------------

/// Exists only while locked. Owns the phase cycle, the intervention
/// counter, their timers and the cue player.
struct BreathingPanel {
    mount: u64,
    cycle: PhaseCycle,
    phase_timer: Interval,
    intervention: InterventionCountdown,
    intervention_timer: Interval,
    audio_enabled: bool,
    player: CuePlayer,
    /// Resume task driving the current arm attempt.
    pending_resume: Option<(ArmToken, JoinHandle<()>)>,
}

enum PanelTick {
    Phase,
    Intervention,
}

impl BreathingPanel {
    async fn next_tick(&mut self) -> PanelTick {
        tokio::select! {
            biased;
            _ = self.phase_timer.tick() => PanelTick::Phase,
            _ = self.intervention_timer.tick() => PanelTick::Intervention,
        }
    }

    fn abort_resume(&mut self) {
        if let Some((token, task)) = self.pending_resume.take() {
            tracing::debug!(token = token.0, "pending resume aborted");
            task.abort();
        }
    }

    /// Cancel the pending resume, stop the tone and close the output.
    fn unmount(mut self, now_ms: u64) {
        self.abort_resume();
        self.player.teardown(now_ms);
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session {
    config: CooldownConfig,
    backend: Arc<dyn AudioBackend>,
    clock: SessionClock,
    rng: StdRng,
    signal: SignalSimulator,
    lockout: LockoutController,
    vent: VentShield,
    panel: Option<BreathingPanel>,
    mounts: u64,
    countdown_timer: Option<Interval>,
    vent_deadline: Option<Instant>,
    intents: mpsc::UnboundedReceiver<Intent>,
    resume_tx: mpsc::UnboundedSender<ResumeOutcome>,
    resume_rx: mpsc::UnboundedReceiver<ResumeOutcome>,
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl Session {
    /// Build a session. Must be called inside a tokio runtime.
    pub fn new(
        config: CooldownConfig,
        backend: Arc<dyn AudioBackend>,
        options: SessionOptions,
    ) -> (Self, SessionHandle) {
        let clock = match options.epoch_ms {
            Some(ms) => SessionClock::starting_at(ms),
            None => SessionClock::system(),
        };
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (resume_tx, resume_rx) = mpsc::unbounded_channel();

        let signal = SignalSimulator::new(config.signal.clone());
        let lockout = LockoutController::new(config.lockout.clone());
        let vent = VentShield::new(&config.vent);
        let initial = SessionSnapshot {
            now_ms: clock.now_ms(),
            current_bpm: signal.current_bpm(),
            history: Vec::new(),
            lockout: lockout.state(),
            phase: None,
            intervention: None,
            audio_enabled: false,
            audio: None,
            vent_text: String::new(),
            vent: vent.state(),
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let session = Self {
            config,
            backend,
            clock,
            rng,
            signal,
            lockout,
            vent,
            panel: None,
            mounts: 0,
            countdown_timer: None,
            vent_deadline: None,
            intents: intent_rx,
            resume_tx,
            resume_rx,
            events: event_tx,
            snapshot: snapshot_tx,
        };
        let handle = SessionHandle {
            intents: intent_tx,
            events: event_rx,
            snapshots: snapshot_rx,
        };
        (session, handle)
    }

    /// Drive the session until `Shutdown` or every intent sender is dropped.
    /// Returns the final snapshot.
    pub async fn run(mut self) -> SessionSnapshot {
        let period = Duration::from_millis(self.config.signal.update_interval_ms);
        let mut signal_timer = steady_interval(period);
        tracing::info!(
            backend = self.backend.name(),
            threshold_bpm = self.config.lockout.threshold_bpm,
            "session started"
        );

        loop {
            tokio::select! {
                biased;
                intent = self.intents.recv() => match intent {
                    Some(Intent::Shutdown) | None => break,
                    Some(intent) => self.handle_intent(intent),
                },
                Some(outcome) = self.resume_rx.recv() => self.apply_resume(outcome),
                _ = tick_opt(self.countdown_timer.as_mut()) => self.on_countdown(),
                _ = signal_timer.tick() => self.on_signal_tick(),
                tick = panel_tick(self.panel.as_mut()) => match tick {
                    PanelTick::Phase => self.on_phase_tick(),
                    PanelTick::Intervention => self.on_intervention_tick(),
                },
                () = sleep_opt(self.vent_deadline) => self.on_vent_deadline(),
            }
            self.publish();
        }

        let now = self.clock.now_ms();
        if let Some(panel) = self.panel.take() {
            panel.unmount(now);
        }
        self.emit(SessionEvent::Shutdown { at_ms: now });
        tracing::info!("session stopped");
        self.publish();
        self.snapshot.borrow().clone()
    }

    // ── intents ─────────────────────────────────────────────────────

    fn handle_intent(&mut self, intent: Intent) {
        let now = self.clock.now_ms();
        let locked = self.lockout.is_locked();
        match intent {
            Intent::SimulateSpike => {
                if locked {
                    self.reject(&intent, now, "locked");
                    return;
                }
                let window = self.signal.simulate_spike(now);
                tracing::info!(until_ms = window.end_ms, "spike requested");
                self.emit(SessionEvent::SpikeStarted {
                    at_ms: now,
                    until_ms: window.end_ms,
                });
            }
            Intent::SetAudioEnabled(enabled) => self.set_audio_enabled(enabled, now),
            Intent::ToggleAudio => match self.panel.as_ref() {
                Some(panel) => self.set_audio_enabled(!panel.audio_enabled, now),
                None => self.reject(&intent, now, "not locked"),
            },
            Intent::VentText(ref text) => {
                if let Err(e) = self.vent.write(text, locked) {
                    self.reject(&intent, now, &e.to_string());
                }
            }
            Intent::Dissolve => match self.vent.dissolve(now, locked) {
                Ok(until_ms) => {
                    self.vent_deadline = Some(self.clock.instant_at(until_ms));
                    self.emit(SessionEvent::VentDissolving { at_ms: now, until_ms });
                }
                Err(e) => self.reject(&intent, now, &e.to_string()),
            },
            Intent::Shutdown => {}
        }
    }

    fn reject(&self, intent: &Intent, now: u64, reason: &str) {
        tracing::debug!(intent = intent.name(), reason, "intent rejected");
        self.emit(SessionEvent::IntentRejected {
            at_ms: now,
            intent: intent.name(),
            reason: reason.to_string(),
        });
    }

    fn set_audio_enabled(&mut self, enabled: bool, now: u64) {
        let Some(panel) = self.panel.as_mut() else {
            self.reject(&Intent::SetAudioEnabled(enabled), now, "not locked");
            return;
        };
        if panel.audio_enabled == enabled {
            return;
        }
        panel.audio_enabled = enabled;
        self.emit(SessionEvent::AudioEnabled { at_ms: now, enabled });

        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let before = panel.player.arm_state();
        if enabled {
            if let Some(PendingResume { token, future }) = panel.player.arm() {
                panel.abort_resume();
                let tx = self.resume_tx.clone();
                let mount = panel.mount;
                let task = tokio::spawn(async move {
                    let result = future.await;
                    let _ = tx.send(ResumeOutcome { mount, token, result });
                });
                panel.pending_resume = Some((token, task));
            }
        } else {
            panel.abort_resume();
            panel.player.stop(now);
        }
        self.report_audio(before, now);
    }

    fn apply_resume(&mut self, outcome: ResumeOutcome) {
        let now = self.clock.now_ms();
        let Some(panel) = self.panel.as_mut().filter(|p| p.mount == outcome.mount) else {
            tracing::debug!(mount = outcome.mount, "resume outcome for unmounted panel dropped");
            return;
        };
        if panel
            .pending_resume
            .as_ref()
            .is_some_and(|(token, _)| *token == outcome.token)
        {
            panel.pending_resume = None;
        }
        let before = panel.player.arm_state();
        let resolution = panel.player.complete_resume(outcome.token, outcome.result);
        if resolution != ResumeResolution::Stale {
            self.report_audio(before, now);
        }
    }

    fn report_audio(&self, before: ArmState, now: u64) {
        let Some(panel) = self.panel.as_ref() else {
            return;
        };
        let state = panel.player.arm_state();
        if state == before {
            return;
        }
        self.emit(SessionEvent::Audio { at_ms: now, state });
        if state == ArmState::PermanentlyFailed {
            self.emit(SessionEvent::AudioFailed {
                at_ms: now,
                reason: panel.player.failure().unwrap_or("unknown").to_string(),
            });
        }
    }

    // ── timers ──────────────────────────────────────────────────────

    fn on_signal_tick(&mut self) {
        let now = self.clock.now_ms();
        let sample = self.signal.tick(now, &mut self.rng);
        let bpm = self.signal.current_bpm();
        tracing::debug!(bpm, raw = sample.value, "signal tick");
        self.emit(SessionEvent::Bpm {
            at_ms: now,
            bpm,
            raw: sample.value,
        });

        if self.lockout.observe_bpm(bpm, now) {
            self.on_lockout_started(bpm, now);
        }
    }

    fn on_lockout_started(&mut self, bpm: u32, now: u64) {
        let state = self.lockout.state();
        let end_ms = state.end_ms.unwrap_or(now);
        tracing::info!(bpm, end_ms, "lockout started");

        let refresh = Duration::from_millis(self.config.lockout.refresh_interval_ms);
        self.countdown_timer = Some(steady_interval(refresh));
        self.emit(SessionEvent::LockoutStarted {
            at_ms: now,
            end_ms,
            remaining_seconds: state.remaining_seconds,
        });
        self.mount_panel(now);
    }

    fn on_countdown(&mut self) {
        let now = self.clock.now_ms();
        let before = self.lockout.remaining_seconds();
        match self.lockout.refresh(now) {
            LockoutRefresh::Counting { remaining_seconds } => {
                if remaining_seconds != before {
                    self.emit(SessionEvent::Countdown {
                        at_ms: now,
                        remaining_seconds,
                    });
                }
            }
            LockoutRefresh::Ended => {
                self.countdown_timer = None;
                if let Some(panel) = self.panel.take() {
                    panel.unmount(now);
                }
                tracing::info!("lockout ended");
                self.emit(SessionEvent::LockoutEnded { at_ms: now });
            }
            LockoutRefresh::Idle => self.countdown_timer = None,
        }
    }

    fn mount_panel(&mut self, now: u64) {
        self.mounts += 1;
        let phase_period = Duration::from_millis(self.config.breathing.phase_duration_ms);
        let second = Duration::from_secs(1);
        let (cycle, initial) = PhaseCycle::mount(now);
        let intervention = InterventionCountdown::new(&self.config.intervention);
        let remaining = intervention.remaining();

        self.panel = Some(BreathingPanel {
            mount: self.mounts,
            cycle,
            phase_timer: steady_interval(phase_period),
            intervention,
            intervention_timer: steady_interval(second),
            audio_enabled: false,
            player: CuePlayer::new(Arc::clone(&self.backend), self.config.cue.clone()),
            pending_resume: None,
        });
        tracing::info!(mount = self.mounts, "breathing panel mounted");

        self.deliver_phase(initial);
        self.emit(SessionEvent::Intervention {
            at_ms: now,
            remaining,
        });
    }

    fn on_phase_tick(&mut self) {
        let now = self.clock.now_ms();
        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let change = panel.cycle.advance(now);
        self.deliver_phase(change);
    }

    /// Notify observers and hand the phase to the cue player in one step.
    fn deliver_phase(&mut self, change: PhaseChange) {
        self.emit(SessionEvent::Phase {
            at_ms: change.at_ms,
            phase: change.phase,
            label: change.phase.label(),
            sequence: change.sequence,
        });
        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let before = panel.player.arm_state();
        if panel.player.play_cue(change.phase, change.at_ms) {
            let frequency_hz = self.config.cue.frequencies.for_phase(change.phase);
            self.emit(SessionEvent::Cue {
                at_ms: change.at_ms,
                phase: change.phase,
                frequency_hz,
            });
        }
        self.report_audio(before, change.at_ms);
    }

    fn on_intervention_tick(&mut self) {
        let now = self.clock.now_ms();
        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let remaining = panel.intervention.tick();
        self.emit(SessionEvent::Intervention {
            at_ms: now,
            remaining,
        });
    }

    fn on_vent_deadline(&mut self) {
        self.vent_deadline = None;
        let now = self.clock.now_ms();
        if self.vent.poll(now) {
            self.emit(SessionEvent::VentCleared { at_ms: now });
        }
    }

    // ── output ──────────────────────────────────────────────────────

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        let panel = self.panel.as_ref();
        self.snapshot.send_replace(SessionSnapshot {
            now_ms: self.clock.now_ms(),
            current_bpm: self.signal.current_bpm(),
            history: self.signal.history().iter().copied().collect(),
            lockout: self.lockout.state(),
            phase: panel.map(|p| p.cycle.phase()),
            intervention: panel.map(|p| p.intervention.remaining()),
            audio_enabled: panel.is_some_and(|p| p.audio_enabled),
            audio: panel.map(|p| p.player.arm_state()),
            vent_text: self.vent.text().to_string(),
            vent: self.vent.state(),
        });
    }
}

/// Periodic timer whose first tick is one `period` from now. A stalled
/// runtime gets one late tick, then the cadence restarts from it.
fn steady_interval(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn tick_opt(timer: Option<&mut Interval>) -> Instant {
    match timer {
        Some(timer) => timer.tick().await,
        None => std::future::pending().await,
    }
}

async fn panel_tick(panel: Option<&mut BreathingPanel>) -> PanelTick {
    match panel {
        Some(panel) => panel.next_tick().await,
        None => std::future::pending().await,
    }
}

async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
