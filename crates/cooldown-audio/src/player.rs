//! Cue player: runs the arming protocol against an [`AudioBackend`].
//!
//! The player owns at most one output, opened on the first `arm()`. The
//! asynchronous part of arming (resuming a suspended output) is handed to
//! the caller as a [`PendingResume`]; its result comes back through
//! [`CuePlayer::complete_resume`] and is applied only if its token is
//! still current.

use std::sync::Arc;

use cooldown_core::config::CueConfig;
use cooldown_core::{ArmMachine, ArmRequest, ArmState, ArmToken, BreathPhase, ResumeResolution, Tone};

use crate::error::AudioError;
use crate::output::{AudioBackend, AudioOutput, OutputState, ResumeFuture, ToneHandle};

/// A resume the caller must drive to completion and report back.
pub struct PendingResume {
    pub token: ArmToken,
    pub future: ResumeFuture,
}

impl std::fmt::Debug for PendingResume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResume")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
struct SoundingTone {
    handle: ToneHandle,
    ends_at_ms: u64,
}

pub struct CuePlayer {
    backend: Arc<dyn AudioBackend>,
    cue: CueConfig,
    output: Option<Box<dyn AudioOutput>>,
    arm: ArmMachine,
    sounding: Option<SoundingTone>,
    failure: Option<String>,
}

impl CuePlayer {
    pub fn new(backend: Arc<dyn AudioBackend>, cue: CueConfig) -> Self {
        Self {
            backend,
            cue,
            output: None,
            arm: ArmMachine::new(),
            sounding: None,
            failure: None,
        }
    }

    pub fn arm_state(&self) -> ArmState {
        self.arm.state()
    }

    /// Why the player became permanently failed.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Request playback. Idempotent: does nothing unless `Unarmed`.
    ///
    /// Returns the resume to drive when the output starts suspended.
    pub fn arm(&mut self) -> Option<PendingResume> {
        if let ArmRequest::Skip(state) = self.arm.request() {
            tracing::debug!(?state, "arm skipped");
            return None;
        }

        if self.output.is_none() {
            match self.backend.open() {
                Ok(output) => {
                    tracing::debug!(backend = self.backend.name(), "audio output opened");
                    self.output = Some(output);
                }
                Err(e) => {
                    tracing::warn!(backend = self.backend.name(), "audio output unavailable: {e}");
                    self.failure = Some(e.to_string());
                    self.arm.fail();
                    return None;
                }
            }
        }
        let output = self.output.as_mut()?;

        match output.state() {
            OutputState::Running => {
                self.arm.mark_armed();
                tracing::info!("audio armed");
                None
            }
            OutputState::Suspended => {
                let token = self.arm.begin_resume();
                tracing::debug!(token = token.0, "resuming suspended audio output");
                Some(PendingResume {
                    token,
                    future: output.resume(),
                })
            }
            OutputState::Closed => {
                tracing::warn!("audio output already closed");
                self.failure = Some(AudioError::Closed.to_string());
                self.arm.fail();
                None
            }
        }
    }

    /// Apply the outcome of the resume tagged with `token`.
    pub fn complete_resume(
        &mut self,
        token: ArmToken,
        result: Result<(), AudioError>,
    ) -> ResumeResolution {
        let resolution = self.arm.resolve(token, result.is_ok());
        match (&resolution, &result) {
            (ResumeResolution::Armed, _) => tracing::info!(token = token.0, "audio armed"),
            (ResumeResolution::Failed, Err(e)) => {
                tracing::warn!(token = token.0, "audio resume failed: {e}");
                self.failure = Some(e.to_string());
            }
            (ResumeResolution::Failed, Ok(())) => {}
            (ResumeResolution::Stale, _) => {
                tracing::debug!(token = token.0, ok = result.is_ok(), "stale resume outcome discarded");
            }
        }
        resolution
    }

    /// Play the cue for `phase`. Returns `true` if a tone was started.
    ///
    /// A tone that fails to start fails the player permanently, like a
    /// failed resume.
    pub fn play_cue(&mut self, phase: BreathPhase, now_ms: u64) -> bool {
        if !self.arm.can_play() {
            return false;
        }
        self.silence(now_ms);

        let tone = Tone::for_phase(phase, &self.cue);
        let Some(output) = self.output.as_mut() else {
            return false;
        };
        match output.start_tone(&tone, now_ms) {
            Ok(handle) => {
                tracing::debug!(%phase, frequency_hz = tone.frequency_hz, "cue started");
                self.sounding = Some(SoundingTone {
                    handle,
                    ends_at_ms: now_ms.saturating_add(tone.duration_ms),
                });
                true
            }
            Err(e) => {
                tracing::warn!(%phase, "cue failed to start: {e}");
                self.failure = Some(e.to_string());
                self.arm.fail();
                false
            }
        }
    }

    /// Silence any sounding tone and disarm. `PermanentlyFailed` is kept.
    pub fn stop(&mut self, now_ms: u64) {
        self.silence(now_ms);
        if self.arm.disarm() {
            tracing::info!("audio disarmed");
        }
    }

    /// Stop and close the output. Close failures are swallowed.
    pub fn teardown(&mut self, now_ms: u64) {
        self.stop(now_ms);
        if let Some(mut output) = self.output.take() {
            if let Err(e) = output.close() {
                tracing::debug!("audio output close failed: {e}");
            }
        }
    }

    fn silence(&mut self, now_ms: u64) {
        let Some(sounding) = self.sounding.take() else {
            return;
        };
        // Naturally finished; nothing to stop.
        if now_ms >= sounding.ends_at_ms {
            return;
        }
        let Some(output) = self.output.as_mut() else {
            return;
        };
        match output.stop_tone(sounding.handle, now_ms) {
            Ok(()) | Err(AudioError::ToneFinished(_)) => {}
            Err(e) => tracing::debug!("tone stop failed: {e}"),
        }
    }
}

impl Drop for CuePlayer {
    fn drop(&mut self) {
        if let Some(mut output) = self.output.take() {
            let _ = output.close();
        }
    }
}
