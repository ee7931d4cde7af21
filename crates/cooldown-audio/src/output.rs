//! AudioBackend / AudioOutput traits and the bookkeeping shared by the
//! built-in backends.
//!
//! An output mirrors a browser-style audio context: it is opened lazily,
//! may start `Suspended` until a user gesture resumes it, plays one-shot
//! tones scheduled on a millisecond timeline, and is closed exactly once.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cooldown_core::Tone;
use serde::Serialize;

use crate::error::AudioError;

/// Lifecycle of an opened output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputState {
    Suspended,
    Running,
    Closed,
}

/// Identifies one started tone on its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ToneHandle(pub u64);

/// Resume of a suspended output. Owned and `'static` so the caller can
/// move it into a spawned task.
pub type ResumeFuture = Pin<Box<dyn Future<Output = Result<(), AudioError>> + Send + 'static>>;

/// An opened audio output.
pub trait AudioOutput: Send {
    fn state(&self) -> OutputState;

    /// Start the output. Resolves once it is running.
    fn resume(&mut self) -> ResumeFuture;

    /// Schedule `tone` to start at `at_ms`. It ends by itself after
    /// `tone.duration_ms`.
    fn start_tone(&mut self, tone: &Tone, at_ms: u64) -> Result<ToneHandle, AudioError>;

    /// Cut a tone short. Fails with [`AudioError::ToneFinished`] if it
    /// already ended.
    fn stop_tone(&mut self, handle: ToneHandle, at_ms: u64) -> Result<(), AudioError>;

    fn close(&mut self) -> Result<(), AudioError>;
}

/// Factory for outputs. One output is opened per cue player.
pub trait AudioBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn open(&self) -> Result<Box<dyn AudioOutput>, AudioError>;
}

impl<T: AudioBackend + ?Sized> AudioBackend for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&self) -> Result<Box<dyn AudioOutput>, AudioError> {
        (**self).open()
    }
}

// ---------------------------------------------------------------------------
// Shared output bookkeeping
// ---------------------------------------------------------------------------

/// Output state shared between an output and its in-flight resume.
#[derive(Debug, Clone)]
pub(crate) struct SharedState(Arc<Mutex<OutputState>>);

impl SharedState {
    pub(crate) fn new(initial: OutputState) -> Self {
        Self(Arc::new(Mutex::new(initial)))
    }

    pub(crate) fn get(&self) -> OutputState {
        // A poisoned lock only happens if a holder panicked; treat as closed.
        self.0.lock().map(|s| *s).unwrap_or(OutputState::Closed)
    }

    pub(crate) fn set(&self, state: OutputState) -> Result<(), AudioError> {
        let mut guard = self.0.lock().map_err(|_| AudioError::Poisoned)?;
        *guard = state;
        Ok(())
    }

    /// Build a resume that waits `latency`, then either fails or moves the
    /// output to `Running`. A close that lands first wins.
    pub(crate) fn resume_after(&self, latency: Duration, failure: Option<String>) -> ResumeFuture {
        let shared = self.clone();
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let mut guard = shared.0.lock().map_err(|_| AudioError::Poisoned)?;
            match *guard {
                OutputState::Closed => Err(AudioError::Closed),
                _ => match failure {
                    Some(reason) => Err(AudioError::ResumeFailed(reason)),
                    None => {
                        *guard = OutputState::Running;
                        Ok(())
                    }
                },
            }
        })
    }

    pub(crate) fn ensure_open(&self) -> Result<(), AudioError> {
        match self.get() {
            OutputState::Closed => Err(AudioError::Closed),
            _ => Ok(()),
        }
    }
}

/// A tone placed on an output's timeline.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScheduledTone {
    pub handle: ToneHandle,
    pub tone: Tone,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Set when the tone was stopped before its natural end.
    pub cut_ms: Option<u64>,
}

impl ScheduledTone {
    pub(crate) fn sounding_until(&self) -> u64 {
        self.cut_ms.map_or(self.end_ms, |cut| cut.min(self.end_ms))
    }
}

/// Every tone started on one output, in start order.
#[derive(Debug, Default)]
pub(crate) struct ToneLedger {
    next_handle: u64,
    tones: Vec<ScheduledTone>,
}

impl ToneLedger {
    pub(crate) fn start(&mut self, tone: &Tone, at_ms: u64) -> ToneHandle {
        self.next_handle += 1;
        let handle = ToneHandle(self.next_handle);
        self.tones.push(ScheduledTone {
            handle,
            tone: *tone,
            start_ms: at_ms,
            end_ms: at_ms.saturating_add(tone.duration_ms),
            cut_ms: None,
        });
        handle
    }

    pub(crate) fn stop(&mut self, handle: ToneHandle, at_ms: u64) -> Result<(), AudioError> {
        let Some(entry) = self.tones.iter_mut().find(|t| t.handle == handle) else {
            return Err(AudioError::ToneFinished(handle.0));
        };
        if entry.cut_ms.is_some() || at_ms >= entry.end_ms {
            return Err(AudioError::ToneFinished(handle.0));
        }
        entry.cut_ms = Some(at_ms.max(entry.start_ms));
        Ok(())
    }

    pub(crate) fn tones(&self) -> &[ScheduledTone] {
        &self.tones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooldown_core::BreathPhase;
    use cooldown_core::config::CueConfig;

    fn tone() -> Tone {
        Tone::for_phase(BreathPhase::Inhale, &CueConfig::default())
    }

    #[test]
    fn ledger_stops_sounding_tone() {
        let mut ledger = ToneLedger::default();
        let h = ledger.start(&tone(), 1_000);
        ledger.stop(h, 1_050).unwrap();
        assert_eq!(ledger.tones()[0].sounding_until(), 1_050);
    }

    #[test]
    fn ledger_rejects_stop_after_natural_end() {
        let mut ledger = ToneLedger::default();
        let h = ledger.start(&tone(), 1_000);
        assert!(matches!(ledger.stop(h, 1_150), Err(AudioError::ToneFinished(1))));
        assert_eq!(ledger.tones()[0].sounding_until(), 1_150);
    }

    #[test]
    fn ledger_rejects_double_stop() {
        let mut ledger = ToneLedger::default();
        let h = ledger.start(&tone(), 0);
        ledger.stop(h, 10).unwrap();
        assert!(matches!(ledger.stop(h, 20), Err(AudioError::ToneFinished(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn resume_moves_to_running_after_latency() {
        let shared = SharedState::new(OutputState::Suspended);
        let fut = shared.resume_after(Duration::from_millis(50), None);
        assert_eq!(shared.get(), OutputState::Suspended);
        fut.await.unwrap();
        assert_eq!(shared.get(), OutputState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn close_before_resume_completes_wins() {
        let shared = SharedState::new(OutputState::Suspended);
        let fut = shared.resume_after(Duration::from_millis(50), None);
        shared.set(OutputState::Closed).unwrap();
        assert!(matches!(fut.await, Err(AudioError::Closed)));
        assert_eq!(shared.get(), OutputState::Closed);
    }

    #[tokio::test]
    async fn failing_resume_keeps_suspended() {
        let shared = SharedState::new(OutputState::Suspended);
        let result = shared
            .resume_after(Duration::ZERO, Some("denied".into()))
            .await;
        assert!(matches!(result, Err(AudioError::ResumeFailed(r)) if r == "denied"));
        assert_eq!(shared.get(), OutputState::Suspended);
    }
}
