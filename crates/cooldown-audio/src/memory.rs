//! In-process audio sink.
//!
//! Nothing is rendered. Every call made against any output opened from the
//! backend is appended to one shared call log, which `cooldown simulate`
//! prints and tests assert on. Start state, resume latency, resume failure
//! and tone failure are configurable so every branch of the arming protocol
//! can be driven.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cooldown_core::Tone;
use serde::Serialize;

use crate::error::AudioError;
use crate::output::{
    AudioBackend, AudioOutput, OutputState, ResumeFuture, SharedState, ToneHandle, ToneLedger,
};

/// One recorded output call. `output` numbers opened outputs from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum OutputCall {
    Opened { output: u32 },
    ResumeRequested { output: u32 },
    ToneStarted { output: u32, handle: u64, frequency_hz: f32, at_ms: u64 },
    ToneStopped { output: u32, handle: u64, at_ms: u64 },
    Closed { output: u32 },
}

#[derive(Debug, Default)]
struct Log {
    opened: u32,
    calls: Vec<OutputCall>,
}

#[derive(Debug, Clone)]
pub struct MemoryBackend {
    start_running: bool,
    resume_latency: Duration,
    resume_failure: Option<String>,
    tone_failure: Option<String>,
    log: Arc<Mutex<Log>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Outputs start suspended and resume immediately.
    pub fn new() -> Self {
        Self {
            start_running: false,
            resume_latency: Duration::ZERO,
            resume_failure: None,
            tone_failure: None,
            log: Arc::new(Mutex::new(Log::default())),
        }
    }

    #[must_use]
    pub fn start_running(mut self, running: bool) -> Self {
        self.start_running = running;
        self
    }

    #[must_use]
    pub fn resume_latency(mut self, latency: Duration) -> Self {
        self.resume_latency = latency;
        self
    }

    /// Make every resume fail with `reason`.
    #[must_use]
    pub fn failing_resume(mut self, reason: impl Into<String>) -> Self {
        self.resume_failure = Some(reason.into());
        self
    }

    /// Make every `start_tone` fail with `reason`.
    #[must_use]
    pub fn failing_tones(mut self, reason: impl Into<String>) -> Self {
        self.tone_failure = Some(reason.into());
        self
    }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<OutputCall> {
        self.log.lock().map(|l| l.calls.clone()).unwrap_or_default()
    }

    pub fn opened(&self) -> u32 {
        self.log.lock().map(|l| l.opened).unwrap_or(0)
    }

    /// Frequencies of every started tone, in order.
    pub fn started_frequencies(&self) -> Vec<f32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                OutputCall::ToneStarted { frequency_hz, .. } => Some(frequency_hz),
                _ => None,
            })
            .collect()
    }
}

impl AudioBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&self) -> Result<Box<dyn AudioOutput>, AudioError> {
        let id = {
            let mut log = self.log.lock().map_err(|_| AudioError::Poisoned)?;
            log.opened += 1;
            let id = log.opened;
            log.calls.push(OutputCall::Opened { output: id });
            id
        };
        let initial = if self.start_running {
            OutputState::Running
        } else {
            OutputState::Suspended
        };
        Ok(Box::new(MemoryOutput {
            id,
            state: SharedState::new(initial),
            ledger: ToneLedger::default(),
            resume_latency: self.resume_latency,
            resume_failure: self.resume_failure.clone(),
            tone_failure: self.tone_failure.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct MemoryOutput {
    id: u32,
    state: SharedState,
    ledger: ToneLedger,
    resume_latency: Duration,
    resume_failure: Option<String>,
    tone_failure: Option<String>,
    log: Arc<Mutex<Log>>,
}

impl MemoryOutput {
    fn record(&self, call: OutputCall) -> Result<(), AudioError> {
        let mut log = self.log.lock().map_err(|_| AudioError::Poisoned)?;
        log.calls.push(call);
        Ok(())
    }
}

impl AudioOutput for MemoryOutput {
    fn state(&self) -> OutputState {
        self.state.get()
    }

    fn resume(&mut self) -> ResumeFuture {
        if let Err(e) = self.record(OutputCall::ResumeRequested { output: self.id }) {
            return Box::pin(async move { Err(e) });
        }
        self.state
            .resume_after(self.resume_latency, self.resume_failure.clone())
    }

    fn start_tone(&mut self, tone: &Tone, at_ms: u64) -> Result<ToneHandle, AudioError> {
        self.state.ensure_open()?;
        if let Some(reason) = &self.tone_failure {
            return Err(AudioError::ToneFailed(reason.clone()));
        }
        let handle = self.ledger.start(tone, at_ms);
        self.record(OutputCall::ToneStarted {
            output: self.id,
            handle: handle.0,
            frequency_hz: tone.frequency_hz,
            at_ms,
        })?;
        Ok(handle)
    }

    fn stop_tone(&mut self, handle: ToneHandle, at_ms: u64) -> Result<(), AudioError> {
        self.ledger.stop(handle, at_ms)?;
        self.record(OutputCall::ToneStopped {
            output: self.id,
            handle: handle.0,
            at_ms,
        })
    }

    fn close(&mut self) -> Result<(), AudioError> {
        self.state.ensure_open()?;
        self.state.set(OutputState::Closed)?;
        self.record(OutputCall::Closed { output: self.id })
    }
}
