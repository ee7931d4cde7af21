//! WAV recording backend (hound).
//!
//! Each opened output collects its tones on a millisecond timeline and
//! renders them into `<stem>-<n>.wav` when closed. The timeline starts at
//! the first tone; gaps between cues are silence.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use cooldown_core::Tone;
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::AudioError;
use crate::output::{
    AudioBackend, AudioOutput, OutputState, ResumeFuture, SharedState, ToneHandle, ToneLedger,
};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

#[derive(Debug)]
pub struct WavBackend {
    base_path: PathBuf,
    sample_rate: u32,
    start_running: bool,
    resume_latency: Duration,
    opened: AtomicU32,
}

impl WavBackend {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            start_running: false,
            resume_latency: Duration::ZERO,
            opened: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
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

    /// File written by the `n`th output (1-based).
    pub fn recording_path(&self, n: u32) -> PathBuf {
        numbered_path(&self.base_path, n)
    }
}

fn numbered_path(base: &Path, n: u32) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("cooldown");
    base.with_file_name(format!("{stem}-{n}.wav"))
}

impl AudioBackend for WavBackend {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn open(&self) -> Result<Box<dyn AudioOutput>, AudioError> {
        let n = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        let initial = if self.start_running {
            OutputState::Running
        } else {
            OutputState::Suspended
        };
        Ok(Box::new(WavOutput {
            path: self.recording_path(n),
            sample_rate: self.sample_rate,
            resume_latency: self.resume_latency,
            state: SharedState::new(initial),
            ledger: ToneLedger::default(),
        }))
    }
}

struct WavOutput {
    path: PathBuf,
    sample_rate: u32,
    resume_latency: Duration,
    state: SharedState,
    ledger: ToneLedger,
}

impl WavOutput {
    fn render_timeline(&self) -> Vec<f32> {
        let tones = self.ledger.tones();
        let Some(origin) = tones.iter().map(|t| t.start_ms).min() else {
            return Vec::new();
        };
        let end = tones.iter().map(|t| t.sounding_until()).max().unwrap_or(origin);
        let rate = u64::from(self.sample_rate);
        let to_samples = |ms: u64| usize::try_from(ms * rate / 1_000).unwrap_or(usize::MAX);

        let mut buffer = vec![0.0f32; to_samples(end - origin)];
        for scheduled in tones {
            let offset = to_samples(scheduled.start_ms - origin);
            let keep = to_samples(scheduled.sounding_until() - scheduled.start_ms);
            let rendered = scheduled.tone.render(self.sample_rate);
            for (i, sample) in rendered.into_iter().take(keep).enumerate() {
                if let Some(slot) = buffer.get_mut(offset + i) {
                    *slot += sample;
                }
            }
        }
        buffer
    }
}

impl AudioOutput for WavOutput {
    fn state(&self) -> OutputState {
        self.state.get()
    }

    fn resume(&mut self) -> ResumeFuture {
        self.state.resume_after(self.resume_latency, None)
    }

    fn start_tone(&mut self, tone: &Tone, at_ms: u64) -> Result<ToneHandle, AudioError> {
        self.state.ensure_open()?;
        Ok(self.ledger.start(tone, at_ms))
    }

    fn stop_tone(&mut self, handle: ToneHandle, at_ms: u64) -> Result<(), AudioError> {
        self.ledger.stop(handle, at_ms)
    }

    fn close(&mut self) -> Result<(), AudioError> {
        self.state.ensure_open()?;
        self.state.set(OutputState::Closed)?;
        let samples = self.render_timeline();
        if samples.is_empty() {
            tracing::debug!(path = %self.path.display(), "no cues played, skipping recording");
            return Ok(());
        }
        write_mono(&self.path, self.sample_rate, &samples)?;
        tracing::info!(
            path = %self.path.display(),
            tones = self.ledger.tones().len(),
            "wrote cue recording"
        );
        Ok(())
    }
}

/// Render a single cue tone to a 16-bit mono WAV file.
pub fn render_cue(tone: &Tone, sample_rate: u32, path: &Path) -> Result<usize, AudioError> {
    let samples = tone.render(sample_rate);
    write_mono(path, sample_rate, &samples)?;
    Ok(samples.len())
}

fn write_mono(path: &Path, sample_rate: u32, samples: &[f32]) -> Result<(), AudioError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for sample in samples {
        #[expect(clippy::cast_possible_truncation)]
        let value = (sample.clamp(-1.0, 1.0) * 32_767.0) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;
    Ok(())
}
