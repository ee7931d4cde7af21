//! Command context: config resolution and audio backend selection.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cooldown_audio::{AudioBackend, MemoryBackend, NullBackend, OutputCall, WavBackend};
use cooldown_core::CooldownConfig;

use crate::cli::{AudioOpts, BackendKind, default_config_path};

/// Load config from `explicit`, else the default path if it exists, else
/// built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<CooldownConfig> {
    if let Some(path) = explicit {
        return CooldownConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    match default_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!(path = %path.display(), "using default config file");
            CooldownConfig::load(&path)
                .with_context(|| format!("loading config {}", path.display()))
        }
        _ => Ok(CooldownConfig::default()),
    }
}

/// The backend handed to the session, plus the memory backend's call log
/// when that backend was chosen.
pub struct SelectedBackend {
    pub backend: Arc<dyn AudioBackend>,
    memory: Option<MemoryBackend>,
}

impl SelectedBackend {
    /// Calls recorded so far; `None` unless the memory backend is in use.
    pub fn call_log(&self) -> Option<Vec<OutputCall>> {
        self.memory.as_ref().map(MemoryBackend::calls)
    }
}

pub fn build_backend(opts: &AudioOpts) -> SelectedBackend {
    let latency = Duration::from_millis(opts.resume_latency_ms);
    if opts.audio_backend != BackendKind::Memory
        && (opts.fail_resume.is_some() || opts.fail_tones.is_some())
    {
        tracing::warn!("--fail-resume and --fail-tones only apply to the memory backend");
    }
    match opts.audio_backend {
        BackendKind::Wav => SelectedBackend {
            backend: Arc::new(
                WavBackend::new(&opts.record)
                    .sample_rate(opts.wav_sample_rate)
                    .start_running(opts.start_running)
                    .resume_latency(latency),
            ),
            memory: None,
        },
        BackendKind::Memory => {
            let mut memory = MemoryBackend::new()
                .start_running(opts.start_running)
                .resume_latency(latency);
            if let Some(reason) = &opts.fail_resume {
                memory = memory.failing_resume(reason.clone());
            }
            if let Some(reason) = &opts.fail_tones {
                memory = memory.failing_tones(reason.clone());
            }
            SelectedBackend {
                backend: Arc::new(memory.clone()),
                memory: Some(memory),
            }
        }
        BackendKind::None => SelectedBackend {
            backend: Arc::new(NullBackend),
            memory: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooldown_audio::AudioOutput;
    use std::path::PathBuf;

    fn audio(kind: BackendKind) -> AudioOpts {
        AudioOpts {
            audio_backend: kind,
            record: PathBuf::from("rec.wav"),
            resume_latency_ms: 0,
            start_running: false,
            wav_sample_rate: 44_100,
            fail_resume: None,
            fail_tones: None,
        }
    }

    #[test]
    fn backend_names_follow_kind() {
        assert_eq!(build_backend(&audio(BackendKind::Wav)).backend.name(), "wav");
        assert_eq!(build_backend(&audio(BackendKind::Memory)).backend.name(), "memory");
        assert_eq!(build_backend(&audio(BackendKind::None)).backend.name(), "none");
    }

    #[test]
    fn only_memory_backend_keeps_a_call_log() {
        let memory = build_backend(&audio(BackendKind::Memory));
        let _output = memory.backend.open().unwrap();
        assert_eq!(memory.call_log(), Some(vec![OutputCall::Opened { output: 1 }]));
        assert!(build_backend(&audio(BackendKind::Wav)).call_log().is_none());
        assert!(build_backend(&audio(BackendKind::None)).call_log().is_none());
    }

    #[tokio::test]
    async fn fail_resume_reaches_memory_backend() {
        let mut opts = audio(BackendKind::Memory);
        opts.fail_resume = Some("no device".into());
        let selected = build_backend(&opts);
        let mut output = selected.backend.open().unwrap();
        let err = output.resume().await.unwrap_err();
        assert!(err.to_string().contains("no device"));
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(&path, "[lockout]\nduration_secs = 5\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.lockout.duration_secs, 5);
    }

    #[test]
    fn invalid_explicit_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[cue]\npeak_gain = 3.0\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
        assert!(format!("{err:#}").contains("cue.peak_gain"));
    }
}
