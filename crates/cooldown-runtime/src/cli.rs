//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cooldown_core::BreathPhase;

#[derive(Parser)]
#[command(name = "cooldown", about = "Biofeedback lockout and paced-breathing simulator")]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/cooldown/config.toml if present)
    #[arg(long, short = 'c', global = true, env = "COOLDOWN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a real-time session, reading intents from stdin
    Run(RunOpts),
    /// Run a scripted session on a virtual clock and print NDJSON events
    Simulate(SimulateOpts),
    /// Render one breathing cue to a WAV file
    Cue(CueOpts),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Record cues to WAV files (one per lockout)
    Wav,
    /// Keep cues in memory (no output)
    Memory,
    /// No audio: arming always fails
    None,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AudioOpts {
    /// Audio backend
    #[arg(long, value_enum, default_value = "memory")]
    pub audio_backend: BackendKind,

    /// Recording path for the wav backend; each lockout writes `<stem>-<n>.wav`
    #[arg(long, default_value = "cooldown.wav")]
    pub record: PathBuf,

    /// Simulated delay before a suspended output finishes resuming
    #[arg(long, default_value = "0")]
    pub resume_latency_ms: u64,

    /// Open outputs already running (skip the asynchronous resume)
    #[arg(long)]
    pub start_running: bool,

    /// Sample rate of the wav backend's recordings
    #[arg(long, default_value = "44100")]
    pub wav_sample_rate: u32,

    /// Memory backend: make every resume fail with this reason
    #[arg(long, value_name = "REASON")]
    pub fail_resume: Option<String>,

    /// Memory backend: make every tone fail to start with this reason
    #[arg(long, value_name = "REASON")]
    pub fail_tones: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RunOpts {
    #[command(flatten)]
    pub audio: AudioOpts,

    /// Print session events as NDJSON instead of the status line
    #[arg(long)]
    pub events: bool,

    /// RNG seed (default: random)
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct SimulateOpts {
    #[command(flatten)]
    pub audio: AudioOpts,

    /// Virtual session length in seconds
    #[arg(long, default_value = "40")]
    pub duration_secs: u64,

    /// RNG seed
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Epoch millisecond the virtual clock starts at
    #[arg(long, default_value = "0")]
    pub epoch_ms: u64,

    /// Request a spike at these session offsets (ms); repeatable
    #[arg(long, value_name = "MS")]
    pub spike_at: Vec<u64>,

    /// Enable audio at these session offsets (ms); repeatable
    #[arg(long, value_name = "MS")]
    pub audio_on_at: Vec<u64>,

    /// Disable audio at these session offsets (ms); repeatable
    #[arg(long, value_name = "MS")]
    pub audio_off_at: Vec<u64>,

    /// Omit per-tick `bpm` events
    #[arg(long)]
    pub quiet_ticks: bool,
}

#[derive(clap::Args, Debug)]
pub struct CueOpts {
    /// Phase to render: inhale, hold_after_inhale, exhale, hold_after_exhale
    #[arg(long, default_value = "inhale")]
    pub phase: BreathPhase,

    /// Output WAV path
    #[arg(long, short = 'o')]
    pub out: PathBuf,

    #[arg(long, default_value = "44100")]
    pub sample_rate: u32,
}

/// Default config path, honouring `$XDG_CONFIG_HOME`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir).join("cooldown/config.toml"));
        }
    }
    let home = std::env::var("HOME").ok().filter(|h| !h.is_empty())?;
    Some(PathBuf::from(home).join(".config/cooldown/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_accepts_repeated_offsets() {
        let cli = Cli::parse_from([
            "cooldown",
            "simulate",
            "--spike-at",
            "0",
            "--spike-at",
            "40000",
            "--audio-on-at",
            "2500",
            "--audio-backend",
            "none",
        ]);
        let Command::Simulate(opts) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(opts.spike_at, vec![0, 40_000]);
        assert_eq!(opts.audio_on_at, vec![2_500]);
        assert_eq!(opts.audio.audio_backend, BackendKind::None);
        assert_eq!(opts.duration_secs, 40);
    }

    #[test]
    fn cue_parses_phase_aliases() {
        let cli = Cli::parse_from(["cooldown", "cue", "--phase", "hold-after-exhale", "-o", "x.wav"]);
        let Command::Cue(opts) = cli.command else {
            panic!("expected cue");
        };
        assert_eq!(opts.phase, BreathPhase::HoldAfterExhale);
        assert_eq!(opts.sample_rate, 44_100);
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["cooldown", "config", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from(["cooldown", "run"]);
        let Command::Run(opts) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(opts.audio.audio_backend, BackendKind::Memory);
        assert_eq!(opts.audio.resume_latency_ms, 0);
        assert!(!opts.audio.start_running);
        assert_eq!(opts.audio.wav_sample_rate, 44_100);
        assert!(opts.audio.fail_resume.is_none());
        assert!(opts.seed.is_none());
    }

    #[test]
    fn audio_failure_knobs_parse() {
        let cli = Cli::parse_from([
            "cooldown",
            "simulate",
            "--fail-resume",
            "no device",
            "--fail-tones",
            "device lost",
            "--wav-sample-rate",
            "8000",
        ]);
        let Command::Simulate(opts) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(opts.audio.fail_resume.as_deref(), Some("no device"));
        assert_eq!(opts.audio.fail_tones.as_deref(), Some("device lost"));
        assert_eq!(opts.audio.wav_sample_rate, 8_000);
    }
}
