//! cooldown-core: pure state machines for the cooldown biofeedback engine.
//!
//! Heart-rate simulation, lockout countdown, breathing phase cycle, audio
//! arming and cue tone synthesis. No async, no clock access: every
//! time-dependent operation takes `now_ms` (epoch milliseconds) from the
//! caller, so the runtime and the tests drive the same code.

pub mod arming;
pub mod breathing;
pub mod config;
pub mod cue;
pub mod intervention;
pub mod lockout;
pub mod signal;
pub mod types;
pub mod vent;

pub use arming::{ArmMachine, ArmRequest, ArmState, ArmToken, ResumeResolution};
pub use breathing::{PhaseChange, PhaseCycle};
pub use config::{ConfigError, CooldownConfig};
pub use cue::Tone;
pub use intervention::InterventionCountdown;
pub use lockout::{LockoutController, LockoutRefresh, LockoutState};
pub use signal::{SignalSimulator, SpikeWindow};
pub use types::{BpmSample, BreathPhase};
pub use vent::{VentError, VentShield, VentState};
