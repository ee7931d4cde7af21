//! cooldown-audio: audio output IO boundary.
//! Backend traits, the `wav`, `memory` and `none` backends, and the
//! [`CuePlayer`] that runs the arming protocol against them.

pub mod error;
pub mod memory;
pub mod null;
pub mod output;
pub mod player;
pub mod wav;

pub use error::AudioError;
pub use memory::{MemoryBackend, OutputCall};
pub use null::NullBackend;
pub use output::{AudioBackend, AudioOutput, OutputState, ResumeFuture, ToneHandle};
pub use player::{CuePlayer, PendingResume};
pub use wav::{WavBackend, render_cue};
