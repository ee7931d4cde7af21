//! Error types for the audio boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output not supported: {0}")]
    Unsupported(String),

    #[error("audio output resume failed: {0}")]
    ResumeFailed(String),

    #[error("tone failed to start: {0}")]
    ToneFailed(String),

    #[error("tone {0} has already finished")]
    ToneFinished(u64),

    #[error("audio output is closed")]
    Closed,

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio output state lock poisoned")]
    Poisoned,
}
