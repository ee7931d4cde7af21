//! Backend for hosts without audio. Opening always fails, which leaves the
//! cue player permanently failed and the session silent.

use crate::error::AudioError;
use crate::output::{AudioBackend, AudioOutput};

#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl AudioBackend for NullBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    fn open(&self) -> Result<Box<dyn AudioOutput>, AudioError> {
        Err(AudioError::Unsupported("no audio backend configured".into()))
    }
}
