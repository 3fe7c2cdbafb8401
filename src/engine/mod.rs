//! Speech engines the gateway can delegate to.
//!
//! The gateway only sees [`SpeechEngine`]; everything model specific stays
//! behind it.

pub mod piper;
pub mod voice;

use crate::audio::AudioFormat;
use crate::registry::VoiceDescriptor;

pub use piper::PiperEngine;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("voice model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("phonemization failed: {0}")]
    Phonemizer(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("audio encoding failed: {0}")]
    Encoding(String),

    #[error("engine does not produce {0} audio")]
    UnsupportedFormat(AudioFormat),

    #[error("engine produced no audio")]
    EmptyAudio,
}

/// One synthesis call, already validated by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    pub text: &'a str,
    pub voice: &'a VoiceDescriptor,
    pub format: AudioFormat,
    /// Playback rate multiplier, 1.0 is the model's natural pace.
    pub speed: f32,
}

pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> &str;

    fn supported_formats(&self) -> &[AudioFormat];

    fn supports(&self, format: AudioFormat) -> bool {
        self.supported_formats().contains(&format)
    }

    /// Render `request.text` and return encoded audio bytes.
    fn synthesize(&self, request: &EngineRequest<'_>) -> Result<Vec<u8>, EngineError>;
}
