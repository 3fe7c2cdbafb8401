//! OpenAI-style text-to-speech gateway.
//!
//! `POST /v1/audio/speech` requests are validated against a read-only voice
//! registry and handed to a [`engine::SpeechEngine`]; the shipped engine runs
//! Piper voices through ONNX Runtime.

pub mod api;
pub mod audio;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod registry;

pub use audio::AudioFormat;
pub use config::GatewayConfig;
pub use engine::{EngineError, EngineRequest, SpeechEngine};
pub use error::AppError;
pub use gateway::{SynthesisGateway, SynthesisRequest, SynthesisResult};
pub use registry::{VoiceDescriptor, VoiceRegistry};
