#![allow(dead_code)]

use std::sync::Arc;

use speech_gateway::api::routes::{create_router, AppState};
use speech_gateway::audio;
use speech_gateway::{
    AudioFormat, EngineError, EngineRequest, SpeechEngine, SynthesisGateway, VoiceRegistry,
};

/// Emits a short tone whose length follows the input text.
pub struct ToneEngine;

impl SpeechEngine for ToneEngine {
    fn name(&self) -> &str {
        "tone"
    }

    fn supported_formats(&self) -> &[AudioFormat] {
        &[AudioFormat::Wav, AudioFormat::Pcm]
    }

    fn synthesize(&self, request: &EngineRequest<'_>) -> Result<Vec<u8>, EngineError> {
        let samples: Vec<f32> = (0..request.text.len() * 100)
            .map(|i| (i as f32 * 0.05).sin() * 0.3)
            .collect();
        audio::encode(&samples, 22050, request.format)
    }
}

/// Fails every call the way a missing model would.
pub struct FailingEngine;

impl SpeechEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    fn supported_formats(&self) -> &[AudioFormat] {
        &[AudioFormat::Wav]
    }

    fn synthesize(&self, _request: &EngineRequest<'_>) -> Result<Vec<u8>, EngineError> {
        Err(EngineError::ModelUnavailable("en_US-lessac-medium".into()))
    }
}

pub fn router_with(engine: Arc<dyn SpeechEngine>) -> axum::Router {
    let gateway = SynthesisGateway::new(VoiceRegistry::builtin(), engine);
    create_router(Arc::new(AppState { gateway }), None)
}

pub fn router() -> axum::Router {
    router_with(Arc::new(ToneEngine))
}
