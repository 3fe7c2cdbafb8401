//! Request handling between the HTTP surface and the speech engine.
//!
//! [`SynthesisGateway`] owns the read-only voice registry and the engine. It
//! validates a [`SynthesisRequest`], resolves the voice to its language and
//! engine model, and returns a [`SynthesisResult`] or an [`AppError`].

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;
use crate::engine::{EngineError, EngineRequest, SpeechEngine};
use crate::error::AppError;
use crate::registry::{VoiceDescriptor, VoiceRegistry};

pub const DEFAULT_MODEL: &str = "tts-1";
pub const DEFAULT_MAX_INPUT_CHARS: usize = 4096;
pub const MIN_SPEED: f32 = 0.25;
pub const MAX_SPEED: f32 = 4.0;

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Body of `POST /v1/audio/speech`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Informational only; any value is accepted.
    #[serde(default = "default_model")]
    pub model: String,
    pub input: String,
    pub voice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    /// Must match the voice's language when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl SynthesisRequest {
    pub fn new(input: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            model: default_model(),
            input: input.into(),
            voice: voice.into(),
            response_format: None,
            language: None,
            speed: None,
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.response_format = Some(format.as_str().to_string());
        self
    }
}

/// A request that passed validation, with its voice resolved.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedRequest<'a> {
    pub input: &'a str,
    pub voice: &'a VoiceDescriptor,
    pub format: AudioFormat,
    pub speed: f32,
}

#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub audio: Vec<u8>,
    pub format: AudioFormat,
}

impl SynthesisResult {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub engine: String,
}

pub struct SynthesisGateway {
    registry: VoiceRegistry,
    languages: Vec<String>,
    engine: Arc<dyn SpeechEngine>,
    max_input_chars: usize,
}

impl SynthesisGateway {
    pub fn new(registry: VoiceRegistry, engine: Arc<dyn SpeechEngine>) -> Self {
        let languages = registry.languages();
        Self {
            registry,
            languages,
            engine,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine: self.engine.name().to_string(),
        }
    }

    pub fn list_voices(&self) -> &[VoiceDescriptor] {
        self.registry.voices()
    }

    pub fn list_languages(&self) -> &[String] {
        &self.languages
    }

    pub fn validate<'a>(
        &'a self,
        request: &'a SynthesisRequest,
    ) -> Result<ValidatedRequest<'a>, AppError> {
        if request.input.trim().is_empty() {
            return Err(AppError::invalid("input must not be empty"));
        }

        let chars = request.input.chars().count();
        if chars > self.max_input_chars {
            return Err(AppError::invalid(format!(
                "input too long ({} chars, max {})",
                chars, self.max_input_chars
            )));
        }

        let voice = self
            .registry
            .resolve(&request.voice)
            .ok_or_else(|| AppError::invalid(format!("unknown voice '{}'", request.voice)))?;

        if let Some(language) = &request.language {
            if !language.eq_ignore_ascii_case(&voice.language) {
                return Err(AppError::invalid(format!(
                    "voice '{}' speaks '{}', not '{}'",
                    voice.id, voice.language, language
                )));
            }
        }

        let format = match &request.response_format {
            Some(raw) => raw
                .parse::<AudioFormat>()
                .map_err(|e| AppError::invalid(format!("invalid response_format: {}", e)))?,
            None => AudioFormat::default(),
        };

        if !self.engine.supports(format) {
            let supported: Vec<&str> = self
                .engine
                .supported_formats()
                .iter()
                .map(|f| f.as_str())
                .collect();
            return Err(AppError::invalid(format!(
                "response_format '{}' is not supported (supported: {})",
                format,
                supported.join(", ")
            )));
        }

        let speed = request.speed.unwrap_or(1.0);
        if !speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(AppError::invalid(format!(
                "speed must be between {} and {}",
                MIN_SPEED, MAX_SPEED
            )));
        }

        Ok(ValidatedRequest {
            input: &request.input,
            voice,
            format,
            speed,
        })
    }

    /// Validate, then hand the text to the engine. Engine failures are not retried.
    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, AppError> {
        let validated = self.validate(request)?;

        tracing::info!(
            model = %request.model,
            voice = %validated.voice.id,
            language = %validated.voice.language,
            format = %validated.format,
            input_chars = validated.input.chars().count(),
            "Synthesizing speech"
        );

        let started = Instant::now();
        let audio = self.engine.synthesize(&EngineRequest {
            text: validated.input,
            voice: validated.voice,
            format: validated.format,
            speed: validated.speed,
        })?;

        if audio.is_empty() {
            return Err(EngineError::EmptyAudio.into());
        }

        tracing::debug!(
            bytes = audio.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Synthesis complete"
        );

        Ok(SynthesisResult {
            audio,
            format: validated.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renders one sample per input byte so output size tracks the text.
    #[derive(Default)]
    struct CountingEngine {
        calls: AtomicUsize,
    }

    impl SpeechEngine for CountingEngine {
        fn name(&self) -> &str {
            "counting"
        }

        fn supported_formats(&self) -> &[AudioFormat] {
            &[AudioFormat::Wav, AudioFormat::Pcm]
        }

        fn synthesize(&self, request: &EngineRequest<'_>) -> Result<Vec<u8>, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let samples = vec![0.25; request.text.len()];
            crate::audio::encode(&samples, 16000, request.format)
        }
    }

    struct BrokenEngine;

    impl SpeechEngine for BrokenEngine {
        fn name(&self) -> &str {
            "broken"
        }

        fn supported_formats(&self) -> &[AudioFormat] {
            &[AudioFormat::Wav]
        }

        fn synthesize(&self, _request: &EngineRequest<'_>) -> Result<Vec<u8>, EngineError> {
            Err(EngineError::Inference("model exploded".into()))
        }
    }

    struct SilentEngine;

    impl SpeechEngine for SilentEngine {
        fn name(&self) -> &str {
            "silent"
        }

        fn supported_formats(&self) -> &[AudioFormat] {
            &[AudioFormat::Pcm]
        }

        fn synthesize(&self, _request: &EngineRequest<'_>) -> Result<Vec<u8>, EngineError> {
            Ok(Vec::new())
        }
    }

    fn gateway() -> SynthesisGateway {
        SynthesisGateway::new(VoiceRegistry::builtin(), Arc::new(CountingEngine::default()))
    }

    fn assert_invalid(result: Result<SynthesisResult, AppError>, needle: &str) {
        match result {
            Err(AppError::InvalidArgument(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected InvalidArgument containing {needle:?}, got {other:?}"),
        }
    }

    #[test]
    fn every_voice_synthesizes_wav() {
        let gateway = gateway();
        for voice in gateway.list_voices() {
            let result = gateway
                .synthesize(&SynthesisRequest::new("Hello, this is a test.", voice.id.clone()))
                .unwrap();
            assert_eq!(result.format, AudioFormat::Wav);
            assert_eq!(result.mime_type(), "audio/wav");
            assert!(result.audio.starts_with(b"RIFF"));
        }
    }

    #[test]
    fn pcm_output_has_no_header() {
        let result = gateway()
            .synthesize(&SynthesisRequest::new("abcd", "nova").with_format(AudioFormat::Pcm))
            .unwrap();
        assert_eq!(result.audio.len(), 8);
        assert_eq!(result.mime_type(), "audio/pcm");
    }

    #[test]
    fn empty_and_blank_input_rejected() {
        assert_invalid(gateway().synthesize(&SynthesisRequest::new("", "alloy")), "empty");
        assert_invalid(gateway().synthesize(&SynthesisRequest::new("  \n\t", "alloy")), "empty");
    }

    #[test]
    fn overlong_input_rejected() {
        let gateway = gateway().with_max_input_chars(5);
        assert_invalid(
            gateway.synthesize(&SynthesisRequest::new("123456", "alloy")),
            "too long",
        );
        // Limit counts characters, not bytes.
        assert!(gateway.synthesize(&SynthesisRequest::new("नमस्ते", "hindi_voice")).is_err());
        assert!(gateway.synthesize(&SynthesisRequest::new("héllo", "alloy")).is_ok());
    }

    #[test]
    fn unknown_voice_rejected() {
        assert_invalid(
            gateway().synthesize(&SynthesisRequest::new("hi", "nonexistent")),
            "unknown voice",
        );
        assert_invalid(gateway().synthesize(&SynthesisRequest::new("hi", "")), "unknown voice");
    }

    #[test]
    fn language_must_match_voice() {
        let gateway = gateway();
        let mut request = SynthesisRequest::new("namaste", "hindi_voice");
        request.language = Some("hi".into());
        assert!(gateway.synthesize(&request).is_ok());

        request.language = Some("en".into());
        assert_invalid(gateway.synthesize(&request), "speaks 'hi'");
    }

    #[test]
    fn unknown_and_unsupported_formats_rejected() {
        let gateway = gateway();
        let mut request = SynthesisRequest::new("hi", "alloy");
        request.response_format = Some("ogg".into());
        assert_invalid(gateway.synthesize(&request), "invalid response_format");

        request.response_format = Some("mp3".into());
        assert_invalid(gateway.synthesize(&request), "supported: wav, pcm");
    }

    #[test]
    fn speed_bounds_enforced() {
        let gateway = gateway();
        for bad in [0.1, 4.5, f32::NAN] {
            let mut request = SynthesisRequest::new("hi", "alloy");
            request.speed = Some(bad);
            assert_invalid(gateway.synthesize(&request), "speed");
        }
        let mut request = SynthesisRequest::new("hi", "alloy");
        request.speed = Some(4.0);
        assert!(gateway.synthesize(&request).is_ok());
    }

    #[test]
    fn invalid_request_never_reaches_engine() {
        let engine = Arc::new(CountingEngine::default());
        let gateway = SynthesisGateway::new(VoiceRegistry::builtin(), engine.clone());
        let _ = gateway.synthesize(&SynthesisRequest::new("", "alloy"));
        let _ = gateway.synthesize(&SynthesisRequest::new("hi", "nobody"));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn engine_failure_is_not_retried() {
        let gateway = SynthesisGateway::new(VoiceRegistry::builtin(), Arc::new(BrokenEngine));
        let err = gateway.synthesize(&SynthesisRequest::new("hi", "alloy")).unwrap_err();
        assert!(matches!(err, AppError::Engine(EngineError::Inference(_))));
    }

    #[test]
    fn empty_engine_output_is_engine_error() {
        let gateway = SynthesisGateway::new(VoiceRegistry::builtin(), Arc::new(SilentEngine));
        let request = SynthesisRequest::new("hi", "alloy").with_format(AudioFormat::Pcm);
        let err = gateway.synthesize(&request).unwrap_err();
        assert!(matches!(err, AppError::Engine(EngineError::EmptyAudio)));
    }

    #[test]
    fn listings_are_stable() {
        let gateway = gateway();
        assert_eq!(gateway.list_voices(), gateway.list_voices());
        assert_eq!(gateway.list_voices().len(), 7);
        assert_eq!(gateway.list_languages(), ["en", "hi"]);
    }

    #[test]
    fn health_reports_engine() {
        let health = gateway().health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.engine, "counting");
    }

    #[test]
    fn request_defaults_from_json() {
        let request: SynthesisRequest =
            serde_json::from_str(r#"{"input": "Hello", "voice": "alloy"}"#).unwrap();
        assert_eq!(request.model, "tts-1");
        assert!(request.response_format.is_none());
        assert!(request.speed.is_none());
    }
}
