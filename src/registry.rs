use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("duplicate voice id '{0}'")]
    DuplicateVoice(String),

    #[error("voice '{voice}' has an empty {field}")]
    MissingField { voice: String, field: &'static str },

    #[error("voice registry is empty")]
    Empty,

    #[error("failed to read voice registry: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse voice registry: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named voice bound to one language and one engine model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    pub id: String,
    pub name: String,
    pub language: String,
    /// Engine model backing this voice. Not exposed over the API.
    #[serde(default, skip_serializing)]
    pub model: String,
}

impl VoiceDescriptor {
    pub fn new(id: &str, name: &str, language: &str, model: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    voices: Vec<VoiceDescriptor>,
}

/// Read-only table of voices, built once at startup.
#[derive(Debug, Clone)]
pub struct VoiceRegistry {
    voices: Vec<VoiceDescriptor>,
    by_id: HashMap<String, usize>,
}

impl VoiceRegistry {
    pub fn new(voices: Vec<VoiceDescriptor>) -> Result<Self, RegistryError> {
        if voices.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut by_id = HashMap::with_capacity(voices.len());
        for (idx, voice) in voices.iter().enumerate() {
            for (field, value) in [
                ("id", &voice.id),
                ("language", &voice.language),
                ("model", &voice.model),
            ] {
                if value.trim().is_empty() {
                    return Err(RegistryError::MissingField {
                        voice: voice.id.clone(),
                        field,
                    });
                }
            }

            if by_id.insert(voice.id.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateVoice(voice.id.clone()));
            }
        }

        Ok(Self { voices, by_id })
    }

    /// The OpenAI voice names mapped onto Piper models, plus one Hindi voice.
    pub fn builtin() -> Self {
        let voices = vec![
            VoiceDescriptor::new("alloy", "Alloy", "en", "en_US-lessac-medium"),
            VoiceDescriptor::new("echo", "Echo", "en", "en_US-ryan-medium"),
            VoiceDescriptor::new("fable", "Fable", "en", "en_GB-alan-medium"),
            VoiceDescriptor::new("onyx", "Onyx", "en", "en_US-joe-medium"),
            VoiceDescriptor::new("nova", "Nova", "en", "en_US-amy-medium"),
            VoiceDescriptor::new("shimmer", "Shimmer", "en", "en_US-kristin-medium"),
            VoiceDescriptor::new("hindi_voice", "Hindi Voice", "hi", "hi_IN-pratham-medium"),
        ];
        let by_id = voices
            .iter()
            .enumerate()
            .map(|(idx, v)| (v.id.clone(), idx))
            .collect();
        Self { voices, by_id }
    }

    /// Load a `{"voices": [...]}` JSON file.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_reader(File::open(path)?)?;
        Self::new(file.voices)
    }

    pub fn resolve(&self, voice_id: &str) -> Option<&VoiceDescriptor> {
        self.by_id.get(voice_id).map(|&idx| &self.voices[idx])
    }

    pub fn voices(&self) -> &[VoiceDescriptor] {
        &self.voices
    }

    /// Distinct language codes in first-seen order.
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = Vec::new();
        for voice in &self.voices {
            if !languages.contains(&voice.language) {
                languages.push(voice.language.clone());
            }
        }
        languages
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}
