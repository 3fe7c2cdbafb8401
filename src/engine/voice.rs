use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::EngineError;

/// The `<model>.onnx.json` sidecar shipped with every Piper voice.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub audio: AudioConfig,
    pub espeak: Option<EspeakConfig>,
    #[serde(default)]
    pub phoneme_id_map: HashMap<String, Vec<i64>>,
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspeakConfig {
    pub voice: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f32,
    #[serde(default = "default_length_scale")]
    pub length_scale: f32,
    #[serde(default = "default_noise_w")]
    pub noise_w: f32,
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_length_scale() -> f32 {
    1.0
}

fn default_noise_w() -> f32 {
    0.8
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

impl ModelConfig {
    pub fn espeak_voice(&self) -> &str {
        self.espeak.as_ref().map(|e| e.voice.as_str()).unwrap_or("en")
    }
}

/// Paths and parsed config of one Piper model on disk.
#[derive(Debug)]
pub struct ModelFiles {
    pub config: ModelConfig,
    pub model_path: PathBuf,
}

impl ModelFiles {
    pub fn load(voices_dir: &Path, model: &str) -> Result<Self, EngineError> {
        let model_path = voices_dir.join(format!("{}.onnx", model));
        let config_path = voices_dir.join(format!("{}.onnx.json", model));

        if !model_path.exists() {
            tracing::error!("Model file not found: {}", model_path.display());
            return Err(EngineError::ModelUnavailable(format!("{} not found", model)));
        }

        if !config_path.exists() {
            tracing::error!("Model config not found: {}", config_path.display());
            return Err(EngineError::ModelUnavailable(format!(
                "{} (missing config file)",
                model
            )));
        }

        let unreadable = |e: &dyn std::fmt::Display| {
            tracing::error!("Failed to read {}: {}", config_path.display(), e);
            EngineError::ModelUnavailable(format!("{} (unreadable config file)", model))
        };
        let file = File::open(&config_path).map_err(|e| unreadable(&e))?;
        let config: ModelConfig = serde_json::from_reader(file).map_err(|e| unreadable(&e))?;

        Ok(Self { config, model_path })
    }
}
