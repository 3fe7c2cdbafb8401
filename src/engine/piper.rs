use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;

use super::voice::{ModelConfig, ModelFiles};
use super::{EngineError, EngineRequest, SpeechEngine};
use crate::audio::{self, AudioFormat};

const SUPPORTED_FORMATS: [AudioFormat; 2] = [AudioFormat::Wav, AudioFormat::Pcm];

/// Piper voices run through ONNX Runtime, phonemized by espeak-ng.
pub struct PiperEngine {
    voices_dir: PathBuf,
    models: RwLock<HashMap<String, Arc<PiperModel>>>,
}

struct PiperModel {
    session: Mutex<Session>,
    config: ModelConfig,
}

impl PiperEngine {
    pub fn new(voices_dir: PathBuf) -> Self {
        Self {
            voices_dir,
            models: RwLock::new(HashMap::new()),
        }
    }

    fn get_model(&self, model: &str) -> Result<Arc<PiperModel>, EngineError> {
        // Check cache
        {
            let models = self
                .models
                .read()
                .map_err(|_| EngineError::Inference("model cache lock poisoned".into()))?;
            if let Some(loaded) = models.get(model) {
                return Ok(Arc::clone(loaded));
            }
        }

        let files = ModelFiles::load(&self.voices_dir, model)?;
        let loaded = Arc::new(PiperModel::load(files)?);
        tracing::info!("Loaded Piper model {}", model);

        let mut models = self
            .models
            .write()
            .map_err(|_| EngineError::Inference("model cache lock poisoned".into()))?;
        // Another request may have loaded it meanwhile; keep the first one.
        let entry = models
            .entry(model.to_string())
            .or_insert_with(|| Arc::clone(&loaded));
        Ok(Arc::clone(entry))
    }
}

impl SpeechEngine for PiperEngine {
    fn name(&self) -> &str {
        "piper"
    }

    fn supported_formats(&self) -> &[AudioFormat] {
        &SUPPORTED_FORMATS
    }

    fn synthesize(&self, request: &EngineRequest<'_>) -> Result<Vec<u8>, EngineError> {
        if !self.supports(request.format) {
            return Err(EngineError::UnsupportedFormat(request.format));
        }

        let model = self.get_model(&request.voice.model)?;
        let phonemes = phonemize(request.text, model.config.espeak_voice())?;
        let ids = phonemes_to_ids(&phonemes, &model.config.phoneme_id_map);
        let samples = model.infer(&ids, request.speed)?;

        if samples.is_empty() {
            return Err(EngineError::EmptyAudio);
        }

        audio::encode(&samples, model.config.audio.sample_rate, request.format)
    }
}

impl PiperModel {
    fn load(files: ModelFiles) -> Result<Self, EngineError> {
        let session = Session::builder()
            .map_err(model_unavailable("failed to create session builder"))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(model_unavailable("failed to set optimization level"))?
            .with_intra_threads(4)
            .map_err(model_unavailable("failed to set threads"))?
            .commit_from_file(&files.model_path)
            .map_err(model_unavailable("failed to load model"))?;

        Ok(Self {
            session: Mutex::new(session),
            config: files.config,
        })
    }

    fn infer(&self, phoneme_ids: &[i64], speed: f32) -> Result<Vec<f32>, EngineError> {
        if phoneme_ids.is_empty() {
            return Ok(Vec::new());
        }

        let inference = self.config.inference.clone().unwrap_or_default();
        let input_len = phoneme_ids.len();

        // input: [batch, sequence] = [1, phoneme_count]
        let input_value = Value::from_array((vec![1, input_len], phoneme_ids.to_vec()))
            .map_err(|e| EngineError::Inference(format!("failed to create input tensor: {}", e)))?;

        // input_lengths: [batch] = [1]
        let lengths_value =
            Value::from_array((vec![1], vec![input_len as i64])).map_err(|e| {
                EngineError::Inference(format!("failed to create lengths tensor: {}", e))
            })?;

        // scales: [3] = [noise_scale, length_scale, noise_w]
        let scales_value = Value::from_array((
            vec![3],
            vec![
                inference.noise_scale,
                length_scale_for(inference.length_scale, speed),
                inference.noise_w,
            ],
        ))
        .map_err(|e| EngineError::Inference(format!("failed to create scales tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EngineError::Inference("session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![input_value, lengths_value, scales_value])
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        let output = outputs
            .get("output")
            .or_else(|| outputs.get("audio"))
            .ok_or_else(|| EngineError::Inference("missing output tensor".to_string()))?;

        let output_view = output.try_extract_tensor::<f32>().map_err(|e| {
            EngineError::Inference(format!("failed to extract output tensor: {}", e))
        })?;

        Ok(output_view.1.iter().copied().collect())
    }
}

fn model_unavailable<E: fmt::Display>(context: &'static str) -> impl FnOnce(E) -> EngineError {
    move |e| EngineError::ModelUnavailable(format!("{}: {}", context, e))
}

/// Piper stretches durations by `length_scale`; faster speech means a smaller scale.
fn length_scale_for(base: f32, speed: f32) -> f32 {
    if speed > 0.0 {
        base / speed
    } else {
        base
    }
}

/// Convert text to IPA phonemes using espeak-ng
pub fn phonemize(text: &str, voice: &str) -> Result<String, EngineError> {
    phonemize_with(ESPEAK_PROGRAM, text, voice)
}

const ESPEAK_PROGRAM: &str = "espeak-ng";

/// Text is fed on stdin so it is never parsed as an espeak-ng option.
fn phonemize_with(
    program: impl AsRef<OsStr>,
    text: &str,
    voice: &str,
) -> Result<String, EngineError> {
    if text.is_empty() {
        return Ok(String::new());
    }

    let mut child = Command::new(program)
        .args(["--ipa", "-q", "-v", voice])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            EngineError::Phonemizer(format!("failed to run espeak-ng (is it installed?): {}", e))
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| EngineError::Phonemizer("espeak-ng stdin unavailable".to_string()))?;
    let input = text.as_bytes().to_vec();
    // Written from another thread so a full stdout pipe cannot stall us.
    let writer = thread::spawn(move || stdin.write_all(&input));

    let output = child
        .wait_with_output()
        .map_err(|e| EngineError::Phonemizer(format!("espeak-ng did not finish: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::Phonemizer(format!(
            "espeak-ng failed: {}",
            stderr.trim()
        )));
    }

    match writer.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Err(EngineError::Phonemizer(format!(
                "failed to write text to espeak-ng: {}",
                e
            )))
        }
        Err(_) => {
            return Err(EngineError::Phonemizer(
                "espeak-ng writer thread panicked".to_string(),
            ))
        }
    }

    // espeak-ng prints one line per input line; keep them as one utterance.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let phonemes: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    Ok(phonemes.join(" "))
}

/// Map phonemes to model ids, framed by BOS/EOS and interleaved with padding.
pub fn phonemes_to_ids(phonemes: &str, id_map: &HashMap<String, Vec<i64>>) -> Vec<i64> {
    let mut ids = Vec::new();

    match id_map.get("^") {
        Some(bos) => ids.extend(bos),
        None => ids.push(0),
    }

    let pad = id_map.get("_");
    for ch in phonemes.chars() {
        if let Some(mapped) = id_map.get(ch.encode_utf8(&mut [0; 4]) as &str) {
            ids.extend(mapped);
        }
        if let Some(pad) = pad {
            ids.extend(pad);
        }
    }

    match id_map.get("$") {
        Some(eos) => ids.extend(eos),
        None => ids.push(0),
    }

    ids
}
