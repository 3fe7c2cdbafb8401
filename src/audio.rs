use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::engine::EngineError;

/// Output container/codec a client may ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Opus,
    Aac,
    Flac,
    #[default]
    Wav,
    Pcm,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 6] = [
        Self::Mp3,
        Self::Opus,
        Self::Aac,
        Self::Flac,
        Self::Wav,
        Self::Pcm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Pcm => "pcm",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/opus",
            Self::Aac => "audio/aac",
            Self::Flac => "audio/flac",
            Self::Wav => "audio/wav",
            Self::Pcm => "audio/pcm",
        }
    }

    /// File extension used for download names.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pcm => "raw",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown audio format '{0}'")]
pub struct UnknownFormat(pub String);

impl FromStr for AudioFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == lowered)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// Encode mono f32 samples into the requested container.
pub fn encode(
    samples: &[f32],
    sample_rate: u32,
    format: AudioFormat,
) -> Result<Vec<u8>, EngineError> {
    match format {
        AudioFormat::Wav => samples_to_wav(samples, sample_rate),
        AudioFormat::Pcm => Ok(samples_to_pcm(samples)),
        other => Err(EngineError::UnsupportedFormat(other)),
    }
}

/// Convert f32 [-1.0, 1.0] to i16 with a 2x gain boost.
fn to_i16(sample: f32) -> i16 {
    (sample * 2.0 * 32767.0).clamp(-32768.0, 32767.0) as i16
}

pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, EngineError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let cursor = Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, spec)
            .map_err(|e| EngineError::Encoding(format!("failed to create WAV writer: {}", e)))?;

        for sample in samples {
            writer
                .write_sample(to_i16(*sample))
                .map_err(|e| EngineError::Encoding(format!("failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| EngineError::Encoding(format!("failed to finalize WAV: {}", e)))?;
    }

    Ok(buffer)
}

/// Headerless 16-bit little-endian mono.
pub fn samples_to_pcm(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|s| to_i16(*s).to_le_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("WAV".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
        assert_eq!(" mp3 ".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!("pcm".parse::<AudioFormat>().unwrap(), AudioFormat::Pcm);
    }

    #[test]
    fn rejects_unknown_format() {
        let err = "ogg".parse::<AudioFormat>().unwrap_err();
        assert_eq!(err, UnknownFormat("ogg".to_string()));
    }

    #[test]
    fn mime_types_match_openai_surface() {
        assert_eq!(AudioFormat::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(AudioFormat::Wav.mime_type(), "audio/wav");
        assert_eq!(AudioFormat::Pcm.mime_type(), "audio/pcm");
        assert_eq!(AudioFormat::Pcm.extension(), "raw");
    }

    #[test]
    fn default_format_is_wav() {
        assert_eq!(AudioFormat::default(), AudioFormat::Wav);
    }

    #[test]
    fn test_samples_to_wav_empty() {
        let wav = samples_to_wav(&[], 22050).unwrap();
        // Should produce valid WAV header even for empty audio
        assert!(wav.starts_with(b"RIFF"));
    }

    #[test]
    fn test_samples_to_wav_valid() {
        let samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        let wav = samples_to_wav(&samples, 22050).unwrap();
        assert!(wav.starts_with(b"RIFF"));
        assert!(wav.len() > 44); // Header + some data
    }

    #[test]
    fn pcm_is_two_bytes_per_sample_and_clamped() {
        let pcm = samples_to_pcm(&[0.0, 1.0, -1.0]);
        assert_eq!(pcm.len(), 6);
        assert_eq!(&pcm[0..2], &0i16.to_le_bytes());
        assert_eq!(&pcm[2..4], &i16::MAX.to_le_bytes());
        assert_eq!(&pcm[4..6], &i16::MIN.to_le_bytes());
    }

    #[test]
    fn encode_rejects_compressed_formats() {
        let err = encode(&[0.1], 22050, AudioFormat::Mp3).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(AudioFormat::Mp3)));
    }
}
