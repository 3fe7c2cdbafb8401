//! HTTP client for a running gateway, used by the `speak` binary.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::api::{HealthResponse, LanguagesResponse, VoicesResponse};
use crate::audio::AudioFormat;
use crate::error::ErrorResponse;
use crate::gateway::{SynthesisRequest, SynthesisResult};
use crate::registry::VoiceDescriptor;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("cannot reach gateway at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("gateway returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("unexpected response from gateway: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Uses `BACKEND_URL`, falling back to the local default.
    pub fn from_env() -> Self {
        let url = std::env::var("BACKEND_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        Self::new(url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get_json("/health").await
    }

    pub async fn is_online(&self) -> bool {
        self.health().await.is_ok()
    }

    pub async fn voices(&self) -> Result<Vec<VoiceDescriptor>, ClientError> {
        let response: VoicesResponse = self.get_json("/v1/voices").await?;
        Ok(response.voices)
    }

    /// Voice ids grouped by language code.
    pub async fn voices_by_language(
        &self,
    ) -> Result<BTreeMap<String, Vec<String>>, ClientError> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for voice in self.voices().await? {
            grouped.entry(voice.language).or_default().push(voice.id);
        }
        Ok(grouped)
    }

    pub async fn languages(&self) -> Result<Vec<String>, ClientError> {
        let response: LanguagesResponse = self.get_json("/api/languages").await?;
        Ok(response.languages)
    }

    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisResult, ClientError> {
        let url = self.url("/v1/audio/speech");
        let response = self
            .http
            .post(&url)
            .timeout(SYNTHESIS_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url, source })?;
        let response = check_status(response).await?;

        let requested: AudioFormat = request
            .response_format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();
        let format = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(format_for_mime)
            .unwrap_or(requested);

        let audio = response.bytes().await.map_err(ClientError::Decode)?;
        Ok(SynthesisResult {
            audio: audio.to_vec(),
            format,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url, source })?;
        check_status(response)
            .await?
            .json::<T>()
            .await
            .map_err(ClientError::Decode)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => (Some(err.code), err.error),
        Err(_) => (None, body),
    };

    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

fn format_for_mime(mime: &str) -> Option<AudioFormat> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    AudioFormat::ALL
        .into_iter()
        .find(|f| f.mime_type().eq_ignore_ascii_case(essence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let client = GatewayClient::new("http://tts.local:8000/");
        assert_eq!(client.base_url(), "http://tts.local:8000");
        assert_eq!(client.url("/health"), "http://tts.local:8000/health");
    }

    #[test]
    fn maps_mime_back_to_format() {
        assert_eq!(format_for_mime("audio/wav"), Some(AudioFormat::Wav));
        assert_eq!(format_for_mime("audio/mpeg; charset=binary"), Some(AudioFormat::Mp3));
        assert_eq!(format_for_mime("application/json"), None);
    }
}
