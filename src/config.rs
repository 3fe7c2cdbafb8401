use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::gateway::DEFAULT_MAX_INPUT_CHARS;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a port number, got '{value}'")]
    InvalidPort { var: &'static str, value: String },

    #[error("{var} must be an IP address, got '{value}'")]
    InvalidHost { var: &'static str, value: String },

    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidLimit { var: &'static str, value: String },
}

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: IpAddr,
    pub port: u16,
    pub voices_dir: PathBuf,
    /// JSON file replacing the built-in voice table.
    pub voice_registry: Option<PathBuf>,
    pub max_input_chars: usize,
    /// Client UI assets; `None` disables static serving.
    pub static_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8000,
            voices_dir: PathBuf::from("./voices"),
            voice_registry: None,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            static_dir: Some(PathBuf::from("./static")),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("HOST") {
            config.host = value.trim().parse().map_err(|_| ConfigError::InvalidHost {
                var: "HOST",
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup("PORT") {
            config.port = value.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: "PORT",
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup("VOICES_DIR") {
            config.voices_dir = PathBuf::from(value);
        }

        config.voice_registry = lookup("VOICE_REGISTRY")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        if let Some(value) = lookup("MAX_INPUT_CHARS") {
            config.max_input_chars = match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidLimit {
                        var: "MAX_INPUT_CHARS",
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup("STATIC_DIR") {
            config.static_dir = if value.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }

        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
