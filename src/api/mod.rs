pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

use crate::registry::VoiceDescriptor;

pub use crate::gateway::HealthStatus as HealthResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesResponse {
    pub languages: Vec<String>,
}
