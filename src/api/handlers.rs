use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{HealthResponse, LanguagesResponse, VoicesResponse};
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::gateway::SynthesisRequest;

pub async fn create_speech(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SynthesisRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|e| AppError::invalid(e.body_text()))?;

    // Inference is CPU bound; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || state.gateway.synthesize(&request))
        .await
        .map_err(|e| AppError::Internal(format!("synthesis task failed: {}", e)))??;

    let disposition = format!("inline; filename=\"speech.{}\"", result.format.extension());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, result.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        result.audio,
    )
        .into_response())
}

pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: state.gateway.list_voices().to_vec(),
    })
}

pub async fn list_languages(State(state): State<Arc<AppState>>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: state.gateway.list_languages().to_vec(),
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(state.gateway.health())
}
