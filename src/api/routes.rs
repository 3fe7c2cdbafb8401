use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers;
use crate::gateway::SynthesisGateway;

pub struct AppState {
    pub gateway: SynthesisGateway,
}

/// API routes, plus the client UI from `static_dir` for every other path.
pub fn create_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/voices", get(handlers::list_voices))
        .route("/api/languages", get(handlers::list_languages))
        .route("/v1/audio/speech", post(handlers::create_speech));

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
