use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use speech_gateway::api::routes::{create_router, AppState};
use speech_gateway::engine::PiperEngine;
use speech_gateway::{GatewayConfig, SynthesisGateway, VoiceRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env().context("invalid configuration")?;

    let registry = match &config.voice_registry {
        Some(path) => VoiceRegistry::from_file(path)
            .with_context(|| format!("failed to load voice registry {}", path.display()))?,
        None => VoiceRegistry::builtin(),
    };

    let addr = config.addr();
    tracing::info!("Speech Gateway v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", addr);
    tracing::info!("Voices directory: {}", config.voices_dir.display());
    tracing::info!(
        "{} voices across languages {:?}",
        registry.len(),
        registry.languages()
    );

    let engine = Arc::new(PiperEngine::new(config.voices_dir.clone()));
    let gateway =
        SynthesisGateway::new(registry, engine).with_max_input_chars(config.max_input_chars);
    let state = Arc::new(AppState { gateway });

    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving client UI from {}", dir.display());
    }
    let app = create_router(state, config.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
