//! HTTP proxy in front of the speech and chat vendors
//!
//! This module keeps vendor keys server-side for the browser client:
//! - POST /api/stt - Transcribe an uploaded `audio` part
//! - POST /api/tts - Synthesize speech (`__PREVIEW__` speaks the preview line)
//! - POST /api/chat - Clarify or finalize a meal conversation
//! - GET /api/voices - Selectable voices (cached)
//! - GET /api/patterns - Patterns report over the bundled history
//! - GET /health - Health check
//!
//! Any other path is served from the static directory when one is configured.

mod handlers;
mod routes;
mod state;

pub use handlers::{ChatRequest, ChatResponse, ErrorResponse, SttResponse, TtsRequest};
pub use routes::create_router;
pub use state::AppState;

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")
}
