use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Vendor proxies
        .route("/api/stt", post(handlers::speech_to_text))
        .route("/api/tts", post(handlers::text_to_speech))
        .route("/api/chat", post(handlers::chat))
        .route("/api/voices", get(handlers::list_voices))
        // Analytics
        .route("/api/patterns", get(handlers::patterns));

    let router = match &state.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
