use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::AppConfig;
use crate::server::handlers::{health, query, tickets, voice};
use crate::state::AppState;

/// Origins allowed when `CORS_ALLOWED_ORIGINS` is not configured; covers
/// the usual local frontend dev servers.
const LOCAL_DEV_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Builds the application router: the answer and ticket endpoints, the
/// voice-assistant surface, and CORS/trace middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config);
    Router::new()
        .route("/health", get(health::health))
        .route("/query", post(query::query))
        .route("/create-ticket", post(tickets::create_ticket))
        .route("/api/config", get(voice::get_voice_config))
        .route("/api/webhook", post(voice::vapi_webhook))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if origins.is_empty() {
        origins = LOCAL_DEV_ORIGINS
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
