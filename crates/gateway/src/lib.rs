//! HTTP API gateway for OrbitChat.
//!
//! Exposes the chat pipeline over REST (buffered and streamed), raw space
//! data per category, a health check, and the embedded web frontend.
//!
//! Built on Axum.

pub mod api;
pub mod frontend;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use orbitchat_agent::ChatPipeline;
use orbitchat_config::{AppConfig, GatewayConfig};

/// Shared application state for the gateway.
pub struct AppState {
    pub pipeline: ChatPipeline,
}

pub type SharedState = Arc<AppState>;

/// Build the full router: API, health check and frontend.
///
/// Layers applied:
/// - CORS from `gateway.allowed_origins` (`*` allows any origin)
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(api::chat_handler))
        .route("/api/chat/stream", post(api::chat_stream_handler))
        .route("/api/data/{category}", get(api::data_handler))
        .route("/ask", get(api::ask_handler))
        .with_state(state);

    api.merge(frontend::frontend_router()).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config.allowed_origins))
            .layer(DefaultBodyLimit::max(config.body_limit_bytes)),
    )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.gateway.addr();

    let provider = orbitchat_providers::build_from_config(&config);
    let pipeline = ChatPipeline::from_config(&config, provider)?;
    let state = Arc::new(AppState { pipeline });
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, model = %config.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
