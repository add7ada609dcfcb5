//! HTTP/WebSocket API of the relay.
//!
//! # Endpoints
//!
//! ```text
//! GET /health      - Health check and open room count
//! GET /rooms       - Public rooms waiting in the lobby
//! GET /ws/{code}   - WebSocket into room `code`
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use singular_relay::{api::{AppState, create_router}, config::RelayConfig};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelayConfig::default();
//! let app = create_router(AppState::new(config.clone()));
//! let listener = tokio::net::TcpListener::bind(config.bind).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod websocket;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::{config::RelayConfig, registry::RoomRegistry};

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            registry: Arc::new(RoomRegistry::new(config.max_rooms, config.max_members)),
            config: Arc::new(config),
        }
    }
}

/// Create the relay router with all endpoints and CORS applied.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/rooms", get(list_rooms))
        .route("/ws/{code}", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "rooms": state.registry.room_count().await,
    }))
}

async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.public_rooms().await)
}
