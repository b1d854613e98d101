//! API Router and Application State
//!
//! Central routing configuration and shared state. Each resource module is
//! a thin controller: it consults the permission gate and the visibility
//! resolver, then translates the request into repository calls.

pub mod accounts;
pub mod categories;
pub mod comments;
pub mod error;
pub mod pagination;
pub mod posts;
pub mod reactions;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth;
use crate::config::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .nest("/api/auth", auth::router())
        // Legacy registration endpoint, same handler as /api/auth/register.
        .route("/api/registration", post(auth::register))
        .nest("/api/accounts", accounts::router())
        .nest("/api/posts", posts::router())
        .nest("/api/categories", categories::router())
        .nest("/api/comments", comments::router())
        .nest("/api/reactions", reactions::router())
        .layer(from_fn_with_state(state.clone(), auth::load_actor));

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
