//! Authentication Service
//!
//! Local email/password authentication with opaque bearer session tokens.
//! Tokens are random 256-bit values handed to the client once; only their
//! SHA-256 hash is persisted.

mod handlers;
mod middleware;
mod password;

use axum::{routing::post, Router};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::api::AppState;

pub use handlers::register;
pub use middleware::{load_actor, SessionToken};
pub use password::{hash_password, verify_password};

/// Hash a bearer token for storage/lookup.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh session token (64 hex chars).
#[must_use]
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Create authentication router.
///
/// - POST /register - Create an account (restricted write schema)
/// - POST /login - Login with email/password, returns a session token
/// - POST /logout - Revoke the presented session
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
}
