//! Authentication HTTP Handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::accounts::{account_body, validate_username, AccountBody};
use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::db;
use crate::permissions::{Actor, ActorAccount};

use super::middleware::SessionToken;
use super::{generate_session_token, hash_password, hash_token, verify_password};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username (3-150 chars, letters/digits/`_.+-`).
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    /// Email address (login identity).
    #[validate(email)]
    pub email: String,
    /// Password.
    #[validate(length(max = 128))]
    pub password: String,
    /// Display name (optional).
    #[validate(length(max = 150))]
    pub name: Option<String>,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
}

/// Login response: the session token plus the account's privileged view.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Opaque bearer session token.
    pub token: String,
    /// Token type (always "Bearer").
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    /// The logged-in account, privileged view.
    pub account: AccountBody,
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new account.
///
/// Always uses the restricted write schema: public registration can never
/// set capability flags.
///
/// POST /api/auth/register (also mounted at POST /api/registration)
#[tracing::instrument(skip(state, body), fields(username = %body.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    validate_username(&body.username)?;
    if body.password.len() < state.config.password_min_length {
        return Err(ApiError::Validation(format!(
            "password must be at least {} characters",
            state.config.password_min_length
        )));
    }

    // Friendly pre-checks; the UNIQUE constraints remain authoritative
    // under concurrent registration.
    if db::username_exists(&state.db, &body.username).await? {
        return Err(ApiError::Conflict("username already taken".into()));
    }
    if db::email_exists(&state.db, &body.email).await? {
        return Err(ApiError::Conflict("email already taken".into()));
    }

    let password_hash = hash_password(&body.password).map_err(|_| ApiError::PasswordHash)?;
    let name = body.name.as_deref().unwrap_or("");

    let account = db::create_account(
        &state.db,
        &body.username,
        &body.email,
        name,
        &password_hash,
        false,
        true,
    )
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            ApiError::Conflict("username or email already taken".into())
        } else {
            ApiError::Database(e)
        }
    })?;

    tracing::info!(account_id = %account.id, "Account registered");

    // The fresh account is its own reader here, so it gets the privileged
    // view of itself.
    let self_actor = Actor::Account(ActorAccount::from(&account));
    Ok((
        StatusCode::CREATED,
        Json(account_body(&self_actor, &account)),
    ))
}

/// Login with email and password.
///
/// Establishes a session and returns its bearer token together with the
/// privileged view of the account. Wrong email, wrong password and
/// deactivated accounts are indistinguishable to the caller.
///
/// POST /api/auth/login
#[tracing::instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let account = db::find_account_by_email(&state.db, &body.email)
        .await?
        .ok_or(ApiError::WrongCredentials)?;

    let verified =
        verify_password(&body.password, &account.password_hash).unwrap_or(false);
    if !verified || !account.is_active {
        return Err(ApiError::WrongCredentials);
    }

    db::touch_last_login(&state.db, account.id).await?;

    let token = generate_session_token();
    let expires_at = Utc::now() + Duration::seconds(state.config.session_expiry);
    db::create_session(&state.db, account.id, &hash_token(&token), expires_at).await?;

    tracing::info!(account_id = %account.id, "Login succeeded");

    // Reload so the response carries the fresh last_login.
    let account = db::find_account_by_id(&state.db, account.id)
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    let self_actor = Actor::Account(ActorAccount::from(&account));
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".into(),
        expires_in: state.config.session_expiry,
        account: account_body(&self_actor, &account),
    }))
}

/// Revoke the session that authenticated this request.
///
/// Anonymous callers fail with a 403-class "not logged in" error.
///
/// POST /api/auth/logout
#[tracing::instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    token: SessionToken,
) -> ApiResult<impl IntoResponse> {
    db::delete_session_by_token_hash(&state.db, &hash_token(&token.0)).await?;

    Ok(StatusCode::NO_CONTENT)
}
