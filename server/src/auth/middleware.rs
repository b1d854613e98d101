//! Actor-loading middleware.
//!
//! Resolves the `Authorization` header into an explicit [`Actor`] value
//! injected into request extensions; handlers never consult ambient session
//! state. Requests without the header proceed as [`Actor::Anonymous`];
//! a present-but-invalid bearer token is rejected outright.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::db::{self, Account};
use crate::permissions::{Actor, ActorAccount};

use super::hash_token;

/// Raw bearer token of the current session, kept around so logout can
/// revoke exactly the session that authenticated the request.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl From<&Account> for ActorAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            is_staff: account.is_staff,
            is_admin: account.is_admin,
            is_owner: account.is_owner,
            is_active: account.is_active,
        }
    }
}

/// Middleware that loads the acting identity for every API request.
pub async fn load_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(ToOwned::to_owned);

    let actor = match auth_header {
        None => Actor::Anonymous,
        Some(header) => {
            let token = header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthenticated)?;

            let account = db::find_session_account(&state.db, &hash_token(token))
                .await?
                .ok_or(ApiError::Unauthenticated)?;

            request
                .extensions_mut()
                .insert(SessionToken(token.to_owned()));

            Actor::Account(ActorAccount::from(&account))
        }
    };

    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

/// Extractor for the acting identity in handlers.
///
/// Falls back to [`Actor::Anonymous`] on routes mounted outside the
/// actor-loading middleware.
impl<S> axum::extract::FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or(Self::Anonymous))
    }
}

/// Extractor for the raw session token of the current request, if any.
impl<S> axum::extract::FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(ApiError::NotLoggedIn)
    }
}
