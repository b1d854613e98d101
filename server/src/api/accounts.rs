//! Accounts API
//!
//! Account CRUD with role-based view selection: privileged readers (and the
//! account itself) get the full field set including email; everyone else a
//! public view. Inactive accounts are filtered from lists for non-staff and
//! redacted to `{id, is_active: false}` wherever they still surface.

use std::sync::LazyLock;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::hash_password;
use crate::db::{self, Account, AccountChanges, AccountFilter};
use crate::permissions::{
    allow, gate::Target, visibility, Actor, AccountRef, ResourceKind, Verb, ViewKind, WriteSchema,
};

use super::error::{ApiError, ApiResult};
use super::pagination::Page;
use super::AppState;

/// Accepted username alphabet.
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.+-]{3,150}$").unwrap());

/// Validate a username against the accepted alphabet.
///
/// Shared by registration and account create/update so every path that can
/// set a username applies the same rule.
pub fn validate_username(username: &str) -> ApiResult<()> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "username may only contain letters, digits and _.+-".into(),
        ))
    }
}

// ============================================================================
// Types
// ============================================================================

/// Serialized account, field set per resolved view.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AccountBody {
    /// Full field set for privileged readers and the account itself.
    Privileged {
        id: i64,
        username: String,
        email: String,
        name: String,
        image_url: Option<String>,
        date_joined: DateTime<Utc>,
        last_login: Option<DateTime<Utc>>,
        is_admin: bool,
        is_staff: bool,
        is_active: bool,
    },
    /// Public field set (no email, no active flag).
    Public {
        id: i64,
        username: String,
        image_url: Option<String>,
        date_joined: DateTime<Utc>,
        last_login: Option<DateTime<Utc>>,
        is_admin: bool,
        is_staff: bool,
    },
    /// Minimal redacted body for inactive accounts.
    Redacted { id: i64, is_active: bool },
}

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    username: Option<String>,
    is_staff: Option<bool>,
    is_admin: Option<bool>,
    is_owner: Option<bool>,
}

/// Create request; `is_staff` is honored only under the privileged write
/// schema.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 3, max = 150))]
    username: String,
    #[validate(email)]
    email: String,
    #[validate(length(max = 150))]
    name: Option<String>,
    #[validate(length(max = 128))]
    password: String,
    is_active: Option<bool>,
    is_staff: Option<bool>,
}

/// Partial update request. Absent fields stay untouched; `is_staff` is
/// honored only under the privileged write schema.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 3, max = 150))]
    username: Option<String>,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(max = 150))]
    name: Option<String>,
    #[validate(length(max = 128))]
    password: Option<String>,
    image_url: Option<String>,
    is_active: Option<bool>,
    is_staff: Option<bool>,
}

// ============================================================================
// Projection
// ============================================================================

/// Project an account through an already-resolved view, applying the
/// inactive-redaction transform last. One code path for single objects and
/// list members.
#[must_use]
pub fn project_account(actor: &Actor, view: ViewKind, account: &Account) -> AccountBody {
    let target = AccountRef {
        id: account.id,
        is_active: account.is_active,
    };

    if visibility::redact_account(actor, target) {
        return AccountBody::Redacted {
            id: account.id,
            is_active: false,
        };
    }

    match view {
        ViewKind::Privileged => AccountBody::Privileged {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            image_url: account.image_url.clone(),
            date_joined: account.date_joined,
            last_login: account.last_login,
            is_admin: account.is_admin,
            is_staff: account.is_staff,
            is_active: account.is_active,
        },
        ViewKind::Public => AccountBody::Public {
            id: account.id,
            username: account.username.clone(),
            image_url: account.image_url.clone(),
            date_joined: account.date_joined,
            last_login: account.last_login,
            is_admin: account.is_admin,
            is_staff: account.is_staff,
        },
    }
}

/// Resolve the view for a single target account and project it.
#[must_use]
pub fn account_body(actor: &Actor, account: &Account) -> AccountBody {
    let view = visibility::account_view(
        actor,
        Some(AccountRef {
            id: account.id,
            is_active: account.is_active,
        }),
    );
    project_account(actor, view, account)
}

// ============================================================================
// Routing
// ============================================================================

/// Account routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{id}",
            get(retrieve).patch(update).delete(remove),
        )
}

/// Resolve an account selector: a numeric id, or the `me` alias for the
/// current actor.
fn resolve_selector(selector: &str, actor: &Actor) -> ApiResult<i64> {
    if selector == "me" {
        return actor.id().ok_or(ApiError::Unauthenticated);
    }

    selector
        .parse()
        .map_err(|_| ApiError::Validation("invalid account id".into()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/accounts
async fn list(
    State(state): State<AppState>,
    actor: Actor,
    query: Result<Query<ListAccountsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AccountBody>>> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.to_string()))?;
    let page = Page::new(query.limit, query.offset)?;

    let filter = AccountFilter {
        // Non-staff never see inactive accounts in listings.
        only_active: !actor.is_staff(),
        username: query.username.as_deref(),
        is_staff: query.is_staff,
        is_admin: query.is_admin,
        is_owner: query.is_owner,
    };
    let accounts = db::list_accounts(&state.db, filter, page.limit, page.offset).await?;

    // One view for the whole page; redaction stays per-row.
    let view = visibility::account_view(&actor, None);
    let bodies = accounts
        .iter()
        .map(|account| project_account(&actor, view, account))
        .collect();

    Ok(Json(bodies))
}

/// POST /api/accounts
async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<CreateAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    if !allow(&actor, Verb::Post, ResourceKind::Account, None) {
        return Err(ApiError::Forbidden);
    }

    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    validate_username(&body.username)?;
    if body.password.len() < state.config.password_min_length {
        return Err(ApiError::Validation(format!(
            "password must be at least {} characters",
            state.config.password_min_length
        )));
    }

    // Only the privileged write schema may set capability flags; the
    // restricted schema silently drops them, mirroring serializer field
    // selection.
    let is_staff = match visibility::account_write_schema(&actor) {
        WriteSchema::Privileged => body.is_staff.unwrap_or(false),
        WriteSchema::Restricted => false,
    };

    let password_hash = hash_password(&body.password).map_err(|_| ApiError::PasswordHash)?;
    let account = db::create_account(
        &state.db,
        &body.username,
        &body.email,
        body.name.as_deref().unwrap_or(""),
        &password_hash,
        is_staff,
        body.is_active.unwrap_or(true),
    )
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            ApiError::Conflict("username or email already taken".into())
        } else {
            ApiError::Database(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(account_body(&actor, &account))))
}

/// GET /api/accounts/{id|me}
async fn retrieve(
    State(state): State<AppState>,
    actor: Actor,
    Path(selector): Path<String>,
) -> ApiResult<Json<AccountBody>> {
    let id = resolve_selector(&selector, &actor)?;

    let account = db::find_account_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    Ok(Json(account_body(&actor, &account)))
}

/// PATCH /api/accounts/{id|me}
async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(selector): Path<String>,
    Json(body): Json<UpdateAccountRequest>,
) -> ApiResult<Json<AccountBody>> {
    let id = resolve_selector(&selector, &actor)?;

    let account = db::find_account_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    if !allow(
        &actor,
        Verb::Patch,
        ResourceKind::Account,
        Some(Target::owned_by(account.id)),
    ) {
        return Err(ApiError::Forbidden);
    }

    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    if let Some(username) = body.username.as_deref() {
        validate_username(username)?;
    }

    let password_hash = match body.password.as_deref() {
        Some(password) => {
            if password.len() < state.config.password_min_length {
                return Err(ApiError::Validation(format!(
                    "password must be at least {} characters",
                    state.config.password_min_length
                )));
            }
            Some(hash_password(password).map_err(|_| ApiError::PasswordHash)?)
        }
        None => None,
    };

    let is_staff = match visibility::account_write_schema(&actor) {
        WriteSchema::Privileged => body.is_staff,
        WriteSchema::Restricted => None,
    };

    let changes = AccountChanges {
        username: body.username.as_deref(),
        email: body.email.as_deref(),
        name: body.name.as_deref(),
        password_hash: password_hash.as_deref(),
        image_url: body.image_url.as_deref(),
        is_active: body.is_active,
        is_staff,
    };

    let updated = db::update_account(&state.db, id, changes)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                ApiError::Conflict("username or email already taken".into())
            } else {
                ApiError::Database(e)
            }
        })?
        .ok_or(ApiError::NotFound("account"))?;

    Ok(Json(account_body(&actor, &updated)))
}

/// DELETE /api/accounts/{id|me}
async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(selector): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = resolve_selector(&selector, &actor)?;

    let account = db::find_account_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    if !allow(
        &actor,
        Verb::Delete,
        ResourceKind::Account,
        Some(Target::owned_by(account.id)),
    ) {
        return Err(ApiError::Forbidden);
    }

    let deleted = db::delete_account(&state.db, id).await.map_err(|e| {
        if db::is_foreign_key_violation(&e) {
            ApiError::Conflict(
                "account is still referenced by posts, comments or reactions".into(),
            )
        } else {
            ApiError::Database(e)
        }
    })?;

    if !deleted {
        return Err(ApiError::NotFound("account"));
    }

    Ok(StatusCode::NO_CONTENT)
}
