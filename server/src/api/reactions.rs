//! Reactions API
//!
//! Like/dislike marks on posts. At most one reaction per (author, post)
//! pair, enforced by a UNIQUE constraint. Only the author may change or
//! withdraw a reaction; changing means flipping its kind.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::{self, Reaction, ReactionKind};
use crate::permissions::{allow, gate::Target, Actor, ResourceKind, Verb};

use super::error::{ApiError, ApiResult};
use super::pagination::Page;
use super::AppState;

// ============================================================================
// Types
// ============================================================================

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListReactionsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    /// Filter by post ID.
    post: Option<i64>,
    /// Filter by author account ID.
    author: Option<i64>,
    /// Filter by kind (`like` or `dislike`).
    reaction: Option<ReactionKind>,
}

/// Create request. The author is always the requesting actor.
#[derive(Debug, Deserialize)]
pub struct CreateReactionRequest {
    post: i64,
    reaction: ReactionKind,
}

/// Update request. Only the kind may change.
#[derive(Debug, Deserialize)]
pub struct UpdateReactionRequest {
    reaction: ReactionKind,
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(retrieve).patch(update).delete(remove))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/reactions
async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListReactionsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Reaction>>> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.to_string()))?;
    let page = Page::new(query.limit, query.offset)?;

    let reactions = db::list_reactions(
        &state.db,
        query.post,
        query.author,
        query.reaction,
        page.limit,
        page.offset,
    )
    .await?;

    Ok(Json(reactions))
}

/// POST /api/reactions
async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<CreateReactionRequest>,
) -> ApiResult<impl IntoResponse> {
    if !allow(&actor, Verb::Post, ResourceKind::Reaction, None) {
        return Err(ApiError::Forbidden);
    }
    // The gate only admits authenticated actors here.
    let author = actor.account().ok_or(ApiError::Forbidden)?;

    if db::find_post_by_id(&state.db, body.post).await?.is_none() {
        return Err(ApiError::Validation("post does not exist".into()));
    }

    let reaction = db::create_reaction(&state.db, author.id, body.post, body.reaction)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                ApiError::Conflict("reaction to this post already exists".into())
            } else if db::is_foreign_key_violation(&e) {
                ApiError::Validation("post does not exist".into())
            } else {
                ApiError::Database(e)
            }
        })?;

    Ok((StatusCode::CREATED, Json(reaction)))
}

/// GET /api/reactions/{id}
async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Reaction>> {
    let reaction = db::find_reaction_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("reaction"))?;

    Ok(Json(reaction))
}

/// PATCH /api/reactions/{id}
async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<UpdateReactionRequest>,
) -> ApiResult<Json<Reaction>> {
    let reaction = db::find_reaction_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("reaction"))?;

    if !allow(
        &actor,
        Verb::Patch,
        ResourceKind::Reaction,
        Some(Target::owned_by(reaction.author_id)),
    ) {
        return Err(ApiError::Forbidden);
    }

    let updated = db::update_reaction_kind(&state.db, id, body.reaction)
        .await?
        .ok_or(ApiError::NotFound("reaction"))?;

    Ok(Json(updated))
}

/// DELETE /api/reactions/{id}
async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let reaction = db::find_reaction_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("reaction"))?;

    if !allow(
        &actor,
        Verb::Delete,
        ResourceKind::Reaction,
        Some(Target::owned_by(reaction.author_id)),
    ) {
        return Err(ApiError::Forbidden);
    }

    if !db::delete_reaction(&state.db, id).await? {
        return Err(ApiError::NotFound("reaction"));
    }

    Ok(StatusCode::NO_CONTENT)
}
