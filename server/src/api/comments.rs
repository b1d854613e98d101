//! Comments API
//!
//! Comments attach an author to a post. Any authenticated actor may
//! comment; only the author or staff may edit or delete, and only the
//! content is mutable afterwards.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::db::{self, Comment};
use crate::permissions::{allow, gate::Target, Actor, ResourceKind, Verb};

use super::error::{ApiError, ApiResult};
use super::pagination::Page;
use super::AppState;

// ============================================================================
// Types
// ============================================================================

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListCommentsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    /// Filter by post ID.
    post: Option<i64>,
    /// Filter by author account ID.
    author: Option<i64>,
}

/// Create request. The author is always the requesting actor.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    post: i64,
    #[validate(length(min = 1))]
    content: String,
}

/// Update request. Only the content may change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1))]
    content: String,
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

/// GET /api/comments
async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListCommentsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Comment>>> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.to_string()))?;
    let page = Page::new(query.limit, query.offset)?;

    let comments = db::list_comments(
        &state.db,
        query.post,
        query.author,
        page.limit,
        page.offset,
    )
    .await?;

    Ok(Json(comments))
}

/// POST /api/comments
async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    if !allow(&actor, Verb::Post, ResourceKind::Comment, None) {
        return Err(ApiError::Forbidden);
    }
    // The gate only admits authenticated actors here.
    let author = actor.account().ok_or(ApiError::Forbidden)?;

    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if db::find_post_by_id(&state.db, body.post).await?.is_none() {
        return Err(ApiError::Validation("post does not exist".into()));
    }

    let comment = db::create_comment(&state.db, author.id, body.post, &body.content)
        .await
        .map_err(|e| {
            if db::is_foreign_key_violation(&e) {
                ApiError::Validation("post does not exist".into())
            } else {
                ApiError::Database(e)
            }
        })?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/comments/{id}
async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Comment>> {
    let comment = db::find_comment_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;

    Ok(Json(comment))
}

/// PATCH /api/comments/{id}
async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    let comment = db::find_comment_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;

    if !allow(
        &actor,
        Verb::Patch,
        ResourceKind::Comment,
        Some(Target::owned_by(comment.author_id)),
    ) {
        return Err(ApiError::Forbidden);
    }

    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let updated = db::update_comment_content(&state.db, id, &body.content)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;

    Ok(Json(updated))
}

/// DELETE /api/comments/{id}
async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let comment = db::find_comment_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;

    if !allow(
        &actor,
        Verb::Delete,
        ResourceKind::Comment,
        Some(Target::owned_by(comment.author_id)),
    ) {
        return Err(ApiError::Forbidden);
    }

    if !db::delete_comment(&state.db, id).await? {
        return Err(ApiError::NotFound("comment"));
    }

    Ok(StatusCode::NO_CONTENT)
}
