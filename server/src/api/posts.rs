//! Posts API
//!
//! Post CRUD with attached category sets. Staff manage the post pool;
//! authors may edit their own posts but not create or delete them.
//! Inactive posts are filtered from lists for non-staff and redacted to
//! `{id, is_active: false}` wherever they still surface.

use std::collections::HashMap;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::{self, Post, PostChanges};
use crate::permissions::{allow, gate::Target, visibility, Actor, PostRef, ResourceKind, Verb};

use super::error::{ApiError, ApiResult};
use super::pagination::Page;
use super::AppState;

// ============================================================================
// Types
// ============================================================================

/// Serialized post with its category IDs.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PostBody {
    /// Full field set.
    Full {
        id: i64,
        author: i64,
        title: String,
        content: String,
        date: DateTime<Utc>,
        is_active: bool,
        categories: Vec<i64>,
    },
    /// Minimal redacted body for inactive posts.
    Redacted { id: i64, is_active: bool },
}

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    /// Filter by author username.
    author: Option<String>,
    /// Filter by category name.
    category: Option<String>,
}

/// Create request. The author is always the requesting actor.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 150))]
    title: String,
    #[validate(length(min = 1))]
    content: String,
    is_active: Option<bool>,
    #[serde(default)]
    categories: Vec<i64>,
}

/// Full replacement request for `PUT`.
#[derive(Debug, Deserialize, Validate)]
pub struct ReplacePostRequest {
    #[validate(length(min = 1, max = 150))]
    title: String,
    #[validate(length(min = 1))]
    content: String,
    is_active: Option<bool>,
    #[serde(default)]
    categories: Vec<i64>,
}

/// Partial update request for `PATCH`. Absent fields stay untouched;
/// the author and creation date are immutable.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 150))]
    title: Option<String>,
    #[validate(length(min = 1))]
    content: Option<String>,
    is_active: Option<bool>,
    categories: Option<Vec<i64>>,
}

// ============================================================================
// Projection
// ============================================================================

/// Serialize a post for this reader, applying redaction last.
fn project_post(actor: &Actor, post: &Post, categories: Vec<i64>) -> PostBody {
    let target = PostRef {
        author_id: post.author_id,
        is_active: post.is_active,
    };

    if visibility::redact_post(actor, target) {
        return PostBody::Redacted {
            id: post.id,
            is_active: post.is_active,
        };
    }

    PostBody::Full {
        id: post.id,
        author: post.author_id,
        title: post.title.clone(),
        content: post.content.clone(),
        date: post.date,
        is_active: post.is_active,
        categories,
    }
}

/// Validate a requested category set: dedupe, then require that every ID
/// exists. Returns the deduplicated set in ascending order.
async fn check_categories(state: &AppState, ids: &[i64]) -> ApiResult<Vec<i64>> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let existing = db::count_existing_categories(&state.db, &ids).await?;
    if existing != i64::try_from(ids.len()).unwrap_or(i64::MAX) {
        return Err(ApiError::Validation(
            "one or more categories do not exist".into(),
        ));
    }

    Ok(ids)
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{id}",
            get(retrieve).put(replace).patch(update).delete(remove),
        )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/posts
async fn list(
    State(state): State<AppState>,
    actor: Actor,
    query: Result<Query<ListPostsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PostBody>>> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.to_string()))?;
    let page = Page::new(query.limit, query.offset)?;

    // Non-staff never see inactive posts in listings.
    let only_active = !actor.is_staff();
    let posts = db::list_posts(
        &state.db,
        only_active,
        query.author.as_deref(),
        query.category.as_deref(),
        page.limit,
        page.offset,
    )
    .await?;

    let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let mut categories: HashMap<i64, Vec<i64>> = HashMap::new();
    for (post_id, category_id) in db::category_ids_for_posts(&state.db, &post_ids).await? {
        categories.entry(post_id).or_default().push(category_id);
    }

    let bodies = posts
        .iter()
        .map(|post| {
            let ids = categories.remove(&post.id).unwrap_or_default();
            project_post(&actor, post, ids)
        })
        .collect();

    Ok(Json(bodies))
}

/// POST /api/posts
async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    if !allow(&actor, Verb::Post, ResourceKind::Post, None) {
        return Err(ApiError::Forbidden);
    }
    // The gate only admits authenticated staff here.
    let author = actor.account().ok_or(ApiError::Forbidden)?;

    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let categories = check_categories(&state, &body.categories).await?;

    let post = db::create_post(
        &state.db,
        author.id,
        &body.title,
        &body.content,
        body.is_active.unwrap_or(true),
        &categories,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(project_post(&actor, &post, categories)),
    ))
}

/// GET /api/posts/{id}
async fn retrieve(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<Json<PostBody>> {
    let post = db::find_post_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    let categories = db::category_ids_for_post(&state.db, id).await?;
    Ok(Json(project_post(&actor, &post, categories)))
}

/// PUT /api/posts/{id}
async fn replace(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<ReplacePostRequest>,
) -> ApiResult<Json<PostBody>> {
    let post = db::find_post_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    if !allow(
        &actor,
        Verb::Put,
        ResourceKind::Post,
        Some(Target::owned_by(post.author_id)),
    ) {
        return Err(ApiError::Forbidden);
    }

    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let categories = check_categories(&state, &body.categories).await?;

    let changes = PostChanges {
        title: Some(&body.title),
        content: Some(&body.content),
        is_active: Some(body.is_active.unwrap_or(true)),
    };
    let updated = db::update_post(&state.db, id, changes, Some(&categories))
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    Ok(Json(project_post(&actor, &updated, categories)))
}

/// PATCH /api/posts/{id}
async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostRequest>,
) -> ApiResult<Json<PostBody>> {
    let post = db::find_post_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    if !allow(
        &actor,
        Verb::Patch,
        ResourceKind::Post,
        Some(Target::owned_by(post.author_id)),
    ) {
        return Err(ApiError::Forbidden);
    }

    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let categories = match body.categories.as_deref() {
        Some(ids) => Some(check_categories(&state, ids).await?),
        None => None,
    };

    let changes = PostChanges {
        title: body.title.as_deref(),
        content: body.content.as_deref(),
        is_active: body.is_active,
    };
    let updated = db::update_post(&state.db, id, changes, categories.as_deref())
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    let category_ids = match categories {
        Some(ids) => ids,
        None => db::category_ids_for_post(&state.db, id).await?,
    };
    Ok(Json(project_post(&actor, &updated, category_ids)))
}

/// DELETE /api/posts/{id}
async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let post = db::find_post_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    if !allow(
        &actor,
        Verb::Delete,
        ResourceKind::Post,
        Some(Target::owned_by(post.author_id)),
    ) {
        return Err(ApiError::Forbidden);
    }

    let deleted = db::delete_post(&state.db, id).await.map_err(|e| {
        if db::is_foreign_key_violation(&e) {
            ApiError::Conflict("post is still referenced by comments or reactions".into())
        } else {
            ApiError::Database(e)
        }
    })?;

    if !deleted {
        return Err(ApiError::NotFound("post"));
    }

    Ok(StatusCode::NO_CONTENT)
}
