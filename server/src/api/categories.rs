//! Categories API
//!
//! Flat slug vocabulary attached to posts. Reads are open; the pool is
//! curated by staff. Deleting a category detaches it from posts.

use std::sync::LazyLock;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use regex::Regex;
use serde::Deserialize;

use crate::db::{self, Category};
use crate::permissions::{allow, Actor, ResourceKind, Verb};

use super::error::{ApiError, ApiResult};
use super::pagination::Page;
use super::AppState;

static SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]{1,40}$").unwrap());

// ============================================================================
// Types
// ============================================================================

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    name: Option<String>,
}

/// Create / replace request. The name is a slug: letters, digits,
/// hyphens and underscores only.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    name: String,
}

fn check_slug(name: &str) -> ApiResult<()> {
    if SLUG_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "name must be a slug of at most 40 letters, digits, hyphens or underscores".into(),
        ))
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(retrieve).put(replace).delete(remove))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/categories
async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListCategoriesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Category>>> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.to_string()))?;
    let page = Page::new(query.limit, query.offset)?;

    let categories = db::list_categories(
        &state.db,
        query.name.as_deref(),
        page.limit,
        page.offset,
    )
    .await?;

    Ok(Json(categories))
}

/// POST /api/categories
async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<CategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    if !allow(&actor, Verb::Post, ResourceKind::Category, None) {
        return Err(ApiError::Forbidden);
    }
    check_slug(&body.name)?;

    let category = db::create_category(&state.db, &body.name)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                ApiError::Conflict("category name already exists".into())
            } else {
                ApiError::Database(e)
            }
        })?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/categories/{id}
async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Category>> {
    let category = db::find_category_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("category"))?;

    Ok(Json(category))
}

/// PUT /api/categories/{id}
async fn replace(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    if !allow(&actor, Verb::Put, ResourceKind::Category, None) {
        return Err(ApiError::Forbidden);
    }
    check_slug(&body.name)?;

    let category = db::update_category(&state.db, id, &body.name)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                ApiError::Conflict("category name already exists".into())
            } else {
                ApiError::Database(e)
            }
        })?
        .ok_or(ApiError::NotFound("category"))?;

    Ok(Json(category))
}

/// DELETE /api/categories/{id}
async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if !allow(&actor, Verb::Delete, ResourceKind::Category, None) {
        return Err(ApiError::Forbidden);
    }

    if !db::delete_category(&state.db, id).await? {
        return Err(ApiError::NotFound("category"));
    }

    Ok(StatusCode::NO_CONTENT)
}
