//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account model (the persisted profile of an actor).
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub image_url: Option<String>,
    pub is_staff: bool,
    pub is_admin: bool,
    pub is_owner: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Post model.
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub is_active: bool,
}

/// Category model (unique slug, no owner).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Comment model. Author and post are immutable after creation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    pub post_id: i64,
    pub content: String,
}

/// Reaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reaction_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

/// Reaction model. At most one per (author, post) pair.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reaction {
    pub id: i64,
    pub author_id: i64,
    pub post_id: i64,
    pub reaction: ReactionKind,
}

/// Session model for bearer token tracking.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    /// Session ID.
    pub id: i64,
    /// Account this session belongs to.
    pub account_id: i64,
    /// SHA256 hash of the bearer token.
    pub token_hash: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
}
