//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::error;

use super::models::{Account, Category, Comment, Post, Reaction, ReactionKind};

/// Log and return a database error with context.
///
/// This helper ensures all database errors are logged with relevant context
/// before being propagated, making production debugging easier.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

// ============================================================================
// Account Queries
// ============================================================================

/// Find account by ID.
pub async fn find_account_by_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_account_by_id", account_id = %id))
}

/// Find account by username.
pub async fn find_account_by_username(
    pool: &PgPool,
    username: &str,
) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_account_by_username", username = %username))
}

/// Find account by email (login identity).
pub async fn find_account_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_account_by_email", email = %email))
}

/// Check if username exists.
pub async fn username_exists(pool: &PgPool, username: &str) -> sqlx::Result<bool> {
    let result: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)")
            .bind(username)
            .fetch_one(pool)
            .await?;

    Ok(result.0)
}

/// Check if email exists.
pub async fn email_exists(pool: &PgPool, email: &str) -> sqlx::Result<bool> {
    let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(result.0)
}

/// Create a new account.
pub async fn create_account(
    pool: &PgPool,
    username: &str,
    email: &str,
    name: &str,
    password_hash: &str,
    is_staff: bool,
    is_active: bool,
) -> sqlx::Result<Account> {
    sqlx::query_as::<_, Account>(
        r"
        INSERT INTO accounts (username, email, name, password_hash, is_staff, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        ",
    )
    .bind(username)
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(is_staff)
    .bind(is_active)
    .fetch_one(pool)
    .await
}

/// Equality filters for account listings. `only_active` implements the
/// default visibility filter for non-staff readers.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountFilter<'a> {
    pub only_active: bool,
    pub username: Option<&'a str>,
    pub is_staff: Option<bool>,
    pub is_admin: Option<bool>,
    pub is_owner: Option<bool>,
}

/// List accounts ordered newest-joined first. `limit = None` means no
/// upper bound.
pub async fn list_accounts(
    pool: &PgPool,
    filter: AccountFilter<'_>,
    limit: Option<i64>,
    offset: i64,
) -> sqlx::Result<Vec<Account>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM accounts WHERE TRUE");

    if filter.only_active {
        qb.push(" AND is_active = TRUE");
    }
    if let Some(username) = filter.username {
        qb.push(" AND username = ").push_bind(username);
    }
    if let Some(is_staff) = filter.is_staff {
        qb.push(" AND is_staff = ").push_bind(is_staff);
    }
    if let Some(is_admin) = filter.is_admin {
        qb.push(" AND is_admin = ").push_bind(is_admin);
    }
    if let Some(is_owner) = filter.is_owner {
        qb.push(" AND is_owner = ").push_bind(is_owner);
    }

    qb.push(" ORDER BY date_joined DESC, id DESC");
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    qb.build_query_as::<Account>()
        .fetch_all(pool)
        .await
        .map_err(db_error!("list_accounts", only_active = filter.only_active))
}

/// Field changes for an account update. `None` leaves the column untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountChanges<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
}

impl AccountChanges<'_> {
    /// Whether any column would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.name.is_none()
            && self.password_hash.is_none()
            && self.image_url.is_none()
            && self.is_active.is_none()
            && self.is_staff.is_none()
    }
}

/// Apply a partial update to an account. Returns `None` if the account does
/// not exist.
pub async fn update_account(
    pool: &PgPool,
    id: i64,
    changes: AccountChanges<'_>,
) -> sqlx::Result<Option<Account>> {
    if changes.is_empty() {
        return find_account_by_id(pool, id).await;
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE accounts SET ");
    let mut set = qb.separated(", ");

    if let Some(username) = changes.username {
        set.push("username = ").push_bind_unseparated(username);
    }
    if let Some(email) = changes.email {
        set.push("email = ").push_bind_unseparated(email);
    }
    if let Some(name) = changes.name {
        set.push("name = ").push_bind_unseparated(name);
    }
    if let Some(password_hash) = changes.password_hash {
        set.push("password_hash = ")
            .push_bind_unseparated(password_hash);
    }
    if let Some(image_url) = changes.image_url {
        set.push("image_url = ").push_bind_unseparated(image_url);
    }
    if let Some(is_active) = changes.is_active {
        set.push("is_active = ").push_bind_unseparated(is_active);
    }
    if let Some(is_staff) = changes.is_staff {
        set.push("is_staff = ").push_bind_unseparated(is_staff);
    }

    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING *");

    qb.build_query_as::<Account>()
        .fetch_optional(pool)
        .await
        .map_err(db_error!("update_account", account_id = %id))
}

/// Delete an account. Returns `false` if no row matched.
///
/// Fails with a foreign-key violation while posts, comments or reactions
/// still reference the account (protect-on-delete).
pub async fn delete_account(pool: &PgPool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Record a successful login.
pub async fn touch_last_login(pool: &PgPool, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE accounts SET last_login = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(db_error!("touch_last_login", account_id = %id))?;

    Ok(())
}

// ============================================================================
// Session Queries
// ============================================================================

/// Create a session row for a bearer token hash.
pub async fn create_session(
    pool: &PgPool,
    account_id: i64,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO sessions (account_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(account_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await
    .map_err(db_error!("create_session", account_id = %account_id))?;

    Ok(())
}

/// Resolve an unexpired session token hash to its account.
pub async fn find_session_account(
    pool: &PgPool,
    token_hash: &str,
) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>(
        r"
        SELECT a.* FROM accounts a
        JOIN sessions s ON s.account_id = a.id
        WHERE s.token_hash = $1 AND s.expires_at > NOW()
        ",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("find_session_account", table = "sessions"))
}

/// Delete a session by its token hash. Returns `false` if no row matched.
pub async fn delete_session_by_token_hash(pool: &PgPool, token_hash: &str) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Post Queries
// ============================================================================

/// Find post by ID.
pub async fn find_post_by_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<Post>> {
    sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_post_by_id", post_id = %id))
}

/// Create a post and attach its categories in one transaction.
pub async fn create_post(
    pool: &PgPool,
    author_id: i64,
    title: &str,
    content: &str,
    is_active: bool,
    categories: &[i64],
) -> sqlx::Result<Post> {
    let mut tx = pool.begin().await?;

    let post = sqlx::query_as::<_, Post>(
        r"
        INSERT INTO posts (author_id, title, content, is_active)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        ",
    )
    .bind(author_id)
    .bind(title)
    .bind(content)
    .bind(is_active)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error!("create_post", author_id = %author_id))?;

    if !categories.is_empty() {
        sqlx::query(
            r"
            INSERT INTO post_categories (post_id, category_id)
            SELECT $1, unnest($2::bigint[])
            ",
        )
        .bind(post.id)
        .bind(categories)
        .execute(&mut *tx)
        .await
        .map_err(db_error!("create_post_categories", post_id = %post.id))?;
    }

    tx.commit().await?;
    Ok(post)
}

/// Field changes for a post update. Author and creation date are immutable.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostChanges<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub is_active: Option<bool>,
}

/// Apply a partial update to a post, optionally replacing its category set.
/// Returns `None` if the post does not exist.
pub async fn update_post(
    pool: &PgPool,
    id: i64,
    changes: PostChanges<'_>,
    categories: Option<&[i64]>,
) -> sqlx::Result<Option<Post>> {
    let mut tx = pool.begin().await?;

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE posts SET ");
    let mut set = qb.separated(", ");

    // `id = id` keeps the statement valid when only categories change.
    set.push("id = id");
    if let Some(title) = changes.title {
        set.push("title = ").push_bind_unseparated(title);
    }
    if let Some(content) = changes.content {
        set.push("content = ").push_bind_unseparated(content);
    }
    if let Some(is_active) = changes.is_active {
        set.push("is_active = ").push_bind_unseparated(is_active);
    }

    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING *");

    let Some(post) = qb
        .build_query_as::<Post>()
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error!("update_post", post_id = %id))?
    else {
        return Ok(None);
    };

    if let Some(categories) = categories {
        sqlx::query("DELETE FROM post_categories WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if !categories.is_empty() {
            sqlx::query(
                r"
                INSERT INTO post_categories (post_id, category_id)
                SELECT $1, unnest($2::bigint[])
                ",
            )
            .bind(id)
            .bind(categories)
            .execute(&mut *tx)
            .await
            .map_err(db_error!("update_post_categories", post_id = %id))?;
        }
    }

    tx.commit().await?;
    Ok(Some(post))
}

/// List posts ordered newest first.
pub async fn list_posts(
    pool: &PgPool,
    only_active: bool,
    author_username: Option<&str>,
    category_name: Option<&str>,
    limit: Option<i64>,
    offset: i64,
) -> sqlx::Result<Vec<Post>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT p.* FROM posts p WHERE TRUE");

    if only_active {
        qb.push(" AND p.is_active = TRUE");
    }
    if let Some(username) = author_username {
        qb.push(" AND p.author_id = (SELECT id FROM accounts WHERE username = ")
            .push_bind(username)
            .push(")");
    }
    if let Some(name) = category_name {
        qb.push(
            " AND EXISTS (SELECT 1 FROM post_categories pc \
             JOIN categories c ON c.id = pc.category_id \
             WHERE pc.post_id = p.id AND c.name = ",
        )
        .push_bind(name)
        .push(")");
    }

    qb.push(" ORDER BY p.date DESC, p.id DESC");
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    qb.build_query_as::<Post>()
        .fetch_all(pool)
        .await
        .map_err(db_error!("list_posts", only_active = only_active))
}

/// Delete a post. Returns `false` if no row matched.
///
/// Fails with a foreign-key violation while comments or reactions still
/// reference the post.
pub async fn delete_post(pool: &PgPool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Category IDs attached to a post.
pub async fn category_ids_for_post(pool: &PgPool, post_id: i64) -> sqlx::Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT category_id FROM post_categories WHERE post_id = $1 ORDER BY category_id",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Category IDs for many posts in one query (avoids N+1 in list responses).
pub async fn category_ids_for_posts(
    pool: &PgPool,
    post_ids: &[i64],
) -> sqlx::Result<Vec<(i64, i64)>> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as(
        r"
        SELECT post_id, category_id FROM post_categories
        WHERE post_id = ANY($1)
        ORDER BY post_id, category_id
        ",
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await
}

/// How many of the given category IDs exist.
pub async fn count_existing_categories(pool: &PgPool, ids: &[i64]) -> sqlx::Result<i64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM categories WHERE id = ANY($1)")
            .bind(ids)
            .fetch_one(pool)
            .await?;

    Ok(count)
}

// ============================================================================
// Category Queries
// ============================================================================

/// Find category by ID.
pub async fn find_category_by_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_category_by_id", category_id = %id))
}

/// Create a category.
pub async fn create_category(pool: &PgPool, name: &str) -> sqlx::Result<Category> {
    sqlx::query_as::<_, Category>("INSERT INTO categories (name) VALUES ($1) RETURNING *")
        .bind(name)
        .fetch_one(pool)
        .await
}

/// List categories by id.
pub async fn list_categories(
    pool: &PgPool,
    name: Option<&str>,
    limit: Option<i64>,
    offset: i64,
) -> sqlx::Result<Vec<Category>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM categories WHERE TRUE");

    if let Some(name) = name {
        qb.push(" AND name = ").push_bind(name);
    }

    qb.push(" ORDER BY id");
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    qb.build_query_as::<Category>().fetch_all(pool).await
}

/// Replace a category's slug name. Returns `None` if it does not exist.
pub async fn update_category(
    pool: &PgPool,
    id: i64,
    name: &str,
) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>("UPDATE categories SET name = $1 WHERE id = $2 RETURNING *")
        .bind(name)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Delete a category. Returns `false` if no row matched.
pub async fn delete_category(pool: &PgPool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Comment Queries
// ============================================================================

/// Find comment by ID.
pub async fn find_comment_by_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<Comment>> {
    sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_comment_by_id", comment_id = %id))
}

/// Create a comment.
pub async fn create_comment(
    pool: &PgPool,
    author_id: i64,
    post_id: i64,
    content: &str,
) -> sqlx::Result<Comment> {
    sqlx::query_as::<_, Comment>(
        r"
        INSERT INTO comments (author_id, post_id, content)
        VALUES ($1, $2, $3)
        RETURNING *
        ",
    )
    .bind(author_id)
    .bind(post_id)
    .bind(content)
    .fetch_one(pool)
    .await
    .map_err(db_error!("create_comment", post_id = %post_id))
}

/// List comments by id.
pub async fn list_comments(
    pool: &PgPool,
    post_id: Option<i64>,
    author_id: Option<i64>,
    limit: Option<i64>,
    offset: i64,
) -> sqlx::Result<Vec<Comment>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM comments WHERE TRUE");

    if let Some(post_id) = post_id {
        qb.push(" AND post_id = ").push_bind(post_id);
    }
    if let Some(author_id) = author_id {
        qb.push(" AND author_id = ").push_bind(author_id);
    }

    qb.push(" ORDER BY id");
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    qb.build_query_as::<Comment>().fetch_all(pool).await
}

/// Update a comment's content (the only mutable field). Returns `None` if it
/// does not exist.
pub async fn update_comment_content(
    pool: &PgPool,
    id: i64,
    content: &str,
) -> sqlx::Result<Option<Comment>> {
    sqlx::query_as::<_, Comment>("UPDATE comments SET content = $1 WHERE id = $2 RETURNING *")
        .bind(content)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Delete a comment. Returns `false` if no row matched.
pub async fn delete_comment(pool: &PgPool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Reaction Queries
// ============================================================================

/// Find reaction by ID.
pub async fn find_reaction_by_id(pool: &PgPool, id: i64) -> sqlx::Result<Option<Reaction>> {
    sqlx::query_as::<_, Reaction>("SELECT * FROM reactions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_reaction_by_id", reaction_id = %id))
}

/// Create a reaction.
///
/// The UNIQUE (author, post) constraint rejects duplicates atomically;
/// callers map that violation to a conflict error.
pub async fn create_reaction(
    pool: &PgPool,
    author_id: i64,
    post_id: i64,
    reaction: ReactionKind,
) -> sqlx::Result<Reaction> {
    sqlx::query_as::<_, Reaction>(
        r"
        INSERT INTO reactions (author_id, post_id, reaction)
        VALUES ($1, $2, $3)
        RETURNING *
        ",
    )
    .bind(author_id)
    .bind(post_id)
    .bind(reaction)
    .fetch_one(pool)
    .await
}

/// List reactions by id.
pub async fn list_reactions(
    pool: &PgPool,
    post_id: Option<i64>,
    author_id: Option<i64>,
    kind: Option<ReactionKind>,
    limit: Option<i64>,
    offset: i64,
) -> sqlx::Result<Vec<Reaction>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM reactions WHERE TRUE");

    if let Some(post_id) = post_id {
        qb.push(" AND post_id = ").push_bind(post_id);
    }
    if let Some(author_id) = author_id {
        qb.push(" AND author_id = ").push_bind(author_id);
    }
    if let Some(kind) = kind {
        qb.push(" AND reaction = ").push_bind(kind);
    }

    qb.push(" ORDER BY id");
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    qb.build_query_as::<Reaction>().fetch_all(pool).await
}

/// Change a reaction's kind (the only mutable field). Returns `None` if it
/// does not exist.
pub async fn update_reaction_kind(
    pool: &PgPool,
    id: i64,
    reaction: ReactionKind,
) -> sqlx::Result<Option<Reaction>> {
    sqlx::query_as::<_, Reaction>(
        "UPDATE reactions SET reaction = $1 WHERE id = $2 RETURNING *",
    )
    .bind(reaction)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Delete a reaction. Returns `false` if no row matched.
pub async fn delete_reaction(pool: &PgPool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM reactions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
