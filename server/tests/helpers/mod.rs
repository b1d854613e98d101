//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full
//! axum router, plus utilities for account creation, staff grants, and
//! session tokens.
//!
//! ## Shared Resources
//!
//! Use [`shared_pool()`] to avoid creating a new connection pool per test.
//!
//! ## Cleanup Guards
//!
//! Use [`CleanupGuard`] for RAII-based cleanup that runs even if a test
//! panics.
#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::Body;
use axum::http::{self, header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use ink_server::api::{create_router, AppState};
use ink_server::config::Config;
use ink_server::db;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tower::ServiceExt;

// ============================================================================
// Shared resources
// ============================================================================

/// Shared database pool across all tests in the same binary.
static SHARED_POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Shared config across all tests in the same binary.
static SHARED_CONFIG: OnceCell<Config> = OnceCell::const_new();

/// Get or create a shared database pool. Runs migrations once.
pub async fn shared_pool() -> &'static PgPool {
    SHARED_POOL
        .get_or_init(|| async {
            let config = shared_config().await;
            let pool = db::create_pool(&config.database_url)
                .await
                .expect("Failed to connect to test DB");
            db::run_migrations(&pool)
                .await
                .expect("Failed to run migrations");
            pool
        })
        .await
}

/// Get or create a shared config.
pub async fn shared_config() -> &'static Config {
    SHARED_CONFIG
        .get_or_init(|| async { Config::default_for_test() })
        .await
}

/// A unique suffix, for usernames and emails that must not collide across
/// tests sharing one database.
pub fn unique_suffix() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .subsec_nanos();
    u64::from(nanos) * 1000 + COUNTER.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Cleanup Guard
// ============================================================================

/// Async cleanup action type.
type CleanupAction = Box<dyn FnOnce(PgPool) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// RAII guard that runs cleanup actions on drop, even if the test panics.
pub struct CleanupGuard {
    pool: PgPool,
    actions: Vec<CleanupAction>,
}

impl CleanupGuard {
    /// Create a new cleanup guard for the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            actions: Vec::new(),
        }
    }

    /// Register a generic async cleanup action.
    pub fn add<F, Fut>(&mut self, action: F)
    where
        F: FnOnce(PgPool) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.actions
            .push(Box::new(move |pool| Box::pin(action(pool))));
    }

    /// Register cleanup to delete an account and everything it owns.
    pub fn delete_account(&mut self, account_id: i64) {
        self.add(move |pool| async move {
            let _ = sqlx::query("DELETE FROM reactions WHERE author_id = $1")
                .bind(account_id)
                .execute(&pool)
                .await;
            let _ = sqlx::query("DELETE FROM comments WHERE author_id = $1")
                .bind(account_id)
                .execute(&pool)
                .await;
            let _ = sqlx::query(
                "DELETE FROM reactions WHERE post_id IN (SELECT id FROM posts WHERE author_id = $1)",
            )
            .bind(account_id)
            .execute(&pool)
            .await;
            let _ = sqlx::query(
                "DELETE FROM comments WHERE post_id IN (SELECT id FROM posts WHERE author_id = $1)",
            )
            .bind(account_id)
            .execute(&pool)
            .await;
            let _ = sqlx::query("DELETE FROM posts WHERE author_id = $1")
                .bind(account_id)
                .execute(&pool)
                .await;
            let _ = sqlx::query("DELETE FROM accounts WHERE id = $1")
                .bind(account_id)
                .execute(&pool)
                .await;
        });
    }

    /// Register cleanup to delete a category by ID.
    pub fn delete_category(&mut self, category_id: i64) {
        self.add(move |pool| async move {
            let _ = sqlx::query("DELETE FROM categories WHERE id = $1")
                .bind(category_id)
                .execute(&pool)
                .await;
        });
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let actions = std::mem::take(&mut self.actions);
        if actions.is_empty() {
            return;
        }

        let connect_options = (*self.pool.connect_options()).clone();

        // Spawn a blocking thread to run async cleanup on its own runtime
        // and connection, so it does not depend on the test runtime — which
        // this drop is blocking. This works regardless of tokio runtime
        // flavor.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build cleanup runtime");
            runtime.block_on(async move {
                let pool = PgPool::connect_with(connect_options)
                    .await
                    .expect("failed to connect cleanup pool");
                for action in actions {
                    action(pool.clone()).await;
                }
                pool.close().await;
            });
        })
        .join()
        .expect("Cleanup thread panicked");
    }
}

// ============================================================================
// Test App
// ============================================================================

/// A registered account together with a live session token.
pub struct TestAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub token: String,
}

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub config: Arc<Config>,
}

impl TestApp {
    /// Create a new test app using the shared DB connection pool.
    pub async fn new() -> Self {
        let pool = shared_pool().await.clone();
        let config = shared_config().await.clone();

        let state = AppState::new(pool.clone(), config.clone());
        let router = create_router(state);

        Self {
            router,
            pool,
            config: Arc::new(config),
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Send a JSON request, optionally with a bearer token.
    pub async fn json_request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Self::request(method, uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");

        self.oneshot(request).await
    }

    /// Register a fresh account through the API and log it in.
    pub async fn register_account(&self) -> TestAccount {
        let suffix = unique_suffix();
        let username = format!("user_{suffix}");
        let email = format!("user_{suffix}@example.com");
        let password = "correct-horse-battery".to_string();

        let resp = self
            .json_request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED, "registration failed");
        let body = read_json(resp).await;
        let id = body["id"].as_i64().expect("registration body has no id");

        let token = self.login(&email, &password).await;

        TestAccount {
            id,
            username,
            email,
            password,
            token,
        }
    }

    /// Register an account and grant it the staff flag directly in the
    /// database (registration itself never grants capability flags).
    pub async fn register_staff_account(&self) -> TestAccount {
        let account = self.register_account().await;
        sqlx::query("UPDATE accounts SET is_staff = TRUE WHERE id = $1")
            .bind(account.id)
            .execute(&self.pool)
            .await
            .expect("failed to grant staff flag");
        account
    }

    /// Log in and return the bearer token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK, "login failed");
        let body = read_json(resp).await;
        body["token"]
            .as_str()
            .expect("login body has no token")
            .to_string()
    }

    /// Create a [`CleanupGuard`] for this app's pool.
    pub fn cleanup_guard(&self) -> CleanupGuard {
        CleanupGuard::new(self.pool.clone())
    }
}

/// Collect a response body and parse it as JSON.
pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is not valid JSON")
}
