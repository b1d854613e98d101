//! Posts HTTP tests.
//!
//! Staff-curated post pool: creation and deletion are staff operations,
//! authors may edit their own posts, inactive posts are filtered from
//! lists and redacted on direct reads.
//!
//! Run ignored (integration) tests: `cargo test --test posts_http_test -- --ignored`

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::{read_json, TestAccount, TestApp};

async fn create_post(app: &TestApp, author: &TestAccount, title: &str) -> serde_json::Value {
    let resp = app
        .json_request(
            Method::POST,
            "/api/posts",
            Some(&author.token),
            Some(serde_json::json!({ "title": title, "content": "some content" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED, "post creation failed");
    read_json(resp).await
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_only_staff_create_posts() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let plain = app.register_account().await;
    guard.delete_account(plain.id);

    let body = serde_json::json!({ "title": "Nope", "content": "nope" });

    let resp = app
        .json_request(Method::POST, "/api/posts", None, Some(body.clone()))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .json_request(Method::POST, "/api/posts", Some(&plain.token), Some(body))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_create_post_with_categories() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let staff = app.register_staff_account().await;
    guard.delete_account(staff.id);

    let resp = app
        .json_request(
            Method::POST,
            "/api/categories",
            Some(&staff.token),
            Some(serde_json::json!({ "name": format!("rust-{}", helpers::unique_suffix()) })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let category = read_json(resp).await;
    let category_id = category["id"].as_i64().unwrap();
    guard.delete_category(category_id);

    let resp = app
        .json_request(
            Method::POST,
            "/api/posts",
            Some(&staff.token),
            Some(serde_json::json!({
                "title": "Tagged",
                "content": "body",
                "categories": [category_id, category_id],
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = read_json(resp).await;

    assert_eq!(body["author"], staff.id);
    // Duplicate IDs collapse to one attachment.
    assert_eq!(body["categories"], serde_json::json!([category_id]));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_create_post_with_unknown_category_rejected() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let staff = app.register_staff_account().await;
    guard.delete_account(staff.id);

    let resp = app
        .json_request(
            Method::POST,
            "/api/posts",
            Some(&staff.token),
            Some(serde_json::json!({
                "title": "Tagged",
                "content": "body",
                "categories": [i64::MAX],
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_author_updates_own_post_but_cannot_delete() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let author = app.register_staff_account().await;
    guard.delete_account(author.id);
    let post = create_post(&app, &author, "Mine").await;
    let post_id = post["id"].as_i64().unwrap();

    // Demote the author back to a plain account; ownership must carry the
    // update on its own.
    sqlx::query("UPDATE accounts SET is_staff = FALSE WHERE id = $1")
        .bind(author.id)
        .execute(&app.pool)
        .await
        .unwrap();

    let resp = app
        .json_request(
            Method::PATCH,
            &format!("/api/posts/{post_id}"),
            Some(&author.token),
            Some(serde_json::json!({ "title": "Mine, edited" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["title"], "Mine, edited");
    assert_eq!(body["content"], "some content", "PATCH leaves other fields alone");

    // Authors do not get to delete; that stays a staff operation.
    let resp = app
        .json_request(
            Method::DELETE,
            &format!("/api/posts/{post_id}"),
            Some(&author.token),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_non_author_cannot_update_post() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let author = app.register_staff_account().await;
    guard.delete_account(author.id);
    let stranger = app.register_account().await;
    guard.delete_account(stranger.id);

    let post = create_post(&app, &author, "Untouchable").await;
    let post_id = post["id"].as_i64().unwrap();

    let resp = app
        .json_request(
            Method::PATCH,
            &format!("/api/posts/{post_id}"),
            Some(&stranger.token),
            Some(serde_json::json!({ "title": "defaced" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_put_replaces_category_set() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let staff = app.register_staff_account().await;
    guard.delete_account(staff.id);

    let post = create_post(&app, &staff, "Replace me").await;
    let post_id = post["id"].as_i64().unwrap();

    let resp = app
        .json_request(
            Method::PUT,
            &format!("/api/posts/{post_id}"),
            Some(&staff.token),
            Some(serde_json::json!({
                "title": "Replaced",
                "content": "new content",
                "categories": [],
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["title"], "Replaced");
    assert_eq!(body["content"], "new content");
    assert_eq!(body["categories"], serde_json::json!([]));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_inactive_post_redacted_and_filtered() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let staff = app.register_staff_account().await;
    guard.delete_account(staff.id);
    let reader = app.register_account().await;
    guard.delete_account(reader.id);

    let resp = app
        .json_request(
            Method::POST,
            "/api/posts",
            Some(&staff.token),
            Some(serde_json::json!({
                "title": "Draft",
                "content": "not ready",
                "is_active": false,
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post = read_json(resp).await;
    let post_id = post["id"].as_i64().unwrap();

    // Direct read by a stranger: redacted to {id, is_active}.
    let resp = app
        .json_request(
            Method::GET,
            &format!("/api/posts/{post_id}"),
            Some(&reader.token),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body, serde_json::json!({ "id": post_id, "is_active": false }));

    // Listing by the author's username: hidden from non-staff, visible to
    // staff.
    let uri = format!("/api/posts?author={}", staff.username);
    let resp = app.json_request(Method::GET, &uri, Some(&reader.token), None).await;
    let body = read_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    let resp = app.json_request(Method::GET, &uri, Some(&staff.token), None).await;
    let body = read_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Draft", "staff get the full body in lists");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_list_filters_by_category_name() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let staff = app.register_staff_account().await;
    guard.delete_account(staff.id);

    let slug = format!("filter-{}", helpers::unique_suffix());
    let resp = app
        .json_request(
            Method::POST,
            "/api/categories",
            Some(&staff.token),
            Some(serde_json::json!({ "name": slug })),
        )
        .await;
    let category = read_json(resp).await;
    let category_id = category["id"].as_i64().unwrap();
    guard.delete_category(category_id);

    let resp = app
        .json_request(
            Method::POST,
            "/api/posts",
            Some(&staff.token),
            Some(serde_json::json!({
                "title": "In category",
                "content": "body",
                "categories": [category_id],
            })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    create_post(&app, &staff, "Out of category").await;

    let resp = app
        .json_request(Method::GET, &format!("/api/posts?category={slug}"), None, None)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    let posts = body.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "In category");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_pagination_slices_newest_first() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let staff = app.register_staff_account().await;
    guard.delete_account(staff.id);

    for i in 1..=5 {
        create_post(&app, &staff, &format!("p{i}")).await;
    }

    // Newest first: p5 p4 p3 p2 p1; [1:3] is p4 and p3.
    let resp = app
        .json_request(
            Method::GET,
            &format!("/api/posts?author={}&limit=2&offset=1", staff.username),
            None,
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["p4", "p3"]);

    // Open-ended offset runs to the end of the set.
    let resp = app
        .json_request(
            Method::GET,
            &format!("/api/posts?author={}&offset=3", staff.username),
            None,
            None,
        )
        .await;
    let body = read_json(resp).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["p2", "p1"]);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_delete_post_with_comments_conflicts() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let staff = app.register_staff_account().await;
    guard.delete_account(staff.id);
    let commenter = app.register_account().await;
    guard.delete_account(commenter.id);

    let post = create_post(&app, &staff, "Commented").await;
    let post_id = post["id"].as_i64().unwrap();

    let resp = app
        .json_request(
            Method::POST,
            "/api/comments",
            Some(&commenter.token),
            Some(serde_json::json!({ "post": post_id, "content": "first!" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .json_request(
            Method::DELETE,
            &format!("/api/posts/{post_id}"),
            Some(&staff.token),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_staff_delete_post_succeeds() {
    let app = TestApp::new().await;
    let mut guard = app.cleanup_guard();

    let staff = app.register_staff_account().await;
    guard.delete_account(staff.id);

    let post = create_post(&app, &staff, "Short lived").await;
    let post_id = post["id"].as_i64().unwrap();

    let resp = app
        .json_request(
            Method::DELETE,
            &format!("/api/posts/{post_id}"),
            Some(&staff.token),
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .json_request(Method::GET, &format!("/api/posts/{post_id}"), None, None)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
