use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, Database, EntityTrait, PaginatorTrait, Set};
use serde_json::{Value, json};
use tower::ServiceExt;

use cinelog::{
    AppState,
    config::Config,
    entities::{movie, rating, watch_list},
    tmdb::TmdbClient,
};

async fn test_state() -> Arc<AppState> {
    // One pooled connection, or each checkout would see a fresh in-memory db.
    let mut opts = sea_orm::ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1);
    let db = Database::connect(opts).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let config = Arc::new(Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        tmdb_access_token: String::new(),
        tmdb_base_url: "http://localhost".to_string(),
        tmdb_image_base: "http://localhost/img".to_string(),
        tmdb_rps: 4,
        jwt_secret: "test-secret-long-enough-for-hmac".to_string(),
        access_ttl_mins: 15,
        refresh_ttl_days: 7,
    });

    let tmdb = Arc::new(TmdbClient::new(
        reqwest::Client::new(),
        String::new(),
        "http://localhost".to_string(),
        4,
    ));

    Arc::new(AppState { config, db, tmdb })
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn seed_movie(state: &AppState, title: &str) -> movie::Model {
    movie::ActiveModel {
        title: Set(title.to_string()),
        original_title: Set(title.to_string()),
        release_year: Set(Some(2020)),
        country: Set("US".to_string()),
        runtime: Set(Some(120)),
        poster_url: Set(String::new()),
        overview: Set(String::new()),
        created_at: Set(0),
        updated_at: Set(0),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .unwrap()
}

async fn register_and_login(app: &Router, username: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/api/v1/auth/register/",
        Some(json!({"username": username, "password": "hunter2222"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/api/v1/auth/login/",
        Some(json!({"username": username, "password": "hunter2222"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_login_me_roundtrip() {
    let state = test_state().await;
    let app = cinelog::router(state);

    let token = register_and_login(&app, "alice").await;

    let (status, body) = send(&app, "GET", "/api/v1/auth/me/", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, _) = send(&app, "GET", "/api/v1/auth/me/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let state = test_state().await;
    let app = cinelog::router(state);

    register_and_login(&app, "alice").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/register/",
        Some(json!({"username": "alice", "password": "other-password"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("taken"));
}

#[tokio::test]
async fn refresh_issues_new_access_token() {
    let state = test_state().await;
    let app = cinelog::router(state);

    let (_, _) = send(
        &app,
        "POST",
        "/api/v1/auth/register/",
        Some(json!({"username": "bob", "password": "hunter2222"})),
        None,
    )
    .await;
    let (_, tokens) = send(
        &app,
        "POST",
        "/api/v1/auth/login/",
        Some(json!({"username": "bob", "password": "hunter2222"})),
        None,
    )
    .await;

    let refresh = tokens["refresh"].as_str().unwrap();
    let (status, body) =
        send(&app, "POST", "/api/v1/auth/refresh/", Some(json!({"refresh": refresh})), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].as_str().is_some());

    // An access token must not pass as a refresh token.
    let access = tokens["access"].as_str().unwrap();
    let (status, _) =
        send(&app, "POST", "/api/v1/auth/refresh/", Some(json!({"refresh": access})), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let state = test_state().await;
    let app = cinelog::router(state);

    register_and_login(&app, "carol").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/login/",
        Some(json!({"username": "carol", "password": "wrong"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rating_upserts_with_created_then_ok() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let target = seed_movie(&state, "Heat").await;
    let token = register_and_login(&app, "alice").await;

    let uri = format!("/api/v1/movies/{}/ratings/", target.id);
    let (status, _) = send(&app, "POST", &uri, Some(json!({"score": 4.0})), Some(&token)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", &uri, Some(json!({"score": 2.5})), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"].as_f64().unwrap(), 2.5);

    let rows = rating::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].score, 2.5);
}

#[tokio::test]
async fn rating_requires_auth_and_known_movie() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let target = seed_movie(&state, "Heat").await;
    let token = register_and_login(&app, "alice").await;

    let uri = format!("/api/v1/movies/{}/ratings/", target.id);
    let (status, _) = send(&app, "POST", &uri, Some(json!({"score": 4.0})), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        send(&app, "POST", "/api/v1/movies/999/ratings/", Some(json!({"score": 4.0})), Some(&token))
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn movie_detail_reports_viewer_state() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let target = seed_movie(&state, "Heat").await;
    let token = register_and_login(&app, "alice").await;

    let rate_uri = format!("/api/v1/movies/{}/ratings/", target.id);
    send(&app, "POST", &rate_uri, Some(json!({"score": 3.5})), Some(&token)).await;

    let detail_uri = format!("/api/v1/movies/{}/", target.id);
    let (status, body) = send(&app, "GET", &detail_uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["avg_score"].as_f64().unwrap(), 3.5);
    assert_eq!(body["user_score"].as_f64().unwrap(), 3.5);
    assert_eq!(body["is_in_watchlist"], false);

    // Anonymous view keeps the aggregate but no per-user fields.
    let (_, body) = send(&app, "GET", &detail_uri, None, None).await;
    assert_eq!(body["avg_score"].as_f64().unwrap(), 3.5);
    assert_eq!(body["user_score"], Value::Null);
}

#[tokio::test]
async fn watchlist_status_is_upserted() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let target = seed_movie(&state, "Heat").await;
    let token = register_and_login(&app, "alice").await;

    let uri = format!("/api/v1/movies/{}/watchlist-toggle/", target.id);
    let (status, body) = send(&app, "POST", &uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "WANT");

    let (status, body) =
        send(&app, "POST", &uri, Some(json!({"status": "DONE"})), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DONE");

    let rows = watch_list::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, watch_list::WatchStatus::Done);
}

#[tokio::test]
async fn malformed_watchlist_body_is_rejected() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let target = seed_movie(&state, "Heat").await;
    let token = register_and_login(&app, "alice").await;

    let uri = format!("/api/v1/movies/{}/watchlist-toggle/", target.id);

    // Unknown status string must not be recorded as WANT.
    let (status, _) =
        send(&app, "POST", &uri, Some(json!({"status": "done"})), Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", &uri, Some(json!({"status": 5})), Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(watch_list::Entity::find().count(&state.db).await.unwrap(), 0);

    // Omitting the key entirely still defaults to WANT.
    let (status, body) = send(&app, "POST", &uri, Some(json!({})), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "WANT");
}

#[tokio::test]
async fn anonymous_watchlist_falls_back_to_first_user() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let target = seed_movie(&state, "Heat").await;

    let uri = format!("/api/v1/movies/{}/watchlist-toggle/", target.id);

    // No user rows at all: explicit 400.
    let (status, body) = send(&app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().is_some());

    register_and_login(&app, "alice").await;
    let (status, _) = send(&app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(watch_list::Entity::find().count(&state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn review_like_is_a_true_toggle() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let target = seed_movie(&state, "Heat").await;
    let token = register_and_login(&app, "alice").await;

    let review_uri = format!("/api/v1/movies/{}/reviews/", target.id);
    let (status, review) = send(
        &app,
        "POST",
        &review_uri,
        Some(json!({"author": "anon", "content": "slaps"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let like_uri = format!("/api/v1/reviews/{}/like/", review["id"]);
    let (status, body) = send(&app, "POST", &like_uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);
    assert_eq!(body["like_count"], 1);

    let (_, body) = send(&app, "POST", &like_uri, None, Some(&token)).await;
    assert_eq!(body["liked"], false);
    assert_eq!(body["like_count"], 0);
}

#[tokio::test]
async fn reviews_list_newest_first_with_like_counts() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let target = seed_movie(&state, "Heat").await;
    let token = register_and_login(&app, "alice").await;

    let review_uri = format!("/api/v1/movies/{}/reviews/", target.id);
    let (_, first) =
        send(&app, "POST", &review_uri, Some(json!({"author": "a", "content": "one"})), None).await;
    let (_, second) =
        send(&app, "POST", &review_uri, Some(json!({"author": "b", "content": "two"})), None).await;

    let like_uri = format!("/api/v1/reviews/{}/like/", first["id"]);
    send(&app, "POST", &like_uri, None, Some(&token)).await;

    let (status, body) = send(&app, "GET", &review_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], second["id"]);
    assert_eq!(list[1]["id"], first["id"]);
    assert_eq!(list[1]["like_count"], 1);

    let (status, _) = send(&app, "GET", "/api/v1/movies/999/reviews/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn like_counts_are_scoped_to_the_listed_movie() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let first = seed_movie(&state, "Heat").await;
    let second = seed_movie(&state, "Ronin").await;
    let token = register_and_login(&app, "alice").await;

    let first_uri = format!("/api/v1/movies/{}/reviews/", first.id);
    send(&app, "POST", &first_uri, Some(json!({"author": "a", "content": "one"})), None).await;

    let second_uri = format!("/api/v1/movies/{}/reviews/", second.id);
    let (_, other) =
        send(&app, "POST", &second_uri, Some(json!({"author": "b", "content": "two"})), None)
            .await;
    let like_uri = format!("/api/v1/reviews/{}/like/", other["id"]);
    send(&app, "POST", &like_uri, None, Some(&token)).await;

    let (status, body) = send(&app, "GET", &first_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["like_count"], 0);
}

#[tokio::test]
async fn movie_listing_is_newest_first() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let first = seed_movie(&state, "First").await;
    let second = seed_movie(&state, "Second").await;

    let (status, body) = send(&app, "GET", "/api/v1/movies/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], second.id);
    assert_eq!(list[1]["id"], first.id);
    assert_eq!(list[0]["avg_score"], Value::Null);
}

#[tokio::test]
async fn my_watchlist_embeds_movie_summaries() {
    let state = test_state().await;
    let app = cinelog::router(state.clone());
    let target = seed_movie(&state, "Heat").await;
    let token = register_and_login(&app, "alice").await;

    let toggle_uri = format!("/api/v1/movies/{}/watchlist-toggle/", target.id);
    send(&app, "POST", &toggle_uri, Some(json!({"status": "DONE"})), Some(&token)).await;

    let (status, body) = send(&app, "GET", "/api/v1/watchlist/me/", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["status"], "DONE");
    assert_eq!(list[0]["movie"]["title"], "Heat");
}

#[tokio::test]
async fn similar_endpoint_404s_on_unknown_movie() {
    let state = test_state().await;
    let app = cinelog::router(state);

    let (status, body) = send(&app, "GET", "/api/v1/movies/999/similar/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("not found"));
}
