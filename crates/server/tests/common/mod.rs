use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::{Value, json};
use tower::ServiceExt;

use studyflow_migration::{Migrator, MigratorTrait};
use studyflow_server::api::{self, AppState};
use studyflow_server::auth::{AuthConfig, password_digest};
use studyflow_server::entity::user;

pub const PASSWORD: &str = "s3cret";

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
}

/// Fresh in-memory database, migrated, with the router on top. A single
/// connection keeps every query on the same SQLite memory instance.
pub async fn spawn_app() -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options)
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let auth = AuthConfig::new("integration-test-secret", Duration::from_secs(3600));
    let router = api::create_router(AppState::new(db.clone(), auth));
    TestApp { router, db }
}

/// Inserts a user directly, bypassing the API, and returns its id.
pub async fn seed_user(db: &DatabaseConnection, username: &str, role: &str) -> i32 {
    let row = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_digest(PASSWORD)),
        role: Set(role.to_string()),
        full_name: Set(format!("{username} Test")),
        matric_number: Set(if role == "student" {
            Some(format!("M-{username}"))
        } else {
            None
        }),
        ..Default::default()
    };
    row.insert(db).await.expect("seed user").user_id
}

/// Sends one request through the router and decodes the JSON body.
pub async fn request(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("route request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Logs a seeded user in and returns their bearer token.
pub async fn login(app: &TestApp, username: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/login",
        None,
        Some(json!({"username": username, "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().expect("token in response").to_string()
}
