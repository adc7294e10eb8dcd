//! Notification delivery, read receipts, and admin broadcasts.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, login, request, seed_user, spawn_app};

async fn setup(app: &TestApp) -> (String, i32) {
    seed_user(&app.db, "admin1", "admin").await;
    let student_id = seed_user(&app.db, "stud", "student").await;
    (login(app, "admin1").await, student_id)
}

#[tokio::test]
async fn admin_sends_a_direct_notification() {
    let app = spawn_app().await;
    let (admin_token, student_id) = setup(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/notifications",
        Some(&admin_token),
        Some(json!({
            "user_id": student_id,
            "title": "Registration deadline",
            "message": "Course registration closes on Friday",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Notification sent successfully");

    let student_token = login(&app, "stud").await;
    let (status, body) = request(&app, "GET", "/notifications", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array body");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "Registration deadline");
    assert_eq!(rows[0]["is_read"], false);
}

#[tokio::test]
async fn role_broadcast_counts_recipients_and_drops_unknown_roles() {
    let app = spawn_app().await;
    let (admin_token, _) = setup(&app).await;
    seed_user(&app.db, "stud2", "student").await;
    seed_user(&app.db, "lect", "lecturer").await;

    let (status, body) = request(
        &app,
        "POST",
        "/notifications",
        Some(&admin_token),
        Some(json!({
            "roles": ["student", "wizard", "student"],
            "title": "Semester break",
            "message": "Campus closes next week",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    // Two students; the unknown role and the duplicate are dropped.
    assert_eq!(body["count"], 2);

    let lecturer_token = login(&app, "lect").await;
    let (status, body) = request(&app, "GET", "/notifications", Some(&lecturer_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array body").len(), 0);
}

#[tokio::test]
async fn broadcast_with_only_unknown_roles_is_rejected() {
    let app = spawn_app().await;
    let (admin_token, _) = setup(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/notifications",
        Some(&admin_token),
        Some(json!({
            "roles": ["wizard"],
            "title": "Semester break",
            "message": "Campus closes next week",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No valid recipient roles specified");
}

#[tokio::test]
async fn a_recipient_is_required() {
    let app = spawn_app().await;
    let (admin_token, _) = setup(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/notifications",
        Some(&admin_token),
        Some(json!({"title": "Hello", "message": "No one to tell"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Either user_id or roles is required");
}

#[tokio::test]
async fn only_admins_send_notifications() {
    let app = spawn_app().await;
    let (_, student_id) = setup(&app).await;

    let student_token = login(&app, "stud").await;
    let (status, body) = request(
        &app,
        "POST",
        "/notifications",
        Some(&student_token),
        Some(json!({
            "user_id": student_id,
            "title": "Hello",
            "message": "From a student",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied: admin only");
}

#[tokio::test]
async fn read_receipts_are_owner_only() {
    let app = spawn_app().await;
    let (admin_token, student_id) = setup(&app).await;
    seed_user(&app.db, "stud2", "student").await;

    let (status, body) = request(
        &app,
        "POST",
        "/notifications",
        Some(&admin_token),
        Some(json!({
            "user_id": student_id,
            "title": "Registration deadline",
            "message": "Course registration closes on Friday",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let student_token = login(&app, "stud").await;
    let (status, body) = request(&app, "GET", "/notifications", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let id = body[0]["notification_id"].as_i64().expect("id");

    // Another student cannot touch it.
    let other_token = login(&app, "stud2").await;
    let (status, body) = request(
        &app,
        "PUT",
        &format!("/notifications/{id}/read"),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Access denied: You can only mark your own notifications as read."
    );

    // The owner can.
    let (status, body) = request(
        &app,
        "PUT",
        &format!("/notifications/{id}/read"),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Notification marked as read");

    let (status, body) = request(&app, "GET", "/notifications", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["is_read"], true);
}

#[tokio::test]
async fn owners_delete_their_own_notifications() {
    let app = spawn_app().await;
    let (admin_token, student_id) = setup(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/notifications",
        Some(&admin_token),
        Some(json!({
            "user_id": student_id,
            "title": "Old news",
            "message": "This can go",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let student_token = login(&app, "stud").await;
    let (_, body) = request(&app, "GET", "/notifications", Some(&student_token), None).await;
    let id = body[0]["notification_id"].as_i64().expect("id");

    let (status, body) = request(
        &app,
        "DELETE",
        &format!("/notifications/{id}"),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Notification deleted successfully");

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/notifications/{id}"),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_title_or_message_is_rejected() {
    let app = spawn_app().await;
    let (admin_token, student_id) = setup(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/notifications",
        Some(&admin_token),
        Some(json!({"user_id": student_id, "title": "  ", "message": "text"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title and message are required");
}
