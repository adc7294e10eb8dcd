//! Enrollment creation, duplicate detection, and roster lookups.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, login, request, seed_user, spawn_app};

struct Fixture {
    admin_token: String,
    course_id: i64,
    student_id: i32,
}

async fn setup(app: &TestApp) -> Fixture {
    seed_user(&app.db, "admin1", "admin").await;
    let lecturer_id = seed_user(&app.db, "lect", "lecturer").await;
    let student_id = seed_user(&app.db, "stud", "student").await;

    let admin_token = login(app, "admin1").await;
    let (status, body) = request(
        app,
        "POST",
        "/courses",
        Some(&admin_token),
        Some(json!({"course_code": "CS101", "course_name": "Intro", "lecturer_id": lecturer_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    Fixture {
        admin_token,
        course_id: body["id"].as_i64().expect("course id"),
        student_id,
    }
}

#[tokio::test]
async fn duplicate_enrollment_conflicts() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    let payload = json!({"student_id": fixture.student_id, "course_id": fixture.course_id});
    let (status, body) = request(
        &app,
        "POST",
        "/enrollments",
        Some(&fixture.admin_token),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = request(
        &app,
        "POST",
        "/enrollments",
        Some(&fixture.admin_token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Student is already enrolled in this course");
}

#[tokio::test]
async fn enrollment_references_are_validated() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/enrollments",
        Some(&fixture.admin_token),
        Some(json!({"student_id": 9999, "course_id": fixture.course_id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Student not found");

    // A lecturer id in the student slot is rejected even though it resolves.
    let lecturer_id = seed_user(&app.db, "lect2", "lecturer").await;
    let (status, body) = request(
        &app,
        "POST",
        "/enrollments",
        Some(&fixture.admin_token),
        Some(json!({"student_id": lecturer_id, "course_id": fixture.course_id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Specified user is not a student");
}

#[tokio::test]
async fn students_see_only_their_own_enrollments() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;
    let other_id = seed_user(&app.db, "stud2", "student").await;

    for student_id in [fixture.student_id, other_id] {
        let (status, _) = request(
            &app,
            "POST",
            "/enrollments",
            Some(&fixture.admin_token),
            Some(json!({"student_id": student_id, "course_id": fixture.course_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let token = login(&app, "stud").await;
    let (status, body) = request(&app, "GET", "/enrollments", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array body");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["student_id"], fixture.student_id);
    assert_eq!(rows[0]["course_code"], "CS101");
}

#[tokio::test]
async fn eligible_students_excludes_the_enrolled() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;
    let waiting_id = seed_user(&app.db, "stud2", "student").await;

    let (status, _) = request(
        &app,
        "POST",
        "/enrollments",
        Some(&fixture.admin_token),
        Some(json!({"student_id": fixture.student_id, "course_id": fixture.course_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let token = login(&app, "lect").await;
    let (status, body) = request(
        &app,
        "GET",
        &format!("/courses/{}/eligible-students", fixture.course_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .expect("array body")
        .iter()
        .map(|row| row["user_id"].as_i64().expect("user id"))
        .collect();
    assert_eq!(ids, vec![i64::from(waiting_id)]);
}

#[tokio::test]
async fn bulk_add_students_isolates_bad_items() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;
    let second_id = seed_user(&app.db, "stud2", "student").await;

    // First student pre-enrolled; the batch repeats them plus one new
    // student plus a nonexistent id.
    let (status, _) = request(
        &app,
        "POST",
        "/enrollments",
        Some(&fixture.admin_token),
        Some(json!({"student_id": fixture.student_id, "course_id": fixture.course_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let token = login(&app, "lect").await;
    let (status, body) = request(
        &app,
        "POST",
        &format!("/courses/{}/add-students", fixture.course_id),
        Some(&token),
        Some(json!({"student_ids": [fixture.student_id, second_id, 9999]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Enrollment complete: 1 added, 2 skipped");
    let details = body["details"].as_array().expect("details array");
    assert_eq!(details.len(), 2);
}

#[tokio::test]
async fn course_with_enrollments_cannot_be_deleted() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    let (status, _) = request(
        &app,
        "POST",
        "/enrollments",
        Some(&fixture.admin_token),
        Some(json!({"student_id": fixture.student_id, "course_id": fixture.course_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(
        &app,
        "DELETE",
        &format!("/courses/{}", fixture.course_id),
        Some(&fixture.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "Cannot delete a course with existing enrollments or components"
    );
}
