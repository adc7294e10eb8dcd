//! Mark recording, bounds, rosters, batch upserts, and grade summaries.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, login, request, seed_user, spawn_app};

struct Fixture {
    admin_token: String,
    lecturer_token: String,
    student_id: i32,
    course_id: i64,
    enrollment_id: i64,
    assignment_id: i64,
    exam_id: i64,
}

/// One course with a 40% assignment (max 100) and a 60% exam (max 50),
/// and one enrolled student.
async fn setup(app: &TestApp) -> Fixture {
    seed_user(&app.db, "admin1", "admin").await;
    let lecturer_id = seed_user(&app.db, "lect", "lecturer").await;
    let student_id = seed_user(&app.db, "stud", "student").await;

    let admin_token = login(app, "admin1").await;
    let lecturer_token = login(app, "lect").await;

    let (status, body) = request(
        app,
        "POST",
        "/courses",
        Some(&admin_token),
        Some(json!({"course_code": "CS101", "course_name": "Intro", "lecturer_id": lecturer_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let course_id = body["id"].as_i64().expect("course id");

    let (status, body) = request(
        app,
        "POST",
        "/enrollments",
        Some(&admin_token),
        Some(json!({"student_id": student_id, "course_id": course_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let enrollment_id = body["id"].as_i64().expect("enrollment id");

    let mut component_ids = Vec::new();
    for (name, max_mark, weight) in [("Assignment", 100.0, 40.0), ("Final Exam", 50.0, 60.0)] {
        let (status, body) = request(
            app,
            "POST",
            "/assessment-components",
            Some(&lecturer_token),
            Some(json!({
                "course_id": course_id,
                "component_name": name,
                "max_mark": max_mark,
                "weight_percentage": weight,
                "is_final_exam": name == "Final Exam",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        component_ids.push(body["id"].as_i64().expect("component id"));
    }

    Fixture {
        admin_token,
        lecturer_token,
        student_id,
        course_id,
        enrollment_id,
        assignment_id: component_ids[0],
        exam_id: component_ids[1],
    }
}

#[tokio::test]
async fn marks_are_bounds_checked_inclusive() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(json!({
            "enrollment_id": fixture.enrollment_id,
            "component_id": fixture.assignment_id,
            "mark_obtained": 100.5,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Mark obtained (100.5) exceeds the maximum mark allowed (100) for this component."
    );

    let (status, _) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(json!({
            "enrollment_id": fixture.enrollment_id,
            "component_id": fixture.assignment_id,
            "mark_obtained": -1.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Both endpoints of the range are accepted.
    let (status, body) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(json!({
            "enrollment_id": fixture.enrollment_id,
            "component_id": fixture.assignment_id,
            "mark_obtained": 0.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(json!({
            "enrollment_id": fixture.enrollment_id,
            "component_id": fixture.exam_id,
            "mark_obtained": 50.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn duplicate_mark_for_component_conflicts() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    let payload = json!({
        "enrollment_id": fixture.enrollment_id,
        "component_id": fixture.assignment_id,
        "mark_obtained": 70.0,
    });
    let (status, _) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "A mark for this enrollment and component already exists"
    );
}

#[tokio::test]
async fn recording_a_mark_notifies_the_student() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    let (status, _) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(json!({
            "enrollment_id": fixture.enrollment_id,
            "component_id": fixture.assignment_id,
            "mark_obtained": 80.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let student_token = login(&app, "stud").await;
    let (status, body) = request(&app, "GET", "/notifications", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array body");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "New mark recorded");
    assert_eq!(rows[0]["user_id"], fixture.student_id);
    assert_eq!(rows[0]["is_read"], false);
}

#[tokio::test]
async fn notification_failure_does_not_fail_the_mutation() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    // Make every notification insert fail.
    use sea_orm::ConnectionTrait;
    app.db
        .execute_unprepared("DROP TABLE notifications")
        .await
        .expect("drop notifications table");

    let (status, body) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(json!({
            "enrollment_id": fixture.enrollment_id,
            "component_id": fixture.assignment_id,
            "mark_obtained": 80.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Student mark added successfully");
}

#[tokio::test]
async fn roster_lists_unmarked_students_with_null_marks() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;
    let second_id = seed_user(&app.db, "stud2", "student").await;

    let (status, _) = request(
        &app,
        "POST",
        "/enrollments",
        Some(&fixture.admin_token),
        Some(json!({"student_id": second_id, "course_id": fixture.course_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(json!({
            "enrollment_id": fixture.enrollment_id,
            "component_id": fixture.assignment_id,
            "mark_obtained": 80.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(
        &app,
        "GET",
        &format!(
            "/student-marks/course/{}/assessment/{}",
            fixture.course_id, fixture.assignment_id
        ),
        Some(&fixture.lecturer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array body");
    assert_eq!(rows.len(), 2);

    let marked = rows
        .iter()
        .find(|row| row["student_id"] == fixture.student_id)
        .expect("marked row");
    assert_eq!(marked["mark_obtained"], 80.0);
    let unmarked = rows
        .iter()
        .find(|row| row["student_id"] == second_id)
        .expect("unmarked row");
    assert!(unmarked["mark_obtained"].is_null());
}

#[tokio::test]
async fn course_summary_matches_the_weighted_formula() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    // 80/100 at 40% plus 45/50 at 60% comes to 86% overall.
    for (component_id, mark) in [(fixture.assignment_id, 80.0), (fixture.exam_id, 45.0)] {
        let (status, _) = request(
            &app,
            "POST",
            "/student-marks",
            Some(&fixture.lecturer_token),
            Some(json!({
                "enrollment_id": fixture.enrollment_id,
                "component_id": component_id,
                "mark_obtained": mark,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let student_token = login(&app, "stud").await;
    let (status, body) = request(
        &app,
        "GET",
        &format!(
            "/student-marks/student/{}/course-summaries",
            fixture.student_id
        ),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array body");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["course_code"], "CS101");
    let overall = rows[0]["overall_percentage"].as_f64().expect("percentage");
    assert!((overall - 86.0).abs() < 1e-9, "got {overall}");
    assert_eq!(rows[0]["letter_grade"], "B");
}

#[tokio::test]
async fn ungraded_component_drags_the_summary_down() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    // Perfect assignment, no exam mark: 40 of 100 weight earned.
    let (status, _) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(json!({
            "enrollment_id": fixture.enrollment_id,
            "component_id": fixture.assignment_id,
            "mark_obtained": 100.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let student_token = login(&app, "stud").await;
    let (status, body) = request(
        &app,
        "GET",
        &format!(
            "/student-marks/student/{}/course-summaries",
            fixture.student_id
        ),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let overall = body[0]["overall_percentage"].as_f64().expect("percentage");
    assert!((overall - 40.0).abs() < 1e-9, "got {overall}");
    assert_eq!(body[0]["letter_grade"], "F");
}

#[tokio::test]
async fn batch_update_reports_per_item_outcomes() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;

    let (status, _) = request(
        &app,
        "POST",
        "/student-marks",
        Some(&fixture.lecturer_token),
        Some(json!({
            "enrollment_id": fixture.enrollment_id,
            "component_id": fixture.assignment_id,
            "mark_obtained": 60.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // One update, one insert, one out-of-bounds failure.
    let (status, body) = request(
        &app,
        "POST",
        "/student-marks/batch-update",
        Some(&fixture.lecturer_token),
        Some(json!({"marks": [
            {"enrollment_id": fixture.enrollment_id, "component_id": fixture.assignment_id, "mark_obtained": 75.0},
            {"enrollment_id": fixture.enrollment_id, "component_id": fixture.exam_id, "mark_obtained": 40.0},
            {"enrollment_id": fixture.enrollment_id, "component_id": fixture.exam_id, "mark_obtained": 500.0},
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["inserted"], 1);
    assert_eq!(body["updated"], 1);
    assert_eq!(body["errors"].as_array().expect("errors").len(), 1);
    assert!(
        body["errors"][0]
            .as_str()
            .expect("error text")
            .starts_with("Item 3:")
    );
}

#[tokio::test]
async fn peer_view_aliases_other_students() {
    let app = spawn_app().await;
    let fixture = setup(&app).await;
    let second_id = seed_user(&app.db, "stud2", "student").await;

    let (status, body) = request(
        &app,
        "POST",
        "/enrollments",
        Some(&fixture.admin_token),
        Some(json!({"student_id": second_id, "course_id": fixture.course_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_enrollment = body["id"].as_i64().expect("enrollment id");

    for (enrollment_id, mark) in [(fixture.enrollment_id, 80.0), (second_enrollment, 90.0)] {
        let (status, _) = request(
            &app,
            "POST",
            "/student-marks",
            Some(&fixture.lecturer_token),
            Some(json!({
                "enrollment_id": enrollment_id,
                "component_id": fixture.assignment_id,
                "mark_obtained": mark,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let student_token = login(&app, "stud").await;
    let (status, body) = request(&app, "GET", "/all-student-marks", Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array body");
    assert_eq!(rows.len(), 2);

    let own = rows
        .iter()
        .find(|row| row["is_current_user"] == true)
        .expect("own row");
    assert_eq!(own["student_name"], "stud Test");
    let peer = rows
        .iter()
        .find(|row| row["is_current_user"] == false)
        .expect("peer row");
    assert!(
        peer["student_name"]
            .as_str()
            .expect("alias")
            .starts_with("Student ")
    );
    assert!(peer.get("matric_number").is_none(), "identity must be dropped");

    // Staff keep the full rows.
    let (status, body) = request(
        &app,
        "GET",
        "/all-student-marks",
        Some(&fixture.lecturer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array body");
    assert!(rows.iter().all(|row| row["student_name"] != "Student 1"));
}
