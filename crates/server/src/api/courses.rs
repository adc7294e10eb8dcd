//! Course catalogue, eligible-student lookup, and bulk enrollment.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, QueryTrait, Set,
};
use serde::{Deserialize, Serialize};
use studyflow_api_types::{BatchReport, MessageResponse};
use studyflow_core::domain::{
    Action, OwnerChain, Resource, Role, authorize, check_lecturer_self_assignment,
};

use super::state::AppState;
use crate::auth::Claims;
use crate::entity::{course, enrollment, user};
use crate::error::{ApiError, ApiResult};
use crate::notify::{self, Pending};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/courses/{id}/eligible-students", get(eligible_students))
        .route("/courses/{id}/add-students", post(add_students))
}

#[derive(Debug, Serialize)]
struct CourseRow {
    #[serde(flatten)]
    course: course::Model,
    lecturer_name: Option<String>,
}

async fn list_courses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<CourseRow>>> {
    let actor = claims.actor()?;
    authorize(actor, Action::Read, Resource::Course, &OwnerChain::default())?;

    let rows = course::Entity::find()
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(course, lecturer)| CourseRow {
                course,
                lecturer_name: lecturer.map(|user| user.full_name),
            })
            .collect(),
    ))
}

async fn get_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<CourseRow>> {
    let actor = claims.actor()?;
    let (course, lecturer) = course::Entity::find_by_id(id)
        .find_also_related(user::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    authorize(actor, Action::Read, Resource::Course, &OwnerChain::default())?;
    Ok(Json(CourseRow {
        course,
        lecturer_name: lecturer.map(|user| user.full_name),
    }))
}

/// Resolves a body-supplied lecturer id, rejecting ids that do not belong to
/// a lecturer account.
async fn resolve_lecturer(state: &AppState, lecturer_id: i32) -> ApiResult<user::Model> {
    let user = user::Entity::find_by_id(lecturer_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Lecturer not found"))?;
    if user.role != Role::Lecturer.as_str() {
        return Err(ApiError::validation("Specified user is not a lecturer"));
    }
    Ok(user)
}

#[derive(Debug, Deserialize)]
struct CreateCourse {
    course_code: String,
    course_name: String,
    lecturer_id: i32,
    credit_hours: Option<i16>,
}

async fn create_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateCourse>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let actor = claims.actor()?;
    if body.course_code.trim().is_empty() || body.course_name.trim().is_empty() {
        return Err(ApiError::validation("Course code and name are required"));
    }
    let credit_hours = body.credit_hours.unwrap_or(3);
    if credit_hours <= 0 {
        return Err(ApiError::validation("Credit hours must be positive"));
    }
    resolve_lecturer(&state, body.lecturer_id).await?;

    authorize(actor, Action::Create, Resource::Course, &OwnerChain::default())?;
    check_lecturer_self_assignment(actor, body.lecturer_id)?;

    let course = course::ActiveModel {
        course_code: Set(body.course_code.trim().to_string()),
        course_name: Set(body.course_name.trim().to_string()),
        lecturer_id: Set(body.lecturer_id),
        credit_hours: Set(credit_hours),
        ..Default::default()
    };
    let course = course
        .insert(&state.db)
        .await
        .map_err(|err| ApiError::db(err, "Course code already exists"))?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Course added successfully",
            course.course_id,
        )),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateCourse {
    course_code: Option<String>,
    course_name: Option<String>,
    lecturer_id: Option<i32>,
    credit_hours: Option<i16>,
}

async fn update_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateCourse>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = course::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    if let Some(lecturer_id) = body.lecturer_id {
        resolve_lecturer(&state, lecturer_id).await?;
    }

    authorize(
        actor,
        Action::Update,
        Resource::Course,
        &OwnerChain::lecturer(existing.lecturer_id),
    )?;
    // A lecturer may keep the course but not hand it to someone else.
    if let Some(lecturer_id) = body.lecturer_id {
        check_lecturer_self_assignment(actor, lecturer_id)?;
    }

    let mut patch: course::ActiveModel = existing.into();
    if let Some(course_code) = body.course_code {
        patch.course_code = Set(course_code.trim().to_string());
    }
    if let Some(course_name) = body.course_name {
        patch.course_name = Set(course_name.trim().to_string());
    }
    if let Some(lecturer_id) = body.lecturer_id {
        patch.lecturer_id = Set(lecturer_id);
    }
    if let Some(credit_hours) = body.credit_hours {
        if credit_hours <= 0 {
            return Err(ApiError::validation("Credit hours must be positive"));
        }
        patch.credit_hours = Set(credit_hours);
    }

    patch
        .update(&state.db)
        .await
        .map_err(|err| ApiError::db(err, "Course code already exists"))?;

    Ok(Json(MessageResponse::new("Course updated successfully")))
}

async fn delete_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = course::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    authorize(actor, Action::Delete, Resource::Course, &OwnerChain::default())?;

    course::Entity::delete_by_id(existing.course_id)
        .exec(&state.db)
        .await
        .map_err(|err| {
            ApiError::db(
                err,
                "Cannot delete a course with existing enrollments or components",
            )
        })?;

    Ok(Json(MessageResponse::new("Course deleted successfully")))
}

/// Students not yet enrolled in the course.
async fn eligible_students(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<user::Model>>> {
    let actor = claims.actor()?;
    let course = course::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    authorize(
        actor,
        Action::Read,
        Resource::Enrollment,
        &OwnerChain::lecturer(course.lecturer_id),
    )?;

    let enrolled = enrollment::Entity::find()
        .select_only()
        .column(enrollment::Column::StudentId)
        .filter(enrollment::Column::CourseId.eq(course.course_id))
        .into_query();

    let students = user::Entity::find()
        .filter(user::Column::Role.eq(Role::Student.as_str()))
        .filter(user::Column::UserId.not_in_subquery(enrolled))
        .all(&state.db)
        .await?;

    Ok(Json(students))
}

#[derive(Debug, Deserialize)]
struct AddStudents {
    student_ids: Vec<i32>,
}

/// Bulk-enrolls students into a course. Items are isolated: one bad id is
/// reported, the rest proceed.
async fn add_students(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(body): Json<AddStudents>,
) -> ApiResult<Json<BatchReport>> {
    let actor = claims.actor()?;
    let course = course::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    // Enrolling into a course is an edit of that course's roster.
    authorize(
        actor,
        Action::Update,
        Resource::Course,
        &OwnerChain::lecturer(course.lecturer_id),
    )?;

    if body.student_ids.is_empty() {
        return Err(ApiError::validation("No student ids supplied"));
    }

    let today = chrono::Utc::now().date_naive();
    let mut added = 0usize;
    let mut details = Vec::new();

    for student_id in body.student_ids {
        let student = match user::Entity::find_by_id(student_id).one(&state.db).await? {
            Some(user) if user.role == Role::Student.as_str() => user,
            Some(_) => {
                details.push(format!("User {student_id} is not a student"));
                continue;
            }
            None => {
                details.push(format!("Student {student_id} not found"));
                continue;
            }
        };

        let row = enrollment::ActiveModel {
            student_id: Set(student.user_id),
            course_id: Set(course.course_id),
            enrollment_date: Set(today),
            ..Default::default()
        };
        match row.insert(&state.db).await {
            Ok(_) => {
                added += 1;
                notify::send(
                    &state.db,
                    Pending {
                        user_id: student.user_id,
                        title: "Course enrollment".to_string(),
                        message: format!(
                            "You have been enrolled in {} ({})",
                            course.course_name, course.course_code
                        ),
                        kind: Some("enrollment".to_string()),
                        related_id: Some(course.course_id),
                    },
                )
                .await;
            }
            Err(err) => match err.sql_err() {
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                    details.push(format!(
                        "Student {student_id} is already enrolled in this course"
                    ));
                }
                _ => return Err(err.into()),
            },
        }
    }

    let skipped = details.len();
    Ok(Json(BatchReport {
        message: format!("Enrollment complete: {added} added, {skipped} skipped"),
        details,
    }))
}
