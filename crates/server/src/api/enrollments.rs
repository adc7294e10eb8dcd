//! Enrollment records linking students to courses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, RelationTrait, Select, Set,
};
use serde::Deserialize;
use serde::Serialize;
use studyflow_api_types::MessageResponse;
use studyflow_core::domain::{Action, OwnerChain, Resource, Role, authorize};

use super::state::AppState;
use crate::auth::Claims;
use crate::entity::{course, enrollment, user};
use crate::error::{ApiError, ApiResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/enrollments", get(list_enrollments).post(create_enrollment))
        .route(
            "/enrollments/{id}",
            get(get_enrollment)
                .put(update_enrollment)
                .delete(delete_enrollment),
        )
}

const DUPLICATE_MESSAGE: &str = "Student is already enrolled in this course";

#[derive(Debug, Serialize, FromQueryResult)]
struct EnrollmentRow {
    enrollment_id: i32,
    student_id: i32,
    course_id: i32,
    enrollment_date: chrono::NaiveDate,
    student_name: String,
    matric_number: Option<String>,
    course_code: String,
    course_name: String,
}

fn enrollment_rows() -> Select<enrollment::Entity> {
    enrollment::Entity::find()
        .join(JoinType::InnerJoin, enrollment::Relation::Student.def())
        .join(JoinType::InnerJoin, enrollment::Relation::Course.def())
        .column_as(user::Column::FullName, "student_name")
        .column(user::Column::MatricNumber)
        .column(course::Column::CourseCode)
        .column(course::Column::CourseName)
}

async fn list_enrollments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<EnrollmentRow>>> {
    let actor = claims.actor()?;
    authorize(
        actor,
        Action::Read,
        Resource::Enrollment,
        &OwnerChain::actor_self(actor.id),
    )?;

    // Advisors were already denied above; admin sees everything.
    let mut query = enrollment_rows();
    match actor.role {
        Role::Student => query = query.filter(enrollment::Column::StudentId.eq(actor.id)),
        Role::Lecturer => query = query.filter(course::Column::LecturerId.eq(actor.id)),
        _ => {}
    }

    let rows = query.into_model::<EnrollmentRow>().all(&state.db).await?;
    Ok(Json(rows))
}

async fn get_enrollment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<EnrollmentRow>> {
    let actor = claims.actor()?;
    let (enrollment, course) = enrollment::Entity::find_by_id(id)
        .find_also_related(course::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment not found"))?;
    let course = course.ok_or_else(|| ApiError::not_found("Course not found"))?;

    authorize(
        actor,
        Action::Read,
        Resource::Enrollment,
        &OwnerChain::student(enrollment.student_id).with_lecturer(course.lecturer_id),
    )?;

    let row = enrollment_rows()
        .filter(enrollment::Column::EnrollmentId.eq(id))
        .into_model::<EnrollmentRow>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment not found"))?;
    Ok(Json(row))
}

/// Checks that a body-supplied student id names a student account.
pub(super) async fn resolve_student(state: &AppState, student_id: i32) -> ApiResult<user::Model> {
    let user = user::Entity::find_by_id(student_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Student not found"))?;
    if user.role != Role::Student.as_str() {
        return Err(ApiError::validation("Specified user is not a student"));
    }
    Ok(user)
}

#[derive(Debug, Deserialize)]
struct CreateEnrollment {
    student_id: i32,
    course_id: i32,
    enrollment_date: Option<chrono::NaiveDate>,
}

async fn create_enrollment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateEnrollment>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let actor = claims.actor()?;
    resolve_student(&state, body.student_id).await?;
    course::Entity::find_by_id(body.course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Course not found"))?;

    authorize(
        actor,
        Action::Create,
        Resource::Enrollment,
        &OwnerChain::default(),
    )?;

    let row = enrollment::ActiveModel {
        student_id: Set(body.student_id),
        course_id: Set(body.course_id),
        enrollment_date: Set(body
            .enrollment_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive())),
        ..Default::default()
    };
    let row = row
        .insert(&state.db)
        .await
        .map_err(|err| ApiError::db(err, DUPLICATE_MESSAGE))?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Enrollment added successfully",
            row.enrollment_id,
        )),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateEnrollment {
    student_id: Option<i32>,
    course_id: Option<i32>,
    enrollment_date: Option<chrono::NaiveDate>,
}

async fn update_enrollment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateEnrollment>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = enrollment::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment not found"))?;

    if let Some(student_id) = body.student_id {
        resolve_student(&state, student_id).await?;
    }
    if let Some(course_id) = body.course_id {
        course::Entity::find_by_id(course_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| ApiError::validation("Course not found"))?;
    }

    authorize(
        actor,
        Action::Update,
        Resource::Enrollment,
        &OwnerChain::default(),
    )?;

    let mut patch: enrollment::ActiveModel = existing.into();
    if let Some(student_id) = body.student_id {
        patch.student_id = Set(student_id);
    }
    if let Some(course_id) = body.course_id {
        patch.course_id = Set(course_id);
    }
    if let Some(enrollment_date) = body.enrollment_date {
        patch.enrollment_date = Set(enrollment_date);
    }

    patch
        .update(&state.db)
        .await
        .map_err(|err| ApiError::db(err, DUPLICATE_MESSAGE))?;

    Ok(Json(MessageResponse::new("Enrollment updated successfully")))
}

async fn delete_enrollment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = enrollment::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment not found"))?;

    authorize(
        actor,
        Action::Delete,
        Resource::Enrollment,
        &OwnerChain::default(),
    )?;

    enrollment::Entity::delete_by_id(existing.enrollment_id)
        .exec(&state.db)
        .await?;

    Ok(Json(MessageResponse::new("Enrollment deleted successfully")))
}
