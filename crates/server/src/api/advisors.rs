//! Advisor-student assignments. One advisor per student, enforced by the
//! store's unique constraint.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use studyflow_api_types::MessageResponse;
use studyflow_core::domain::{Action, OwnerChain, Resource, Role, authorize};

use super::enrollments::resolve_student;
use super::state::AppState;
use crate::auth::Claims;
use crate::entity::{advisor_student, user};
use crate::error::{ApiError, ApiResult};
use crate::notify::{self, Pending};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/advisor-student", get(list_assignments).post(create_assignment))
        .route(
            "/advisor-student/{id}",
            get(get_assignment)
                .put(update_assignment)
                .delete(delete_assignment),
        )
}

const DUPLICATE_MESSAGE: &str = "Student already has an advisor assigned";

#[derive(Debug, Serialize)]
struct AssignmentRow {
    #[serde(flatten)]
    assignment: advisor_student::Model,
    advisor_name: Option<String>,
    student_name: Option<String>,
    matric_number: Option<String>,
}

async fn with_names(
    state: &AppState,
    assignment: advisor_student::Model,
) -> ApiResult<AssignmentRow> {
    let advisor = user::Entity::find_by_id(assignment.advisor_id)
        .one(&state.db)
        .await?;
    let student = user::Entity::find_by_id(assignment.student_id)
        .one(&state.db)
        .await?;
    Ok(AssignmentRow {
        assignment,
        advisor_name: advisor.map(|user| user.full_name),
        matric_number: student.as_ref().and_then(|user| user.matric_number.clone()),
        student_name: student.map(|user| user.full_name),
    })
}

async fn list_assignments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<AssignmentRow>>> {
    let actor = claims.actor()?;
    authorize(
        actor,
        Action::Read,
        Resource::AdvisorAssignment,
        &OwnerChain::actor_self(actor.id),
    )?;

    let mut query = advisor_student::Entity::find();
    match actor.role {
        Role::Advisor => query = query.filter(advisor_student::Column::AdvisorId.eq(actor.id)),
        Role::Student => query = query.filter(advisor_student::Column::StudentId.eq(actor.id)),
        _ => {}
    }

    let assignments = query.all(&state.db).await?;
    let mut rows = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        rows.push(with_names(&state, assignment).await?);
    }
    Ok(Json(rows))
}

async fn get_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<AssignmentRow>> {
    let actor = claims.actor()?;
    let assignment = advisor_student::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Advisor assignment not found"))?;

    authorize(
        actor,
        Action::Read,
        Resource::AdvisorAssignment,
        &OwnerChain::student(assignment.student_id).with_advisor(assignment.advisor_id),
    )?;

    Ok(Json(with_names(&state, assignment).await?))
}

/// Checks that a body-supplied advisor id names an advisor account.
async fn resolve_advisor(state: &AppState, advisor_id: i32) -> ApiResult<user::Model> {
    let user = user::Entity::find_by_id(advisor_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Advisor not found"))?;
    if user.role != Role::Advisor.as_str() {
        return Err(ApiError::validation("Specified user is not an advisor"));
    }
    Ok(user)
}

#[derive(Debug, Deserialize)]
struct CreateAssignment {
    advisor_id: i32,
    student_id: i32,
}

async fn create_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateAssignment>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let actor = claims.actor()?;
    let advisor = resolve_advisor(&state, body.advisor_id).await?;
    let student = resolve_student(&state, body.student_id).await?;

    authorize(
        actor,
        Action::Create,
        Resource::AdvisorAssignment,
        &OwnerChain::default(),
    )?;

    let assignment = advisor_student::ActiveModel {
        advisor_id: Set(advisor.user_id),
        student_id: Set(student.user_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|err| ApiError::db(err, DUPLICATE_MESSAGE))?;

    notify::send(
        &state.db,
        Pending {
            user_id: student.user_id,
            title: "Academic advisor assigned".to_string(),
            message: format!("{} is now your academic advisor", advisor.full_name),
            kind: Some("advisor".to_string()),
            related_id: Some(assignment.advisor_student_id),
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Advisor assigned successfully",
            assignment.advisor_student_id,
        )),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateAssignment {
    advisor_id: Option<i32>,
    student_id: Option<i32>,
}

async fn update_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateAssignment>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = advisor_student::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Advisor assignment not found"))?;

    if let Some(advisor_id) = body.advisor_id {
        resolve_advisor(&state, advisor_id).await?;
    }
    if let Some(student_id) = body.student_id {
        resolve_student(&state, student_id).await?;
    }

    authorize(
        actor,
        Action::Update,
        Resource::AdvisorAssignment,
        &OwnerChain::default(),
    )?;

    let mut patch: advisor_student::ActiveModel = existing.into();
    if let Some(advisor_id) = body.advisor_id {
        patch.advisor_id = Set(advisor_id);
    }
    if let Some(student_id) = body.student_id {
        patch.student_id = Set(student_id);
    }

    patch
        .update(&state.db)
        .await
        .map_err(|err| ApiError::db(err, DUPLICATE_MESSAGE))?;

    Ok(Json(MessageResponse::new(
        "Advisor assignment updated successfully",
    )))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = advisor_student::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Advisor assignment not found"))?;

    authorize(
        actor,
        Action::Delete,
        Resource::AdvisorAssignment,
        &OwnerChain::default(),
    )?;

    advisor_student::Entity::delete_by_id(existing.advisor_student_id)
        .exec(&state.db)
        .await?;

    Ok(Json(MessageResponse::new(
        "Advisor assignment deleted successfully",
    )))
}
