//! Remark requests: a student's formal challenge of a recorded mark.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, QueryTrait, RelationTrait, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use studyflow_api_types::MessageResponse;
use studyflow_core::domain::{
    Action, OwnerChain, RemarkStatus, Resource, Role, authorize,
};

use super::marks::advisor_of;
use super::state::AppState;
use crate::auth::Claims;
use crate::entity::{
    advisor_student, assessment_component, course, enrollment, remark_request, student_mark,
};
use crate::error::{ApiError, ApiResult};
use crate::notify::Outbox;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/remark-requests", get(list_requests).post(create_request))
        .route(
            "/remark-requests/{id}",
            get(get_request).put(resolve_request).delete(delete_request),
        )
}

#[derive(Debug, Serialize, FromQueryResult)]
struct RemarkRow {
    request_id: i32,
    mark_id: i32,
    student_id: i32,
    justification: String,
    status: String,
    lecturer_notes: Option<String>,
    resolved_by: Option<i32>,
    resolved_at: Option<chrono::NaiveDateTime>,
    created_at: chrono::NaiveDateTime,
    student_name: String,
    mark_obtained: f64,
    component_name: String,
    max_mark: f64,
    course_code: String,
    course_name: String,
}

fn remark_rows() -> Select<remark_request::Entity> {
    remark_request::Entity::find()
        .join(
            JoinType::InnerJoin,
            remark_request::Relation::StudentMark.def(),
        )
        .join(JoinType::InnerJoin, remark_request::Relation::Student.def())
        .join(
            JoinType::InnerJoin,
            student_mark::Relation::Enrollment.def(),
        )
        .join(
            JoinType::InnerJoin,
            student_mark::Relation::AssessmentComponent.def(),
        )
        .join(JoinType::InnerJoin, enrollment::Relation::Course.def())
        .column_as(crate::entity::user::Column::FullName, "student_name")
        .column(student_mark::Column::MarkObtained)
        .column(assessment_component::Column::ComponentName)
        .column(assessment_component::Column::MaxMark)
        .column(course::Column::CourseCode)
        .column(course::Column::CourseName)
}

/// A remark request with the rows its ownership chain runs through.
struct RequestContext {
    request: remark_request::Model,
    course: course::Model,
}

async fn load_request(state: &AppState, id: i32) -> ApiResult<RequestContext> {
    let request = remark_request::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Remark request not found"))?;
    let mark = student_mark::Entity::find_by_id(request.mark_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Student mark not found"))?;
    let enrollment = enrollment::Entity::find_by_id(mark.enrollment_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment not found"))?;
    let course = course::Entity::find_by_id(enrollment.course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    Ok(RequestContext { request, course })
}

async fn request_chain(state: &AppState, ctx: &RequestContext) -> ApiResult<OwnerChain> {
    let mut chain = OwnerChain::student(ctx.request.student_id)
        .with_lecturer(ctx.course.lecturer_id);
    if let Some(advisor_id) = advisor_of(state, ctx.request.student_id).await? {
        chain = chain.with_advisor(advisor_id);
    }
    Ok(chain)
}

async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<RemarkRow>>> {
    let actor = claims.actor()?;
    authorize(
        actor,
        Action::Read,
        Resource::RemarkRequest,
        &OwnerChain::actor_self(actor.id),
    )?;

    let mut query = remark_rows();
    match actor.role {
        Role::Student => query = query.filter(remark_request::Column::StudentId.eq(actor.id)),
        Role::Lecturer => query = query.filter(course::Column::LecturerId.eq(actor.id)),
        Role::Advisor => {
            let advisees = advisor_student::Entity::find()
                .select_only()
                .column(advisor_student::Column::StudentId)
                .filter(advisor_student::Column::AdvisorId.eq(actor.id))
                .into_query();
            query = query.filter(remark_request::Column::StudentId.in_subquery(advisees));
        }
        Role::Admin => {}
    }

    let rows = query.into_model::<RemarkRow>().all(&state.db).await?;
    Ok(Json(rows))
}

async fn get_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<RemarkRow>> {
    let actor = claims.actor()?;
    let ctx = load_request(&state, id).await?;
    let chain = request_chain(&state, &ctx).await?;
    authorize(actor, Action::Read, Resource::RemarkRequest, &chain)?;

    let row = remark_rows()
        .filter(remark_request::Column::RequestId.eq(ctx.request.request_id))
        .into_model::<RemarkRow>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Remark request not found"))?;
    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    mark_id: i32,
    justification: String,
}

async fn create_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let actor = claims.actor()?;
    if body.justification.trim().is_empty() {
        return Err(ApiError::validation("Justification is required"));
    }

    let mark = student_mark::Entity::find_by_id(body.mark_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Student mark not found"))?;
    let enrollment = enrollment::Entity::find_by_id(mark.enrollment_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Enrollment not found"))?;
    let course = course::Entity::find_by_id(enrollment.course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Course not found"))?;

    // A student may only challenge their own mark.
    authorize(
        actor,
        Action::Create,
        Resource::RemarkRequest,
        &OwnerChain::student(enrollment.student_id),
    )?;

    let txn = state.db.begin().await?;
    let request = remark_request::ActiveModel {
        mark_id: Set(mark.mark_id),
        student_id: Set(enrollment.student_id),
        justification: Set(body.justification.trim().to_string()),
        status: Set(RemarkStatus::Pending.as_str().to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|err| {
        ApiError::db(err, "A remark request for this mark already exists")
    })?;

    let mut outbox = Outbox::new();
    outbox.push(
        course.lecturer_id,
        "New remark request",
        format!(
            "A remark was requested for a mark in {} ({})",
            course.course_name, course.course_code
        ),
        Some("remark_request"),
        Some(request.request_id),
    );
    txn.commit().await?;
    outbox.flush(&state.db).await;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Remark request submitted successfully",
            request.request_id,
        )),
    ))
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    status: String,
    lecturer_notes: Option<String>,
}

/// Resolves a pending request. `resolved_by` and `resolved_at` are stamped
/// here, never taken from the payload, and a resolved request is terminal.
async fn resolve_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(body): Json<ResolveRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let ctx = load_request(&state, id).await?;

    let status: RemarkStatus = body.status.parse()?;
    if !status.is_resolved() {
        return Err(ApiError::validation("Status must be approved or rejected"));
    }

    let chain = request_chain(&state, &ctx).await?;
    authorize(actor, Action::Update, Resource::RemarkRequest, &chain)?;

    if ctx.request.status != RemarkStatus::Pending.as_str() {
        return Err(ApiError::conflict(
            "This remark request has already been resolved",
        ));
    }

    let student_id = ctx.request.student_id;
    let txn = state.db.begin().await?;
    let mut patch: remark_request::ActiveModel = ctx.request.into();
    patch.status = Set(status.as_str().to_string());
    patch.lecturer_notes = Set(body.lecturer_notes);
    patch.resolved_by = Set(Some(actor.id));
    patch.resolved_at = Set(Some(chrono::Utc::now().naive_utc()));
    let request = patch.update(&txn).await?;

    let mut outbox = Outbox::new();
    outbox.push(
        student_id,
        "Remark request resolved",
        format!(
            "Your remark request for {} ({}) was {}",
            ctx.course.course_name,
            ctx.course.course_code,
            status.as_str()
        ),
        Some("remark_request"),
        Some(request.request_id),
    );
    txn.commit().await?;
    outbox.flush(&state.db).await;

    Ok(Json(MessageResponse::new(
        "Remark request updated successfully",
    )))
}

async fn delete_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let ctx = load_request(&state, id).await?;
    let chain = request_chain(&state, &ctx).await?;
    authorize(actor, Action::Delete, Resource::RemarkRequest, &chain)?;

    // Students may withdraw a request only while it is still pending.
    if actor.role == Role::Student && ctx.request.status != RemarkStatus::Pending.as_str() {
        return Err(ApiError::Authorization(
            "Access denied: You can only delete your own pending remark requests.".to_string(),
        ));
    }

    remark_request::Entity::delete_by_id(ctx.request.request_id)
        .exec(&state.db)
        .await?;

    Ok(Json(MessageResponse::new(
        "Remark request deleted successfully",
    )))
}
