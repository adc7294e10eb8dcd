//! Student marks: recording, rosters, batch upserts, and grade summaries.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, QueryTrait, RelationTrait, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use studyflow_api_types::{BatchMarkReport, MessageResponse};
use studyflow_core::domain::{
    Action, Actor, ComponentMark, OwnerChain, Resource, Role, authorize, summarize_course,
    validate_mark,
};

use super::state::AppState;
use crate::auth::Claims;
use crate::entity::{advisor_student, assessment_component, course, enrollment, student_mark, user};
use crate::error::{ApiError, ApiResult};
use crate::notify::Outbox;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/student-marks", get(list_marks).post(create_mark))
        .route(
            "/student-marks/{id}",
            get(get_mark).put(update_mark).delete(delete_mark),
        )
        .route("/student-marks/student/{id}", get(student_marks))
        .route(
            "/student-marks/student/{id}/course-summaries",
            get(course_summaries),
        )
        .route(
            "/student-marks/course/{course_id}/assessment/{assessment_id}",
            get(assessment_roster),
        )
        .route("/student-marks/batch-update", post(batch_update))
        .route("/all-student-marks", get(all_marks))
}

const DUPLICATE_MESSAGE: &str = "A mark for this enrollment and component already exists";

#[derive(Debug, Serialize, FromQueryResult)]
struct MarkRow {
    mark_id: i32,
    enrollment_id: i32,
    component_id: i32,
    mark_obtained: f64,
    recorded_by: i32,
    recorded_at: chrono::NaiveDateTime,
    component_name: String,
    max_mark: f64,
    weight_percentage: f64,
    student_id: i32,
    student_name: String,
    matric_number: Option<String>,
    course_id: i32,
    course_code: String,
    course_name: String,
}

fn mark_rows() -> Select<student_mark::Entity> {
    student_mark::Entity::find()
        .join(JoinType::InnerJoin, student_mark::Relation::Enrollment.def())
        .join(
            JoinType::InnerJoin,
            student_mark::Relation::AssessmentComponent.def(),
        )
        .join(JoinType::InnerJoin, enrollment::Relation::Student.def())
        .join(JoinType::InnerJoin, enrollment::Relation::Course.def())
        .column_as(enrollment::Column::StudentId, "student_id")
        .column_as(user::Column::FullName, "student_name")
        .column(user::Column::MatricNumber)
        .column_as(course::Column::CourseId, "course_id")
        .column(course::Column::CourseCode)
        .column(course::Column::CourseName)
        .column(assessment_component::Column::ComponentName)
        .column(assessment_component::Column::MaxMark)
        .column(assessment_component::Column::WeightPercentage)
}

/// The advisor assigned to a student, if any.
pub(super) async fn advisor_of(state: &AppState, student_id: i32) -> ApiResult<Option<i32>> {
    let link = advisor_student::Entity::find()
        .filter(advisor_student::Column::StudentId.eq(student_id))
        .one(&state.db)
        .await?;
    Ok(link.map(|row| row.advisor_id))
}

/// A mark with the rows its ownership chain runs through.
struct MarkContext {
    mark: student_mark::Model,
    enrollment: enrollment::Model,
    course: course::Model,
    component: assessment_component::Model,
}

async fn load_mark(state: &AppState, id: i32) -> ApiResult<MarkContext> {
    let mark = student_mark::Entity::find_by_id(id)
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
    let component = assessment_component::Entity::find_by_id(mark.component_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Assessment component not found"))?;
    Ok(MarkContext {
        mark,
        enrollment,
        course,
        component,
    })
}

async fn list_marks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<MarkRow>>> {
    let actor = claims.actor()?;
    authorize(
        actor,
        Action::Read,
        Resource::StudentMark,
        &OwnerChain::actor_self(actor.id),
    )?;

    let mut query = mark_rows();
    match actor.role {
        Role::Student => query = query.filter(enrollment::Column::StudentId.eq(actor.id)),
        Role::Lecturer => query = query.filter(course::Column::LecturerId.eq(actor.id)),
        Role::Advisor => {
            let advisees = advisor_student::Entity::find()
                .select_only()
                .column(advisor_student::Column::StudentId)
                .filter(advisor_student::Column::AdvisorId.eq(actor.id))
                .into_query();
            query = query.filter(enrollment::Column::StudentId.in_subquery(advisees));
        }
        Role::Admin => {}
    }

    let rows = query.into_model::<MarkRow>().all(&state.db).await?;
    Ok(Json(rows))
}

async fn get_mark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MarkRow>> {
    let actor = claims.actor()?;
    let ctx = load_mark(&state, id).await?;

    let mut chain = OwnerChain::student(ctx.enrollment.student_id)
        .with_lecturer(ctx.course.lecturer_id);
    if let Some(advisor_id) = advisor_of(&state, ctx.enrollment.student_id).await? {
        chain = chain.with_advisor(advisor_id);
    }
    authorize(actor, Action::Read, Resource::StudentMark, &chain)?;

    let row = mark_rows()
        .filter(student_mark::Column::MarkId.eq(ctx.mark.mark_id))
        .into_model::<MarkRow>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Student mark not found"))?;
    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
struct CreateMark {
    enrollment_id: i32,
    component_id: i32,
    mark_obtained: f64,
}

async fn create_mark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateMark>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let actor = claims.actor()?;
    let enrollment = enrollment::Entity::find_by_id(body.enrollment_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Enrollment not found"))?;
    let component = assessment_component::Entity::find_by_id(body.component_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Assessment component not found"))?;
    if component.course_id != enrollment.course_id {
        return Err(ApiError::validation(
            "Component does not belong to the enrolled course",
        ));
    }
    let course = course::Entity::find_by_id(enrollment.course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Course not found"))?;

    validate_mark(body.mark_obtained, component.max_mark)?;
    authorize(
        actor,
        Action::Create,
        Resource::StudentMark,
        &OwnerChain::lecturer(course.lecturer_id),
    )?;

    let txn = state.db.begin().await?;
    let mark = student_mark::ActiveModel {
        enrollment_id: Set(enrollment.enrollment_id),
        component_id: Set(component.component_id),
        mark_obtained: Set(body.mark_obtained),
        recorded_by: Set(actor.id),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|err| ApiError::db(err, DUPLICATE_MESSAGE))?;

    let mut outbox = Outbox::new();
    outbox.push(
        enrollment.student_id,
        "New mark recorded",
        format!(
            "A mark was recorded for {} in {}",
            component.component_name, course.course_code
        ),
        Some("mark"),
        Some(mark.mark_id),
    );
    txn.commit().await?;
    outbox.flush(&state.db).await;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Student mark added successfully",
            mark.mark_id,
        )),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateMark {
    mark_obtained: f64,
}

async fn update_mark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateMark>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let ctx = load_mark(&state, id).await?;

    validate_mark(body.mark_obtained, ctx.component.max_mark)?;
    authorize(
        actor,
        Action::Update,
        Resource::StudentMark,
        &OwnerChain::lecturer(ctx.course.lecturer_id),
    )?;

    let txn = state.db.begin().await?;
    let mut patch: student_mark::ActiveModel = ctx.mark.into();
    patch.mark_obtained = Set(body.mark_obtained);
    patch.recorded_by = Set(actor.id);
    let mark = patch.update(&txn).await?;

    let mut outbox = Outbox::new();
    outbox.push(
        ctx.enrollment.student_id,
        "Mark updated",
        format!(
            "Your mark for {} in {} was updated",
            ctx.component.component_name, ctx.course.course_code
        ),
        Some("mark"),
        Some(mark.mark_id),
    );
    txn.commit().await?;
    outbox.flush(&state.db).await;

    Ok(Json(MessageResponse::new(
        "Student mark updated successfully",
    )))
}

async fn delete_mark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let ctx = load_mark(&state, id).await?;

    authorize(
        actor,
        Action::Delete,
        Resource::StudentMark,
        &OwnerChain::lecturer(ctx.course.lecturer_id),
    )?;

    student_mark::Entity::delete_by_id(ctx.mark.mark_id)
        .exec(&state.db)
        .await?;

    Ok(Json(MessageResponse::new(
        "Student mark deleted successfully",
    )))
}

/// Marks for one student across all enrollments, with component context.
async fn student_marks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<MarkRow>>> {
    let actor = claims.actor()?;
    let chain = student_chain(&state, id).await?;
    authorize(actor, Action::Read, Resource::StudentMark, &chain)?;

    let rows = mark_rows()
        .filter(enrollment::Column::StudentId.eq(id))
        .into_model::<MarkRow>()
        .all(&state.db)
        .await?;
    Ok(Json(rows))
}

/// Ownership chain for student-scoped reads: the student plus their advisor.
async fn student_chain(state: &AppState, student_id: i32) -> ApiResult<OwnerChain> {
    let student = user::Entity::find_by_id(student_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;
    if student.role != Role::Student.as_str() {
        return Err(ApiError::not_found("Student not found"));
    }
    let mut chain = OwnerChain::student(student.user_id);
    if let Some(advisor_id) = advisor_of(state, student.user_id).await? {
        chain = chain.with_advisor(advisor_id);
    }
    Ok(chain)
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    course_id: i32,
    course_code: String,
    course_name: String,
    credit_hours: i16,
    overall_percentage: f64,
    letter_grade: char,
}

/// Weighted overall percentage and letter grade for each enrolled course.
/// Every component contributes its weight to the denominator whether or not
/// a mark exists yet, so an ungraded component lowers the percentage.
async fn course_summaries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<SummaryRow>>> {
    let actor = claims.actor()?;
    let chain = student_chain(&state, id).await?;
    authorize(actor, Action::Read, Resource::StudentMark, &chain)?;

    let enrollments = enrollment::Entity::find()
        .filter(enrollment::Column::StudentId.eq(id))
        .find_also_related(course::Entity)
        .all(&state.db)
        .await?;

    let mut rows = Vec::with_capacity(enrollments.len());
    for (enrollment, course) in enrollments {
        let Some(course) = course else { continue };

        let components = assessment_component::Entity::find()
            .filter(assessment_component::Column::CourseId.eq(course.course_id))
            .all(&state.db)
            .await?;
        let marks = student_mark::Entity::find()
            .filter(student_mark::Column::EnrollmentId.eq(enrollment.enrollment_id))
            .all(&state.db)
            .await?;
        let by_component: HashMap<i32, f64> = marks
            .into_iter()
            .map(|mark| (mark.component_id, mark.mark_obtained))
            .collect();

        let inputs: Vec<ComponentMark> = components
            .iter()
            .map(|component| ComponentMark {
                max_mark: component.max_mark,
                weight_percentage: component.weight_percentage,
                mark_obtained: by_component.get(&component.component_id).copied(),
            })
            .collect();
        let summary = summarize_course(&inputs);

        rows.push(SummaryRow {
            course_id: course.course_id,
            course_code: course.course_code,
            course_name: course.course_name,
            credit_hours: course.credit_hours,
            overall_percentage: summary.overall_percentage,
            letter_grade: summary.letter_grade,
        });
    }

    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
struct RosterRow {
    enrollment_id: i32,
    student_id: i32,
    student_name: String,
    matric_number: Option<String>,
    mark_id: Option<i32>,
    mark_obtained: Option<f64>,
}

/// Every enrolled student with their mark for one component, marked or not.
async fn assessment_roster(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, assessment_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Vec<RosterRow>>> {
    let actor = claims.actor()?;
    let course = course::Entity::find_by_id(course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    let component = assessment_component::Entity::find_by_id(assessment_id)
        .one(&state.db)
        .await?
        .filter(|component| component.course_id == course.course_id)
        .ok_or_else(|| ApiError::not_found("Assessment component not found"))?;

    authorize(
        actor,
        Action::Read,
        Resource::StudentMark,
        &OwnerChain::lecturer(course.lecturer_id),
    )?;

    let enrollments = enrollment::Entity::find()
        .filter(enrollment::Column::CourseId.eq(course.course_id))
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;
    let marks = student_mark::Entity::find()
        .filter(student_mark::Column::ComponentId.eq(component.component_id))
        .all(&state.db)
        .await?;
    let by_enrollment: HashMap<i32, student_mark::Model> = marks
        .into_iter()
        .map(|mark| (mark.enrollment_id, mark))
        .collect();

    let rows = enrollments
        .into_iter()
        .filter_map(|(enrollment, student)| {
            let student = student?;
            let mark = by_enrollment.get(&enrollment.enrollment_id);
            Some(RosterRow {
                enrollment_id: enrollment.enrollment_id,
                student_id: student.user_id,
                student_name: student.full_name,
                matric_number: student.matric_number,
                mark_id: mark.map(|m| m.mark_id),
                mark_obtained: mark.map(|m| m.mark_obtained),
            })
        })
        .collect();

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
struct BatchMarkItem {
    enrollment_id: i32,
    component_id: i32,
    mark_obtained: f64,
}

#[derive(Debug, Deserialize)]
struct BatchUpdate {
    marks: Vec<BatchMarkItem>,
}

enum Upsert {
    Inserted,
    Updated,
}

/// One batch item end to end: referential checks, bounds, authorization,
/// then an upsert in its own transaction with the notification queued behind
/// the commit.
async fn apply_batch_item(
    state: &AppState,
    actor: Actor,
    item: &BatchMarkItem,
) -> ApiResult<Upsert> {
    let enrollment = enrollment::Entity::find_by_id(item.enrollment_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Enrollment not found"))?;
    let component = assessment_component::Entity::find_by_id(item.component_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Assessment component not found"))?;
    if component.course_id != enrollment.course_id {
        return Err(ApiError::validation(
            "Component does not belong to the enrolled course",
        ));
    }
    let course = course::Entity::find_by_id(enrollment.course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Course not found"))?;

    validate_mark(item.mark_obtained, component.max_mark)?;
    authorize(
        actor,
        Action::Update,
        Resource::StudentMark,
        &OwnerChain::lecturer(course.lecturer_id),
    )?;

    let existing = student_mark::Entity::find()
        .filter(student_mark::Column::EnrollmentId.eq(enrollment.enrollment_id))
        .filter(student_mark::Column::ComponentId.eq(component.component_id))
        .one(&state.db)
        .await?;

    let txn = state.db.begin().await?;
    let (mark, outcome) = match existing {
        Some(existing) => {
            let mut patch: student_mark::ActiveModel = existing.into();
            patch.mark_obtained = Set(item.mark_obtained);
            patch.recorded_by = Set(actor.id);
            (patch.update(&txn).await?, Upsert::Updated)
        }
        None => {
            let mark = student_mark::ActiveModel {
                enrollment_id: Set(enrollment.enrollment_id),
                component_id: Set(component.component_id),
                mark_obtained: Set(item.mark_obtained),
                recorded_by: Set(actor.id),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|err| ApiError::db(err, DUPLICATE_MESSAGE))?;
            (mark, Upsert::Inserted)
        }
    };

    let mut outbox = Outbox::new();
    outbox.push(
        enrollment.student_id,
        "Mark recorded",
        format!(
            "Your mark for {} in {} was recorded",
            component.component_name, course.course_code
        ),
        Some("mark"),
        Some(mark.mark_id),
    );
    txn.commit().await?;
    outbox.flush(&state.db).await;

    Ok(outcome)
}

/// Upserts a batch of marks. Items are isolated: a failing item is reported
/// in `errors` and never rolls back its neighbours.
async fn batch_update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<BatchUpdate>,
) -> ApiResult<Json<BatchMarkReport>> {
    let actor = claims.actor()?;
    if body.marks.is_empty() {
        return Err(ApiError::validation("No marks supplied"));
    }

    let mut inserted = 0u32;
    let mut updated = 0u32;
    let mut errors = Vec::new();

    for (index, item) in body.marks.iter().enumerate() {
        match apply_batch_item(&state, actor, item).await {
            Ok(Upsert::Inserted) => inserted += 1,
            Ok(Upsert::Updated) => updated += 1,
            Err(err) => errors.push(format!("Item {}: {}", index + 1, err.public_message())),
        }
    }

    Ok(Json(BatchMarkReport {
        message: "Batch update complete".to_string(),
        inserted,
        updated,
        errors,
    }))
}

#[derive(Debug, Serialize)]
struct PeerMarkRow {
    mark_id: i32,
    course_code: String,
    course_name: String,
    component_name: String,
    max_mark: f64,
    weight_percentage: f64,
    mark_obtained: f64,
    student_name: String,
    is_current_user: bool,
}

/// Peer comparison view. Staff see full rows; students and advisors see
/// every row with classmates reduced to stable "Student N" aliases.
async fn all_marks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<serde_json::Value>> {
    let actor = claims.actor()?;
    authorize(
        actor,
        Action::Read,
        Resource::StudentMark,
        &OwnerChain::actor_self(actor.id),
    )?;

    let rows = mark_rows().into_model::<MarkRow>().all(&state.db).await?;

    if matches!(actor.role, Role::Admin | Role::Lecturer) {
        return Ok(Json(serde_json::to_value(rows).map_err(anyhow::Error::from)?));
    }

    // Alias by ascending student id so the mapping is stable across calls.
    let mut student_ids: Vec<i32> = rows.iter().map(|row| row.student_id).collect();
    student_ids.sort_unstable();
    student_ids.dedup();
    let alias: HashMap<i32, usize> = student_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index + 1))
        .collect();

    let anonymized: Vec<PeerMarkRow> = rows
        .into_iter()
        .map(|row| {
            let is_current_user = row.student_id == actor.id;
            let student_name = if is_current_user {
                row.student_name
            } else {
                format!("Student {}", alias[&row.student_id])
            };
            PeerMarkRow {
                mark_id: row.mark_id,
                course_code: row.course_code,
                course_name: row.course_name,
                component_name: row.component_name,
                max_mark: row.max_mark,
                weight_percentage: row.weight_percentage,
                mark_obtained: row.mark_obtained,
                student_name,
                is_current_user,
            }
        })
        .collect();

    Ok(Json(
        serde_json::to_value(anonymized).map_err(anyhow::Error::from)?,
    ))
}
