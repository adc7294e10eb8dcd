//! Advisory meeting notes, attached to an advisor-student assignment.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, RelationTrait, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use studyflow_api_types::MessageResponse;
use studyflow_core::domain::{Action, OwnerChain, Resource, Role, authorize};

use super::state::AppState;
use crate::auth::Claims;
use crate::entity::{advisor_note, advisor_student, user};
use crate::error::{ApiError, ApiResult};
use crate::notify::Outbox;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/advisor-notes", get(list_notes).post(create_note))
        .route(
            "/advisor-notes/{id}",
            get(get_note).put(update_note).delete(delete_note),
        )
}

#[derive(Debug, FromQueryResult)]
struct NoteRow {
    note_id: i32,
    advisor_student_id: i32,
    note_content: String,
    meeting_date: chrono::NaiveDate,
    recommendations: String,
    follow_up_required: bool,
    created_at: chrono::NaiveDateTime,
    advisor_id: i32,
    student_id: i32,
    student_name: String,
}

/// Wire shape: recommendations decoded from their stored JSON text.
#[derive(Debug, Serialize)]
struct NoteResponse {
    note_id: i32,
    advisor_student_id: i32,
    note_content: String,
    meeting_date: chrono::NaiveDate,
    recommendations: Vec<String>,
    follow_up_required: bool,
    created_at: chrono::NaiveDateTime,
    advisor_id: i32,
    student_id: i32,
    student_name: String,
}

impl From<NoteRow> for NoteResponse {
    fn from(row: NoteRow) -> Self {
        let recommendations = serde_json::from_str(&row.recommendations).unwrap_or_default();
        Self {
            note_id: row.note_id,
            advisor_student_id: row.advisor_student_id,
            note_content: row.note_content,
            meeting_date: row.meeting_date,
            recommendations,
            follow_up_required: row.follow_up_required,
            created_at: row.created_at,
            advisor_id: row.advisor_id,
            student_id: row.student_id,
            student_name: row.student_name,
        }
    }
}

fn note_rows() -> Select<advisor_note::Entity> {
    advisor_note::Entity::find()
        .join(
            JoinType::InnerJoin,
            advisor_note::Relation::AdvisorStudent.def(),
        )
        .join(JoinType::InnerJoin, advisor_student::Relation::Student.def())
        .column(advisor_student::Column::AdvisorId)
        .column(advisor_student::Column::StudentId)
        .column_as(user::Column::FullName, "student_name")
}

async fn list_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<NoteResponse>>> {
    let actor = claims.actor()?;
    authorize(
        actor,
        Action::Read,
        Resource::AdvisorNote,
        &OwnerChain::actor_self(actor.id),
    )?;

    let mut query = note_rows();
    match actor.role {
        Role::Advisor => query = query.filter(advisor_student::Column::AdvisorId.eq(actor.id)),
        Role::Student => query = query.filter(advisor_student::Column::StudentId.eq(actor.id)),
        _ => {}
    }

    let rows = query.into_model::<NoteRow>().all(&state.db).await?;
    Ok(Json(rows.into_iter().map(NoteResponse::from).collect()))
}

/// A note plus the assignment it hangs off.
async fn load_note(
    state: &AppState,
    id: i32,
) -> ApiResult<(advisor_note::Model, advisor_student::Model)> {
    let (note, link) = advisor_note::Entity::find_by_id(id)
        .find_also_related(advisor_student::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Advisor note not found"))?;
    let link = link.ok_or_else(|| ApiError::not_found("Advisor assignment not found"))?;
    Ok((note, link))
}

async fn get_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<NoteResponse>> {
    let actor = claims.actor()?;
    let (note, link) = load_note(&state, id).await?;

    authorize(
        actor,
        Action::Read,
        Resource::AdvisorNote,
        &OwnerChain::student(link.student_id).with_advisor(link.advisor_id),
    )?;

    let row = note_rows()
        .filter(advisor_note::Column::NoteId.eq(note.note_id))
        .into_model::<NoteRow>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Advisor note not found"))?;
    Ok(Json(NoteResponse::from(row)))
}

#[derive(Debug, Deserialize)]
struct CreateNote {
    advisor_student_id: i32,
    note_content: String,
    meeting_date: chrono::NaiveDate,
    recommendations: Option<Vec<String>>,
    follow_up_required: Option<bool>,
}

async fn create_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateNote>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let actor = claims.actor()?;
    if body.note_content.trim().is_empty() {
        return Err(ApiError::validation("Note content is required"));
    }
    let link = advisor_student::Entity::find_by_id(body.advisor_student_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Advisor assignment not found"))?;

    authorize(
        actor,
        Action::Create,
        Resource::AdvisorNote,
        &OwnerChain::default().with_advisor(link.advisor_id),
    )?;

    let recommendations = serde_json::to_string(&body.recommendations.unwrap_or_default())
        .map_err(anyhow::Error::from)?;

    let txn = state.db.begin().await?;
    let note = advisor_note::ActiveModel {
        advisor_student_id: Set(link.advisor_student_id),
        note_content: Set(body.note_content.trim().to_string()),
        meeting_date: Set(body.meeting_date),
        recommendations: Set(recommendations),
        follow_up_required: Set(body.follow_up_required.unwrap_or(false)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut outbox = Outbox::new();
    outbox.push(
        link.student_id,
        "New advisor note",
        "Your academic advisor added a note from your meeting",
        Some("advisor_note"),
        Some(note.note_id),
    );
    txn.commit().await?;
    outbox.flush(&state.db).await;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Advisor note added successfully",
            note.note_id,
        )),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateNote {
    note_content: Option<String>,
    meeting_date: Option<chrono::NaiveDate>,
    recommendations: Option<Vec<String>>,
    follow_up_required: Option<bool>,
}

async fn update_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateNote>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let (note, link) = load_note(&state, id).await?;

    authorize(
        actor,
        Action::Update,
        Resource::AdvisorNote,
        &OwnerChain::default().with_advisor(link.advisor_id),
    )?;

    let mut patch: advisor_note::ActiveModel = note.into();
    if let Some(note_content) = body.note_content {
        if note_content.trim().is_empty() {
            return Err(ApiError::validation("Note content is required"));
        }
        patch.note_content = Set(note_content.trim().to_string());
    }
    if let Some(meeting_date) = body.meeting_date {
        patch.meeting_date = Set(meeting_date);
    }
    if let Some(recommendations) = body.recommendations {
        patch.recommendations =
            Set(serde_json::to_string(&recommendations).map_err(anyhow::Error::from)?);
    }
    if let Some(follow_up_required) = body.follow_up_required {
        patch.follow_up_required = Set(follow_up_required);
    }

    patch.update(&state.db).await?;
    Ok(Json(MessageResponse::new(
        "Advisor note updated successfully",
    )))
}

async fn delete_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let (note, link) = load_note(&state, id).await?;

    authorize(
        actor,
        Action::Delete,
        Resource::AdvisorNote,
        &OwnerChain::default().with_advisor(link.advisor_id),
    )?;

    advisor_note::Entity::delete_by_id(note.note_id)
        .exec(&state.db)
        .await?;

    Ok(Json(MessageResponse::new(
        "Advisor note deleted successfully",
    )))
}
