//! Assessment components: the weighted pieces a course grade is built from.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QuerySelect, QueryTrait, RelationTrait, Select, Set,
};
use serde::{Deserialize, Serialize};
use studyflow_api_types::MessageResponse;
use studyflow_core::domain::{Action, OwnerChain, Resource, Role, authorize, validate_component};

use super::state::AppState;
use crate::auth::Claims;
use crate::entity::{assessment_component, course, enrollment};
use crate::error::{ApiError, ApiResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/assessment-components",
            get(list_components).post(create_component),
        )
        .route(
            "/assessment-components/{id}",
            get(get_component)
                .put(update_component)
                .delete(delete_component),
        )
}

#[derive(Debug, Serialize, FromQueryResult)]
struct ComponentRow {
    component_id: i32,
    course_id: i32,
    component_name: String,
    max_mark: f64,
    weight_percentage: f64,
    is_final_exam: bool,
    course_code: String,
    course_name: String,
}

fn component_rows() -> Select<assessment_component::Entity> {
    assessment_component::Entity::find()
        .join(
            JoinType::InnerJoin,
            assessment_component::Relation::Course.def(),
        )
        .column(course::Column::CourseCode)
        .column(course::Column::CourseName)
}

async fn list_components(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<ComponentRow>>> {
    let actor = claims.actor()?;
    authorize(
        actor,
        Action::Read,
        Resource::AssessmentComponent,
        &OwnerChain::actor_self(actor.id),
    )?;

    let mut query = component_rows();
    match actor.role {
        Role::Lecturer => query = query.filter(course::Column::LecturerId.eq(actor.id)),
        Role::Student => {
            let enrolled_courses = enrollment::Entity::find()
                .select_only()
                .column(enrollment::Column::CourseId)
                .filter(enrollment::Column::StudentId.eq(actor.id))
                .into_query();
            query =
                query.filter(assessment_component::Column::CourseId.in_subquery(enrolled_courses));
        }
        _ => {}
    }

    let rows = query.into_model::<ComponentRow>().all(&state.db).await?;
    Ok(Json(rows))
}

/// Ownership chain for one component: the course's lecturer, plus the actor
/// as student when they are enrolled in that course.
async fn component_chain(
    state: &AppState,
    actor_id: i32,
    course: &course::Model,
) -> ApiResult<OwnerChain> {
    let mut chain = OwnerChain::lecturer(course.lecturer_id);
    let enrolled = enrollment::Entity::find()
        .filter(enrollment::Column::CourseId.eq(course.course_id))
        .filter(enrollment::Column::StudentId.eq(actor_id))
        .one(&state.db)
        .await?;
    if enrolled.is_some() {
        chain = chain.with_student(actor_id);
    }
    Ok(chain)
}

async fn get_component(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<ComponentRow>> {
    let actor = claims.actor()?;
    let (component, course) = assessment_component::Entity::find_by_id(id)
        .find_also_related(course::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Assessment component not found"))?;
    let course = course.ok_or_else(|| ApiError::not_found("Course not found"))?;

    let chain = component_chain(&state, actor.id, &course).await?;
    authorize(actor, Action::Read, Resource::AssessmentComponent, &chain)?;

    let row = component_rows()
        .filter(assessment_component::Column::ComponentId.eq(component.component_id))
        .into_model::<ComponentRow>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Assessment component not found"))?;
    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
struct CreateComponent {
    course_id: i32,
    component_name: String,
    max_mark: f64,
    weight_percentage: f64,
    #[serde(default)]
    is_final_exam: bool,
}

async fn create_component(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateComponent>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let actor = claims.actor()?;
    let course = course::Entity::find_by_id(body.course_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("Course not found"))?;

    if body.component_name.trim().is_empty() {
        return Err(ApiError::validation("Component name is required"));
    }
    validate_component(body.max_mark, body.weight_percentage)?;

    authorize(
        actor,
        Action::Create,
        Resource::AssessmentComponent,
        &OwnerChain::lecturer(course.lecturer_id),
    )?;

    let component = assessment_component::ActiveModel {
        course_id: Set(course.course_id),
        component_name: Set(body.component_name.trim().to_string()),
        max_mark: Set(body.max_mark),
        weight_percentage: Set(body.weight_percentage),
        is_final_exam: Set(body.is_final_exam),
        ..Default::default()
    };
    let component = component.insert(&state.db).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Assessment component added successfully",
            component.component_id,
        )),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateComponent {
    component_name: Option<String>,
    max_mark: Option<f64>,
    weight_percentage: Option<f64>,
    is_final_exam: Option<bool>,
}

async fn update_component(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateComponent>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let (existing, course) = assessment_component::Entity::find_by_id(id)
        .find_also_related(course::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Assessment component not found"))?;
    let course = course.ok_or_else(|| ApiError::not_found("Course not found"))?;

    // Validate the values the row will end up with, not just the patch.
    let max_mark = body.max_mark.unwrap_or(existing.max_mark);
    let weight = body.weight_percentage.unwrap_or(existing.weight_percentage);
    validate_component(max_mark, weight)?;

    authorize(
        actor,
        Action::Update,
        Resource::AssessmentComponent,
        &OwnerChain::lecturer(course.lecturer_id),
    )?;

    let mut patch: assessment_component::ActiveModel = existing.into();
    if let Some(component_name) = body.component_name {
        if component_name.trim().is_empty() {
            return Err(ApiError::validation("Component name is required"));
        }
        patch.component_name = Set(component_name.trim().to_string());
    }
    patch.max_mark = Set(max_mark);
    patch.weight_percentage = Set(weight);
    if let Some(is_final_exam) = body.is_final_exam {
        patch.is_final_exam = Set(is_final_exam);
    }

    patch.update(&state.db).await?;
    Ok(Json(MessageResponse::new(
        "Assessment component updated successfully",
    )))
}

async fn delete_component(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let (existing, course) = assessment_component::Entity::find_by_id(id)
        .find_also_related(course::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Assessment component not found"))?;
    let course = course.ok_or_else(|| ApiError::not_found("Course not found"))?;

    authorize(
        actor,
        Action::Delete,
        Resource::AssessmentComponent,
        &OwnerChain::lecturer(course.lecturer_id),
    )?;

    assessment_component::Entity::delete_by_id(existing.component_id)
        .exec(&state.db)
        .await?;

    Ok(Json(MessageResponse::new(
        "Assessment component deleted successfully",
    )))
}
