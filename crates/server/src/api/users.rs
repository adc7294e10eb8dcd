//! User administration plus the lecturer roster lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait,
    Set,
};
use serde::Deserialize;
use studyflow_api_types::MessageResponse;
use studyflow_core::domain::{Action, OwnerChain, Resource, Role, authorize};

use super::state::AppState;
use crate::auth::{Claims, password_digest};
use crate::entity::{course, enrollment, user};
use crate::error::{ApiError, ApiResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/users/lecturer/{username}/students",
            get(lecturer_students),
        )
}

const CONFLICT_MESSAGE: &str = "Username, email, or matric number already exists";

async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<user::Model>>> {
    let actor = claims.actor()?;
    authorize(actor, Action::Read, Resource::User, &OwnerChain::default())?;

    let users = user::Entity::find().all(&state.db).await?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<user::Model>> {
    let actor = claims.actor()?;
    let user = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    authorize(actor, Action::Read, Resource::User, &OwnerChain::user(id))?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct CreateUser {
    username: String,
    password: String,
    role: String,
    full_name: String,
    email: Option<String>,
    matric_number: Option<String>,
    pin: Option<String>,
    profile_picture: Option<String>,
}

async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let actor = claims.actor()?;
    authorize(actor, Action::Create, Resource::User, &OwnerChain::default())?;

    if body.username.trim().is_empty() || body.password.is_empty() || body.full_name.trim().is_empty()
    {
        return Err(ApiError::validation(
            "Username, password, and full name are required",
        ));
    }
    let role: Role = body.role.parse()?;

    let user = user::ActiveModel {
        username: Set(body.username.trim().to_string()),
        password_hash: Set(password_digest(&body.password)),
        role: Set(role.as_str().to_string()),
        full_name: Set(body.full_name.trim().to_string()),
        email: Set(body.email),
        matric_number: Set(body.matric_number),
        pin: Set(body.pin),
        profile_picture: Set(body.profile_picture),
        ..Default::default()
    };

    let user = user
        .insert(&state.db)
        .await
        .map_err(|err| ApiError::db(err, CONFLICT_MESSAGE))?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "User created successfully",
            user.user_id,
        )),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateUser {
    username: Option<String>,
    password: Option<String>,
    role: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
    matric_number: Option<String>,
    pin: Option<String>,
    profile_picture: Option<String>,
}

async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateUser>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    authorize(actor, Action::Update, Resource::User, &OwnerChain::default())?;

    let mut patch: user::ActiveModel = existing.into();
    if let Some(username) = body.username {
        patch.username = Set(username.trim().to_string());
    }
    if let Some(password) = body.password {
        patch.password_hash = Set(password_digest(&password));
    }
    if let Some(role) = body.role {
        let role: Role = role.parse()?;
        patch.role = Set(role.as_str().to_string());
    }
    if let Some(full_name) = body.full_name {
        patch.full_name = Set(full_name.trim().to_string());
    }
    if let Some(email) = body.email {
        patch.email = Set(Some(email));
    }
    if let Some(matric_number) = body.matric_number {
        patch.matric_number = Set(Some(matric_number));
    }
    if let Some(pin) = body.pin {
        patch.pin = Set(Some(pin));
    }
    if let Some(profile_picture) = body.profile_picture {
        patch.profile_picture = Set(Some(profile_picture));
    }

    patch
        .update(&state.db)
        .await
        .map_err(|err| ApiError::db(err, CONFLICT_MESSAGE))?;

    Ok(Json(MessageResponse::new("User updated successfully")))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    authorize(actor, Action::Delete, Resource::User, &OwnerChain::default())?;

    user::Entity::delete_by_id(existing.user_id)
        .exec(&state.db)
        .await
        .map_err(|err| {
            ApiError::db(
                err,
                "Cannot delete a user that still has linked records",
            )
        })?;

    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// Students enrolled in any course taught by the named lecturer.
async fn lecturer_students(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<user::Model>>> {
    let actor = claims.actor()?;
    let lecturer = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .filter(user::Column::Role.eq(Role::Lecturer.as_str()))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Lecturer not found"))?;

    // The roster belongs to the lecturer's courses, so enrollment rules apply.
    authorize(
        actor,
        Action::Read,
        Resource::Enrollment,
        &OwnerChain::lecturer(lecturer.user_id),
    )?;

    let students = user::Entity::find()
        .join(JoinType::InnerJoin, user::Relation::Enrollment.def())
        .join(JoinType::InnerJoin, enrollment::Relation::Course.def())
        .filter(course::Column::LecturerId.eq(lecturer.user_id))
        .distinct()
        .all(&state.db)
        .await?;

    Ok(Json(students))
}
