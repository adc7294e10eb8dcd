//! In-app notifications: listing, read receipts, and admin broadcasts.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use studyflow_api_types::MessageResponse;
use studyflow_core::domain::{Action, OwnerChain, Resource, Role, authorize};

use super::state::AppState;
use crate::auth::Claims;
use crate::entity::{notification, user};
use crate::error::{ApiError, ApiResult};
use crate::notify::{self, Pending};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/notifications/{id}/read", put(mark_read))
        .route(
            "/notifications/{id}",
            axum::routing::delete(delete_notification),
        )
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<notification::Model>>> {
    let actor = claims.actor()?;
    authorize(
        actor,
        Action::Read,
        Resource::Notification,
        &OwnerChain::user(actor.id),
    )?;

    let mut query = notification::Entity::find()
        .order_by_desc(notification::Column::CreatedAt);
    if actor.role != Role::Admin {
        query = query.filter(notification::Column::UserId.eq(actor.id));
    }

    let rows = query.all(&state.db).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
struct CreateNotification {
    user_id: Option<i32>,
    roles: Option<Vec<String>>,
    title: String,
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    related_id: Option<i32>,
}

/// Admin-only: one recipient via `user_id`, or a broadcast via `roles`.
async fn create_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateNotification>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let actor = claims.actor()?;
    authorize(
        actor,
        Action::Create,
        Resource::Notification,
        &OwnerChain::default(),
    )?;

    if body.title.trim().is_empty() || body.message.trim().is_empty() {
        return Err(ApiError::validation("Title and message are required"));
    }

    if let Some(roles) = body.roles.filter(|roles| !roles.is_empty()) {
        let outcome = notify::send_to_roles(
            &state.db,
            &roles,
            body.title.trim(),
            body.message.trim(),
            body.kind.as_deref(),
            body.related_id,
        )
        .await;
        if !outcome.success {
            return Err(ApiError::validation("No valid recipient roles specified"));
        }
        return Ok((
            StatusCode::CREATED,
            Json(serde_json::to_value(outcome).map_err(anyhow::Error::from)?),
        ));
    }

    let user_id = body
        .user_id
        .ok_or_else(|| ApiError::validation("Either user_id or roles is required"))?;
    user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::validation("User not found"))?;

    let delivered = notify::send(
        &state.db,
        Pending {
            user_id,
            title: body.title.trim().to_string(),
            message: body.message.trim().to_string(),
            kind: body.kind,
            related_id: body.related_id,
        },
    )
    .await;
    if !delivered {
        return Err(ApiError::Internal(anyhow::anyhow!(
            "notification insert failed"
        )));
    }

    Ok((
        StatusCode::CREATED,
        Json(
            serde_json::to_value(MessageResponse::new("Notification sent successfully"))
                .map_err(anyhow::Error::from)?,
        ),
    ))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = notification::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    authorize(
        actor,
        Action::Update,
        Resource::Notification,
        &OwnerChain::user(existing.user_id),
    )?;

    let mut patch: notification::ActiveModel = existing.into();
    patch.is_read = Set(true);
    patch.update(&state.db).await?;

    Ok(Json(MessageResponse::new("Notification marked as read")))
}

async fn delete_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    let actor = claims.actor()?;
    let existing = notification::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    authorize(
        actor,
        Action::Delete,
        Resource::Notification,
        &OwnerChain::user(existing.user_id),
    )?;

    notification::Entity::delete_by_id(existing.notification_id)
        .exec(&state.db)
        .await?;

    Ok(Json(MessageResponse::new(
        "Notification deleted successfully",
    )))
}
