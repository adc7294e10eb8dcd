use axum::Json;
use axum::extract::State;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use studyflow_api_types::{LoginRequest, LoginResponse, LoginUser};

use super::state::AppState;
use crate::auth::verify_password;
use crate::entity::user;
use crate::error::{ApiError, ApiResult};

/// `POST /login`. The only unauthenticated endpoint.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let user = user::Entity::find()
        .filter(user::Column::Username.eq(body.username.trim()))
        .one(&state.db)
        .await?;

    // One message for both unknown-user and bad-password, so a caller
    // cannot probe for valid usernames.
    let user = match user {
        Some(user) if verify_password(&body.password, &user.password_hash) => user,
        _ => return Err(ApiError::Authentication("Invalid credentials".to_string())),
    };

    let token = state.auth.issue_token(&user)?;
    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            user_id: user.user_id,
            username: user.username,
            role: user.role,
            full_name: user.full_name,
            email: user.email,
            matric_number: user.matric_number,
        },
    }))
}
