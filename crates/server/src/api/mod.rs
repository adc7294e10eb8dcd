//! HTTP API: one module per resource group, merged into a single router.
//!
//! Everything except `/login` sits behind the bearer-token middleware.

pub mod advisor_notes;
pub mod advisors;
pub mod components;
pub mod courses;
pub mod enrollments;
pub mod login;
pub mod marks;
pub mod notifications;
pub mod remarks;
pub mod state;
pub mod users;

use axum::Router;
use axum::middleware;
use axum::routing::post;
use tower_http::cors::CorsLayer;

pub use state::AppState;

use crate::auth::require_auth;

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(users::router())
        .merge(courses::router())
        .merge(enrollments::router())
        .merge(components::router())
        .merge(marks::router())
        .merge(remarks::router())
        .merge(advisors::router())
        .merge(advisor_notes::router())
        .merge(notifications::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .route("/login", post(login::login))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
