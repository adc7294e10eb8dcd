//! Shared application state.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::AuthConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, auth: AuthConfig) -> Self {
        Self {
            db,
            auth: Arc::new(auth),
        }
    }
}
