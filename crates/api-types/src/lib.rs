//! Shared request/response types used by API-facing crates.

use serde::{Deserialize, Serialize};

/// Error envelope returned for every 4xx/5xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Success envelope for mutations that return no resource body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            id: None,
        }
    }

    pub fn with_id(message: impl Into<String>, id: i32) -> Self {
        Self {
            message: message.into(),
            id: Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

/// The authenticated user's public profile, echoed alongside the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUser {
    pub user_id: i32,
    pub username: String,
    pub role: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matric_number: Option<String>,
}

/// Aggregate report for batch operations that isolate failures per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub message: String,
    pub details: Vec<String>,
}

/// Aggregate report for batch mark upserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMarkReport {
    pub message: String,
    pub inserted: u32,
    pub updated: u32,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shape() {
        let json = serde_json::to_value(ErrorResponse::new("Access denied: admin only"))
            .expect("serialize error response");
        assert_eq!(json, serde_json::json!({"error": "Access denied: admin only"}));
    }

    #[test]
    fn message_id_is_omitted_when_absent() {
        let json = serde_json::to_string(&MessageResponse::new("Course deleted successfully"))
            .expect("serialize message");
        assert!(!json.contains("\"id\""));

        let json = serde_json::to_string(&MessageResponse::with_id("Course added successfully", 4))
            .expect("serialize message with id");
        assert!(json.contains("\"id\":4"));
    }

    #[test]
    fn login_round_trip_json() {
        let response = LoginResponse {
            token: "abc".to_string(),
            user: LoginUser {
                user_id: 12,
                username: "jdoe".to_string(),
                role: "student".to_string(),
                full_name: "Jane Doe".to_string(),
                email: None,
                matric_number: Some("A123".to_string()),
            },
        };

        let json = serde_json::to_string(&response).expect("serialize login response");
        let decoded: LoginResponse = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, response);
    }
}
