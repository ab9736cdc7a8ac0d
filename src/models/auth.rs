use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Scheme clients put in front of the token in the `Authorization` header
pub const TOKEN_TYPE: &str = "Bearer";

/// Credentials exchanged for a bearer token. The email is matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "jane.doe@example.com",
    "password": "Secure123pass"
}))]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Bearer token issued on login, with the identity it was issued for
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
    "token_type": "Bearer",
    "expires_at": "2024-01-16T12:00:00Z",
    "user_id": "3f2b8c1e-8a4e-4d7a-9a51-0c4f7b2d9e10",
    "is_admin": false
}))]
pub struct AuthToken {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub is_admin: bool,
}
