use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::handlers::ErrorResponse;
use crate::services::auth_service::{AuthError, AuthService};

/// Extension type to store authenticated user ID in request
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Validates the bearer token and adds the caller's user_id to request extensions
pub async fn auth_middleware(
    State(auth_service): State<Arc<dyn AuthService>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthRejection::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthRejection::InvalidTokenFormat)?;

    let user_id = auth_service
        .validate_token(token)
        .await
        .map_err(|e| {
            debug!(error = %e, "Bearer token rejected");
            match e {
                AuthError::TokenExpired => AuthRejection::TokenExpired,
                _ => AuthRejection::InvalidToken,
            }
        })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}

/// Reasons a request is turned away before reaching a protected handler
#[derive(Debug)]
pub enum AuthRejection {
    MissingToken,
    InvalidTokenFormat,
    InvalidToken,
    TokenExpired,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (error_type, message) = match self {
            AuthRejection::MissingToken => ("missing_token", "Missing authorization token"),
            AuthRejection::InvalidTokenFormat => (
                "invalid_token_format",
                "Invalid authorization header format. Expected: Bearer <token>",
            ),
            AuthRejection::InvalidToken => ("invalid_token", "Invalid or malformed token"),
            AuthRejection::TokenExpired => ("token_expired", "Token has expired"),
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(error_type, message)),
        )
            .into_response()
    }
}
