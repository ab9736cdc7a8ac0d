use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use validator::Validate;

use crate::handlers::{ErrorResponse, validation_error_response};
use crate::models::auth::{AuthToken, LoginRequest};
use crate::models::user::{CreateUserRequest, User};
use crate::services::auth_service::{AuthError, AuthService};

/// Convert AuthError to HTTP response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AuthError::DuplicateEmail => (
                StatusCode::CONFLICT,
                "duplicate_email",
                "Email already exists",
            ),
            AuthError::RegistrationClosed => (
                StatusCode::FORBIDDEN,
                "registration_closed",
                "The maximum number of registered users has been reached",
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid email or password",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid authentication token",
            ),
            AuthError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "token_expired",
                "Authentication token has expired",
            ),
            AuthError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Administrator privileges required",
            ),
            AuthError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.as_str(),
            ),
        };

        (status, Json(ErrorResponse::new(error_type, message))).into_response()
    }
}

/// Handler for user registration
///
/// Creates a new user account with the provided credentials.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User successfully registered", body = User),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "User limit reached", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    match auth_service.register(request).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(user))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for user login
///
/// Authenticates a user and returns a JWT token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthToken),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthToken>, Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    match auth_service.login(request).await {
        Ok(token) => Ok(Json(token)),
        Err(e) => Err(e.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::InMemoryUserRepository;
    use crate::services::auth_service::{AuthServiceImpl, AuthSettings};

    fn auth_service(settings: AuthSettings) -> Arc<dyn AuthService> {
        Arc::new(AuthServiceImpl::new(
            Arc::new(InMemoryUserRepository::new()),
            settings,
        ))
    }

    fn register_request(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            default_currency: Some("EUR".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_handler_success() {
        let service = auth_service(AuthSettings::new("test_secret"));

        let result = register_handler(
            State(service),
            Json(register_request("test@example.com", "Password123")),
        )
        .await;

        let (status, Json(user)) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user.name, "Test User");
        assert_eq!(user.email, "test@example.com");
    }

    #[tokio::test]
    async fn test_register_handler_validation_error() {
        let service = auth_service(AuthSettings::new("test_secret"));

        let invalid_email = register_handler(
            State(service.clone()),
            Json(register_request("invalid-email", "Password123")),
        )
        .await;
        let weak_password = register_handler(
            State(service),
            Json(register_request("test@example.com", "password")),
        )
        .await;

        assert_eq!(invalid_email.unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(weak_password.unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_handler_duplicate_email() {
        let service = auth_service(AuthSettings::new("test_secret"));
        let request = register_request("test@example.com", "Password123");

        let _ = register_handler(State(service.clone()), Json(request.clone())).await;
        let result = register_handler(State(service), Json(request)).await;

        assert_eq!(result.unwrap_err().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_handler_user_limit() {
        let service = auth_service(AuthSettings {
            max_users: Some(0),
            ..AuthSettings::new("test_secret")
        });

        let result = register_handler(
            State(service),
            Json(register_request("test@example.com", "Password123")),
        )
        .await;

        assert_eq!(result.unwrap_err().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_login_handler_success_and_failure() {
        let service = auth_service(AuthSettings::new("test_secret"));
        let _ = register_handler(
            State(service.clone()),
            Json(register_request("test@example.com", "Password123")),
        )
        .await;

        let ok = login_handler(
            State(service.clone()),
            Json(LoginRequest {
                email: "test@example.com".to_string(),
                password: "Password123".to_string(),
            }),
        )
        .await;
        let Json(token) = ok.unwrap();
        assert!(!token.token.is_empty());

        let wrong = login_handler(
            State(service),
            Json(LoginRequest {
                email: "test@example.com".to_string(),
                password: "Wrongpass123".to_string(),
            }),
        )
        .await;
        assert_eq!(wrong.unwrap_err().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_handler_validation_error() {
        let service = auth_service(AuthSettings::new("test_secret"));

        let result = login_handler(
            State(service),
            Json(LoginRequest {
                email: "not-an-email".to_string(),
                password: "Password123".to_string(),
            }),
        )
        .await;

        assert_eq!(result.unwrap_err().status(), StatusCode::BAD_REQUEST);
    }
}
