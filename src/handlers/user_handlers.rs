use axum::{
    Json,
    extract::{Extension, State},
};
use std::sync::Arc;

use crate::handlers::ErrorResponse;
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::user::User;
use crate::services::auth_service::{AuthError, AuthService};

/// Handler for listing every registered user
///
/// Administrators come first, then users in registration order.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Registered users", body = Vec<User>),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "users"
)]
pub async fn list_users_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<User>>, AuthError> {
    Ok(Json(auth_service.list_users(auth_user.user_id).await?))
}
