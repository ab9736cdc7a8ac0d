use axum::{
    Json,
    extract::{Extension, Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::{ErrorResponse, validation_error_response};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::filters::{DeleteResult, PageQuery};
use crate::models::monthly_balance::{
    CreateMonthlyBalanceRequest, MonthlyBalance, PaginatedMonthlyBalances,
};
use crate::services::monthly_balance_service::{MonthlyBalanceError, MonthlyBalanceService};

/// Convert MonthlyBalanceError to HTTP response
impl IntoResponse for MonthlyBalanceError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            MonthlyBalanceError::BalanceNotFound => (
                StatusCode::NOT_FOUND,
                "monthly_balance_not_found",
                "Monthly balance not found".to_string(),
            ),
            MonthlyBalanceError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "unauthorized",
                "Unauthorized to access this monthly balance".to_string(),
            ),
            MonthlyBalanceError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.clone(),
            ),
        };

        (status, Json(ErrorResponse::new(error_type, &message))).into_response()
    }
}

/// Handler for registering a monthly balance
#[utoipa::path(
    post,
    path = "/api/monthly-balances",
    request_body = CreateMonthlyBalanceRequest,
    responses(
        (status = 201, description = "Monthly balance registered", body = MonthlyBalance),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "monthly-balances"
)]
pub async fn create_monthly_balance_handler(
    State(balance_service): State<Arc<dyn MonthlyBalanceService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateMonthlyBalanceRequest>,
) -> Result<(StatusCode, Json<MonthlyBalance>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    match balance_service.register(auth_user.user_id, request).await {
        Ok(balance) => Ok((StatusCode::CREATED, Json(balance))),
        Err(e) => Err(e.into_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/monthly-balances",
    responses(
        (status = 200, description = "Monthly balances, oldest first", body = Vec<MonthlyBalance>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "monthly-balances"
)]
pub async fn list_monthly_balances_handler(
    State(balance_service): State<Arc<dyn MonthlyBalanceService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<MonthlyBalance>>, MonthlyBalanceError> {
    Ok(Json(balance_service.list(auth_user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/monthly-balances/page",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of monthly balances", body = PaginatedMonthlyBalances),
        (status = 400, description = "Invalid page or page size", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "monthly-balances"
)]
pub async fn list_monthly_balances_page_handler(
    State(balance_service): State<Arc<dyn MonthlyBalanceService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PaginatedMonthlyBalances>, Response> {
    let Query(page) = query.map_err(|rejection| {
        let error_response = ErrorResponse::new("invalid_query", &rejection.body_text());
        (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
    })?;
    if let Err(validation_errors) = page.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    balance_service
        .list_page(auth_user.user_id, page)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

#[utoipa::path(
    delete,
    path = "/api/monthly-balances/{id}",
    params(
        ("id" = Uuid, Path, description = "Monthly balance ID")
    ),
    responses(
        (status = 204, description = "Monthly balance deleted"),
        (status = 403, description = "Balance belongs to another user", body = ErrorResponse),
        (status = 404, description = "Monthly balance not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "monthly-balances"
)]
pub async fn delete_monthly_balance_handler(
    State(balance_service): State<Arc<dyn MonthlyBalanceService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(balance_id): Path<Uuid>,
) -> Result<StatusCode, MonthlyBalanceError> {
    balance_service.delete(auth_user.user_id, balance_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/monthly-balances",
    responses(
        (status = 200, description = "Number of deleted monthly balances", body = DeleteResult),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "monthly-balances"
)]
pub async fn delete_all_monthly_balances_handler(
    State(balance_service): State<Arc<dyn MonthlyBalanceService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<DeleteResult>, MonthlyBalanceError> {
    Ok(Json(balance_service.delete_all(auth_user.user_id).await?))
}
