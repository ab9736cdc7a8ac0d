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
use crate::models::suggestion::{
    CreateSuggestionRequest, DayOfMonth, DayQuery, RecurringExpenseSuggestion,
    UpdateSuggestionRequest,
};
use crate::services::suggestion_service::{SuggestionError, SuggestionService};

/// Convert SuggestionError to HTTP response
impl IntoResponse for SuggestionError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            SuggestionError::InvalidDay(ref e) => {
                (StatusCode::BAD_REQUEST, "invalid_day", e.to_string())
            }
            SuggestionError::CategoryNotFound => (
                StatusCode::NOT_FOUND,
                "category_not_found",
                "Category not found".to_string(),
            ),
            SuggestionError::SubcategoryNotInCategory => (
                StatusCode::BAD_REQUEST,
                "subcategory_not_in_category",
                "Subcategory does not belong to the given category".to_string(),
            ),
            SuggestionError::SuggestionNotFound => (
                StatusCode::NOT_FOUND,
                "suggestion_not_found",
                "Recurring suggestion not found".to_string(),
            ),
            SuggestionError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "unauthorized",
                "Unauthorized to access this suggestion".to_string(),
            ),
            SuggestionError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.clone(),
            ),
        };

        (status, Json(ErrorResponse::new(error_type, &message))).into_response()
    }
}

/// Handler for registering a recurring expense suggestion
///
/// `start_day` greater than `end_day` describes a range that wraps past the end of the month.
#[utoipa::path(
    post,
    path = "/api/suggestions",
    request_body = CreateSuggestionRequest,
    responses(
        (status = 201, description = "Suggestion registered", body = RecurringExpenseSuggestion),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "suggestions"
)]
pub async fn create_suggestion_handler(
    State(suggestion_service): State<Arc<dyn SuggestionService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateSuggestionRequest>,
) -> Result<(StatusCode, Json<RecurringExpenseSuggestion>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    match suggestion_service.register(auth_user.user_id, request).await {
        Ok(suggestion) => Ok((StatusCode::CREATED, Json(suggestion))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for listing the caller's suggestions in creation order
#[utoipa::path(
    get,
    path = "/api/suggestions",
    responses(
        (status = 200, description = "Recurring suggestions", body = Vec<RecurringExpenseSuggestion>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "suggestions"
)]
pub async fn list_suggestions_handler(
    State(suggestion_service): State<Arc<dyn SuggestionService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<RecurringExpenseSuggestion>>, SuggestionError> {
    Ok(Json(suggestion_service.list(auth_user.user_id).await?))
}

/// Handler for the suggestions that apply on a day of month
///
/// Only active suggestions are returned, in creation order.
#[utoipa::path(
    get,
    path = "/api/suggestions/for-day",
    params(DayQuery),
    responses(
        (status = 200, description = "Matching suggestions", body = Vec<RecurringExpenseSuggestion>),
        (status = 400, description = "Day outside 1..=31", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "suggestions"
)]
pub async fn suggestions_for_day_handler(
    State(suggestion_service): State<Arc<dyn SuggestionService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    query: Result<Query<DayQuery>, QueryRejection>,
) -> Result<Json<Vec<RecurringExpenseSuggestion>>, Response> {
    let Query(query) = query.map_err(|rejection| {
        let error_response = ErrorResponse::new("invalid_day", &rejection.body_text());
        (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
    })?;

    let day = DayOfMonth::try_from(query.day)
        .map_err(|e| SuggestionError::from(e).into_response())?;

    suggestion_service
        .find_for_day(auth_user.user_id, day)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

#[utoipa::path(
    put,
    path = "/api/suggestions/{id}",
    params(
        ("id" = Uuid, Path, description = "Suggestion ID")
    ),
    request_body = UpdateSuggestionRequest,
    responses(
        (status = 200, description = "Suggestion updated", body = RecurringExpenseSuggestion),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Suggestion belongs to another user", body = ErrorResponse),
        (status = 404, description = "Suggestion or category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "suggestions"
)]
pub async fn update_suggestion_handler(
    State(suggestion_service): State<Arc<dyn SuggestionService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(suggestion_id): Path<Uuid>,
    Json(request): Json<UpdateSuggestionRequest>,
) -> Result<Json<RecurringExpenseSuggestion>, Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    match suggestion_service
        .update(auth_user.user_id, suggestion_id, request)
        .await
    {
        Ok(suggestion) => Ok(Json(suggestion)),
        Err(e) => Err(e.into_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/suggestions/{id}",
    params(
        ("id" = Uuid, Path, description = "Suggestion ID")
    ),
    responses(
        (status = 204, description = "Suggestion deleted"),
        (status = 403, description = "Suggestion belongs to another user", body = ErrorResponse),
        (status = 404, description = "Suggestion not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "suggestions"
)]
pub async fn delete_suggestion_handler(
    State(suggestion_service): State<Arc<dyn SuggestionService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(suggestion_id): Path<Uuid>,
) -> Result<StatusCode, SuggestionError> {
    suggestion_service
        .delete(auth_user.user_id, suggestion_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
