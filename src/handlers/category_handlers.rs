use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::ErrorResponse;
use crate::models::category::ExpenseCategoryResponse;
use crate::services::taxonomy_service::{TaxonomyError, TaxonomyService};

impl IntoResponse for TaxonomyError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            TaxonomyError::CategoryNotFound => (
                StatusCode::NOT_FOUND,
                "category_not_found",
                "Category not found",
            ),
            TaxonomyError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.as_str(),
            ),
        };

        (status, Json(ErrorResponse::new(error_type, message))).into_response()
    }
}

/// Handler for listing the expense taxonomy
///
/// Returns every category sorted by name, with its subcategories in definition order.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Expense categories", body = Vec<ExpenseCategoryResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "categories"
)]
pub async fn list_categories_handler(
    State(taxonomy_service): State<Arc<dyn TaxonomyService>>,
) -> Result<Json<Vec<ExpenseCategoryResponse>>, TaxonomyError> {
    Ok(Json(taxonomy_service.get_categories().await?))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Expense category", body = ExpenseCategoryResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "categories"
)]
pub async fn get_category_handler(
    State(taxonomy_service): State<Arc<dyn TaxonomyService>>,
    Path(category_id): Path<Uuid>,
) -> Result<Json<ExpenseCategoryResponse>, TaxonomyError> {
    Ok(Json(taxonomy_service.get_category(category_id).await?))
}
