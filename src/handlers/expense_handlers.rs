use axum::{
    Json,
    extract::{Extension, Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::{ErrorResponse, validation_error_response};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::expense::{
    CreateExpenseRequest, DateRangeQuery, Expense, ExpenseSumByType, ExpensesMonthlyAverage,
    MonthlyAverageQuery, PaginatedExpenses, SumByTypeQuery,
};
use crate::models::filters::{DeleteResult, PageQuery};
use crate::services::expense_service::{ExpenseError, ExpenseService};

/// Convert ExpenseError to HTTP response
impl IntoResponse for ExpenseError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ExpenseError::InvalidDateRange => (
                StatusCode::BAD_REQUEST,
                "invalid_date_range",
                self.to_string(),
            ),
            ExpenseError::InvalidMonthCount => (
                StatusCode::BAD_REQUEST,
                "invalid_month_count",
                self.to_string(),
            ),
            ExpenseError::CategoryNotFound => (
                StatusCode::NOT_FOUND,
                "category_not_found",
                "Category not found".to_string(),
            ),
            ExpenseError::SubcategoryNotInCategory => (
                StatusCode::BAD_REQUEST,
                "subcategory_not_in_category",
                "Subcategory does not belong to the given category".to_string(),
            ),
            ExpenseError::ExpenseNotFound => (
                StatusCode::NOT_FOUND,
                "expense_not_found",
                "Expense not found".to_string(),
            ),
            ExpenseError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "unauthorized",
                "Unauthorized to access this expense".to_string(),
            ),
            ExpenseError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.clone(),
            ),
        };

        (status, Json(ErrorResponse::new(error_type, &message))).into_response()
    }
}

fn bad_query(error_type: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(error_type, message)),
    )
        .into_response()
}

/// Unwraps a query string, validating it when it parsed
fn validated_query<T: Validate>(query: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    let Query(query) = query.map_err(|rejection| bad_query("invalid_query", &rejection.body_text()))?;
    query
        .validate()
        .map_err(|errors| validation_error_response(&errors))?;
    Ok(query)
}

/// Handler for registering an expense
#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense registered", body = Expense),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn create_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    match expense_service.register(auth_user.user_id, request).await {
        Ok(expense) => Ok((StatusCode::CREATED, Json(expense))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for listing the caller's expenses, oldest first
#[utoipa::path(
    get,
    path = "/api/expenses",
    responses(
        (status = 200, description = "Expenses", body = Vec<Expense>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn list_expenses_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Expense>>, ExpenseError> {
    Ok(Json(expense_service.list(auth_user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/expenses/page",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of expenses", body = PaginatedExpenses),
        (status = 400, description = "Invalid page or page size", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn list_expenses_page_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PaginatedExpenses>, Response> {
    let page = validated_query(query)?;

    expense_service
        .list_page(auth_user.user_id, page)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

/// Handler for the expenses dated inside a range, both ends included
#[utoipa::path(
    get,
    path = "/api/expenses/between",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Expenses in the range", body = Vec<Expense>),
        (status = 400, description = "Missing dates or start not before end", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn expenses_between_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> Result<Json<Vec<Expense>>, Response> {
    let Query(query) =
        query.map_err(|rejection| bad_query("invalid_date_range", &rejection.body_text()))?;

    expense_service
        .list_between(auth_user.user_id, query.start_date, query.end_date)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

#[utoipa::path(
    get,
    path = "/api/expenses/sum-by-type",
    params(SumByTypeQuery),
    responses(
        (status = 200, description = "Total of the category type", body = ExpenseSumByType),
        (status = 400, description = "Unknown category type or currency", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn expenses_sum_by_type_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    query: Result<Query<SumByTypeQuery>, QueryRejection>,
) -> Result<Json<ExpenseSumByType>, Response> {
    let query = validated_query(query)?;

    expense_service
        .sum_by_type(auth_user.user_id, query.category_type, query.currency_code)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

/// Handler for the average spent per month
///
/// Covers the `last_n_months` full months before the current one.
#[utoipa::path(
    get,
    path = "/api/expenses/monthly-average",
    params(MonthlyAverageQuery),
    responses(
        (status = 200, description = "Monthly average", body = ExpensesMonthlyAverage),
        (status = 400, description = "Invalid month count or category type", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn expenses_monthly_average_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    query: Result<Query<MonthlyAverageQuery>, QueryRejection>,
) -> Result<Json<ExpensesMonthlyAverage>, Response> {
    let query = validated_query(query)?;
    let excluded = query
        .excluded_types()
        .map_err(|message| bad_query("invalid_category_type", &message))?;
    let months =
        u32::try_from(query.last_n_months).map_err(|_| ExpenseError::InvalidMonthCount.into_response())?;

    expense_service
        .monthly_average(
            auth_user.user_id,
            months,
            excluded,
            query.currency_code,
            Utc::now().date_naive(),
        )
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    params(
        ("id" = Uuid, Path, description = "Expense ID")
    ),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 403, description = "Expense belongs to another user", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn delete_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, ExpenseError> {
    expense_service.delete(auth_user.user_id, expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for deleting every expense of the caller
#[utoipa::path(
    delete,
    path = "/api/expenses",
    responses(
        (status = 200, description = "Number of deleted expenses", body = DeleteResult),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn delete_all_expenses_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<DeleteResult>, ExpenseError> {
    Ok(Json(expense_service.delete_all(auth_user.user_id).await?))
}
