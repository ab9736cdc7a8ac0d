use axum::{
    Router,
    extract::FromRef,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::ErrorResponse;
use crate::handlers::auth_handlers::{login_handler, register_handler};
use crate::handlers::category_handlers::{get_category_handler, list_categories_handler};
use crate::handlers::expense_handlers::{
    create_expense_handler, delete_all_expenses_handler, delete_expense_handler,
    expenses_between_handler, expenses_monthly_average_handler, expenses_sum_by_type_handler,
    list_expenses_handler, list_expenses_page_handler,
};
use crate::handlers::monthly_balance_handlers::{
    create_monthly_balance_handler, delete_all_monthly_balances_handler,
    delete_monthly_balance_handler, list_monthly_balances_handler,
    list_monthly_balances_page_handler,
};
use crate::handlers::suggestion_handlers::{
    create_suggestion_handler, delete_suggestion_handler, list_suggestions_handler,
    suggestions_for_day_handler, update_suggestion_handler,
};
use crate::handlers::user_handlers::list_users_handler;
use crate::middleware::auth_middleware::auth_middleware;
use crate::models::auth::{AuthToken, LoginRequest};
use crate::models::category::{CategoryType, ExpenseCategoryResponse, ExpenseSubcategory};
use crate::models::expense::{
    CreateExpenseRequest, Expense, ExpenseSumByType, ExpensesMonthlyAverage, PaginatedExpenses,
};
use crate::models::filters::{DateRange, DeleteResult, PaginationData};
use crate::models::monthly_balance::{
    CreateMonthlyBalanceRequest, MonthlyBalance, PaginatedMonthlyBalances,
};
use crate::models::suggestion::{
    CreateSuggestionRequest, DayOfMonth, RecurringExpenseSuggestion, SuggestedExpense,
    SuggestedExpenseInput, UpdateSuggestionRequest,
};
use crate::models::user::{CreateUserRequest, User};
use crate::services::auth_service::AuthService;
use crate::services::expense_service::ExpenseService;
use crate::services::monthly_balance_service::MonthlyBalanceService;
use crate::services::suggestion_service::SuggestionService;
use crate::services::taxonomy_service::TaxonomyService;

/// Services shared by every handler
#[derive(Clone, FromRef)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub taxonomy_service: Arc<dyn TaxonomyService>,
    pub suggestion_service: Arc<dyn SuggestionService>,
    pub expense_service: Arc<dyn ExpenseService>,
    pub monthly_balance_service: Arc<dyn MonthlyBalanceService>,
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth_handlers::register_handler,
        crate::handlers::auth_handlers::login_handler,
        crate::handlers::user_handlers::list_users_handler,
        crate::handlers::category_handlers::list_categories_handler,
        crate::handlers::category_handlers::get_category_handler,
        crate::handlers::suggestion_handlers::create_suggestion_handler,
        crate::handlers::suggestion_handlers::list_suggestions_handler,
        crate::handlers::suggestion_handlers::suggestions_for_day_handler,
        crate::handlers::suggestion_handlers::update_suggestion_handler,
        crate::handlers::suggestion_handlers::delete_suggestion_handler,
        crate::handlers::expense_handlers::create_expense_handler,
        crate::handlers::expense_handlers::list_expenses_handler,
        crate::handlers::expense_handlers::list_expenses_page_handler,
        crate::handlers::expense_handlers::expenses_between_handler,
        crate::handlers::expense_handlers::expenses_sum_by_type_handler,
        crate::handlers::expense_handlers::expenses_monthly_average_handler,
        crate::handlers::expense_handlers::delete_expense_handler,
        crate::handlers::expense_handlers::delete_all_expenses_handler,
        crate::handlers::monthly_balance_handlers::create_monthly_balance_handler,
        crate::handlers::monthly_balance_handlers::list_monthly_balances_handler,
        crate::handlers::monthly_balance_handlers::list_monthly_balances_page_handler,
        crate::handlers::monthly_balance_handlers::delete_monthly_balance_handler,
        crate::handlers::monthly_balance_handlers::delete_all_monthly_balances_handler,
    ),
    components(
        schemas(
            User, CreateUserRequest, LoginRequest, AuthToken, ErrorResponse,
            CategoryType, ExpenseCategoryResponse, ExpenseSubcategory,
            DayOfMonth, SuggestedExpense, SuggestedExpenseInput, RecurringExpenseSuggestion,
            CreateSuggestionRequest, UpdateSuggestionRequest,
            Expense, CreateExpenseRequest, PaginatedExpenses, ExpenseSumByType,
            ExpensesMonthlyAverage, DateRange, PaginationData, DeleteResult,
            MonthlyBalance, CreateMonthlyBalanceRequest, PaginatedMonthlyBalances
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User administration"),
        (name = "expenses", description = "Expense tracking"),
        (name = "monthly-balances", description = "Monthly balances"),
        (name = "categories", description = "Expense taxonomy"),
        (name = "suggestions", description = "Recurring expense suggestions")
    ),
    info(
        title = "Budget Tracker API",
        version = "0.1.0",
        description = "Expenses, monthly balances, expense taxonomy and recurring suggestions",
    )
)]
pub struct ApiDoc;

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin([HeaderValue::from_static("http://localhost:3000")])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Builds the application router. The Swagger UI is mounted only when `with_docs` is set.
pub fn build_router(state: AppState, with_docs: bool) -> Router {
    let protected = Router::new()
        .route("/api/categories", get(list_categories_handler))
        .route("/api/categories/:id", get(get_category_handler))
        .route(
            "/api/suggestions",
            get(list_suggestions_handler).post(create_suggestion_handler),
        )
        .route("/api/suggestions/for-day", get(suggestions_for_day_handler))
        .route(
            "/api/suggestions/:id",
            put(update_suggestion_handler).delete(delete_suggestion_handler),
        )
        .route(
            "/api/expenses",
            get(list_expenses_handler)
                .post(create_expense_handler)
                .delete(delete_all_expenses_handler),
        )
        .route("/api/expenses/page", get(list_expenses_page_handler))
        .route("/api/expenses/between", get(expenses_between_handler))
        .route("/api/expenses/sum-by-type", get(expenses_sum_by_type_handler))
        .route(
            "/api/expenses/monthly-average",
            get(expenses_monthly_average_handler),
        )
        .route("/api/expenses/:id", delete(delete_expense_handler))
        .route(
            "/api/monthly-balances",
            get(list_monthly_balances_handler)
                .post(create_monthly_balance_handler)
                .delete(delete_all_monthly_balances_handler),
        )
        .route(
            "/api/monthly-balances/page",
            get(list_monthly_balances_page_handler),
        )
        .route(
            "/api/monthly-balances/:id",
            delete(delete_monthly_balance_handler),
        )
        .route("/api/users", get(list_users_handler))
        // Only matched routes authenticate, so unknown paths stay 404
        .route_layer(middleware::from_fn_with_state(
            state.auth_service.clone(),
            auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .merge(protected)
        .with_state(state);

    if with_docs {
        app = app.merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()));
    }

    app.layer(TraceLayer::new_for_http()).layer(cors_layer())
}
