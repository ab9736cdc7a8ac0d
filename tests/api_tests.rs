//! Router-level tests backed by the in-memory repositories.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use budget_tracker::models::category::{CategoryDefinition, CategoryType, SubcategoryDefinition};
use budget_tracker::repositories::memory::{
    InMemoryExpenseRepository, InMemoryMonthlyBalanceRepository, InMemorySuggestionRepository,
    InMemoryTaxonomyRepository, InMemoryUserRepository,
};
use budget_tracker::routes::{AppState, build_router};
use budget_tracker::services::auth_service::{AuthServiceImpl, AuthSettings};
use budget_tracker::services::expense_service::ExpenseServiceImpl;
use budget_tracker::services::monthly_balance_service::MonthlyBalanceServiceImpl;
use budget_tracker::services::suggestion_service::SuggestionServiceImpl;
use budget_tracker::services::taxonomy_service::{TaxonomyService, TaxonomyServiceImpl};

struct TestApp {
    router: Router,
    users: Arc<InMemoryUserRepository>,
}

impl TestApp {
    async fn new() -> Self {
        let taxonomy_repository = Arc::new(InMemoryTaxonomyRepository::new());
        let taxonomy_service = Arc::new(TaxonomyServiceImpl::new(taxonomy_repository.clone()));
        taxonomy_service
            .synchronize(&[
                CategoryDefinition::new(
                    "Home",
                    "4c1e5ccb3e58f37d8c1f",
                    &["🏠"],
                    CategoryType::Expense,
                    vec![
                        SubcategoryDefinition::new(
                            "Rent",
                            "16bce5eb5bd5bd23a4f5",
                            &["🔑"],
                            CategoryType::Expense,
                        ),
                        SubcategoryDefinition::new(
                            "Electricity",
                            "6d0b6b6a9f6c0f2fd1a2",
                            &["💡"],
                            CategoryType::Expense,
                        ),
                    ],
                ),
                CategoryDefinition::new(
                    "Travels & holidays",
                    "c7f2653ce6672c5b1e52",
                    &["🧳"],
                    CategoryType::Expense,
                    vec![],
                ),
                CategoryDefinition::new(
                    "Savings",
                    "9a8d3f0c2b7e41a5d6c1",
                    &["🐷"],
                    CategoryType::Saving,
                    vec![],
                ),
            ])
            .await
            .unwrap();

        let users = Arc::new(InMemoryUserRepository::new());
        let state = AppState {
            auth_service: Arc::new(AuthServiceImpl::new(
                users.clone(),
                AuthSettings::new("integration_secret"),
            )),
            taxonomy_service,
            suggestion_service: Arc::new(SuggestionServiceImpl::new(
                Arc::new(InMemorySuggestionRepository::new()),
                taxonomy_repository.clone(),
            )),
            expense_service: Arc::new(ExpenseServiceImpl::new(
                Arc::new(InMemoryExpenseRepository::new(taxonomy_repository.clone())),
                taxonomy_repository,
            )),
            monthly_balance_service: Arc::new(MonthlyBalanceServiceImpl::new(Arc::new(
                InMemoryMonthlyBalanceRepository::new(),
            ))),
        };

        Self {
            router: build_router(state, false),
            users,
        }
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).to_string(),
            ))
        };
        (status, value)
    }

    /// Registers a user and returns a bearer token
    async fn login_as(&self, email: &str) -> String {
        let body = self.sign_up(email).await;
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers a user and returns the login response
    async fn sign_up(&self, email: &str) -> Value {
        let (status, _) = self
            .request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "name": "Test User",
                    "email": email,
                    "password": "Password123"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "Password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn categories(&self, token: &str) -> Vec<Value> {
        let (status, body) = self.request("GET", "/api/categories", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().unwrap().clone()
    }

    async fn create_suggestion(&self, token: &str, payload: Value) -> (StatusCode, Value) {
        self.request("POST", "/api/suggestions", Some(token), Some(payload))
            .await
    }
}

fn suggestion_payload(category_id: &str, start_day: i64, end_day: i64) -> Value {
    json!({
        "start_day": start_day,
        "end_day": end_day,
        "suggested_expense": {
            "category_id": category_id,
            "quantity": 750.0
        }
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let (status, body) = app.request("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;

    for uri in [
        "/api/categories",
        "/api/suggestions",
        "/api/suggestions/for-day?day=3",
        "/api/expenses",
        "/api/monthly-balances",
        "/api/users",
    ] {
        let (status, body) = app.request("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error"], "missing_token");
    }
}

#[tokio::test]
async fn test_docs_not_mounted_outside_development() {
    let app = TestApp::new().await;

    let (status, _) = app.request("GET", "/api/docs/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_paths_are_not_found_without_token() {
    let app = TestApp::new().await;

    for uri in ["/api/unknown", "/api/expenses/page/extra", "/nothing-here"] {
        let (status, _) = app.request("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_categories_are_listed_with_subcategories() {
    let app = TestApp::new().await;
    let token = app.login_as("reader@example.com").await;

    let categories = app.categories(&token).await;

    assert_eq!(categories.len(), 3);
    assert_eq!(categories[0]["name"], "Home");
    assert_eq!(categories[0]["category_type"], "expense");
    let subcategories = categories[0]["subcategories"].as_array().unwrap();
    assert_eq!(subcategories.len(), 2);
    assert_eq!(subcategories[0]["name"], "Rent");
    assert!(subcategories[0].get("immutable_key").is_none());

    let id = categories[2]["id"].as_str().unwrap();
    let (status, body) = app
        .request("GET", &format!("/api/categories/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Travels & holidays");

    let (status, body) = app
        .request(
            "GET",
            "/api/categories/00000000-0000-0000-0000-000000000000",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "category_not_found");
}

#[tokio::test]
async fn test_wrapping_suggestion_matches_around_month_end() {
    let app = TestApp::new().await;
    let token = app.login_as("wrap@example.com").await;
    let categories = app.categories(&token).await;
    let home_id = categories[0]["id"].as_str().unwrap();

    let (status, created) = app
        .create_suggestion(&token, suggestion_payload(home_id, 28, 5))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["is_active"], true);
    assert_eq!(created["start_day"], 28);
    assert_eq!(created["suggested_expense"]["currency_code"], "EUR");

    for day in [28, 31, 1, 5] {
        let (status, body) = app
            .request(
                "GET",
                &format!("/api/suggestions/for-day?day={}", day),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1, "day {}", day);
    }

    let (_, body) = app
        .request("GET", "/api/suggestions/for-day?day=15", Some(&token), None)
        .await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_for_day_rejects_invalid_days() {
    let app = TestApp::new().await;
    let token = app.login_as("days@example.com").await;

    for query in ["day=0", "day=32", "day=-4", "day=abc", ""] {
        let (status, body) = app
            .request(
                "GET",
                &format!("/api/suggestions/for-day?{}", query),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "query '{}'", query);
        assert_eq!(body["error"], "invalid_day");
    }
}

#[tokio::test]
async fn test_suggestion_validation_errors() {
    let app = TestApp::new().await;
    let token = app.login_as("validation@example.com").await;
    let categories = app.categories(&token).await;
    let home_id = categories[0]["id"].as_str().unwrap();
    let travel_id = categories[2]["id"].as_str().unwrap();
    let rent_id = categories[0]["subcategories"][0]["id"].as_str().unwrap();

    let (status, body) = app
        .create_suggestion(&token, suggestion_payload(home_id, 0, 5))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = app
        .create_suggestion(
            &token,
            json!({
                "start_day": 1,
                "end_day": 5,
                "suggested_expense": { "category_id": home_id, "quantity": 0 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .create_suggestion(
            &token,
            json!({
                "start_day": 1,
                "end_day": 5,
                "suggested_expense": {
                    "category_id": travel_id,
                    "subcategory_id": rent_id,
                    "quantity": 10
                }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "subcategory_not_in_category");
}

#[tokio::test]
async fn test_suggestions_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let owner = app.login_as("owner@example.com").await;
    let intruder = app.login_as("intruder@example.com").await;
    let categories = app.categories(&owner).await;
    let home_id = categories[0]["id"].as_str().unwrap();

    let (_, created) = app
        .create_suggestion(&owner, suggestion_payload(home_id, 1, 31))
        .await;
    let id = created["id"].as_str().unwrap();

    let (_, listed) = app.request("GET", "/api/suggestions", Some(&intruder), None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (_, for_day) = app
        .request("GET", "/api/suggestions/for-day?day=10", Some(&intruder), None)
        .await;
    assert!(for_day.as_array().unwrap().is_empty());

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/suggestions/{}", id),
            Some(&intruder),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request("DELETE", &format!("/api/suggestions/{}", id), Some(&intruder), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_then_delete_suggestion() {
    let app = TestApp::new().await;
    let token = app.login_as("lifecycle@example.com").await;
    let categories = app.categories(&token).await;
    let home_id = categories[0]["id"].as_str().unwrap();

    let (_, created) = app
        .create_suggestion(&token, suggestion_payload(home_id, 7, 7))
        .await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = app
        .request(
            "PUT",
            &format!("/api/suggestions/{}", id),
            Some(&token),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["start_day"], 7);

    let (_, for_day) = app
        .request("GET", "/api/suggestions/for-day?day=7", Some(&token), None)
        .await;
    assert!(for_day.as_array().unwrap().is_empty());

    let (status, _) = app
        .request("DELETE", &format!("/api/suggestions/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .request("DELETE", &format!("/api/suggestions/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "suggestion_not_found");
}

fn amount(value: &Value) -> f64 {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .unwrap()
}

fn expense_payload(category_id: &str, quantity: f64, date: NaiveDate) -> Value {
    json!({
        "category_id": category_id,
        "quantity": quantity,
        "date": date.to_string()
    })
}

#[tokio::test]
async fn test_expense_lifecycle() {
    let app = TestApp::new().await;
    let token = app.login_as("expenses@example.com").await;
    let categories = app.categories(&token).await;
    let home_id = categories[0]["id"].as_str().unwrap();
    let rent_id = categories[0]["subcategories"][0]["id"].as_str().unwrap();

    let (status, created) = app
        .request(
            "POST",
            "/api/expenses",
            Some(&token),
            Some(json!({
                "category_id": home_id,
                "subcategory_id": rent_id,
                "quantity": 750.0,
                "date": "2024-03-01"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["currency_code"], "EUR");
    assert_eq!(created["date"], "2024-03-01");

    for (quantity, date) in [(20.5, "2024-03-15"), (9.5, "2024-04-02")] {
        let (status, _) = app
            .request(
                "POST",
                "/api/expenses",
                Some(&token),
                Some(json!({ "category_id": home_id, "quantity": quantity, "date": date })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, between) = app
        .request(
            "GET",
            "/api/expenses/between?start_date=2024-03-01&end_date=2024-03-31",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(between.as_array().unwrap().len(), 2);

    let (status, body) = app
        .request(
            "GET",
            "/api/expenses/between?start_date=2024-03-31&end_date=2024-03-01",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_date_range");

    let (status, total) = app
        .request(
            "GET",
            "/api/expenses/sum-by-type?category_type=expense",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&total["sum"]), 780.0);

    let (status, page) = app
        .request("GET", "/api/expenses/page?page=1&page_size=20", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["expenses"].as_array().unwrap().len(), 3);
    assert_eq!(page["pagination"]["total_count"], 3);
    assert_eq!(page["pagination"]["total_pages"], 1);

    let (status, _) = app
        .request("GET", "/api/expenses/page?page=0&page_size=20", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = created["id"].as_str().unwrap();
    let (status, _) = app
        .request("DELETE", &format!("/api/expenses/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, deleted) = app.request("DELETE", "/api/expenses", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted_count"], 2);

    let (_, listed) = app.request("GET", "/api/expenses", Some(&token), None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_expense_monthly_average_excludes_current_month() {
    let app = TestApp::new().await;
    let token = app.login_as("average@example.com").await;
    let categories = app.categories(&token).await;
    let home_id = categories[0]["id"].as_str().unwrap();
    let savings_id = categories[1]["id"].as_str().unwrap();

    let today = Utc::now().date_naive();
    let first_of_month = today.with_day(1).unwrap();
    let last_month = first_of_month.checked_sub_months(Months::new(1)).unwrap();

    for (category_id, quantity, date) in [
        (home_id, 90.0, last_month),
        (savings_id, 300.0, last_month),
        (home_id, 1000.0, today),
    ] {
        let (status, _) = app
            .request(
                "POST",
                "/api/expenses",
                Some(&token),
                Some(expense_payload(category_id, quantity, date)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .request(
            "GET",
            "/api/expenses/monthly-average?last_n_months=3&excluded_category_types=saving,investment",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&body["average"]), 30.0);
    assert_eq!(body["months"], 3);
    assert_eq!(body["date_range"]["end"], first_of_month.pred_opt().unwrap().to_string());

    let (status, body) = app
        .request(
            "GET",
            "/api/expenses/monthly-average?last_n_months=0",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_expenses_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let owner = app.login_as("spender@example.com").await;
    let intruder = app.login_as("snoop@example.com").await;
    let categories = app.categories(&owner).await;
    let home_id = categories[0]["id"].as_str().unwrap();

    let (_, created) = app
        .request(
            "POST",
            "/api/expenses",
            Some(&owner),
            Some(expense_payload(home_id, 12.0, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())),
        )
        .await;
    let id = created["id"].as_str().unwrap();

    let (_, listed) = app.request("GET", "/api/expenses", Some(&intruder), None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = app
        .request("DELETE", &format!("/api/expenses/{}", id), Some(&intruder), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, deleted) = app.request("DELETE", "/api/expenses", Some(&intruder), None).await;
    assert_eq!(deleted["deleted_count"], 0);
}

#[tokio::test]
async fn test_monthly_balance_lifecycle() {
    let app = TestApp::new().await;
    let token = app.login_as("balances@example.com").await;

    for (balance, date) in [(2100.0, "2024-02-29"), (-150.25, "2024-01-31")] {
        let (status, _) = app
            .request(
                "POST",
                "/api/monthly-balances",
                Some(&token),
                Some(json!({ "balance": balance, "date": date })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, listed) = app.request("GET", "/api/monthly-balances", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["date"], "2024-01-31");
    assert_eq!(amount(&listed[0]["balance"]), -150.25);

    let (status, page) = app
        .request(
            "GET",
            "/api/monthly-balances/page?page=1&page_size=101",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(page["error"], "validation_error");

    let id = listed[1]["id"].as_str().unwrap();
    let (status, _) = app
        .request("DELETE", &format!("/api/monthly-balances/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, deleted) = app
        .request("DELETE", "/api/monthly-balances", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted_count"], 1);
}

#[tokio::test]
async fn test_user_listing_is_admin_only() {
    let app = TestApp::new().await;
    let admin = app.sign_up("root@example.com").await;
    let member = app.login_as("member@example.com").await;
    let admin_id = admin["user_id"].as_str().unwrap().parse().unwrap();
    app.users.grant_admin(admin_id);
    let admin_token = admin["token"].as_str().unwrap();

    let (status, body) = app.request("GET", "/api/users", Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, users) = app.request("GET", "/api/users", Some(admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["email"], "root@example.com");
    assert_eq!(users[0]["is_admin"], true);
    assert!(users[0].get("password_hash").is_none());
}
