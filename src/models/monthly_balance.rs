use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::filters::PaginationData;
use crate::validation::validate_currency_code;

/// Account balance recorded by a user for a month. Balances may be negative.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MonthlyBalance {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(value_type = f64)]
    pub balance: Decimal,
    #[schema(format = "date", example = "2024-01-31")]
    pub date: NaiveDate,
    pub currency_code: String,
    pub created_at: DateTime<Utc>,
}

/// Request payload for registering a monthly balance
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "balance": 2350.75,
    "date": "2024-01-31"
}))]
pub struct CreateMonthlyBalanceRequest {
    #[schema(value_type = f64, example = 2350.75)]
    pub balance: Decimal,

    #[schema(format = "date", example = "2024-01-31")]
    pub date: NaiveDate,

    #[validate(custom(function = "validate_currency_code"))]
    #[schema(min_length = 3, max_length = 3, example = "EUR")]
    pub currency_code: Option<String>,
}

/// One page of monthly balances, oldest first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedMonthlyBalances {
    pub monthly_balances: Vec<MonthlyBalance>,
    pub pagination: PaginationData,
}
