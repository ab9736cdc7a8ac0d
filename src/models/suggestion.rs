use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_currency_code, validate_day_of_month, validate_positive_amount};

pub const FIRST_DAY_OF_MONTH: u8 = 1;
pub const LAST_DAY_OF_MONTH: u8 = 31;

/// Currency used when a suggestion does not specify one
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Rejected day-of-month value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Day must be an integer between 1 and 31, got {0}")]
pub struct InvalidDayError(pub i64);

/// Calendar day of month in 1..=31.
///
/// Day 31 is accepted for every month; it simply never matches in shorter months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "i64", into = "u8")]
pub struct DayOfMonth(u8);

impl DayOfMonth {
    pub fn new(day: u8) -> Result<Self, InvalidDayError> {
        Self::try_from(i64::from(day))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every valid day, first to last
    pub fn all() -> impl Iterator<Item = DayOfMonth> {
        (FIRST_DAY_OF_MONTH..=LAST_DAY_OF_MONTH).map(DayOfMonth)
    }
}

impl TryFrom<i64> for DayOfMonth {
    type Error = InvalidDayError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < i64::from(FIRST_DAY_OF_MONTH) || value > i64::from(LAST_DAY_OF_MONTH) {
            return Err(InvalidDayError(value));
        }
        Ok(DayOfMonth(value as u8))
    }
}

impl From<DayOfMonth> for u8 {
    fn from(day: DayOfMonth) -> Self {
        day.0
    }
}

impl std::fmt::Display for DayOfMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Expense proposed to the user when a suggestion applies
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SuggestedExpense {
    pub category_id: Uuid,
    /// Absent when the suggestion targets the whole category
    pub subcategory_id: Option<Uuid>,
    pub quantity: Decimal,
    pub currency_code: String,
}

/// Recurring expense suggestion owned by a user.
///
/// Applies on every day of month inside `[start_day, end_day]`. When `start_day > end_day`
/// the range wraps past the end of the month.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct RecurringExpenseSuggestion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub start_day: DayOfMonth,
    pub end_day: DayOfMonth,
    pub suggested_expense: SuggestedExpense,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringExpenseSuggestion {
    /// True when the range spans the month boundary
    pub fn wraps_month_end(&self) -> bool {
        self.start_day > self.end_day
    }
}

/// Suggested expense as sent by clients
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "category_id": "550e8400-e29b-41d4-a716-446655440000",
    "subcategory_id": null,
    "quantity": 49.99,
    "currency_code": "EUR"
}))]
pub struct SuggestedExpenseInput {
    pub category_id: Uuid,

    pub subcategory_id: Option<Uuid>,

    #[validate(custom(function = "validate_positive_amount"))]
    #[schema(value_type = f64, minimum = 0.01, example = 49.99)]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_currency_code"))]
    #[schema(min_length = 3, max_length = 3, example = "EUR")]
    pub currency_code: Option<String>,
}

/// Request payload for registering a recurring expense suggestion
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "is_active": true,
    "start_day": 28,
    "end_day": 5,
    "suggested_expense": {
        "category_id": "550e8400-e29b-41d4-a716-446655440000",
        "quantity": 750.00
    }
}))]
pub struct CreateSuggestionRequest {
    #[schema(default = true)]
    pub is_active: Option<bool>,

    #[validate(custom(function = "validate_day_of_month"))]
    #[schema(minimum = 1, maximum = 31)]
    pub start_day: i64,

    #[validate(custom(function = "validate_day_of_month"))]
    #[schema(minimum = 1, maximum = 31)]
    pub end_day: i64,

    #[validate(nested)]
    pub suggested_expense: SuggestedExpenseInput,
}

/// Request payload for updating a recurring expense suggestion. Absent fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "is_active": false
}))]
pub struct UpdateSuggestionRequest {
    pub is_active: Option<bool>,

    #[validate(custom(function = "validate_day_of_month"))]
    #[schema(minimum = 1, maximum = 31)]
    pub start_day: Option<i64>,

    #[validate(custom(function = "validate_day_of_month"))]
    #[schema(minimum = 1, maximum = 31)]
    pub end_day: Option<i64>,

    #[validate(nested)]
    pub suggested_expense: Option<SuggestedExpenseInput>,
}

/// Query string of the day lookup
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DayQuery {
    /// Day of month, 1 to 31
    pub day: i64,
}
