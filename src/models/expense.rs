use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::category::CategoryType;
use crate::models::filters::{DateRange, PaginationData};
use crate::validation::{validate_currency_code, validate_month_count, validate_positive_amount};

/// Expense registered by a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[schema(format = "date", example = "2024-01-15")]
    pub date: NaiveDate,
    pub currency_code: String,
    pub created_at: DateTime<Utc>,
}

/// Request payload for registering an expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "category_id": "550e8400-e29b-41d4-a716-446655440000",
    "subcategory_id": null,
    "quantity": 42.50,
    "date": "2024-01-15",
    "currency_code": "EUR"
}))]
pub struct CreateExpenseRequest {
    pub category_id: Uuid,

    pub subcategory_id: Option<Uuid>,

    #[validate(custom(function = "validate_positive_amount"))]
    #[schema(value_type = f64, minimum = 0.01, example = 42.50)]
    pub quantity: Decimal,

    #[schema(format = "date", example = "2024-01-15")]
    pub date: NaiveDate,

    #[validate(custom(function = "validate_currency_code"))]
    #[schema(min_length = 3, max_length = 3, example = "EUR")]
    pub currency_code: Option<String>,
}

/// Which expenses a query covers. Empty filters match every expense of the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilters {
    pub date_range: Option<DateRange>,
    pub currency_code: Option<String>,
    /// Keep only expenses whose category has one of these types
    pub category_types: Option<Vec<CategoryType>>,
    /// Drop expenses whose category has one of these types
    pub excluded_category_types: Vec<CategoryType>,
}

impl ExpenseFilters {
    /// True when a category of `category_type` passes both type filters
    pub fn accepts_type(&self, category_type: CategoryType) -> bool {
        let included = self
            .category_types
            .as_ref()
            .map_or(true, |types| types.contains(&category_type));
        included && !self.excluded_category_types.contains(&category_type)
    }

    /// Date and currency checks; the category type is checked separately
    pub fn accepts(&self, expense: &Expense) -> bool {
        let in_range = self
            .date_range
            .map_or(true, |range| range.contains(expense.date));
        let same_currency = self
            .currency_code
            .as_deref()
            .map_or(true, |code| code == expense.currency_code);
        in_range && same_currency
    }
}

/// One page of expenses, oldest first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedExpenses {
    pub expenses: Vec<Expense>,
    pub pagination: PaginationData,
}

/// Query string of the date-range lookup
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    /// First day included, `YYYY-MM-DD`
    pub start_date: NaiveDate,
    /// Last day included, `YYYY-MM-DD`. Must be after `start_date`.
    pub end_date: NaiveDate,
}

/// Query string of the total-by-type lookup
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SumByTypeQuery {
    pub category_type: CategoryType,

    /// Only expenses in this currency are added. Defaults to EUR.
    #[validate(custom(function = "validate_currency_code"))]
    pub currency_code: Option<String>,
}

/// Query string of the monthly average lookup
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthlyAverageQuery {
    /// Number of full months before the current one, 1 to 120
    #[validate(custom(function = "validate_month_count"))]
    pub last_n_months: i64,

    /// Comma separated category types left out of the average, e.g. `investment,saving`
    pub excluded_category_types: Option<String>,

    /// Only expenses in this currency are added. Defaults to EUR.
    #[validate(custom(function = "validate_currency_code"))]
    pub currency_code: Option<String>,
}

impl MonthlyAverageQuery {
    /// Parses the comma separated type list. Blank entries are ignored.
    pub fn excluded_types(&self) -> Result<Vec<CategoryType>, String> {
        let Some(raw) = self.excluded_category_types.as_deref() else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                CategoryType::from_db_str(part).ok_or_else(|| {
                    format!(
                        "Invalid category type '{}'. Allowed values are: expense, investment, saving",
                        part
                    )
                })
            })
            .collect()
    }
}

/// Total of the expenses of one category type
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ExpenseSumByType {
    pub category_type: CategoryType,
    pub currency_code: String,
    #[schema(value_type = f64)]
    pub sum: Decimal,
}

/// Average spent per month, rounded to two decimals
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ExpensesMonthlyAverage {
    #[schema(value_type = f64)]
    pub average: Decimal,
    pub currency_code: String,
    pub months: u32,
    pub date_range: DateRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(date: NaiveDate, currency_code: &str) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            subcategory_id: None,
            quantity: Decimal::new(1000, 2),
            date,
            currency_code: currency_code.to_string(),
            created_at: Utc::now(),
        }
    }

    fn monthly_average_query(excluded: Option<&str>) -> MonthlyAverageQuery {
        MonthlyAverageQuery {
            last_n_months: 3,
            excluded_category_types: excluded.map(str::to_string),
            currency_code: None,
        }
    }

    #[test]
    fn test_excluded_types_parsing() {
        assert_eq!(monthly_average_query(None).excluded_types(), Ok(vec![]));
        assert_eq!(
            monthly_average_query(Some("investment, saving,")).excluded_types(),
            Ok(vec![CategoryType::Investment, CategoryType::Saving])
        );
        assert!(monthly_average_query(Some("pension_plan"))
            .excluded_types()
            .is_err());
    }

    #[test]
    fn test_filters_by_type() {
        let filters = ExpenseFilters {
            category_types: Some(vec![CategoryType::Expense, CategoryType::Saving]),
            excluded_category_types: vec![CategoryType::Saving],
            ..Default::default()
        };

        assert!(filters.accepts_type(CategoryType::Expense));
        assert!(!filters.accepts_type(CategoryType::Saving));
        assert!(!filters.accepts_type(CategoryType::Investment));
        assert!(ExpenseFilters::default().accepts_type(CategoryType::Investment));
    }

    #[test]
    fn test_filters_by_date_and_currency() {
        let jan = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let filters = ExpenseFilters {
            date_range: Some(DateRange {
                start: jan(10),
                end: jan(20),
            }),
            currency_code: Some("EUR".to_string()),
            ..Default::default()
        };

        assert!(filters.accepts(&expense(jan(10), "EUR")));
        assert!(filters.accepts(&expense(jan(20), "EUR")));
        assert!(!filters.accepts(&expense(jan(21), "EUR")));
        assert!(!filters.accepts(&expense(jan(15), "USD")));
    }

    #[test]
    fn test_create_request_validation() {
        let request = CreateExpenseRequest {
            category_id: Uuid::new_v4(),
            subcategory_id: None,
            quantity: Decimal::ZERO,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            currency_code: Some("EURO".to_string()),
        };

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("currency_code"));
    }
}
