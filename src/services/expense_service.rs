use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::category::CategoryType;
use crate::models::expense::{
    CreateExpenseRequest, Expense, ExpenseFilters, ExpenseSumByType, ExpensesMonthlyAverage,
    PaginatedExpenses,
};
use crate::models::filters::{DateRange, DeleteResult, PageQuery, last_full_months};
use crate::models::suggestion::DEFAULT_CURRENCY;
use crate::repositories::RepositoryError;
use crate::repositories::expense_repository::ExpenseRepository;
use crate::repositories::taxonomy_repository::TaxonomyRepository;

/// Expense service errors
#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    #[error("The start date is not earlier than the end date")]
    InvalidDateRange,

    #[error("The number of months should be at least 1")]
    InvalidMonthCount,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Subcategory does not belong to the category")]
    SubcategoryNotInCategory,

    #[error("Expense not found")]
    ExpenseNotFound,

    #[error("Unauthorized to access this expense")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for ExpenseError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ExpenseError::ExpenseNotFound,
            RepositoryError::DatabaseError(msg) => ExpenseError::DatabaseError(msg),
            RepositoryError::ConstraintViolation(msg) => ExpenseError::DatabaseError(msg),
        }
    }
}

/// Trait defining expense service operations
#[async_trait]
pub trait ExpenseService: Send + Sync {
    /// Register an expense for a user
    async fn register(
        &self,
        user_id: Uuid,
        request: CreateExpenseRequest,
    ) -> Result<Expense, ExpenseError>;

    /// All expenses of a user, oldest first
    async fn list(&self, user_id: Uuid) -> Result<Vec<Expense>, ExpenseError>;

    /// One page of the user's expenses, oldest first
    async fn list_page(
        &self,
        user_id: Uuid,
        page: PageQuery,
    ) -> Result<PaginatedExpenses, ExpenseError>;

    /// Expenses dated from `start` to `end`, both included. `start` must be before `end`.
    async fn list_between(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Expense>, ExpenseError>;

    /// Total of the expenses whose category has `category_type`
    async fn sum_by_type(
        &self,
        user_id: Uuid,
        category_type: CategoryType,
        currency_code: Option<String>,
    ) -> Result<ExpenseSumByType, ExpenseError>;

    /// Average spent per month over the `months` full months before the month of `today`
    async fn monthly_average(
        &self,
        user_id: Uuid,
        months: u32,
        excluded_category_types: Vec<CategoryType>,
        currency_code: Option<String>,
        today: NaiveDate,
    ) -> Result<ExpensesMonthlyAverage, ExpenseError>;

    /// Delete an expense owned by the user
    async fn delete(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), ExpenseError>;

    /// Delete every expense of the user
    async fn delete_all(&self, user_id: Uuid) -> Result<DeleteResult, ExpenseError>;
}

/// Implementation of ExpenseService
pub struct ExpenseServiceImpl {
    expense_repository: Arc<dyn ExpenseRepository>,
    taxonomy_repository: Arc<dyn TaxonomyRepository>,
}

impl ExpenseServiceImpl {
    pub fn new(
        expense_repository: Arc<dyn ExpenseRepository>,
        taxonomy_repository: Arc<dyn TaxonomyRepository>,
    ) -> Self {
        Self {
            expense_repository,
            taxonomy_repository,
        }
    }

    async fn ensure_category_reference(
        &self,
        category_id: Uuid,
        subcategory_id: Option<Uuid>,
    ) -> Result<(), ExpenseError> {
        let category = self
            .taxonomy_repository
            .find_category_by_id(category_id)
            .await
            .map_err(|e| ExpenseError::DatabaseError(e.to_string()))?
            .ok_or(ExpenseError::CategoryNotFound)?;

        match subcategory_id {
            Some(id) if !category.subcategory_ids.contains(&id) => {
                Err(ExpenseError::SubcategoryNotInCategory)
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ExpenseService for ExpenseServiceImpl {
    async fn register(
        &self,
        user_id: Uuid,
        request: CreateExpenseRequest,
    ) -> Result<Expense, ExpenseError> {
        self.ensure_category_reference(request.category_id, request.subcategory_id)
            .await?;

        let expense = Expense {
            id: Uuid::new_v4(),
            user_id,
            category_id: request.category_id,
            subcategory_id: request.subcategory_id,
            quantity: request.quantity,
            date: request.date,
            currency_code: request
                .currency_code
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            created_at: Utc::now(),
        };

        let created = self.expense_repository.create(expense).await?;
        info!(expense_id = %created.id, user_id = %user_id, date = %created.date, "Expense registered");
        Ok(created)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Expense>, ExpenseError> {
        Ok(self
            .expense_repository
            .find_by_user(user_id, &ExpenseFilters::default(), None)
            .await?)
    }

    async fn list_page(
        &self,
        user_id: Uuid,
        page: PageQuery,
    ) -> Result<PaginatedExpenses, ExpenseError> {
        let filters = ExpenseFilters::default();
        let total_count = self
            .expense_repository
            .count_by_user(user_id, &filters)
            .await?;
        let expenses = self
            .expense_repository
            .find_by_user(user_id, &filters, Some(page))
            .await?;

        Ok(PaginatedExpenses {
            expenses,
            pagination: page.pagination(total_count),
        })
    }

    async fn list_between(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Expense>, ExpenseError> {
        if start >= end {
            return Err(ExpenseError::InvalidDateRange);
        }

        let filters = ExpenseFilters {
            date_range: Some(DateRange { start, end }),
            ..Default::default()
        };
        Ok(self
            .expense_repository
            .find_by_user(user_id, &filters, None)
            .await?)
    }

    async fn sum_by_type(
        &self,
        user_id: Uuid,
        category_type: CategoryType,
        currency_code: Option<String>,
    ) -> Result<ExpenseSumByType, ExpenseError> {
        let currency_code = currency_code.unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let filters = ExpenseFilters {
            currency_code: Some(currency_code.clone()),
            category_types: Some(vec![category_type]),
            ..Default::default()
        };

        let sum = self.expense_repository.sum_by_user(user_id, &filters).await?;
        Ok(ExpenseSumByType {
            category_type,
            currency_code,
            sum,
        })
    }

    async fn monthly_average(
        &self,
        user_id: Uuid,
        months: u32,
        excluded_category_types: Vec<CategoryType>,
        currency_code: Option<String>,
        today: NaiveDate,
    ) -> Result<ExpensesMonthlyAverage, ExpenseError> {
        if months == 0 {
            return Err(ExpenseError::InvalidMonthCount);
        }
        let date_range = last_full_months(today, months).ok_or(ExpenseError::InvalidMonthCount)?;
        let currency_code = currency_code.unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let filters = ExpenseFilters {
            date_range: Some(date_range),
            currency_code: Some(currency_code.clone()),
            category_types: None,
            excluded_category_types,
        };
        let total = self.expense_repository.sum_by_user(user_id, &filters).await?;
        let average = (total / Decimal::from(months)).round_dp(2);

        debug!(user_id = %user_id, months, total = %total, "Monthly expense average");
        Ok(ExpensesMonthlyAverage {
            average,
            currency_code,
            months,
            date_range,
        })
    }

    async fn delete(&self, user_id: Uuid, expense_id: Uuid) -> Result<(), ExpenseError> {
        let expense = self
            .expense_repository
            .find_by_id(expense_id)
            .await?
            .ok_or(ExpenseError::ExpenseNotFound)?;

        if expense.user_id != user_id {
            return Err(ExpenseError::Unauthorized);
        }

        self.expense_repository.delete(expense_id).await?;
        info!(expense_id = %expense_id, user_id = %user_id, "Expense deleted");
        Ok(())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<DeleteResult, ExpenseError> {
        let deleted_count = self.expense_repository.delete_by_user(user_id).await?;
        info!(user_id = %user_id, deleted_count, "Expenses deleted");
        Ok(DeleteResult { deleted_count })
    }
}
