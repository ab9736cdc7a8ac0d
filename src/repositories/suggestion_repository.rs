use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::suggestion::{DayOfMonth, RecurringExpenseSuggestion, SuggestedExpense};
use crate::repositories::RepositoryError;
use crate::services::suggestion_matcher::DayCondition;

/// Trait defining recurring expense suggestion repository operations
#[async_trait]
pub trait SuggestionRepository: Send + Sync {
    /// Create a new suggestion
    async fn create(
        &self,
        suggestion: RecurringExpenseSuggestion,
    ) -> Result<RecurringExpenseSuggestion, RepositoryError>;

    /// Update an existing suggestion
    async fn update(
        &self,
        suggestion: RecurringExpenseSuggestion,
    ) -> Result<RecurringExpenseSuggestion, RepositoryError>;

    /// Find a suggestion by ID
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<RecurringExpenseSuggestion>, RepositoryError>;

    /// All suggestions of a user, oldest first
    async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RecurringExpenseSuggestion>, RepositoryError>;

    /// Active suggestions of a user whose day range contains `day`, oldest first
    async fn find_active_for_day(
        &self,
        user_id: Uuid,
        day: DayOfMonth,
    ) -> Result<Vec<RecurringExpenseSuggestion>, RepositoryError>;

    /// Delete a suggestion by ID
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

const SUGGESTION_COLUMNS: &str = r#"
    id, user_id, is_active, start_day, end_day, category_id, subcategory_id,
    quantity, currency_code, created_at, updated_at
"#;

#[derive(sqlx::FromRow)]
struct SuggestionRow {
    id: Uuid,
    user_id: Uuid,
    is_active: bool,
    start_day: i16,
    end_day: i16,
    category_id: Uuid,
    subcategory_id: Option<Uuid>,
    quantity: Decimal,
    currency_code: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SuggestionRow> for RecurringExpenseSuggestion {
    type Error = RepositoryError;

    fn try_from(row: SuggestionRow) -> Result<Self, Self::Error> {
        let start_day = DayOfMonth::try_from(i64::from(row.start_day))
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        let end_day = DayOfMonth::try_from(i64::from(row.end_day))
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(RecurringExpenseSuggestion {
            id: row.id,
            user_id: row.user_id,
            is_active: row.is_active,
            start_day,
            end_day,
            suggested_expense: SuggestedExpense {
                category_id: row.category_id,
                subcategory_id: row.subcategory_id,
                quantity: row.quantity,
                currency_code: row.currency_code,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn day_param(day: DayOfMonth) -> i16 {
    i16::from(day.get())
}

/// PostgreSQL implementation of SuggestionRepository
pub struct PostgresSuggestionRepository {
    pool: PgPool,
}

impl PostgresSuggestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SuggestionRepository for PostgresSuggestionRepository {
    async fn create(
        &self,
        suggestion: RecurringExpenseSuggestion,
    ) -> Result<RecurringExpenseSuggestion, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO recurring_expense_suggestions (
                id, user_id, is_active, start_day, end_day, category_id, subcategory_id,
                quantity, currency_code, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            SUGGESTION_COLUMNS
        );

        let expense = &suggestion.suggested_expense;
        let row = sqlx::query_as::<_, SuggestionRow>(&query)
            .bind(suggestion.id)
            .bind(suggestion.user_id)
            .bind(suggestion.is_active)
            .bind(day_param(suggestion.start_day))
            .bind(day_param(suggestion.end_day))
            .bind(expense.category_id)
            .bind(expense.subcategory_id)
            .bind(expense.quantity)
            .bind(&expense.currency_code)
            .bind(suggestion.created_at)
            .bind(suggestion.updated_at)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn update(
        &self,
        suggestion: RecurringExpenseSuggestion,
    ) -> Result<RecurringExpenseSuggestion, RepositoryError> {
        let query = format!(
            r#"
            UPDATE recurring_expense_suggestions
            SET is_active = $2, start_day = $3, end_day = $4, category_id = $5,
                subcategory_id = $6, quantity = $7, currency_code = $8, updated_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            SUGGESTION_COLUMNS
        );

        let expense = &suggestion.suggested_expense;
        let row = sqlx::query_as::<_, SuggestionRow>(&query)
            .bind(suggestion.id)
            .bind(suggestion.is_active)
            .bind(day_param(suggestion.start_day))
            .bind(day_param(suggestion.end_day))
            .bind(expense.category_id)
            .bind(expense.subcategory_id)
            .bind(expense.quantity)
            .bind(&expense.currency_code)
            .bind(suggestion.updated_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<RecurringExpenseSuggestion>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM recurring_expense_suggestions WHERE id = $1",
            SUGGESTION_COLUMNS
        );

        let row = sqlx::query_as::<_, SuggestionRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(RecurringExpenseSuggestion::try_from).transpose()
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RecurringExpenseSuggestion>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {}
            FROM recurring_expense_suggestions
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
            SUGGESTION_COLUMNS
        );

        let rows = sqlx::query_as::<_, SuggestionRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(RecurringExpenseSuggestion::try_from)
            .collect()
    }

    async fn find_active_for_day(
        &self,
        user_id: Uuid,
        day: DayOfMonth,
    ) -> Result<Vec<RecurringExpenseSuggestion>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {}
            FROM recurring_expense_suggestions
            WHERE user_id = $1 AND {}
            ORDER BY created_at ASC, id ASC
            "#,
            SUGGESTION_COLUMNS,
            DayCondition::matching_day().to_sql("$2")
        );

        let rows = sqlx::query_as::<_, SuggestionRow>(&query)
            .bind(user_id)
            .bind(day_param(day))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(RecurringExpenseSuggestion::try_from)
            .collect()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM recurring_expense_suggestions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
