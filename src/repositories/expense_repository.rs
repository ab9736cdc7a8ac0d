use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::models::category::CategoryType;
use crate::models::expense::{Expense, ExpenseFilters};
use crate::models::filters::PageQuery;
use crate::repositories::RepositoryError;

/// Trait defining expense repository operations
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Create a new expense
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError>;

    /// Find an expense by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError>;

    /// Expenses of a user matching `filters`, by date ascending. `page` limits the window.
    async fn find_by_user(
        &self,
        user_id: Uuid,
        filters: &ExpenseFilters,
        page: Option<PageQuery>,
    ) -> Result<Vec<Expense>, RepositoryError>;

    /// Number of expenses of a user matching `filters`
    async fn count_by_user(
        &self,
        user_id: Uuid,
        filters: &ExpenseFilters,
    ) -> Result<u64, RepositoryError>;

    /// Sum of the quantities of the expenses matching `filters`. Zero when none match.
    async fn sum_by_user(
        &self,
        user_id: Uuid,
        filters: &ExpenseFilters,
    ) -> Result<Decimal, RepositoryError>;

    /// Delete an expense by ID
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Delete every expense of a user and return how many were removed
    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError>;
}

const EXPENSE_COLUMNS: &str = r#"
    e.id, e.user_id, e.category_id, e.subcategory_id, e.quantity, e.date,
    e.currency_code, e.created_at
"#;

#[derive(sqlx::FromRow)]
struct ExpenseRow {
    id: Uuid,
    user_id: Uuid,
    category_id: Uuid,
    subcategory_id: Option<Uuid>,
    quantity: Decimal,
    date: NaiveDate,
    currency_code: String,
    created_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            user_id: row.user_id,
            category_id: row.category_id,
            subcategory_id: row.subcategory_id,
            quantity: row.quantity,
            date: row.date,
            currency_code: row.currency_code,
            created_at: row.created_at,
        }
    }
}

/// `FROM`/`WHERE` clause for `filters`. `$1` is always the user id; the remaining
/// placeholders are bound by [`bind_filters`] in the same order.
fn filter_clause(filters: &ExpenseFilters) -> (String, usize) {
    let mut clause = String::from(
        r#"
        FROM expenses e
        JOIN expense_categories c ON c.id = e.category_id
        WHERE e.user_id = $1
        "#,
    );
    let mut param_count = 1;

    if filters.date_range.is_some() {
        clause.push_str(&format!(
            " AND e.date BETWEEN ${} AND ${}",
            param_count + 1,
            param_count + 2
        ));
        param_count += 2;
    }

    if filters.currency_code.is_some() {
        param_count += 1;
        clause.push_str(&format!(" AND e.currency_code = ${}", param_count));
    }

    if filters.category_types.is_some() {
        param_count += 1;
        clause.push_str(&format!(" AND c.category_type = ANY(${})", param_count));
    }

    if !filters.excluded_category_types.is_empty() {
        param_count += 1;
        clause.push_str(&format!(" AND c.category_type <> ALL(${})", param_count));
    }

    (clause, param_count)
}

fn type_names(types: &[CategoryType]) -> Vec<String> {
    types.iter().map(|t| t.as_db_str().to_string()).collect()
}

fn bind_filters<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    filters: &ExpenseFilters,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    if let Some(range) = filters.date_range {
        query = query.bind(range.start).bind(range.end);
    }
    if let Some(currency_code) = &filters.currency_code {
        query = query.bind(currency_code.clone());
    }
    if let Some(types) = &filters.category_types {
        query = query.bind(type_names(types));
    }
    if !filters.excluded_category_types.is_empty() {
        query = query.bind(type_names(&filters.excluded_category_types));
    }
    query
}

fn bind_scalar_filters<'q, O>(
    mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    filters: &ExpenseFilters,
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    if let Some(range) = filters.date_range {
        query = query.bind(range.start).bind(range.end);
    }
    if let Some(currency_code) = &filters.currency_code {
        query = query.bind(currency_code.clone());
    }
    if let Some(types) = &filters.category_types {
        query = query.bind(type_names(types));
    }
    if !filters.excluded_category_types.is_empty() {
        query = query.bind(type_names(&filters.excluded_category_types));
    }
    query
}

/// PostgreSQL implementation of ExpenseRepository
pub struct PostgresExpenseRepository {
    pool: PgPool,
}

impl PostgresExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExpenseRepository for PostgresExpenseRepository {
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            r#"
            INSERT INTO expenses AS e (
                id, user_id, category_id, subcategory_id, quantity, date,
                currency_code, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(expense.id)
        .bind(expense.user_id)
        .bind(expense.category_id)
        .bind(expense.subcategory_id)
        .bind(expense.quantity)
        .bind(expense.date)
        .bind(&expense.currency_code)
        .bind(expense.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError> {
        let row = sqlx::query_as::<_, ExpenseRow>(&format!(
            "SELECT {} FROM expenses e WHERE e.id = $1",
            EXPENSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Expense::from))
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        filters: &ExpenseFilters,
        page: Option<PageQuery>,
    ) -> Result<Vec<Expense>, RepositoryError> {
        let (clause, param_count) = filter_clause(filters);
        let mut query = format!(
            "SELECT {} {} ORDER BY e.date ASC, e.created_at ASC, e.id ASC",
            EXPENSE_COLUMNS, clause
        );
        if page.is_some() {
            query.push_str(&format!(
                " LIMIT ${} OFFSET ${}",
                param_count + 1,
                param_count + 2
            ));
        }

        let mut sqlx_query =
            bind_filters(sqlx::query_as::<_, ExpenseRow>(&query).bind(user_id), filters);
        if let Some(page) = page {
            sqlx_query = sqlx_query.bind(page.page_size).bind(page.offset());
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Expense::from).collect())
    }

    async fn count_by_user(
        &self,
        user_id: Uuid,
        filters: &ExpenseFilters,
    ) -> Result<u64, RepositoryError> {
        let (clause, _) = filter_clause(filters);
        let query = format!("SELECT COUNT(*) {}", clause);

        let count: i64 = bind_scalar_filters(sqlx::query_scalar::<_, i64>(&query).bind(user_id), filters)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn sum_by_user(
        &self,
        user_id: Uuid,
        filters: &ExpenseFilters,
    ) -> Result<Decimal, RepositoryError> {
        let (clause, _) = filter_clause(filters);
        let query = format!("SELECT COALESCE(SUM(e.quantity), 0) {}", clause);

        let total = bind_scalar_filters(sqlx::query_scalar::<_, Decimal>(&query).bind(user_id), filters)
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM expenses WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::filters::DateRange;

    #[test]
    fn test_filter_clause_numbers_placeholders_in_bind_order() {
        let filters = ExpenseFilters {
            date_range: Some(DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            }),
            currency_code: Some("EUR".to_string()),
            category_types: None,
            excluded_category_types: vec![CategoryType::Saving],
        };

        let (clause, param_count) = filter_clause(&filters);

        assert_eq!(param_count, 5);
        assert!(clause.contains("e.date BETWEEN $2 AND $3"));
        assert!(clause.contains("e.currency_code = $4"));
        assert!(clause.contains("c.category_type <> ALL($5)"));
        assert!(!clause.contains("ANY("));
    }

    #[test]
    fn test_filter_clause_without_filters() {
        let (clause, param_count) = filter_clause(&ExpenseFilters::default());

        assert_eq!(param_count, 1);
        assert!(clause.contains("e.user_id = $1"));
        assert!(!clause.contains("AND"));
    }
}
