use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::filters::PageQuery;
use crate::models::monthly_balance::MonthlyBalance;
use crate::repositories::RepositoryError;

/// Trait defining monthly balance repository operations
#[async_trait]
pub trait MonthlyBalanceRepository: Send + Sync {
    /// Create a new monthly balance
    async fn create(&self, balance: MonthlyBalance) -> Result<MonthlyBalance, RepositoryError>;

    /// Find a monthly balance by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MonthlyBalance>, RepositoryError>;

    /// Balances of a user by date ascending. `page` limits the window.
    async fn find_by_user(
        &self,
        user_id: Uuid,
        page: Option<PageQuery>,
    ) -> Result<Vec<MonthlyBalance>, RepositoryError>;

    /// Number of balances of a user
    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError>;

    /// Delete a monthly balance by ID
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Delete every balance of a user and return how many were removed
    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError>;
}

const BALANCE_COLUMNS: &str = "id, user_id, balance, date, currency_code, created_at";

#[derive(sqlx::FromRow)]
struct MonthlyBalanceRow {
    id: Uuid,
    user_id: Uuid,
    balance: Decimal,
    date: NaiveDate,
    currency_code: String,
    created_at: DateTime<Utc>,
}

impl From<MonthlyBalanceRow> for MonthlyBalance {
    fn from(row: MonthlyBalanceRow) -> Self {
        MonthlyBalance {
            id: row.id,
            user_id: row.user_id,
            balance: row.balance,
            date: row.date,
            currency_code: row.currency_code,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL implementation of MonthlyBalanceRepository
pub struct PostgresMonthlyBalanceRepository {
    pool: PgPool,
}

impl PostgresMonthlyBalanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MonthlyBalanceRepository for PostgresMonthlyBalanceRepository {
    async fn create(&self, balance: MonthlyBalance) -> Result<MonthlyBalance, RepositoryError> {
        let row = sqlx::query_as::<_, MonthlyBalanceRow>(&format!(
            r#"
            INSERT INTO monthly_balances (id, user_id, balance, date, currency_code, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            BALANCE_COLUMNS
        ))
        .bind(balance.id)
        .bind(balance.user_id)
        .bind(balance.balance)
        .bind(balance.date)
        .bind(&balance.currency_code)
        .bind(balance.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MonthlyBalance>, RepositoryError> {
        let row = sqlx::query_as::<_, MonthlyBalanceRow>(&format!(
            "SELECT {} FROM monthly_balances WHERE id = $1",
            BALANCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MonthlyBalance::from))
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        page: Option<PageQuery>,
    ) -> Result<Vec<MonthlyBalance>, RepositoryError> {
        let mut query = format!(
            r#"
            SELECT {}
            FROM monthly_balances
            WHERE user_id = $1
            ORDER BY date ASC, created_at ASC, id ASC
            "#,
            BALANCE_COLUMNS
        );
        if page.is_some() {
            query.push_str(" LIMIT $2 OFFSET $3");
        }

        let mut sqlx_query = sqlx::query_as::<_, MonthlyBalanceRow>(&query).bind(user_id);
        if let Some(page) = page {
            sqlx_query = sqlx_query.bind(page.page_size).bind(page.offset());
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(MonthlyBalance::from).collect())
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM monthly_balances WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.max(0) as u64)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM monthly_balances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM monthly_balances WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
