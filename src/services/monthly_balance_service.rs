use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::filters::{DeleteResult, PageQuery};
use crate::models::monthly_balance::{
    CreateMonthlyBalanceRequest, MonthlyBalance, PaginatedMonthlyBalances,
};
use crate::models::suggestion::DEFAULT_CURRENCY;
use crate::repositories::RepositoryError;
use crate::repositories::monthly_balance_repository::MonthlyBalanceRepository;

/// Monthly balance service errors
#[derive(Debug, thiserror::Error)]
pub enum MonthlyBalanceError {
    #[error("Monthly balance not found")]
    BalanceNotFound,

    #[error("Unauthorized to access this monthly balance")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for MonthlyBalanceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => MonthlyBalanceError::BalanceNotFound,
            RepositoryError::DatabaseError(msg) => MonthlyBalanceError::DatabaseError(msg),
            RepositoryError::ConstraintViolation(msg) => MonthlyBalanceError::DatabaseError(msg),
        }
    }
}

/// Trait defining monthly balance service operations
#[async_trait]
pub trait MonthlyBalanceService: Send + Sync {
    async fn register(
        &self,
        user_id: Uuid,
        request: CreateMonthlyBalanceRequest,
    ) -> Result<MonthlyBalance, MonthlyBalanceError>;

    async fn list(&self, user_id: Uuid) -> Result<Vec<MonthlyBalance>, MonthlyBalanceError>;

    async fn list_page(
        &self,
        user_id: Uuid,
        page: PageQuery,
    ) -> Result<PaginatedMonthlyBalances, MonthlyBalanceError>;

    async fn delete(&self, user_id: Uuid, balance_id: Uuid) -> Result<(), MonthlyBalanceError>;

    async fn delete_all(&self, user_id: Uuid) -> Result<DeleteResult, MonthlyBalanceError>;
}

/// Implementation of MonthlyBalanceService
pub struct MonthlyBalanceServiceImpl {
    repository: Arc<dyn MonthlyBalanceRepository>,
}

impl MonthlyBalanceServiceImpl {
    pub fn new(repository: Arc<dyn MonthlyBalanceRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl MonthlyBalanceService for MonthlyBalanceServiceImpl {
    async fn register(
        &self,
        user_id: Uuid,
        request: CreateMonthlyBalanceRequest,
    ) -> Result<MonthlyBalance, MonthlyBalanceError> {
        let balance = MonthlyBalance {
            id: Uuid::new_v4(),
            user_id,
            balance: request.balance,
            date: request.date,
            currency_code: request
                .currency_code
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            created_at: Utc::now(),
        };

        let created = self.repository.create(balance).await?;
        info!(balance_id = %created.id, user_id = %user_id, date = %created.date, "Monthly balance registered");
        Ok(created)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<MonthlyBalance>, MonthlyBalanceError> {
        Ok(self.repository.find_by_user(user_id, None).await?)
    }

    async fn list_page(
        &self,
        user_id: Uuid,
        page: PageQuery,
    ) -> Result<PaginatedMonthlyBalances, MonthlyBalanceError> {
        let total_count = self.repository.count_by_user(user_id).await?;
        let monthly_balances = self.repository.find_by_user(user_id, Some(page)).await?;

        Ok(PaginatedMonthlyBalances {
            monthly_balances,
            pagination: page.pagination(total_count),
        })
    }

    async fn delete(&self, user_id: Uuid, balance_id: Uuid) -> Result<(), MonthlyBalanceError> {
        let balance = self
            .repository
            .find_by_id(balance_id)
            .await?
            .ok_or(MonthlyBalanceError::BalanceNotFound)?;

        if balance.user_id != user_id {
            return Err(MonthlyBalanceError::Unauthorized);
        }

        self.repository.delete(balance_id).await?;
        info!(balance_id = %balance_id, user_id = %user_id, "Monthly balance deleted");
        Ok(())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<DeleteResult, MonthlyBalanceError> {
        let deleted_count = self.repository.delete_by_user(user_id).await?;
        info!(user_id = %user_id, deleted_count, "Monthly balances deleted");
        Ok(DeleteResult { deleted_count })
    }
}
