use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::suggestion::{
    CreateSuggestionRequest, DEFAULT_CURRENCY, DayOfMonth, InvalidDayError,
    RecurringExpenseSuggestion, SuggestedExpense, SuggestedExpenseInput, UpdateSuggestionRequest,
};
use crate::repositories::RepositoryError;
use crate::repositories::suggestion_repository::SuggestionRepository;
use crate::repositories::taxonomy_repository::TaxonomyRepository;

/// Suggestion service errors
#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error(transparent)]
    InvalidDay(#[from] InvalidDayError),

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Subcategory does not belong to the category")]
    SubcategoryNotInCategory,

    #[error("Suggestion not found")]
    SuggestionNotFound,

    #[error("Unauthorized to access this suggestion")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for SuggestionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => SuggestionError::SuggestionNotFound,
            RepositoryError::DatabaseError(msg) => SuggestionError::DatabaseError(msg),
            RepositoryError::ConstraintViolation(msg) => SuggestionError::DatabaseError(msg),
        }
    }
}

/// Trait defining recurring expense suggestion operations
#[async_trait]
pub trait SuggestionService: Send + Sync {
    /// Register a new suggestion for a user
    async fn register(
        &self,
        user_id: Uuid,
        request: CreateSuggestionRequest,
    ) -> Result<RecurringExpenseSuggestion, SuggestionError>;

    /// All suggestions of a user, in creation order
    async fn list(&self, user_id: Uuid) -> Result<Vec<RecurringExpenseSuggestion>, SuggestionError>;

    /// Active suggestions of a user that apply on `day`, in creation order
    async fn find_for_day(
        &self,
        user_id: Uuid,
        day: DayOfMonth,
    ) -> Result<Vec<RecurringExpenseSuggestion>, SuggestionError>;

    /// Partially update a suggestion owned by the user
    async fn update(
        &self,
        user_id: Uuid,
        suggestion_id: Uuid,
        request: UpdateSuggestionRequest,
    ) -> Result<RecurringExpenseSuggestion, SuggestionError>;

    /// Delete a suggestion owned by the user
    async fn delete(&self, user_id: Uuid, suggestion_id: Uuid) -> Result<(), SuggestionError>;
}

/// Implementation of SuggestionService
pub struct SuggestionServiceImpl {
    suggestion_repository: Arc<dyn SuggestionRepository>,
    taxonomy_repository: Arc<dyn TaxonomyRepository>,
}

impl SuggestionServiceImpl {
    pub fn new(
        suggestion_repository: Arc<dyn SuggestionRepository>,
        taxonomy_repository: Arc<dyn TaxonomyRepository>,
    ) -> Self {
        Self {
            suggestion_repository,
            taxonomy_repository,
        }
    }

    /// Checks the category exists and, when given, that the subcategory is one of its
    /// references.
    async fn resolve_expense(
        &self,
        input: SuggestedExpenseInput,
    ) -> Result<SuggestedExpense, SuggestionError> {
        let category = self
            .taxonomy_repository
            .find_category_by_id(input.category_id)
            .await
            .map_err(|e| SuggestionError::DatabaseError(e.to_string()))?
            .ok_or(SuggestionError::CategoryNotFound)?;

        if let Some(subcategory_id) = input.subcategory_id {
            if !category.subcategory_ids.contains(&subcategory_id) {
                return Err(SuggestionError::SubcategoryNotInCategory);
            }
        }

        Ok(SuggestedExpense {
            category_id: category.id,
            subcategory_id: input.subcategory_id,
            quantity: input.quantity,
            currency_code: input
                .currency_code
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        })
    }

    /// Loads a suggestion and verifies the user owns it
    async fn find_owned(
        &self,
        user_id: Uuid,
        suggestion_id: Uuid,
    ) -> Result<RecurringExpenseSuggestion, SuggestionError> {
        let suggestion = self
            .suggestion_repository
            .find_by_id(suggestion_id)
            .await?
            .ok_or(SuggestionError::SuggestionNotFound)?;

        if suggestion.user_id != user_id {
            return Err(SuggestionError::Unauthorized);
        }

        Ok(suggestion)
    }
}

#[async_trait]
impl SuggestionService for SuggestionServiceImpl {
    async fn register(
        &self,
        user_id: Uuid,
        request: CreateSuggestionRequest,
    ) -> Result<RecurringExpenseSuggestion, SuggestionError> {
        let start_day = DayOfMonth::try_from(request.start_day)?;
        let end_day = DayOfMonth::try_from(request.end_day)?;
        let suggested_expense = self.resolve_expense(request.suggested_expense).await?;

        let now = Utc::now();
        let suggestion = RecurringExpenseSuggestion {
            id: Uuid::new_v4(),
            user_id,
            is_active: request.is_active.unwrap_or(true),
            start_day,
            end_day,
            suggested_expense,
            created_at: now,
            updated_at: now,
        };

        let created = self.suggestion_repository.create(suggestion).await?;
        info!(
            suggestion_id = %created.id,
            user_id = %user_id,
            start_day = %created.start_day,
            end_day = %created.end_day,
            "Recurring suggestion registered"
        );

        Ok(created)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<RecurringExpenseSuggestion>, SuggestionError> {
        Ok(self.suggestion_repository.find_by_user(user_id).await?)
    }

    async fn find_for_day(
        &self,
        user_id: Uuid,
        day: DayOfMonth,
    ) -> Result<Vec<RecurringExpenseSuggestion>, SuggestionError> {
        let suggestions = self
            .suggestion_repository
            .find_active_for_day(user_id, day)
            .await?;

        debug!(user_id = %user_id, day = %day, matches = suggestions.len(), "Suggestions for day");
        Ok(suggestions)
    }

    async fn update(
        &self,
        user_id: Uuid,
        suggestion_id: Uuid,
        request: UpdateSuggestionRequest,
    ) -> Result<RecurringExpenseSuggestion, SuggestionError> {
        let mut suggestion = self.find_owned(user_id, suggestion_id).await?;

        if let Some(start_day) = request.start_day {
            suggestion.start_day = DayOfMonth::try_from(start_day)?;
        }
        if let Some(end_day) = request.end_day {
            suggestion.end_day = DayOfMonth::try_from(end_day)?;
        }
        if let Some(is_active) = request.is_active {
            suggestion.is_active = is_active;
        }
        if let Some(input) = request.suggested_expense {
            suggestion.suggested_expense = self.resolve_expense(input).await?;
        }
        suggestion.updated_at = Utc::now();

        Ok(self.suggestion_repository.update(suggestion).await?)
    }

    async fn delete(&self, user_id: Uuid, suggestion_id: Uuid) -> Result<(), SuggestionError> {
        self.find_owned(user_id, suggestion_id).await?;
        self.suggestion_repository.delete(suggestion_id).await?;

        info!(suggestion_id = %suggestion_id, user_id = %user_id, "Recurring suggestion deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::{CategoryDefinition, CategoryType, SubcategoryDefinition};
    use crate::repositories::memory::{InMemorySuggestionRepository, InMemoryTaxonomyRepository};
    use rust_decimal::Decimal;

    struct Fixture {
        service: SuggestionServiceImpl,
        category_id: Uuid,
        subcategory_id: Uuid,
        other_category_id: Uuid,
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(InMemorySuggestionRepository::new())).await
    }

    async fn fixture_with(suggestions: Arc<InMemorySuggestionRepository>) -> Fixture {
        let taxonomy = Arc::new(InMemoryTaxonomyRepository::new());
        taxonomy.ensure_indexes().await.unwrap();

        let rent = SubcategoryDefinition::new("Rent", "16bce5eb5bd5bd23a4f5", &["🔑"], CategoryType::Expense);
        let subcategory_id = taxonomy.upsert_subcategory(&rent).await.unwrap().id;
        let home = CategoryDefinition::new(
            "Home",
            "4c1e5ccb3e58f37d8c1f",
            &["🏠"],
            CategoryType::Expense,
            vec![rent],
        );
        let category_id = taxonomy
            .upsert_category(&home, &[subcategory_id])
            .await
            .unwrap()
            .id;
        let travel = CategoryDefinition::new(
            "Travels & holidays",
            "c7f2653ce6672c5b1e52",
            &["🧳"],
            CategoryType::Expense,
            vec![],
        );
        let other_category_id = taxonomy.upsert_category(&travel, &[]).await.unwrap().id;

        Fixture {
            service: SuggestionServiceImpl::new(suggestions, taxonomy),
            category_id,
            subcategory_id,
            other_category_id,
        }
    }

    fn request(category_id: Uuid, start_day: i64, end_day: i64) -> CreateSuggestionRequest {
        CreateSuggestionRequest {
            is_active: None,
            start_day,
            end_day,
            suggested_expense: SuggestedExpenseInput {
                category_id,
                subcategory_id: None,
                quantity: Decimal::new(75000, 2),
                currency_code: None,
            },
        }
    }

    fn day(value: u8) -> DayOfMonth {
        DayOfMonth::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_register_applies_defaults() {
        let f = fixture().await;
        let user_id = Uuid::new_v4();

        let suggestion = f
            .service
            .register(user_id, request(f.category_id, 28, 5))
            .await
            .unwrap();

        assert_eq!(suggestion.user_id, user_id);
        assert!(suggestion.is_active);
        assert_eq!(suggestion.start_day.get(), 28);
        assert_eq!(suggestion.end_day.get(), 5);
        assert_eq!(suggestion.suggested_expense.currency_code, "EUR");
        assert_eq!(suggestion.suggested_expense.subcategory_id, None);
    }

    #[tokio::test]
    async fn test_register_with_subcategory() {
        let f = fixture().await;
        let mut req = request(f.category_id, 1, 1);
        req.suggested_expense.subcategory_id = Some(f.subcategory_id);

        let suggestion = f.service.register(Uuid::new_v4(), req).await.unwrap();

        assert_eq!(
            suggestion.suggested_expense.subcategory_id,
            Some(f.subcategory_id)
        );
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_day() {
        let f = fixture().await;

        let result = f
            .service
            .register(Uuid::new_v4(), request(f.category_id, 0, 5))
            .await;

        assert!(matches!(result, Err(SuggestionError::InvalidDay(InvalidDayError(0)))));
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_category() {
        let f = fixture().await;

        let result = f
            .service
            .register(Uuid::new_v4(), request(Uuid::new_v4(), 1, 5))
            .await;

        assert!(matches!(result, Err(SuggestionError::CategoryNotFound)));
    }

    #[tokio::test]
    async fn test_register_rejects_foreign_subcategory() {
        let f = fixture().await;
        let mut req = request(f.other_category_id, 1, 5);
        req.suggested_expense.subcategory_id = Some(f.subcategory_id);

        let result = f.service.register(Uuid::new_v4(), req).await;

        assert!(matches!(result, Err(SuggestionError::SubcategoryNotInCategory)));
    }

    #[tokio::test]
    async fn test_find_for_day_scopes_to_user_and_keeps_order() {
        let f = fixture().await;
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();

        let wrapping = f
            .service
            .register(user_id, request(f.category_id, 28, 5))
            .await
            .unwrap();
        f.service
            .register(user_id, request(f.category_id, 10, 15))
            .await
            .unwrap();
        let single = f
            .service
            .register(user_id, request(f.category_id, 2, 2))
            .await
            .unwrap();
        f.service
            .register(other_user, request(f.category_id, 1, 31))
            .await
            .unwrap();

        let matches = f.service.find_for_day(user_id, day(2)).await.unwrap();
        let ids: Vec<Uuid> = matches.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![wrapping.id, single.id]);

        let none = f.service.find_for_day(user_id, day(20)).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_find_for_day_skips_inactive() {
        let f = fixture().await;
        let user_id = Uuid::new_v4();
        let mut req = request(f.category_id, 1, 31);
        req.is_active = Some(false);
        f.service.register(user_id, req).await.unwrap();

        let matches = f.service.find_for_day(user_id, day(15)).await.unwrap();

        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_update_partial_fields() {
        let f = fixture().await;
        let user_id = Uuid::new_v4();
        let created = f
            .service
            .register(user_id, request(f.category_id, 28, 5))
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                user_id,
                created.id,
                UpdateSuggestionRequest {
                    is_active: Some(false),
                    end_day: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!updated.is_active);
        assert_eq!(updated.start_day.get(), 28);
        assert_eq!(updated.end_day.get(), 3);
        assert_eq!(updated.suggested_expense, created.suggested_expense);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_day() {
        let f = fixture().await;
        let user_id = Uuid::new_v4();
        let created = f
            .service
            .register(user_id, request(f.category_id, 1, 5))
            .await
            .unwrap();

        let result = f
            .service
            .update(
                user_id,
                created.id,
                UpdateSuggestionRequest {
                    start_day: Some(32),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(SuggestionError::InvalidDay(_))));
    }

    #[tokio::test]
    async fn test_update_other_users_suggestion_is_unauthorized() {
        let f = fixture().await;
        let created = f
            .service
            .register(Uuid::new_v4(), request(f.category_id, 1, 5))
            .await
            .unwrap();

        let result = f
            .service
            .update(Uuid::new_v4(), created.id, UpdateSuggestionRequest::default())
            .await;

        assert!(matches!(result, Err(SuggestionError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_update_missing_suggestion() {
        let f = fixture().await;

        let result = f
            .service
            .update(Uuid::new_v4(), Uuid::new_v4(), UpdateSuggestionRequest::default())
            .await;

        assert!(matches!(result, Err(SuggestionError::SuggestionNotFound)));
    }

    #[tokio::test]
    async fn test_delete_removes_suggestion() {
        let f = fixture().await;
        let user_id = Uuid::new_v4();
        let created = f
            .service
            .register(user_id, request(f.category_id, 1, 5))
            .await
            .unwrap();

        f.service.delete(user_id, created.id).await.unwrap();

        assert!(f.service.list(user_id).await.unwrap().is_empty());
        let again = f.service.delete(user_id, created.id).await;
        assert!(matches!(again, Err(SuggestionError::SuggestionNotFound)));
    }

    #[tokio::test]
    async fn test_delete_other_users_suggestion_is_unauthorized() {
        let f = fixture().await;
        let owner = Uuid::new_v4();
        let created = f
            .service
            .register(owner, request(f.category_id, 1, 5))
            .await
            .unwrap();

        let result = f.service.delete(Uuid::new_v4(), created.id).await;

        assert!(matches!(result, Err(SuggestionError::Unauthorized)));
        assert_eq!(f.service.list(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_database_error() {
        let f = fixture_with(Arc::new(InMemorySuggestionRepository::with_failure())).await;

        let result = f.service.list(Uuid::new_v4()).await;

        assert!(matches!(result, Err(SuggestionError::DatabaseError(_))));
    }
}
