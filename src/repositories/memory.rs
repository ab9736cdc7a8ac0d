//! In-memory repository implementations.
//!
//! They keep the observable behavior of the PostgreSQL repositories (upsert by immutable
//! key, stable identities, insertion order) and back unit and API tests without a database.
//! Built only for tests and with the `test-support` feature.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use crate::models::category::{
    CategoryDefinition, ExpenseCategory, ExpenseSubcategory, SubcategoryDefinition,
};
use crate::models::expense::{Expense, ExpenseFilters};
use crate::models::filters::PageQuery;
use crate::models::monthly_balance::MonthlyBalance;
use crate::models::suggestion::{DayOfMonth, RecurringExpenseSuggestion};
use crate::models::user::{CreateUserRequest, DEFAULT_USER_CURRENCY, User};
use crate::repositories::RepositoryError;
use crate::repositories::expense_repository::ExpenseRepository;
use crate::repositories::monthly_balance_repository::MonthlyBalanceRepository;
use crate::repositories::suggestion_repository::SuggestionRepository;
use crate::repositories::taxonomy_repository::{TaxonomyRepository, Upserted};
use crate::repositories::user_repository::UserRepository;
use crate::services::suggestion_matcher::filter_suggestions_for_day;

/// In-memory UserRepository
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a user as administrator
    pub fn grant_admin(&self, user_id: Uuid) {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.is_admin = true;
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(
        &self,
        user: CreateUserRequest,
        password_hash: String,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let email = user.email.to_lowercase();

        if users.iter().any(|u| u.email == email) {
            return Err(RepositoryError::ConstraintViolation(
                "Email already exists".to_string(),
            ));
        }

        let new_user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email,
            password_hash,
            default_currency: user
                .default_currency
                .unwrap_or_else(|| DEFAULT_USER_CURRENCY.to_string()),
            is_admin: false,
            created_at: Utc::now(),
        };

        users.push(new_user.clone());
        Ok(new_user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let email = email.to_lowercase();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.users.lock().unwrap_or_else(PoisonError::into_inner).len() as u64)
    }

    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner).clone();
        // Stable sort keeps registration order within each group
        users.sort_by_key(|u| !u.is_admin);
        Ok(users)
    }
}

/// In-memory TaxonomyRepository with failure injection
#[derive(Default)]
pub struct InMemoryTaxonomyRepository {
    categories: Mutex<Vec<ExpenseCategory>>,
    subcategories: Mutex<Vec<ExpenseSubcategory>>,
    indexes_ready: Mutex<bool>,
    failing_keys: Mutex<HashSet<String>>,
    panicking_keys: Mutex<HashSet<String>>,
    unavailable: bool,
    upsert_delay: Option<Duration>,
}

impl InMemoryTaxonomyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as if the store were unreachable
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Every upsert sleeps for `delay` before touching the data
    pub fn with_upsert_delay(delay: Duration) -> Self {
        Self {
            upsert_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Upserts of `immutable_key` fail with a constraint violation
    pub fn fail_on_key(&self, immutable_key: &str) {
        self.failing_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(immutable_key.to_string());
    }

    /// Upserts of `immutable_key` panic, taking their task down
    pub fn panic_on_key(&self, immutable_key: &str) {
        self.panicking_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(immutable_key.to_string());
    }

    /// Snapshot of the stored categories, in insertion order
    pub fn categories(&self) -> Vec<ExpenseCategory> {
        self.categories.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Snapshot of the stored subcategories, in insertion order
    pub fn subcategories(&self) -> Vec<ExpenseSubcategory> {
        self.subcategories.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn before_upsert(&self, immutable_key: &str) -> Result<(), RepositoryError> {
        if let Some(delay) = self.upsert_delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(RepositoryError::DatabaseError(
                "Connection refused".to_string(),
            ));
        }
        if !*self.indexes_ready.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(RepositoryError::DatabaseError(
                "No unique index on immutable_key".to_string(),
            ));
        }
        if self
            .panicking_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(immutable_key)
        {
            panic!("upsert of {} crashed", immutable_key);
        }
        if self.failing_keys.lock().unwrap_or_else(PoisonError::into_inner).contains(immutable_key) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "duplicate key value violates unique constraint on immutable_key ({})",
                immutable_key
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TaxonomyRepository for InMemoryTaxonomyRepository {
    async fn ensure_indexes(&self) -> Result<(), RepositoryError> {
        if self.unavailable {
            return Err(RepositoryError::DatabaseError(
                "Connection refused".to_string(),
            ));
        }
        *self.indexes_ready.lock().unwrap_or_else(PoisonError::into_inner) = true;
        Ok(())
    }

    async fn upsert_subcategory(
        &self,
        definition: &SubcategoryDefinition,
    ) -> Result<Upserted, RepositoryError> {
        self.before_upsert(&definition.immutable_key).await?;

        let mut subcategories = self.subcategories.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = subcategories
            .iter_mut()
            .find(|s| s.immutable_key == definition.immutable_key)
        {
            existing.name = definition.name.clone();
            existing.emojis = definition.emojis.clone();
            existing.category_type = definition.category_type;
            return Ok(Upserted {
                id: existing.id,
                created: false,
            });
        }

        let id = Uuid::new_v4();
        subcategories.push(ExpenseSubcategory {
            id,
            immutable_key: definition.immutable_key.clone(),
            name: definition.name.clone(),
            emojis: definition.emojis.clone(),
            category_type: definition.category_type,
        });
        Ok(Upserted { id, created: true })
    }

    async fn upsert_category(
        &self,
        definition: &CategoryDefinition,
        subcategory_ids: &[Uuid],
    ) -> Result<Upserted, RepositoryError> {
        self.before_upsert(&definition.immutable_key).await?;

        let mut categories = self.categories.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = categories
            .iter_mut()
            .find(|c| c.immutable_key == definition.immutable_key)
        {
            existing.name = definition.name.clone();
            existing.emojis = definition.emojis.clone();
            existing.category_type = definition.category_type;
            existing.subcategory_ids = subcategory_ids.to_vec();
            return Ok(Upserted {
                id: existing.id,
                created: false,
            });
        }

        let id = Uuid::new_v4();
        categories.push(ExpenseCategory {
            id,
            immutable_key: definition.immutable_key.clone(),
            name: definition.name.clone(),
            emojis: definition.emojis.clone(),
            category_type: definition.category_type,
            subcategory_ids: subcategory_ids.to_vec(),
        });
        Ok(Upserted { id, created: true })
    }

    async fn find_all_categories(&self) -> Result<Vec<ExpenseCategory>, RepositoryError> {
        if self.unavailable {
            return Err(RepositoryError::DatabaseError(
                "Connection refused".to_string(),
            ));
        }
        let mut categories = self.categories();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ExpenseCategory>, RepositoryError> {
        let categories = self.categories.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_key(
        &self,
        immutable_key: &str,
    ) -> Result<Option<ExpenseCategory>, RepositoryError> {
        let categories = self.categories.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(categories
            .iter()
            .find(|c| c.immutable_key == immutable_key)
            .cloned())
    }

    async fn find_subcategory_by_key(
        &self,
        immutable_key: &str,
    ) -> Result<Option<ExpenseSubcategory>, RepositoryError> {
        let subcategories = self.subcategories.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(subcategories
            .iter()
            .find(|s| s.immutable_key == immutable_key)
            .cloned())
    }

    async fn find_subcategories_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<ExpenseSubcategory>, RepositoryError> {
        let subcategories = self.subcategories.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(subcategories
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }
}

/// In-memory SuggestionRepository. Day lookups use the in-process matcher.
#[derive(Default)]
pub struct InMemorySuggestionRepository {
    suggestions: Mutex<Vec<RecurringExpenseSuggestion>>,
    should_fail: bool,
}

impl InMemorySuggestionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            suggestions: Mutex::new(Vec::new()),
            should_fail: true,
        }
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Database connection failed".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SuggestionRepository for InMemorySuggestionRepository {
    async fn create(
        &self,
        suggestion: RecurringExpenseSuggestion,
    ) -> Result<RecurringExpenseSuggestion, RepositoryError> {
        self.check_available()?;

        let mut suggestions = self.suggestions.lock().unwrap_or_else(PoisonError::into_inner);
        if suggestions.iter().any(|s| s.id == suggestion.id) {
            return Err(RepositoryError::ConstraintViolation(
                "Suggestion already exists".to_string(),
            ));
        }
        suggestions.push(suggestion.clone());
        Ok(suggestion)
    }

    async fn update(
        &self,
        suggestion: RecurringExpenseSuggestion,
    ) -> Result<RecurringExpenseSuggestion, RepositoryError> {
        self.check_available()?;

        let mut suggestions = self.suggestions.lock().unwrap_or_else(PoisonError::into_inner);
        let existing = suggestions
            .iter_mut()
            .find(|s| s.id == suggestion.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = suggestion.clone();
        Ok(suggestion)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<RecurringExpenseSuggestion>, RepositoryError> {
        self.check_available()?;

        let suggestions = self.suggestions.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(suggestions.iter().find(|s| s.id == id).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RecurringExpenseSuggestion>, RepositoryError> {
        self.check_available()?;

        let suggestions = self.suggestions.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(suggestions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_active_for_day(
        &self,
        user_id: Uuid,
        day: DayOfMonth,
    ) -> Result<Vec<RecurringExpenseSuggestion>, RepositoryError> {
        let owned = self.find_by_user(user_id).await?;
        Ok(filter_suggestions_for_day(&owned, day))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.check_available()?;

        let mut suggestions = self.suggestions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = suggestions.len();
        suggestions.retain(|s| s.id != id);
        if suggestions.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// In-memory ExpenseRepository. Category types are read from the taxonomy repository.
pub struct InMemoryExpenseRepository {
    expenses: Mutex<Vec<Expense>>,
    taxonomy: Arc<InMemoryTaxonomyRepository>,
}

impl InMemoryExpenseRepository {
    pub fn new(taxonomy: Arc<InMemoryTaxonomyRepository>) -> Self {
        Self {
            expenses: Mutex::new(Vec::new()),
            taxonomy,
        }
    }

    fn matching(&self, user_id: Uuid, filters: &ExpenseFilters) -> Vec<Expense> {
        let categories = self.taxonomy.categories();
        let mut matching: Vec<Expense> = self
            .expenses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.user_id == user_id && filters.accepts(e))
            .filter(|e| {
                categories
                    .iter()
                    .find(|c| c.id == e.category_id)
                    .is_some_and(|c| filters.accepts_type(c.category_type))
            })
            .cloned()
            .collect();
        matching.sort_by_key(|e| (e.date, e.created_at));
        matching
    }
}

#[async_trait]
impl ExpenseRepository for InMemoryExpenseRepository {
    async fn create(&self, expense: Expense) -> Result<Expense, RepositoryError> {
        self.expenses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(expense.clone());
        Ok(expense)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError> {
        let expenses = self.expenses.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(expenses.iter().find(|e| e.id == id).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        filters: &ExpenseFilters,
        page: Option<PageQuery>,
    ) -> Result<Vec<Expense>, RepositoryError> {
        let matching = self.matching(user_id, filters);
        Ok(match page {
            Some(page) => paginate(matching, page),
            None => matching,
        })
    }

    async fn count_by_user(
        &self,
        user_id: Uuid,
        filters: &ExpenseFilters,
    ) -> Result<u64, RepositoryError> {
        Ok(self.matching(user_id, filters).len() as u64)
    }

    async fn sum_by_user(
        &self,
        user_id: Uuid,
        filters: &ExpenseFilters,
    ) -> Result<Decimal, RepositoryError> {
        Ok(self
            .matching(user_id, filters)
            .iter()
            .map(|e| e.quantity)
            .sum())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut expenses = self.expenses.lock().unwrap_or_else(PoisonError::into_inner);
        let before = expenses.len();
        expenses.retain(|e| e.id != id);
        if expenses.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let mut expenses = self.expenses.lock().unwrap_or_else(PoisonError::into_inner);
        let before = expenses.len();
        expenses.retain(|e| e.user_id != user_id);
        Ok((before - expenses.len()) as u64)
    }
}

/// In-memory MonthlyBalanceRepository
#[derive(Default)]
pub struct InMemoryMonthlyBalanceRepository {
    balances: Mutex<Vec<MonthlyBalance>>,
}

impl InMemoryMonthlyBalanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn owned_by(&self, user_id: Uuid) -> Vec<MonthlyBalance> {
        let mut owned: Vec<MonthlyBalance> = self
            .balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|b| (b.date, b.created_at));
        owned
    }
}

#[async_trait]
impl MonthlyBalanceRepository for InMemoryMonthlyBalanceRepository {
    async fn create(&self, balance: MonthlyBalance) -> Result<MonthlyBalance, RepositoryError> {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(balance.clone());
        Ok(balance)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MonthlyBalance>, RepositoryError> {
        let balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(balances.iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        page: Option<PageQuery>,
    ) -> Result<Vec<MonthlyBalance>, RepositoryError> {
        let owned = self.owned_by(user_id);
        Ok(match page {
            Some(page) => paginate(owned, page),
            None => owned,
        })
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(self.owned_by(user_id).len() as u64)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let before = balances.len();
        balances.retain(|b| b.id != id);
        if balances.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let before = balances.len();
        balances.retain(|b| b.user_id != user_id);
        Ok((before - balances.len()) as u64)
    }
}

fn paginate<T>(items: Vec<T>, page: PageQuery) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset().max(0) as usize)
        .take(page.page_size.max(0) as usize)
        .collect()
}
