use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::category::{
    CategoryDefinition, ExpenseCategoryResponse, find_duplicate_keys,
};
use crate::repositories::RepositoryError;
use crate::repositories::taxonomy_repository::{TaxonomyRepository, Upserted};

/// Upper bound for a single upsert when no other value is configured
pub const DEFAULT_UPSERT_TIMEOUT: Duration = Duration::from_secs(5);

/// Taxonomy synchronization errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Definition conflict on key {key}: {message}")]
    DefinitionConflict { key: String, message: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Upsert of {key} timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    #[error("Synchronization task failed: {0}")]
    TaskFailed(String),
}

impl SyncError {
    fn from_repository(key: &str, err: RepositoryError) -> Self {
        match err {
            RepositoryError::ConstraintViolation(message) => SyncError::DefinitionConflict {
                key: key.to_string(),
                message,
            },
            other => SyncError::StoreUnavailable(other.to_string()),
        }
    }
}

/// A category whose pipeline did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySyncFailure {
    pub immutable_key: String,
    pub error: SyncError,
}

/// Outcome of one synchronization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub categories_synced: usize,
    pub subcategories_synced: usize,
    /// Categories and subcategories inserted by this run
    pub records_created: usize,
    pub failures: Vec<CategorySyncFailure>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Taxonomy service errors
#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    #[error("Category not found")]
    CategoryNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for TaxonomyError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => TaxonomyError::CategoryNotFound,
            other => TaxonomyError::DatabaseError(other.to_string()),
        }
    }
}

/// Trait defining taxonomy service operations
#[async_trait]
pub trait TaxonomyService: Send + Sync {
    /// Reconcile `definitions` into the store. Never deletes records.
    ///
    /// Returns an error only when the lookup indexes cannot be created; per-category
    /// failures are collected in the report.
    async fn synchronize(
        &self,
        definitions: &[CategoryDefinition],
    ) -> Result<SyncReport, SyncError>;

    /// All categories sorted by name, with their subcategories resolved
    async fn get_categories(&self) -> Result<Vec<ExpenseCategoryResponse>, TaxonomyError>;

    /// One category with its subcategories resolved
    async fn get_category(&self, id: Uuid) -> Result<ExpenseCategoryResponse, TaxonomyError>;
}

/// Implementation of TaxonomyService
pub struct TaxonomyServiceImpl {
    taxonomy_repository: Arc<dyn TaxonomyRepository>,
    upsert_timeout: Duration,
}

impl TaxonomyServiceImpl {
    pub fn new(taxonomy_repository: Arc<dyn TaxonomyRepository>) -> Self {
        Self {
            taxonomy_repository,
            upsert_timeout: DEFAULT_UPSERT_TIMEOUT,
        }
    }

    pub fn with_upsert_timeout(mut self, upsert_timeout: Duration) -> Self {
        self.upsert_timeout = upsert_timeout;
        self
    }
}

/// Counters of one successful category pipeline
struct CategorySyncOutcome {
    subcategories: usize,
    created: usize,
}

async fn bounded<F>(key: &str, timeout: Duration, upsert: F) -> Result<Upserted, SyncError>
where
    F: Future<Output = Result<Upserted, RepositoryError>>,
{
    match tokio::time::timeout(timeout, upsert).await {
        Ok(result) => result.map_err(|e| SyncError::from_repository(key, e)),
        Err(_) => Err(SyncError::Timeout {
            key: key.to_string(),
            timeout,
        }),
    }
}

/// Subcategories first, then the category with the collected subcategory ids
async fn sync_category(
    repository: Arc<dyn TaxonomyRepository>,
    definition: CategoryDefinition,
    timeout: Duration,
) -> Result<CategorySyncOutcome, SyncError> {
    let mut subcategory_ids = Vec::with_capacity(definition.subcategories.len());
    let mut created = 0;

    for subcategory in &definition.subcategories {
        let upserted = bounded(
            &subcategory.immutable_key,
            timeout,
            repository.upsert_subcategory(subcategory),
        )
        .await?;

        if upserted.created {
            created += 1;
        }
        subcategory_ids.push(upserted.id);
    }

    let upserted = bounded(
        &definition.immutable_key,
        timeout,
        repository.upsert_category(&definition, &subcategory_ids),
    )
    .await?;

    if upserted.created {
        created += 1;
    }

    debug!(
        category = %definition.name,
        key = %definition.immutable_key,
        subcategories = subcategory_ids.len(),
        created = upserted.created,
        "Category synchronized"
    );

    Ok(CategorySyncOutcome {
        subcategories: subcategory_ids.len(),
        created,
    })
}

/// First key of `definition` (its own or a subcategory's) found in `duplicates`
fn conflicting_key<'a>(
    definition: &'a CategoryDefinition,
    duplicates: &HashSet<String>,
) -> Option<&'a str> {
    std::iter::once(definition.immutable_key.as_str())
        .chain(definition.subcategories.iter().map(|s| s.immutable_key.as_str()))
        .find(|key| duplicates.contains(*key))
}

#[async_trait]
impl TaxonomyService for TaxonomyServiceImpl {
    async fn synchronize(
        &self,
        definitions: &[CategoryDefinition],
    ) -> Result<SyncReport, SyncError> {
        self.taxonomy_repository
            .ensure_indexes()
            .await
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;

        let mut report = SyncReport::default();

        // A reused key would let two pipelines overwrite the same record
        let duplicates: HashSet<String> = find_duplicate_keys(definitions).into_iter().collect();
        let mut accepted = Vec::with_capacity(definitions.len());
        for definition in definitions {
            match conflicting_key(definition, &duplicates) {
                Some(key) => {
                    warn!(category = %definition.immutable_key, key, "Taxonomy definition reuses an immutable key");
                    report.failures.push(CategorySyncFailure {
                        immutable_key: definition.immutable_key.clone(),
                        error: SyncError::DefinitionConflict {
                            key: key.to_string(),
                            message: "immutable key is defined more than once".to_string(),
                        },
                    });
                }
                None => accepted.push(definition.clone()),
            }
        }

        let mut pipelines = JoinSet::new();
        let mut keys_by_task = HashMap::new();
        for definition in accepted {
            let repository = Arc::clone(&self.taxonomy_repository);
            let timeout = self.upsert_timeout;
            let key = definition.immutable_key.clone();
            let handle = pipelines.spawn(sync_category(repository, definition, timeout));
            keys_by_task.insert(handle.id(), key);
        }

        while let Some(joined) = pipelines.join_next_with_id().await {
            let (task_id, result) = match joined {
                Ok((task_id, result)) => (task_id, result),
                Err(join_error) => {
                    let task_id = join_error.id();
                    (task_id, Err(SyncError::TaskFailed(join_error.to_string())))
                }
            };
            let immutable_key = keys_by_task.remove(&task_id).unwrap_or_default();

            match result {
                Ok(outcome) => {
                    report.categories_synced += 1;
                    report.subcategories_synced += outcome.subcategories;
                    report.records_created += outcome.created;
                }
                Err(error) => {
                    error!(key = %immutable_key, error = %error, "Category synchronization failed");
                    report.failures.push(CategorySyncFailure {
                        immutable_key,
                        error,
                    });
                }
            }
        }

        info!(
            categories = report.categories_synced,
            subcategories = report.subcategories_synced,
            created = report.records_created,
            failed = report.failures.len(),
            "Taxonomy synchronization finished"
        );

        Ok(report)
    }

    async fn get_categories(&self) -> Result<Vec<ExpenseCategoryResponse>, TaxonomyError> {
        let categories = self.taxonomy_repository.find_all_categories().await?;

        let referenced: Vec<Uuid> = categories
            .iter()
            .flat_map(|c| c.subcategory_ids.iter().copied())
            .collect();
        let subcategories = self
            .taxonomy_repository
            .find_subcategories_by_ids(&referenced)
            .await?;

        Ok(categories
            .into_iter()
            .map(|category| ExpenseCategoryResponse::from_parts(category, &subcategories))
            .collect())
    }

    async fn get_category(&self, id: Uuid) -> Result<ExpenseCategoryResponse, TaxonomyError> {
        let category = self
            .taxonomy_repository
            .find_category_by_id(id)
            .await?
            .ok_or(TaxonomyError::CategoryNotFound)?;

        let subcategories = self
            .taxonomy_repository
            .find_subcategories_by_ids(&category.subcategory_ids)
            .await?;

        Ok(ExpenseCategoryResponse::from_parts(category, &subcategories))
    }
}
