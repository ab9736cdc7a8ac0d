use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::category::{
    CategoryDefinition, CategoryType, ExpenseCategory, ExpenseSubcategory, SubcategoryDefinition,
};
use crate::repositories::RepositoryError;

/// Result of an upsert keyed by immutable key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    /// Store identity of the record, stable across upserts
    pub id: Uuid,
    /// True when the record did not exist before this call
    pub created: bool,
}

/// Trait defining expense taxonomy storage operations.
///
/// Records are looked up by immutable key and never deleted through this trait.
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    /// Create the unique lookup indexes on both immutable key columns. Idempotent.
    async fn ensure_indexes(&self) -> Result<(), RepositoryError>;

    /// Insert or update a subcategory by its immutable key
    async fn upsert_subcategory(
        &self,
        definition: &SubcategoryDefinition,
    ) -> Result<Upserted, RepositoryError>;

    /// Insert or update a category by its immutable key. `subcategory_ids` replaces the
    /// stored reference list.
    async fn upsert_category(
        &self,
        definition: &CategoryDefinition,
        subcategory_ids: &[Uuid],
    ) -> Result<Upserted, RepositoryError>;

    /// All categories sorted by name
    async fn find_all_categories(&self) -> Result<Vec<ExpenseCategory>, RepositoryError>;

    /// Find a category by ID
    async fn find_category_by_id(&self, id: Uuid)
        -> Result<Option<ExpenseCategory>, RepositoryError>;

    /// Find a category by immutable key
    async fn find_category_by_key(
        &self,
        immutable_key: &str,
    ) -> Result<Option<ExpenseCategory>, RepositoryError>;

    /// Find a subcategory by immutable key
    async fn find_subcategory_by_key(
        &self,
        immutable_key: &str,
    ) -> Result<Option<ExpenseSubcategory>, RepositoryError>;

    /// Subcategories with the given IDs, in no particular order. Unknown IDs are skipped.
    async fn find_subcategories_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<ExpenseSubcategory>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    immutable_key: String,
    name: String,
    emojis: Vec<String>,
    category_type: String,
    subcategory_ids: Vec<Uuid>,
}

impl TryFrom<CategoryRow> for ExpenseCategory {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(ExpenseCategory {
            id: row.id,
            category_type: parse_category_type(&row.category_type)?,
            immutable_key: row.immutable_key,
            name: row.name,
            emojis: row.emojis,
            subcategory_ids: row.subcategory_ids,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubcategoryRow {
    id: Uuid,
    immutable_key: String,
    name: String,
    emojis: Vec<String>,
    category_type: String,
}

impl TryFrom<SubcategoryRow> for ExpenseSubcategory {
    type Error = RepositoryError;

    fn try_from(row: SubcategoryRow) -> Result<Self, Self::Error> {
        Ok(ExpenseSubcategory {
            id: row.id,
            category_type: parse_category_type(&row.category_type)?,
            immutable_key: row.immutable_key,
            name: row.name,
            emojis: row.emojis,
        })
    }
}

fn parse_category_type(value: &str) -> Result<CategoryType, RepositoryError> {
    CategoryType::from_db_str(value).ok_or_else(|| {
        RepositoryError::DatabaseError(format!("Unknown category type '{}'", value))
    })
}

/// PostgreSQL implementation of TaxonomyRepository
pub struct PostgresTaxonomyRepository {
    pool: PgPool,
}

impl PostgresTaxonomyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaxonomyRepository for PostgresTaxonomyRepository {
    async fn ensure_indexes(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS uq_expense_subcategories_immutable_key
            ON expense_subcategories (immutable_key)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS uq_expense_categories_immutable_key
            ON expense_categories (immutable_key)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_subcategory(
        &self,
        definition: &SubcategoryDefinition,
    ) -> Result<Upserted, RepositoryError> {
        // xmax is 0 only for freshly inserted tuples
        let (id, created): (Uuid, bool) = sqlx::query_as(
            r#"
            INSERT INTO expense_subcategories (immutable_key, name, emojis, category_type)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (immutable_key) DO UPDATE
            SET name = EXCLUDED.name,
                emojis = EXCLUDED.emojis,
                category_type = EXCLUDED.category_type
            RETURNING id, (xmax = 0) AS created
            "#,
        )
        .bind(&definition.immutable_key)
        .bind(&definition.name)
        .bind(&definition.emojis)
        .bind(definition.category_type.as_db_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(Upserted { id, created })
    }

    async fn upsert_category(
        &self,
        definition: &CategoryDefinition,
        subcategory_ids: &[Uuid],
    ) -> Result<Upserted, RepositoryError> {
        let (id, created): (Uuid, bool) = sqlx::query_as(
            r#"
            INSERT INTO expense_categories
                (immutable_key, name, emojis, category_type, subcategory_ids)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (immutable_key) DO UPDATE
            SET name = EXCLUDED.name,
                emojis = EXCLUDED.emojis,
                category_type = EXCLUDED.category_type,
                subcategory_ids = EXCLUDED.subcategory_ids
            RETURNING id, (xmax = 0) AS created
            "#,
        )
        .bind(&definition.immutable_key)
        .bind(&definition.name)
        .bind(&definition.emojis)
        .bind(definition.category_type.as_db_str())
        .bind(subcategory_ids)
        .fetch_one(&self.pool)
        .await?;

        Ok(Upserted { id, created })
    }

    async fn find_all_categories(&self) -> Result<Vec<ExpenseCategory>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, immutable_key, name, emojis, category_type, subcategory_ids
            FROM expense_categories
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ExpenseCategory::try_from).collect()
    }

    async fn find_category_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<ExpenseCategory>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, immutable_key, name, emojis, category_type, subcategory_ids
            FROM expense_categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExpenseCategory::try_from).transpose()
    }

    async fn find_category_by_key(
        &self,
        immutable_key: &str,
    ) -> Result<Option<ExpenseCategory>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, immutable_key, name, emojis, category_type, subcategory_ids
            FROM expense_categories
            WHERE immutable_key = $1
            "#,
        )
        .bind(immutable_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExpenseCategory::try_from).transpose()
    }

    async fn find_subcategory_by_key(
        &self,
        immutable_key: &str,
    ) -> Result<Option<ExpenseSubcategory>, RepositoryError> {
        let row = sqlx::query_as::<_, SubcategoryRow>(
            r#"
            SELECT id, immutable_key, name, emojis, category_type
            FROM expense_subcategories
            WHERE immutable_key = $1
            "#,
        )
        .bind(immutable_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExpenseSubcategory::try_from).transpose()
    }

    async fn find_subcategories_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<ExpenseSubcategory>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, SubcategoryRow>(
            r#"
            SELECT id, immutable_key, name, emojis, category_type
            FROM expense_subcategories
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ExpenseSubcategory::try_from).collect()
    }
}
