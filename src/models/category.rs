use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of money flow a category represents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Expense,
    Investment,
    Saving,
}

impl CategoryType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            CategoryType::Expense => "expense",
            CategoryType::Investment => "investment",
            CategoryType::Saving => "saving",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "expense" => Some(CategoryType::Expense),
            "investment" => Some(CategoryType::Investment),
            "saving" => Some(CategoryType::Saving),
            _ => None,
        }
    }
}

/// Source-controlled definition of a subcategory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcategoryDefinition {
    pub name: String,
    /// Reconciliation key. Never changes once published.
    pub immutable_key: String,
    pub emojis: Vec<String>,
    pub category_type: CategoryType,
}

/// Source-controlled definition of a category and its subcategories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDefinition {
    pub name: String,
    /// Reconciliation key. Never changes once published.
    pub immutable_key: String,
    pub emojis: Vec<String>,
    pub category_type: CategoryType,
    pub subcategories: Vec<SubcategoryDefinition>,
}

impl SubcategoryDefinition {
    pub fn new(name: &str, immutable_key: &str, emojis: &[&str], category_type: CategoryType) -> Self {
        Self {
            name: name.to_string(),
            immutable_key: immutable_key.to_string(),
            emojis: emojis.iter().map(|e| e.to_string()).collect(),
            category_type,
        }
    }
}

impl CategoryDefinition {
    pub fn new(
        name: &str,
        immutable_key: &str,
        emojis: &[&str],
        category_type: CategoryType,
        subcategories: Vec<SubcategoryDefinition>,
    ) -> Self {
        Self {
            name: name.to_string(),
            immutable_key: immutable_key.to_string(),
            emojis: emojis.iter().map(|e| e.to_string()).collect(),
            category_type,
            subcategories,
        }
    }
}

/// Returns every immutable key that appears more than once across categories and
/// subcategories, in order of first repetition.
pub fn find_duplicate_keys(definitions: &[CategoryDefinition]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();

    let keys = definitions.iter().flat_map(|category| {
        std::iter::once(category.immutable_key.as_str()).chain(
            category
                .subcategories
                .iter()
                .map(|subcategory| subcategory.immutable_key.as_str()),
        )
    });

    for key in keys {
        if !seen.insert(key) && !duplicates.iter().any(|d: &String| d == key) {
            duplicates.push(key.to_string());
        }
    }

    duplicates
}

/// Persisted expense subcategory
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ExpenseSubcategory {
    pub id: Uuid,
    #[serde(skip_serializing, default)]
    pub immutable_key: String,
    pub name: String,
    pub emojis: Vec<String>,
    pub category_type: CategoryType,
}

/// Persisted expense category. Subcategories are referenced by id, in definition order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ExpenseCategory {
    pub id: Uuid,
    #[serde(skip_serializing, default)]
    pub immutable_key: String,
    pub name: String,
    pub emojis: Vec<String>,
    pub category_type: CategoryType,
    pub subcategory_ids: Vec<Uuid>,
}

/// Category with its subcategories resolved, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpenseCategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub emojis: Vec<String>,
    pub category_type: CategoryType,
    pub subcategories: Vec<ExpenseSubcategory>,
}

impl ExpenseCategoryResponse {
    /// Joins a category with its subcategories, keeping the category's reference order.
    /// References to subcategories missing from `subcategories` are skipped.
    pub fn from_parts(category: ExpenseCategory, subcategories: &[ExpenseSubcategory]) -> Self {
        let resolved = category
            .subcategory_ids
            .iter()
            .filter_map(|id| subcategories.iter().find(|s| s.id == *id).cloned())
            .collect();

        Self {
            id: category.id,
            name: category.name,
            emojis: category.emojis,
            category_type: category.category_type,
            subcategories: resolved,
        }
    }
}
