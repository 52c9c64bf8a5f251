//! Category creation, listing, and cached totals

use std::sync::Arc;

use crate::cache::{CountCache, CATEGORY_COUNT_KEY, COUNT_TTL};
use crate::error::{Error, Result};
use crate::models::{Category, NewCategory};
use crate::pagination::Pagination;
use crate::store::CategoryStore;
use crate::views::{CategoryListing, CategoryView};

const CATEGORY_EXISTS: &str = "category already exists";
const MISSING_FIELDS: &str = "invalid payload, missing required fields";

/// Queries and inserts over categories
#[derive(Debug)]
pub struct CategoryQueryEngine<S> {
    store: Arc<S>,
    counts: CountCache,
}

impl<S> Clone for CategoryQueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            counts: self.counts.clone(),
        }
    }
}

impl<S: CategoryStore> CategoryQueryEngine<S> {
    /// Create an engine over `store`, caching totals in `counts`
    pub fn new(store: Arc<S>, counts: CountCache) -> Self {
        Self { store, counts }
    }

    /// Create a category from untrimmed input
    ///
    /// Code and name are trimmed and must not be empty. A code that is already
    /// taken yields [`Error::Conflict`], whether seen by the lookup or by the
    /// insert itself. The cached total is not invalidated, so it may lag by up
    /// to one TTL.
    pub async fn create(&self, code: &str, name: &str) -> Result<Category> {
        let code = code.trim();
        let name = name.trim();

        if code.is_empty() || name.is_empty() {
            return Err(Error::Validation(MISSING_FIELDS.to_string()));
        }

        if self.store.find_category_by_code(code).await?.is_some() {
            tracing::debug!(code, "Rejected duplicate category code");
            return Err(Error::Conflict(CATEGORY_EXISTS.to_string()));
        }

        let category = self
            .store
            .create_category(NewCategory {
                code: code.to_string(),
                name: name.to_string(),
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    Error::Conflict(CATEGORY_EXISTS.to_string())
                } else {
                    Error::Storage(e)
                }
            })?;

        tracing::info!(id = category.id, code = %category.code, "Category created");
        Ok(category)
    }

    /// Categories ordered by identity, sliced by `pagination`
    pub async fn list_categories(&self, pagination: Pagination) -> Result<Vec<Category>> {
        Ok(self.store.list_categories(pagination).await?)
    }

    /// Total number of categories, served from cache when fresh
    pub async fn count(&self) -> Result<i64> {
        self.counts
            .get_or_compute(CATEGORY_COUNT_KEY, COUNT_TTL, || self.store.count_categories())
            .await
            .map_err(Error::from)
    }

    /// A page of categories together with the total
    pub async fn listing(&self, pagination: Pagination) -> Result<CategoryListing> {
        let categories = self.list_categories(pagination).await?;
        let total = self.count().await?;
        Ok(CategoryListing {
            total,
            categories: categories.iter().map(CategoryView::from).collect(),
        })
    }
}
