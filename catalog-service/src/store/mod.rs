//! Storage contracts consumed by the query engines
//!
//! The engines never talk to a database directly. They depend on these traits,
//! which a backend implements with whatever fetch strategy suits it, as long as
//! every returned [`Product`] arrives with its category and variants attached.
//!
//! - [`ProductStore`]: filtered product listing, lookup by code, row count
//! - [`CategoryStore`]: category insert, lookup by code, listing, row count
//! - [`CatalogStore`]: both, plus teardown
//!
//! Backends:
//!
//! - [`InMemoryCatalogStore`]: lock-guarded maps, used by tests and embedded setups
//! - [`PgCatalogStore`]: PostgreSQL via `sqlx` (feature `database`)

use std::future::Future;

use rust_decimal::Decimal;

use crate::error::{Error, Result, StorageError};
use crate::models::{Category, NewCategory, Product};
use crate::pagination::Pagination;

mod memory;
#[cfg(feature = "database")]
mod postgres;

pub use memory::InMemoryCatalogStore;
#[cfg(feature = "database")]
pub use postgres::PgCatalogStore;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StorageError>;

/// Optional product filters, combined with logical AND
///
/// A `None` field means the filter is not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    category: Option<String>,
    max_price: Option<Decimal>,
}

impl ProductFilter {
    /// Filter that matches every product
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to products whose category name equals `name` exactly
    ///
    /// An empty name leaves the category filter unset.
    #[must_use]
    pub fn with_category(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.category = (!name.is_empty()).then_some(name);
        self
    }

    /// Restrict to products priced at or below `ceiling`
    #[must_use]
    pub fn with_max_price(mut self, ceiling: Decimal) -> Self {
        self.max_price = Some(ceiling);
        self
    }

    /// Build from raw `category` and `priceLessThen` query values
    pub fn from_query(category: Option<&str>, price_less_than: Option<&str>) -> Result<Self> {
        let mut filter = Self::new();
        if let Some(name) = category {
            filter = filter.with_category(name);
        }
        if let Some(raw) = price_less_than.filter(|raw| !raw.is_empty()) {
            let ceiling = parse_price(raw).ok_or_else(|| {
                Error::Validation("invalid priceLessThen parameter: must be a number".to_string())
            })?;
            filter = filter.with_max_price(ceiling);
        }
        Ok(filter)
    }

    /// Category name the listing is restricted to
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Inclusive price ceiling
    pub fn max_price(&self) -> Option<Decimal> {
        self.max_price
    }

    /// Whether `product` passes every configured filter
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|name| product.category.name == name);
        let price_ok = self.max_price.is_none_or(|ceiling| product.price <= ceiling);
        category_ok && price_ok
    }
}

/// Plain decimal notation only: optional minus sign, digits, optional fraction
fn parse_price(raw: &str) -> Option<Decimal> {
    let unsigned = raw.strip_prefix('-').unwrap_or(raw);
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());

    let plain = match unsigned.split_once('.') {
        Some((whole, fraction)) => digits(whole) && digits(fraction),
        None => digits(unsigned),
    };
    if !plain {
        return None;
    }
    Decimal::from_str_exact(raw).ok()
}

/// Read access to products
pub trait ProductStore: Send + Sync {
    /// Products matching `filter`, ordered by identity ascending, sliced by `pagination`
    fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> impl Future<Output = StoreResult<Vec<Product>>> + Send;

    /// Product with exactly this code, `None` when absent
    fn find_product_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = StoreResult<Option<Product>>> + Send;

    /// Unfiltered number of products
    fn count_products(&self) -> impl Future<Output = StoreResult<i64>> + Send;
}

/// Read and insert access to categories
pub trait CategoryStore: Send + Sync {
    /// Insert a category and return it with its generated identity
    fn create_category(
        &self,
        data: NewCategory,
    ) -> impl Future<Output = StoreResult<Category>> + Send;

    /// Category with exactly this code, `None` when absent
    fn find_category_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = StoreResult<Option<Category>>> + Send;

    /// Categories ordered by identity ascending, sliced by `pagination`
    fn list_categories(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = StoreResult<Vec<Category>>> + Send;

    /// Unfiltered number of categories
    fn count_categories(&self) -> impl Future<Output = StoreResult<i64>> + Send;
}

/// Full catalog backend
pub trait CatalogStore: ProductStore + CategoryStore + 'static {
    /// Release backend resources
    fn close(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}
