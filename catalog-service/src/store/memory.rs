//! In-memory catalog backend

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{CatalogStore, CategoryStore, ProductFilter, ProductStore, StoreResult};
use crate::error::{StorageError, StorageOperation};
use crate::models::{Category, NewCategory, Product, Variant};
use crate::pagination::Pagination;

#[derive(Debug, Clone)]
struct ProductRecord {
    id: i64,
    code: String,
    price: Decimal,
    category_id: i64,
}

#[derive(Debug, Default)]
struct Tables {
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, ProductRecord>,
    variants: BTreeMap<i64, Variant>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn assemble(&self, record: &ProductRecord) -> StoreResult<Product> {
        let category = self
            .categories
            .get(&record.category_id)
            .cloned()
            .ok_or_else(|| {
                StorageError::query_failed(
                    StorageOperation::Query,
                    format!("product {} references missing category", record.code),
                )
                .add_context("products.category_id")
            })?;

        let variants = self
            .variants
            .values()
            .filter(|variant| variant.product_id == record.id)
            .cloned()
            .collect();

        Ok(Product {
            id: record.id,
            code: record.code.clone(),
            price: record.price,
            category,
            variants,
        })
    }
}

/// Catalog backend kept entirely in process memory
///
/// Rows are keyed by a single identity sequence shared by all tables, so
/// iteration order equals insertion order equals identity order.
/// Cloning is cheap; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryCatalogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a category, rejecting duplicate codes
    pub async fn insert_category(
        &self,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> StoreResult<Category> {
        self.create_category(NewCategory {
            code: code.into(),
            name: name.into(),
        })
        .await
    }

    /// Seed a product under an existing category
    pub async fn insert_product(
        &self,
        code: impl Into<String>,
        price: Decimal,
        category_id: i64,
    ) -> StoreResult<Product> {
        let code = code.into();
        let mut tables = self.tables.write().await;

        if !tables.categories.contains_key(&category_id) {
            return Err(StorageError::new(
                StorageOperation::Insert,
                crate::error::StorageErrorKind::ConstraintViolation,
                format!("category {} does not exist", category_id),
            ));
        }
        if tables.products.values().any(|p| p.code == code) {
            return Err(StorageError::unique_violation(
                StorageOperation::Insert,
                format!("product code {} already exists", code),
            )
            .add_context("products_code_key"));
        }

        let id = tables.next_id();
        let record = ProductRecord {
            id,
            code,
            price,
            category_id,
        };
        tables.products.insert(id, record.clone());
        tables.assemble(&record)
    }

    /// Seed a variant under an existing product
    pub async fn insert_variant(
        &self,
        product_id: i64,
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
    ) -> StoreResult<Variant> {
        let mut tables = self.tables.write().await;

        if !tables.products.contains_key(&product_id) {
            return Err(StorageError::new(
                StorageOperation::Insert,
                crate::error::StorageErrorKind::ConstraintViolation,
                format!("product {} does not exist", product_id),
            ));
        }

        let variant = Variant {
            id: tables.next_id(),
            product_id,
            sku: sku.into(),
            name: name.into(),
            price,
        };
        tables.variants.insert(variant.id, variant.clone());
        Ok(variant)
    }

    /// Change a product's base price
    pub async fn set_product_price(&self, product_id: i64, price: Decimal) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.products.get_mut(&product_id) {
            Some(record) => {
                record.price = price;
                Ok(())
            }
            None => Err(StorageError::query_failed(
                StorageOperation::Query,
                format!("product {} does not exist", product_id),
            )),
        }
    }
}

impl ProductStore for InMemoryCatalogStore {
    async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> StoreResult<Vec<Product>> {
        let tables = self.tables.read().await;

        let mut matching = Vec::new();
        for record in tables.products.values() {
            let product = tables.assemble(record)?;
            if filter.matches(&product) {
                matching.push(product);
            }
        }

        let window = pagination.window(matching.len());
        Ok(matching.drain(window).collect())
    }

    async fn find_product_by_code(&self, code: &str) -> StoreResult<Option<Product>> {
        let tables = self.tables.read().await;
        tables
            .products
            .values()
            .find(|record| record.code == code)
            .map(|record| tables.assemble(record))
            .transpose()
    }

    async fn count_products(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.products.len() as i64)
    }
}

impl CategoryStore for InMemoryCatalogStore {
    async fn create_category(&self, data: NewCategory) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;

        if tables.categories.values().any(|c| c.code == data.code) {
            return Err(StorageError::unique_violation(
                StorageOperation::Insert,
                format!("category code {} already exists", data.code),
            )
            .add_context("categories_code_key"));
        }

        let category = Category {
            id: tables.next_id(),
            code: data.code,
            name: data.name,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn find_category_by_code(&self, code: &str) -> StoreResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| c.code == code).cloned())
    }

    async fn list_categories(&self, pagination: Pagination) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let window = pagination.window(tables.categories.len());
        Ok(tables
            .categories
            .values()
            .skip(window.start)
            .take(window.len())
            .cloned()
            .collect())
    }

    async fn count_categories(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.categories.len() as i64)
    }
}

impl CatalogStore for InMemoryCatalogStore {}
