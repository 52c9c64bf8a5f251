//! PostgreSQL catalog backend
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE categories (
//!     id   BIGSERIAL PRIMARY KEY,
//!     code VARCHAR(50) NOT NULL UNIQUE,
//!     name VARCHAR(255) NOT NULL
//! );
//! CREATE TABLE products (
//!     id          BIGSERIAL PRIMARY KEY,
//!     code        VARCHAR(50) NOT NULL UNIQUE,
//!     price       NUMERIC(10, 2) NOT NULL,
//!     category_id BIGINT NOT NULL REFERENCES categories (id)
//! );
//! CREATE TABLE variants (
//!     id         BIGSERIAL PRIMARY KEY,
//!     product_id BIGINT NOT NULL REFERENCES products (id),
//!     sku        VARCHAR(50) NOT NULL,
//!     name       VARCHAR(255) NOT NULL,
//!     price      NUMERIC(10, 2) NOT NULL DEFAULT 0
//! );
//! ```
//!
//! Products are fetched with their category in one joined query; variants for
//! the whole page are then loaded with a single `product_id = ANY($1)` query.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::{CatalogStore, CategoryStore, ProductFilter, ProductStore, StoreResult};
use crate::error::{StorageError, StorageOperation};
use crate::models::{Category, NewCategory, Product, Variant};
use crate::pagination::Pagination;

const PRODUCT_SELECT: &str = "SELECT p.id, p.code, p.price, \
     c.id AS category_id, c.code AS category_code, c.name AS category_name \
     FROM products p JOIN categories c ON c.id = p.category_id";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    code: String,
    price: Decimal,
    category_id: i64,
    category_code: String,
    category_name: String,
}

impl ProductRow {
    fn into_product(self, variants: Vec<Variant>) -> Product {
        Product {
            id: self.id,
            code: self.code,
            price: self.price,
            category: Category {
                id: self.category_id,
                code: self.category_code,
                name: self.category_name,
            },
            variants,
        }
    }
}

/// Catalog backend over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn attach_variants(&self, rows: Vec<ProductRow>) -> StoreResult<Vec<Product>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let variants: Vec<Variant> = sqlx::query_as(
            "SELECT id, product_id, sku, name, price FROM variants \
             WHERE product_id = ANY($1) ORDER BY id ASC",
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error(e, "variants"))?;

        let mut by_product: HashMap<i64, Vec<Variant>> = HashMap::new();
        for variant in variants {
            by_product.entry(variant.product_id).or_default().push(variant);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let variants = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(variants)
            })
            .collect())
    }
}

fn query_error(err: sqlx::Error, table: &str) -> StorageError {
    StorageError::from(err).add_context(table.to_string())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl ProductStore for PgCatalogStore {
    async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> StoreResult<Vec<Product>> {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(PRODUCT_SELECT);
        query.push(" WHERE TRUE");

        if let Some(name) = filter.category() {
            query.push(" AND c.name = ").push_bind(name.to_string());
        }
        if let Some(ceiling) = filter.max_price() {
            query.push(" AND p.price <= ").push_bind(ceiling);
        }

        query
            .push(" ORDER BY p.id ASC LIMIT ")
            .push_bind(i64::from(pagination.limit()))
            .push(" OFFSET ")
            .push_bind(to_i64(pagination.offset()));

        let rows: Vec<ProductRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error(e, "products"))?;

        self.attach_variants(rows).await
    }

    async fn find_product_by_code(&self, code: &str) -> StoreResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("{} WHERE p.code = $1", PRODUCT_SELECT))
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| query_error(e, "products"))?;

        match row {
            Some(row) => Ok(self.attach_variants(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn count_products(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error(e, "products").during(StorageOperation::Count))
    }
}

impl CategoryStore for PgCatalogStore {
    async fn create_category(&self, data: NewCategory) -> StoreResult<Category> {
        sqlx::query_as(
            "INSERT INTO categories (code, name) VALUES ($1, $2) RETURNING id, code, name",
        )
        .bind(&data.code)
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| query_error(e, "categories").during(StorageOperation::Insert))
    }

    async fn find_category_by_code(&self, code: &str) -> StoreResult<Option<Category>> {
        sqlx::query_as("SELECT id, code, name FROM categories WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error(e, "categories"))
    }

    async fn list_categories(&self, pagination: Pagination) -> StoreResult<Vec<Category>> {
        sqlx::query_as("SELECT id, code, name FROM categories ORDER BY id ASC LIMIT $1 OFFSET $2")
            .bind(i64::from(pagination.limit()))
            .bind(to_i64(pagination.offset()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error(e, "categories"))
    }

    async fn count_categories(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error(e, "categories").during(StorageOperation::Count))
    }
}

impl CatalogStore for PgCatalogStore {
    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }
}
