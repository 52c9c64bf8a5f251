//! # catalog-service
//!
//! Data-access core for a read-mostly product and category catalog.
//!
//! ## Features
//!
//! - **Pagination**: `limit`/`offset` parsing with fixed bounds and defaults
//! - **Filtered listing**: category-name equality and price ceiling, ordered by identity
//! - **Cached totals**: cache-aside row counts with a fixed TTL and background sweep
//! - **Derived prices**: variant prices resolved against their product at read time
//! - **Storage backends**: PostgreSQL via `sqlx` (feature `database`) or in-memory
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config);
//!
//!     let state = AppState::<PgCatalogStore>::connect(config).await?;
//!
//!     let page = Pagination::from_query(Some("20"), None)?;
//!     let filter = ProductFilter::from_query(Some("Shoes"), Some("100.00"))?;
//!     let listing = state.catalog().listing(&filter, page).await?;
//!     println!("{} of {} products", listing.products.len(), listing.total);
//!
//!     state.shutdown().await;
//!     shutdown_tracing();
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod categories;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod observability;
pub mod pagination;
pub mod pricing;
pub mod state;
pub mod store;
pub mod views;

/// Commonly used types and functions
pub mod prelude {
    pub use crate::cache::{CountCache, SweeperHandle, COUNT_TTL};
    pub use crate::catalog::CatalogQueryEngine;
    pub use crate::categories::CategoryQueryEngine;
    pub use crate::config::{CacheConfig, Config, DatabaseConfig, ServiceConfig};
    pub use crate::error::{Error, ErrorResponse, Result, StorageError, StorageErrorKind};
    pub use crate::models::{Category, NewCategory, Product, Variant};
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::pagination::{Pagination, PaginationQuery};
    pub use crate::pricing::effective_price;
    pub use crate::state::{AppState, AppStateBuilder};
    pub use crate::store::{
        CatalogStore, CategoryStore, InMemoryCatalogStore, ProductFilter, ProductStore,
    };
    pub use crate::views::{
        CategoryListing, CategoryView, CreatedCategory, ProductListing, ProductView, VariantView,
    };

    #[cfg(feature = "database")]
    pub use crate::database::create_pool;

    #[cfg(feature = "database")]
    pub use crate::store::PgCatalogStore;

    pub use rust_decimal::Decimal;
}
