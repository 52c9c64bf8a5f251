//! Product listing, lookup, and cached totals

use std::sync::Arc;

use crate::cache::{CountCache, COUNT_TTL, PRODUCT_COUNT_KEY};
use crate::error::{Error, Result};
use crate::pagination::Pagination;
use crate::store::{ProductFilter, ProductStore};
use crate::views::{ProductListing, ProductView};

/// Read-side queries over the product catalog
///
/// Every product handed out has its variant prices resolved against the
/// product's base price.
#[derive(Debug)]
pub struct CatalogQueryEngine<S> {
    store: Arc<S>,
    counts: CountCache,
}

impl<S> Clone for CatalogQueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            counts: self.counts.clone(),
        }
    }
}

impl<S: ProductStore> CatalogQueryEngine<S> {
    /// Create an engine over `store`, caching totals in `counts`
    pub fn new(store: Arc<S>, counts: CountCache) -> Self {
        Self { store, counts }
    }

    /// Products matching `filter`, ordered by identity, sliced by `pagination`
    ///
    /// An offset past the end yields an empty page.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<Vec<ProductView>> {
        let products = self.store.list_products(filter, pagination).await?;
        Ok(products.into_iter().map(ProductView::from).collect())
    }

    /// Product with exactly this code, `None` when no row matches
    pub async fn get_by_code(&self, code: &str) -> Result<Option<ProductView>> {
        let product = self.store.find_product_by_code(code).await?;
        Ok(product.map(ProductView::from))
    }

    /// Like [`get_by_code`](Self::get_by_code), but absence is an [`Error::NotFound`]
    pub async fn require_by_code(&self, code: &str) -> Result<ProductView> {
        self.get_by_code(code)
            .await?
            .ok_or_else(|| Error::NotFound(format!("product {} not found", code)))
    }

    /// Total number of products in the catalog, served from cache when fresh
    ///
    /// Always the unfiltered total, whatever filters the paired listing used.
    pub async fn count(&self) -> Result<i64> {
        self.counts
            .get_or_compute(PRODUCT_COUNT_KEY, COUNT_TTL, || self.store.count_products())
            .await
            .map_err(Error::from)
    }

    /// A page of products together with the unfiltered catalog total
    pub async fn listing(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<ProductListing> {
        let products = self.list_products(filter, pagination).await?;
        let total = self.count().await?;
        Ok(ProductListing { total, products })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, StorageOperation};
    use crate::models::Product;
    use crate::store::{CategoryStore, InMemoryCatalogStore, StoreResult};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    /// Counts how often the row-count aggregate reaches the store
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryCatalogStore,
        count_queries: AtomicUsize,
    }

    impl ProductStore for CountingStore {
        async fn list_products(
            &self,
            filter: &ProductFilter,
            pagination: Pagination,
        ) -> StoreResult<Vec<Product>> {
            self.inner.list_products(filter, pagination).await
        }

        async fn find_product_by_code(&self, code: &str) -> StoreResult<Option<Product>> {
            self.inner.find_product_by_code(code).await
        }

        async fn count_products(&self) -> StoreResult<i64> {
            self.count_queries.fetch_add(1, Ordering::SeqCst);
            self.inner.count_products().await
        }
    }

    struct FailingStore;

    impl ProductStore for FailingStore {
        async fn list_products(
            &self,
            _filter: &ProductFilter,
            _pagination: Pagination,
        ) -> StoreResult<Vec<Product>> {
            Err(StorageError::connection_failed("connection refused"))
        }

        async fn find_product_by_code(&self, _code: &str) -> StoreResult<Option<Product>> {
            Err(StorageError::query_failed(StorageOperation::Query, "timeout"))
        }

        async fn count_products(&self) -> StoreResult<i64> {
            Err(StorageError::connection_failed("connection refused"))
        }
    }

    async fn seeded(products: usize) -> InMemoryCatalogStore {
        let store = InMemoryCatalogStore::new();
        let clothing = store.insert_category("CLOTHING", "Clothing").await.unwrap();
        let shoes = store.insert_category("SHOES", "Shoes").await.unwrap();

        for i in 1..=products {
            let category = if i % 2 == 0 { shoes.id } else { clothing.id };
            store
                .insert_product(format!("PROD{:03}", i), Decimal::from(i as i64 * 10), category)
                .await
                .unwrap();
        }
        store
    }

    fn page(limit: &str, offset: &str) -> Pagination {
        Pagination::from_query(Some(limit), Some(offset)).unwrap()
    }

    #[tokio::test]
    async fn test_pages_are_contiguous_and_disjoint() {
        let engine = CatalogQueryEngine::new(Arc::new(seeded(25).await), CountCache::new());
        let filter = ProductFilter::new();

        let mut seen = Vec::new();
        for (offset, expected_len) in [("0", 10), ("10", 10), ("20", 5)] {
            let products = engine.list_products(&filter, page("10", offset)).await.unwrap();
            assert_eq!(products.len(), expected_len);
            seen.extend(products.into_iter().map(|p| p.code));
        }

        let expected: Vec<String> = (1..=25).map(|i| format!("PROD{:03}", i)).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty_not_error() {
        let engine = CatalogQueryEngine::new(Arc::new(seeded(5).await), CountCache::new());
        let filter = ProductFilter::new();

        assert!(engine.list_products(&filter, page("10", "5")).await.unwrap().is_empty());
        assert!(engine.list_products(&filter, page("10", "500")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_results_ordered_by_identity() {
        let store = InMemoryCatalogStore::new();
        let cat = store.insert_category("MISC", "Misc").await.unwrap();
        // Insertion order differs from lexical order
        for code in ["ZED", "ALPHA", "MIKE"] {
            store.insert_product(code, Decimal::ONE, cat.id).await.unwrap();
        }

        let engine = CatalogQueryEngine::new(Arc::new(store), CountCache::new());
        let products = engine
            .list_products(&ProductFilter::new(), Pagination::default())
            .await
            .unwrap();

        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(products[0].code, "ZED");
    }

    #[tokio::test]
    async fn test_category_and_price_filters() {
        let engine = CatalogQueryEngine::new(Arc::new(seeded(10).await), CountCache::new());

        let shoes = ProductFilter::new().with_category("Shoes");
        let products = engine.list_products(&shoes, Pagination::default()).await.unwrap();
        assert_eq!(products.len(), 5);
        assert!(products.iter().all(|p| p.category.name == "Shoes"));

        let cheap = ProductFilter::new().with_max_price(dec("30"));
        let products = engine.list_products(&cheap, Pagination::default()).await.unwrap();
        let codes: Vec<&str> = products.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, ["PROD001", "PROD002", "PROD003"]);

        let both = ProductFilter::new().with_category("Shoes").with_max_price(dec("40"));
        let products = engine.list_products(&both, Pagination::default()).await.unwrap();
        let codes: Vec<&str> = products.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, ["PROD002", "PROD004"]);

        let lowercase = ProductFilter::new().with_category("shoes");
        assert!(engine
            .list_products(&lowercase, Pagination::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_get_by_code_resolves_variant_prices() {
        let store = InMemoryCatalogStore::new();
        let cat = store.insert_category("CLOTHING", "Clothing").await.unwrap();
        let product = store.insert_product("PROD001", dec("100.00"), cat.id).await.unwrap();
        store
            .insert_variant(product.id, "SKU001A", "Inherits", dec("0.00"))
            .await
            .unwrap();
        store
            .insert_variant(product.id, "SKU001B", "Discounted", dec("75.50"))
            .await
            .unwrap();
        store
            .insert_variant(product.id, "SKU001C", "Premium", dec("150.00"))
            .await
            .unwrap();

        let engine = CatalogQueryEngine::new(Arc::new(store.clone()), CountCache::new());
        let view = engine.get_by_code("PROD001").await.unwrap().unwrap();
        let prices: Vec<Decimal> = view.variants.iter().map(|v| v.price).collect();
        assert_eq!(prices, [dec("100.00"), dec("75.50"), dec("150.00")]);
        assert_eq!(view.category.code, "CLOTHING");

        // Base price changes flow through on the next read
        store.set_product_price(product.id, dec("80.00")).await.unwrap();
        let view = engine.get_by_code("PROD001").await.unwrap().unwrap();
        assert_eq!(view.variants[0].price, dec("80.00"));
        assert_eq!(view.variants[1].price, dec("75.50"));
    }

    #[tokio::test]
    async fn test_listing_resolves_variant_prices() {
        let store = InMemoryCatalogStore::new();
        let cat = store.insert_category("SHOES", "Shoes").await.unwrap();
        let product = store.insert_product("PROD002", dec("50.00"), cat.id).await.unwrap();
        store
            .insert_variant(product.id, "SKU002A", "Default", Decimal::ZERO)
            .await
            .unwrap();

        let engine = CatalogQueryEngine::new(Arc::new(store), CountCache::new());
        let products = engine
            .list_products(&ProductFilter::new(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(products[0].variants[0].price, dec("50.00"));
    }

    #[tokio::test]
    async fn test_missing_code() {
        let engine = CatalogQueryEngine::new(Arc::new(seeded(1).await), CountCache::new());
        assert!(engine.get_by_code("NONEXISTENT").await.unwrap().is_none());
        assert!(matches!(
            engine.require_by_code("NONEXISTENT").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_failures_surface_as_storage_errors() {
        let engine = CatalogQueryEngine::new(Arc::new(FailingStore), CountCache::new());
        assert!(matches!(
            engine.get_by_code("PROD001").await,
            Err(Error::Storage(_))
        ));
        assert!(matches!(
            engine.list_products(&ProductFilter::new(), Pagination::default()).await,
            Err(Error::Storage(_))
        ));
        assert!(matches!(engine.count().await, Err(Error::Storage(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_is_cached_within_ttl() {
        let store = Arc::new(CountingStore {
            inner: seeded(3).await,
            ..CountingStore::default()
        });
        let engine = CatalogQueryEngine::new(Arc::clone(&store), CountCache::new());

        for _ in 0..5 {
            assert_eq!(engine.count().await.unwrap(), 3);
        }
        assert_eq!(store.count_queries.load(Ordering::SeqCst), 1);

        // New rows stay invisible until the entry expires
        let cat = store.inner.find_category_by_code("CLOTHING").await.unwrap().unwrap();
        store.inner.insert_product("PROD100", Decimal::ONE, cat.id).await.unwrap();
        tokio::time::advance(COUNT_TTL - Duration::from_secs(1)).await;
        assert_eq!(engine.count().await.unwrap(), 3);
        assert_eq!(store.count_queries.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(engine.count().await.unwrap(), 4);
        assert_eq!(engine.count().await.unwrap(), 4);
        assert_eq!(store.count_queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_count_ignores_listing_filters() {
        let engine = CatalogQueryEngine::new(Arc::new(seeded(10).await), CountCache::new());
        let listing = engine
            .listing(&ProductFilter::new().with_category("Shoes"), page("2", "0"))
            .await
            .unwrap();
        assert_eq!(listing.products.len(), 2);
        assert_eq!(listing.total, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_converge() {
        let store = Arc::new(CountingStore {
            inner: seeded(7).await,
            ..CountingStore::default()
        });
        let engine = CatalogQueryEngine::new(Arc::clone(&store), CountCache::new());

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let engine = engine.clone();
            tasks.push(tokio::spawn(async move { engine.count().await }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 7);
        }

        // Duplicate recomputation is allowed; what matters is the settled value
        let queries = store.count_queries.load(Ordering::SeqCst);
        assert!((1..=32).contains(&queries));
        assert_eq!(engine.count().await.unwrap(), 7);
        assert_eq!(store.count_queries.load(Ordering::SeqCst), queries);
    }
}
