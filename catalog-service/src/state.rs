//! Service context shared by everything that serves catalog requests
//!
//! [`AppState`] is constructed once by the process entry point and handed to
//! every caller. It owns the configuration, the store, the shared count
//! cache, and the background sweep. Teardown is an explicit
//! [`AppState::shutdown`] call.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cache::{CountCache, SweeperHandle};
use crate::catalog::CatalogQueryEngine;
use crate::categories::CategoryQueryEngine;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::CatalogStore;

#[cfg(feature = "database")]
use crate::store::PgCatalogStore;

/// Application state shared across callers
///
/// Cloning is cheap; clones share the store, the cache, and the sweeper.
pub struct AppState<S> {
    config: Arc<Config>,
    store: Arc<S>,
    counts: CountCache,
    sweeper: Arc<Mutex<Option<SweeperHandle>>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            counts: self.counts.clone(),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<S: CatalogStore> AppState<S> {
    /// Create a new builder for AppState
    pub fn builder() -> AppStateBuilder<S> {
        AppStateBuilder::new()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Count cache shared by both engines
    pub fn counts(&self) -> &CountCache {
        &self.counts
    }

    /// Product query engine bound to this state's store and cache
    pub fn catalog(&self) -> CatalogQueryEngine<S> {
        CatalogQueryEngine::new(Arc::clone(&self.store), self.counts.clone())
    }

    /// Category query engine bound to this state's store and cache
    pub fn categories(&self) -> CategoryQueryEngine<S> {
        CategoryQueryEngine::new(Arc::clone(&self.store), self.counts.clone())
    }

    /// Stop the background sweep and release the store
    ///
    /// Safe to call more than once; later calls only close the store again.
    pub async fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().await.take() {
            sweeper.shutdown().await;
        }
        self.store.close().await;
        tracing::info!("Catalog service state shut down");
    }
}

#[cfg(feature = "database")]
impl AppState<PgCatalogStore> {
    /// Connect to PostgreSQL using `config.database` and build the state
    pub async fn connect(config: Config) -> Result<Self> {
        let pool = crate::database::create_pool(config.require_database()?).await?;
        Self::builder()
            .config(config)
            .store(PgCatalogStore::new(pool))
            .build()
            .await
    }
}

/// Builder for AppState
pub struct AppStateBuilder<S> {
    config: Option<Config>,
    store: Option<S>,
    enable_tracing: bool,
}

impl<S: CatalogStore> AppStateBuilder<S> {
    /// Create a new builder
    ///
    /// Config falls back to `Config::default()`; a store must be provided.
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            enable_tracing: true,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the store backend
    pub fn store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    /// Skip tracing initialization, for callers that install their own subscriber
    pub fn without_tracing(mut self) -> Self {
        self.enable_tracing = false;
        self
    }

    /// Build the state and start the background cache sweep
    ///
    /// Must run inside a Tokio runtime.
    pub async fn build(self) -> Result<AppState<S>> {
        let config = self.config.unwrap_or_default();

        if self.enable_tracing {
            crate::observability::init_tracing(&config);
        }

        let store = self.store.ok_or_else(|| {
            Error::Config(Box::new(figment::Error::from(
                "no catalog store provided to AppStateBuilder".to_string(),
            )))
        })?;

        let counts = CountCache::new();
        let interval = config.cache.sweep_interval();
        let sweeper = counts.spawn_sweeper(interval);
        tracing::debug!(interval_secs = interval.as_secs(), "Count cache sweeper started");

        Ok(AppState {
            config: Arc::new(config),
            store: Arc::new(store),
            counts,
            sweeper: Arc::new(Mutex::new(Some(sweeper))),
        })
    }
}

impl<S: CatalogStore> Default for AppStateBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
