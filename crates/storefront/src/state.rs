//! Application state shared across handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::StorefrontConfig;
use crate::db::CommerceStore;
use crate::middleware::RequestLog;
use crate::models::StockPolicy;
use crate::services::{CartService, CatalogCache, CatalogService, InventoryService, OrderService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and hands out the services,
/// each borrowing the shared store.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

// Manual impl: `S` itself need not be `Clone` for the handle to be.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<S> {
    store: S,
    policy: StockPolicy,
    catalog_cache: CatalogCache,
    request_log: RequestLog,
    started_at: Instant,
}

impl<S: CommerceStore> AppState<S> {
    /// Create a new application state from configuration and a store.
    #[must_use]
    pub fn new(config: &StorefrontConfig, store: S) -> Self {
        Self::with_parts(
            store,
            config.stock_policy(),
            CatalogCache::new(config.catalog_cache_ttl),
            RequestLog::new(config.request_log_capacity),
        )
    }

    /// Create a state from explicit parts.
    #[must_use]
    pub fn with_parts(
        store: S,
        policy: StockPolicy,
        catalog_cache: CatalogCache,
        request_log: RequestLog,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                policy,
                catalog_cache,
                request_log,
                started_at: Instant::now(),
            }),
        }
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// The configured stock policy.
    #[must_use]
    pub fn policy(&self) -> StockPolicy {
        self.inner.policy
    }

    #[must_use]
    pub fn catalog_cache(&self) -> &CatalogCache {
        &self.inner.catalog_cache
    }

    /// The `/api` request ring buffer.
    #[must_use]
    pub fn request_log(&self) -> &RequestLog {
        &self.inner.request_log
    }

    /// Time since the state was built.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_, S> {
        CatalogService::new(self.store(), self.catalog_cache())
    }

    #[must_use]
    pub fn inventory(&self) -> InventoryService<'_, S> {
        InventoryService::new(self.store(), self.policy())
    }

    #[must_use]
    pub fn cart(&self) -> CartService<'_, S> {
        CartService::new(self.store(), self.policy())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_, S> {
        OrderService::new(self.store(), self.policy())
    }
}
