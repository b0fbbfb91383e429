//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use crate::config::StorefrontConfig;
use crate::db::{CatalogRepository, RepositoryError};
use crate::models::CategorySummary;

/// How long sidebar data is served from memory.
const SIDEBAR_TTL: Duration = Duration::from_secs(60);

/// Cache key for catalog data shared by every page.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Sidebar,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog_cache: Cache<CacheKey, Arc<[CategorySummary]>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let catalog_cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(SIDEBAR_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog_cache,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Categories with product counts for the sidebar, cached for a minute.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the cache is cold and the query fails.
    pub async fn sidebar_categories(&self) -> Result<Arc<[CategorySummary]>, RepositoryError> {
        if let Some(categories) = self.inner.catalog_cache.get(&CacheKey::Sidebar).await {
            debug!("Cache hit for sidebar categories");
            return Ok(categories);
        }

        let categories: Arc<[CategorySummary]> = CatalogRepository::new(self.pool())
            .sidebar_categories()
            .await?
            .into();

        self.inner
            .catalog_cache
            .insert(CacheKey::Sidebar, Arc::clone(&categories))
            .await;

        Ok(categories)
    }
}
