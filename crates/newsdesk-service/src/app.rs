//! Composition root: wires storage, cache and access policy into the services.

use std::sync::Arc;

use tracing::info;

use newsdesk_core::{AccessPolicy, NewsRepository, Result, ResultCache, ScopeAccessPolicy, TagRepository};
use newsdesk_db::{log_pool_metrics, Database, MemoryNewsStore, PoolConfig};

use crate::config::{CacheBackend, Config};
use crate::services::{ListingOrchestrator, MemoryResultCache, NewsService, RedisResultCache};

/// Fully wired application services.
#[derive(Clone)]
pub struct App {
    pub listing: ListingOrchestrator,
    pub news: NewsService,
}

impl App {
    /// Wire services from explicit components.
    pub fn from_parts(
        policy: Arc<dyn AccessPolicy>,
        news: Arc<dyn NewsRepository>,
        tags: Arc<dyn TagRepository>,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        Self {
            listing: ListingOrchestrator::new(policy.clone(), news.clone(), cache.clone()),
            news: NewsService::new(policy, news, tags, cache),
        }
    }

    /// In-memory storage and cache with the wall-clock access policy.
    pub fn in_memory(cache_capacity: usize) -> Self {
        Self::in_memory_with_policy(Arc::new(ScopeAccessPolicy::new()), cache_capacity)
    }

    pub fn in_memory_with_policy(policy: Arc<dyn AccessPolicy>, cache_capacity: usize) -> Self {
        let store = MemoryNewsStore::new();
        Self::from_parts(
            policy,
            Arc::new(store.clone()),
            Arc::new(store),
            Arc::new(MemoryResultCache::new(cache_capacity)),
        )
    }

    /// PostgreSQL storage plus the configured cache backend.
    pub async fn connect(config: &Config) -> Result<Self> {
        let db = connect_database(config).await?;
        if config.run_migrations {
            db.migrate().await?;
            info!(subsystem = "db", op = "migrate", "Migrations applied");
        }

        let cache: Arc<dyn ResultCache> = match config.cache_backend {
            CacheBackend::Memory => Arc::new(MemoryResultCache::new(config.cache_capacity)),
            CacheBackend::Redis => Arc::new(
                RedisResultCache::connect(
                    &config.redis_url,
                    &config.cache_prefix,
                    config.cache_ttl_secs,
                )
                .await?,
            ),
        };

        info!(
            subsystem = "app",
            op = "connect",
            cache_backend = %config.cache_backend,
            text_search_config = %config.text_search_config,
            "Services wired"
        );

        Ok(Self::from_parts(
            Arc::new(ScopeAccessPolicy::new()),
            Arc::new(db.news),
            Arc::new(db.tags),
            cache,
        ))
    }
}

/// Open the database pool described by `config`.
pub async fn connect_database(config: &Config) -> Result<Database> {
    let pool_config = PoolConfig::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_connect_timeout);
    let db = Database::connect_with_config(&config.database_url, pool_config)
        .await?
        .with_text_search_config(&config.text_search_config);
    log_pool_metrics(db.pool());
    Ok(db)
}
