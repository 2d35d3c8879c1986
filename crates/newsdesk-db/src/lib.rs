//! # newsdesk-db
//!
//! Storage engines for newsdesk.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL news and tag repositories
//! - SQL compilation of listing search specs with weighted full-text search
//! - An in-memory storage engine with the same listing semantics
//!
//! ## Example
//!
//! ```rust,ignore
//! use newsdesk_db::{Database, NewsRepository, SearchFilterBuilder, ListRequest, ScopeSet};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/newsdesk").await?;
//!     let request = ListRequest::new("", ScopeSet::new());
//!     let page = SearchFilterBuilder::new().execute(&db.news, &request).await?;
//!     println!("{} matches", page.total);
//!     Ok(())
//! }
//! ```
pub mod memory;
pub mod news;
pub mod pool;
pub mod search_filter;
pub mod tags;

// Note: always compiled so integration tests (in tests/) can use it
pub mod test_fixtures;

// Re-export core types
pub use newsdesk_core::*;

pub use memory::MemoryNewsStore;
pub use news::PgNewsRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig, PoolStats};
pub use search_filter::{CompiledQuery, NewsQueryBuilder, QueryParam};
pub use tags::PgTagRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub news: PgNewsRepository,
    pub tags: PgTagRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            news: PgNewsRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            pool,
        }
    }

    /// Use `config` as the text-search configuration for relevance matching.
    pub fn with_text_search_config(mut self, config: &str) -> Self {
        self.news = PgNewsRepository::new(self.pool.clone()).with_text_search_config(config);
        self
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
