//! Listing result caches.
//!
//! Two backends implement [`ResultCache`]:
//! - [`MemoryResultCache`]: bounded LRU inside the process
//! - [`RedisResultCache`]: shared Redis instance with per-entry TTL
//!
//! Keys are request fingerprints, so callers with different scopes never share
//! an entry. Both backends drop every entry on `clear`.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, info};

use newsdesk_core::{Error, Fingerprint, Result, ResultCache, ResultPage};

/// Keys fetched per `SCAN` round when clearing Redis.
const SCAN_BATCH: usize = 500;

// =============================================================================
// IN-PROCESS
// =============================================================================

/// In-process LRU result cache.
#[derive(Clone)]
pub struct MemoryResultCache {
    entries: Arc<Mutex<LruCache<Fingerprint, ResultPage>>>,
}

impl MemoryResultCache {
    /// Create a cache holding at most `capacity` pages (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &Fingerprint) -> Result<Option<ResultPage>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &Fingerprint, page: &ResultPage) -> Result<()> {
        self.entries.lock().await.put(key.clone(), page.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let removed = entries.len();
        entries.clear();
        debug!(
            subsystem = "cache",
            component = "memory",
            op = "clear",
            removed,
            "Result cache cleared"
        );
        Ok(())
    }
}

// =============================================================================
// REDIS
// =============================================================================

/// Redis-backed result cache.
#[derive(Clone)]
pub struct RedisResultCache {
    connection: ConnectionManager,
    prefix: String,
    ttl_seconds: u64,
}

impl RedisResultCache {
    /// Connect to Redis at `url`. Entries live under `prefix` for `ttl_seconds`.
    pub async fn connect(url: &str, prefix: &str, ttl_seconds: u64) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Config(format!("invalid REDIS_URL: {}", e)))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Cache(format!("redis connect: {}", e)))?;

        info!(
            subsystem = "cache",
            component = "redis",
            op = "connect",
            ttl_seconds,
            prefix,
            "Redis result cache connected"
        );

        Ok(Self {
            connection,
            prefix: prefix.to_string(),
            ttl_seconds,
        })
    }

    fn key(&self, fingerprint: &Fingerprint) -> String {
        format!("{}{}", self.prefix, fingerprint)
    }
}

#[async_trait]
impl ResultCache for RedisResultCache {
    async fn get(&self, key: &Fingerprint) -> Result<Option<ResultPage>> {
        let mut conn = self.connection.clone();
        let data = conn
            .get::<_, Option<String>>(self.key(key))
            .await
            .map_err(|e| Error::Cache(format!("redis GET: {}", e)))?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &Fingerprint, page: &ResultPage) -> Result<()> {
        let serialized = serde_json::to_string(page)?;
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(self.key(key), serialized, self.ttl_seconds)
            .await
            .map_err(|e| Error::Cache(format!("redis SET: {}", e)))
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", self.prefix);
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        // SCAN instead of KEYS so a large keyspace does not block the server
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::Cache(format!("redis SCAN: {}", e)))?;

            if !keys.is_empty() {
                conn.del::<_, ()>(&keys[..])
                    .await
                    .map_err(|e| Error::Cache(format!("redis DEL: {}", e)))?;
                removed += keys.len();
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(
            subsystem = "cache",
            component = "redis",
            op = "clear",
            removed,
            "Result cache cleared"
        );
        Ok(())
    }
}
