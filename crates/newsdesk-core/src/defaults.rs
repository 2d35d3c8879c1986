//! Centralized default constants for newsdesk.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// PAGINATION
// =============================================================================

/// Page size used when a listing request carries `limit = 0`.
pub const PAGE_LIMIT: i64 = 20;

/// Effective page size for a requested limit.
pub fn effective_limit(requested: i64) -> i64 {
    if requested == 0 {
        PAGE_LIMIT
    } else {
        requested
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// PostgreSQL text-search configuration for news content.
pub const TEXT_SEARCH_CONFIG: &str = "russian";

/// `setweight` label for the title in the relevance document.
pub const TITLE_WEIGHT_LABEL: &str = "A";

/// `setweight` label for the search text in the relevance document.
pub const BODY_WEIGHT_LABEL: &str = "B";

/// Rank contribution of a title match in the in-memory engine (ts_rank weight for `A`).
pub const TITLE_RANK_WEIGHT: f32 = 1.0;

/// Rank contribution of a body match in the in-memory engine (ts_rank weight for `B`).
pub const BODY_RANK_WEIGHT: f32 = 0.4;

// =============================================================================
// CACHE
// =============================================================================

/// Key prefix for listing results in shared cache backends.
pub const CACHE_PREFIX: &str = "newsdesk:list:";

/// Entry lifetime in shared cache backends, in seconds.
pub const CACHE_TTL_SECS: u64 = 600;

/// Maximum entries held by the in-process cache.
pub const CACHE_CAPACITY: usize = 1000;

// =============================================================================
// DATABASE
// =============================================================================

/// Default maximum number of pooled connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default pool acquire timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Idle pooled connections are closed after this many seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Pooled connections are recycled after this many seconds.
pub const DB_MAX_LIFETIME_SECS: u64 = 1800;

/// Upper bound on slug suffix attempts before giving up.
pub const SLUG_MAX_ATTEMPTS: u32 = 1000;
