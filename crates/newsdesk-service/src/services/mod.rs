//! Application services.

pub mod listing;
pub mod news_service;
pub mod search_cache;
pub mod seed;

pub use listing::{ListingOrchestrator, ListingStage};
pub use news_service::NewsService;
pub use search_cache::{MemoryResultCache, RedisResultCache};
pub use seed::{demo_entries, SeedEntry};
