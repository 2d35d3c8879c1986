//! # newsdesk-service
//!
//! Access-scoped news listing with a fingerprinted result cache, plus the
//! single-record and mutation operations around it.
//!
//! [`App`] is the composition root. Build it with [`App::connect`] for
//! PostgreSQL or [`App::in_memory`] for tests and demos.

pub mod app;
pub mod config;
pub mod logging;
pub mod services;

pub use app::{connect_database, App};
pub use config::{CacheBackend, Config};
pub use services::{
    demo_entries, ListingOrchestrator, ListingStage, MemoryResultCache, NewsService,
    RedisResultCache, SeedEntry,
};
