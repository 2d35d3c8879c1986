//! Core traits for newsdesk storage and caching.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::models::{NewsRecord, ResultPage, Tag};
use crate::search::SearchSpec;

// =============================================================================
// NEWS REPOSITORY
// =============================================================================

/// Repository for news records.
#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Run a listing query and return one page together with the match count.
    async fn query(&self, spec: &SearchSpec) -> Result<ResultPage>;

    /// Fetch a record by id, including its tags.
    ///
    /// Returns [`Error::NewsNotFound`](crate::Error::NewsNotFound) when absent.
    async fn fetch(&self, id: Uuid) -> Result<NewsRecord>;

    /// Fetch an active record whose publication time is before `now`.
    async fn fetch_published_by_slug(&self, slug: &str, now: DateTime<Utc>)
        -> Result<NewsRecord>;

    /// Persist a new record and its tag links.
    ///
    /// Returns the record as stored: tags whose name already existed carry the
    /// stored id, not the one on `record`.
    async fn insert(&self, record: &NewsRecord) -> Result<NewsRecord>;

    /// Replace a stored record's fields and tag links; returns the record as stored.
    async fn update(&self, record: &NewsRecord) -> Result<NewsRecord>;

    /// Delete a record and its tag links.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Whether another record already uses `slug`.
    async fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> Result<bool>;

    /// Delete every record and tag link.
    async fn remove_all(&self) -> Result<()>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Repository for the shared tag vocabulary.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// All tags ordered by name.
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Id of the tag called `name`, or a fresh id when no such tag exists yet.
    async fn resolve_id(&self, name: &str) -> Result<Uuid>;

    /// Delete every tag.
    async fn remove_all(&self) -> Result<()>;
}

// =============================================================================
// RESULT CACHE
// =============================================================================

/// Fingerprint-keyed store of listing pages.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Look up a page. Backend failures surface as errors; callers decide
    /// whether to degrade to a miss.
    async fn get(&self, key: &Fingerprint) -> Result<Option<ResultPage>>;

    /// Store a page.
    async fn set(&self, key: &Fingerprint, page: &ResultPage) -> Result<()>;

    /// Drop every entry.
    async fn clear(&self) -> Result<()>;
}
