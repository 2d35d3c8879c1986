//! Listing orchestration.
//!
//! A listing call moves through these stages:
//!
//! ```text
//! Received -> DefaultsApplied -> CacheChecked -> HitReturn
//!                                             -> MissFetch -> CacheStored -> Done
//! ```
//!
//! Access defaults are applied before the fingerprint is taken, so the cache
//! key always reflects what the caller is allowed to see.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use newsdesk_core::{
    parse_query, AccessPolicy, Fingerprint, ListRequest, NewsRepository, Result, ResultCache,
    ResultPage, SearchFilterBuilder,
};

/// Stage a listing call has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStage {
    Received,
    DefaultsApplied,
    CacheChecked,
    HitReturn,
    MissFetch,
    CacheStored,
    Done,
}

impl ListingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStage::Received => "received",
            ListingStage::DefaultsApplied => "defaults_applied",
            ListingStage::CacheChecked => "cache_checked",
            ListingStage::HitReturn => "hit_return",
            ListingStage::MissFetch => "miss_fetch",
            ListingStage::CacheStored => "cache_stored",
            ListingStage::Done => "done",
        }
    }
}

impl fmt::Display for ListingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sequences access defaults, cache lookup, query parsing, the storage query
/// and cache population for one listing request.
#[derive(Clone)]
pub struct ListingOrchestrator {
    policy: Arc<dyn AccessPolicy>,
    store: Arc<dyn NewsRepository>,
    cache: Arc<dyn ResultCache>,
    filter: SearchFilterBuilder,
}

impl ListingOrchestrator {
    pub fn new(
        policy: Arc<dyn AccessPolicy>,
        store: Arc<dyn NewsRepository>,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        Self {
            policy,
            store,
            cache,
            filter: SearchFilterBuilder::new(),
        }
    }

    /// List news visible to the caller described by `request.privileges`.
    ///
    /// # Errors
    ///
    /// - `Forbidden` when the caller filters by owner or visibility without
    ///   the `filter` scope
    /// - `InvalidInput` for an unknown sort field or a negative window
    /// - `Internal` when storage or the cache store fails
    pub async fn list(&self, request: ListRequest) -> Result<ResultPage> {
        let start = Instant::now();
        trace_stage(ListingStage::Received, None);

        let mut request = self.policy.apply_listing_defaults(request)?;
        trace_stage(ListingStage::DefaultsApplied, None);

        let fingerprint = Fingerprint::of(&request);
        let cached = match self.cache.get(&fingerprint).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(
                    subsystem = "listing",
                    component = "orchestrator",
                    op = "list",
                    fingerprint = %fingerprint,
                    error = %e,
                    "Cache lookup failed, treating as miss"
                );
                None
            }
        };
        trace_stage(ListingStage::CacheChecked, Some(&fingerprint));

        if let Some(page) = cached {
            trace_stage(ListingStage::HitReturn, Some(&fingerprint));
            debug!(
                subsystem = "listing",
                component = "orchestrator",
                op = "list",
                cache_hit = true,
                result_count = page.records.len(),
                total = page.total,
                duration_ms = start.elapsed().as_millis() as u64,
                "Listing served"
            );
            return Ok(page);
        }

        trace_stage(ListingStage::MissFetch, Some(&fingerprint));
        let parsed = parse_query(&request.query);
        request.text = parsed.text;
        request.tags = parsed.tags;

        let page = self
            .filter
            .execute(self.store.as_ref(), &request)
            .await
            .map_err(|e| e.internal_context("list: fetch"))?;

        self.cache
            .set(&fingerprint, &page)
            .await
            .map_err(|e| e.internal_context("list: cache store"))?;
        trace_stage(ListingStage::CacheStored, Some(&fingerprint));

        debug!(
            subsystem = "listing",
            component = "orchestrator",
            op = "list",
            cache_hit = false,
            result_count = page.records.len(),
            total = page.total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Listing served"
        );
        trace_stage(ListingStage::Done, Some(&fingerprint));

        Ok(page)
    }
}

fn trace_stage(stage: ListingStage, fingerprint: Option<&Fingerprint>) {
    trace!(
        subsystem = "listing",
        component = "orchestrator",
        stage = %stage,
        fingerprint = fingerprint.map(Fingerprint::as_str).unwrap_or(""),
        "Listing stage"
    );
}
