//! Single-record reads and mutations.
//!
//! Every successful mutation clears the whole result cache afterwards. There is
//! no compensating rollback: if the clear fails the write stays and the error
//! is returned.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use newsdesk_core::defaults::SLUG_MAX_ATTEMPTS;
use newsdesk_core::{
    slug_candidate, slugify, AccessPolicy, Error, MutationVerb, NewsDraft, NewsRecord,
    NewsRepository, NewsText, Result, ResultCache, ScopeSet, Tag, TagRepository,
};

use super::seed::SeedEntry;

#[derive(Clone)]
pub struct NewsService {
    policy: Arc<dyn AccessPolicy>,
    news: Arc<dyn NewsRepository>,
    tags: Arc<dyn TagRepository>,
    cache: Arc<dyn ResultCache>,
}

impl NewsService {
    pub fn new(
        policy: Arc<dyn AccessPolicy>,
        news: Arc<dyn NewsRepository>,
        tags: Arc<dyn TagRepository>,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        Self {
            policy,
            news,
            tags,
            cache,
        }
    }

    /// Fetch a record the caller may read.
    pub async fn get_one(&self, id: Uuid, scopes: &ScopeSet) -> Result<NewsRecord> {
        let record = self
            .news
            .fetch(id)
            .await
            .map_err(|e| e.internal_context("get_one"))?;
        self.policy.authorize_read(scopes, &record)?;
        Ok(record)
    }

    /// Fetch a published record by slug for the public detail page.
    pub async fn get_by_slug(&self, slug: &str, scopes: &ScopeSet) -> Result<NewsRecord> {
        self.policy.authorize_detail_view(scopes)?;
        self.news
            .fetch_published_by_slug(slug, self.policy.now())
            .await
            .map_err(|e| e.internal_context("get_by_slug"))
    }

    pub async fn create(&self, draft: NewsDraft, scopes: &ScopeSet) -> Result<NewsRecord> {
        self.policy.authorize_create(scopes)?;
        let record = self
            .build_new(draft, scopes.user_id().map(str::to_string))
            .await?;

        let record = self
            .news
            .insert(&record)
            .await
            .map_err(|e| e.internal_context("create: insert"))?;
        self.clear_cache("create").await?;

        info!(
            subsystem = "news",
            op = "create",
            news_id = %record.id,
            slug = %record.slug,
            "News created"
        );
        Ok(record)
    }

    /// Replace a record's content. The caller needs the update scope matching
    /// the stored record's state and becomes the record's owner.
    pub async fn update(
        &self,
        id: Uuid,
        draft: NewsDraft,
        scopes: &ScopeSet,
    ) -> Result<NewsRecord> {
        let existing = self
            .news
            .fetch(id)
            .await
            .map_err(|e| e.internal_context("update: fetch"))?;
        self.policy
            .authorize_mutate(scopes, &existing, MutationVerb::Update)?;
        validate_draft(&draft)?;

        let slug = if draft.title == existing.title {
            existing.slug.clone()
        } else {
            self.unique_slug(&draft.title, Some(id)).await?
        };

        let record = NewsRecord {
            id,
            title: draft.title,
            slug,
            author: draft.author,
            // the editor becomes the owner; a caller without identity keeps it
            user_id: scopes.user_id().map(str::to_string).or(existing.user_id),
            active: draft.active,
            active_from: draft.active_from.unwrap_or(existing.active_from),
            created_at: existing.created_at,
            body: NewsText::new(draft.text),
            text_json: draft.text_json,
            tags: self.resolve_tags(&draft.tags).await?,
            is_important: draft.is_important,
            is_mailed: draft.is_mailed,
        };

        let record = self
            .news
            .update(&record)
            .await
            .map_err(|e| e.internal_context("update: persist"))?;
        self.clear_cache("update").await?;

        info!(subsystem = "news", op = "update", news_id = %id, "News updated");
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid, scopes: &ScopeSet) -> Result<()> {
        let existing = self
            .news
            .fetch(id)
            .await
            .map_err(|e| e.internal_context("delete: fetch"))?;
        self.policy
            .authorize_mutate(scopes, &existing, MutationVerb::Delete)?;

        self.news
            .delete(id)
            .await
            .map_err(|e| e.internal_context("delete: remove"))?;
        self.clear_cache("delete").await?;

        info!(subsystem = "news", op = "delete", news_id = %id, "News deleted");
        Ok(())
    }

    /// All tags ordered by name.
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.tags
            .list()
            .await
            .map_err(|e| e.internal_context("list_tags"))
    }

    /// Replace all news and tags with `entries`. Operator-only; no scope check.
    pub async fn seed(&self, entries: Vec<SeedEntry>) -> Result<usize> {
        self.news
            .remove_all()
            .await
            .map_err(|e| e.internal_context("seed: remove news"))?;
        self.tags
            .remove_all()
            .await
            .map_err(|e| e.internal_context("seed: remove tags"))?;

        let count = entries.len();
        for entry in entries {
            let record = self
                .build_new(entry.draft, Some(entry.owner.to_string()))
                .await?;
            self.news
                .insert(&record)
                .await
                .map_err(|e| e.internal_context("seed: insert"))?;
        }
        self.clear_cache("seed").await?;

        info!(subsystem = "news", op = "seed", count, "Demo data seeded");
        Ok(count)
    }

    async fn build_new(&self, draft: NewsDraft, owner: Option<String>) -> Result<NewsRecord> {
        validate_draft(&draft)?;
        let now = self.policy.now();

        Ok(NewsRecord {
            id: Uuid::now_v7(),
            slug: self.unique_slug(&draft.title, None).await?,
            title: draft.title,
            author: draft.author,
            user_id: owner,
            active: draft.active,
            active_from: draft.active_from.unwrap_or(now),
            created_at: now,
            body: NewsText::new(draft.text),
            text_json: draft.text_json,
            tags: self.resolve_tags(&draft.tags).await?,
            is_important: draft.is_important,
            is_mailed: draft.is_mailed,
        })
    }

    /// First free slug among `base`, `base-1`, `base-2`, ...
    async fn unique_slug(&self, title: &str, exclude_id: Option<Uuid>) -> Result<String> {
        let base = slugify(title);
        for attempt in 0..SLUG_MAX_ATTEMPTS {
            let candidate = slug_candidate(&base, attempt);
            let taken = self
                .news
                .slug_exists(&candidate, exclude_id)
                .await
                .map_err(|e| e.internal_context("slug lookup"))?;
            if !taken {
                debug!(
                    subsystem = "news",
                    op = "unique_slug",
                    slug = %candidate,
                    attempt,
                    "Slug allocated"
                );
                return Ok(candidate);
            }
        }
        Err(Error::Internal(format!(
            "no free slug for {:?} after {} attempts",
            base, SLUG_MAX_ATTEMPTS
        )))
    }

    /// Resolve tag names to tags, reusing ids of known names.
    async fn resolve_tags(&self, names: &[String]) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = Vec::with_capacity(names.len());
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if tags.iter().any(|t| t.name == name) {
                continue;
            }
            let id = self
                .tags
                .resolve_id(name)
                .await
                .map_err(|e| e.internal_context("tag lookup"))?;
            tags.push(Tag {
                id,
                name: name.to_string(),
            });
        }
        Ok(tags)
    }

    async fn clear_cache(&self, op: &str) -> Result<()> {
        self.cache
            .clear()
            .await
            .map_err(|e| e.internal_context(&format!("{}: cache clear", op)))
    }
}

fn validate_draft(draft: &NewsDraft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(Error::InvalidInput("title must not be empty".to_string()));
    }
    Ok(())
}
