//! In-memory storage engine.
//!
//! Evaluates [`SearchSpec`]s directly over a record map. The relevance match
//! approximates PostgreSQL's weighted document: every query term must occur in
//! the title or the search text, and title hits rank above body hits.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use newsdesk_core::defaults::{BODY_RANK_WEIGHT, TITLE_RANK_WEIGHT};
use newsdesk_core::{
    Error, NewsRecord, NewsRepository, Predicate, Result, ResultPage, SearchSpec, SortField,
    SortKey, SortOrder, Tag, TagRepository,
};

#[derive(Debug, Default)]
struct MemoryState {
    news: HashMap<Uuid, NewsRecord>,
    /// Tag vocabulary keyed by name.
    tags: BTreeMap<String, Tag>,
}

impl MemoryState {
    /// Register tags by name, reusing the stored tag when the name is known.
    fn canonical_tags(&mut self, tags: &[Tag]) -> Vec<Tag> {
        let mut linked: Vec<Tag> = tags
            .iter()
            .map(|tag| {
                self.tags
                    .entry(tag.name.clone())
                    .or_insert_with(|| tag.clone())
                    .clone()
            })
            .collect();
        linked.sort_by(|a, b| a.name.cmp(&b.name));
        linked.dedup_by(|a, b| a.id == b.id);
        linked
    }
}

/// News and tag storage held in process memory.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryNewsStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryNewsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.read().await.news.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Lowercased term list of a free-text query.
fn terms(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Relevance of `record` for `terms`, or `None` when the weighted document
/// does not match every term.
fn relevance(record: &NewsRecord, terms: &[String]) -> Option<f32> {
    if terms.is_empty() {
        return None;
    }
    let title = record.title.to_lowercase();
    let body = record.body.search_text().to_lowercase();

    let mut rank = 0.0;
    for term in terms {
        let in_title = title.contains(term.as_str());
        let in_body = body.contains(term.as_str());
        if !in_title && !in_body {
            return None;
        }
        if in_title {
            rank += TITLE_RANK_WEIGHT;
        }
        if in_body {
            rank += BODY_RANK_WEIGHT;
        }
    }
    Some(rank)
}

fn matches_free_text(record: &NewsRecord, text: &str) -> bool {
    let needle = text.to_lowercase();
    relevance(record, &terms(text)).is_some()
        || record.title.to_lowercase().contains(&needle)
        || record.body.search_text().to_lowercase().contains(&needle)
        || record.tag_names().any(|name| name == text)
}

fn matches(record: &NewsRecord, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Active(active) => record.active == *active,
        Predicate::UserId(user_id) => record.user_id.as_deref() == Some(user_id.as_str()),
        Predicate::IsMailed(is_mailed) => record.is_mailed == *is_mailed,
        Predicate::ActiveFromBefore(before) => record.active_from < *before,
        Predicate::AnyTag(tags) => record
            .tag_names()
            .any(|name| tags.iter().any(|t| t.as_str() == name)),
        Predicate::FreeText(text) => matches_free_text(record, text),
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn compare_field(a: &NewsRecord, b: &NewsRecord, field: SortField) -> Ordering {
    match field {
        SortField::ActiveFrom => a.active_from.cmp(&b.active_from),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Title => a.title.cmp(&b.title),
        SortField::Id => a.id.cmp(&b.id),
    }
}

#[async_trait]
impl NewsRepository for MemoryNewsStore {
    async fn query(&self, spec: &SearchSpec) -> Result<ResultPage> {
        let state = self.state.read().await;

        let mut hits: Vec<(&NewsRecord, f32)> = state
            .news
            .values()
            .filter(|record| spec.predicates.iter().all(|p| matches(record, p)))
            .map(|record| (record, 0.0))
            .collect();

        match &spec.sort {
            SortKey::Field { field, order } => {
                hits.sort_by(|(a, _), (b, _)| {
                    directed(compare_field(a, b, *field), *order).then_with(|| b.id.cmp(&a.id))
                });
            }
            SortKey::Relevance { text, order } => {
                let terms = terms(text);
                for (record, rank) in hits.iter_mut() {
                    *rank = relevance(*record, &terms).unwrap_or(0.0);
                }
                hits.sort_by(|(a, ra), (b, rb)| {
                    directed(ra.partial_cmp(rb).unwrap_or(Ordering::Equal), *order)
                        .then_with(|| b.id.cmp(&a.id))
                });
            }
        }

        let total = hits.len() as i64;
        let offset = usize::try_from(spec.offset)
            .map_err(|_| Error::InvalidInput(format!("invalid offset {}", spec.offset)))?;
        let limit = usize::try_from(spec.limit)
            .map_err(|_| Error::InvalidInput(format!("invalid limit {}", spec.limit)))?;

        let records: Vec<NewsRecord> = hits
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(record, _)| record.clone())
            .collect();

        debug!(
            subsystem = "db",
            component = "memory",
            op = "query",
            result_count = records.len(),
            total = total,
            "Listing query complete"
        );

        Ok(ResultPage { records, total })
    }

    async fn fetch(&self, id: Uuid) -> Result<NewsRecord> {
        self.state
            .read()
            .await
            .news
            .get(&id)
            .cloned()
            .ok_or(Error::NewsNotFound(id))
    }

    async fn fetch_published_by_slug(
        &self,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<NewsRecord> {
        self.state
            .read()
            .await
            .news
            .values()
            .find(|r| r.slug == slug && r.active && r.active_from < now)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("news with slug {}", slug)))
    }

    async fn insert(&self, record: &NewsRecord) -> Result<NewsRecord> {
        let mut state = self.state.write().await;
        if state.news.contains_key(&record.id) {
            return Err(Error::InvalidInput(format!(
                "news {} already exists",
                record.id
            )));
        }
        if state.news.values().any(|r| r.slug == record.slug) {
            return Err(Error::InvalidInput(format!(
                "slug {} already in use",
                record.slug
            )));
        }
        let mut stored = record.clone();
        stored.tags = state.canonical_tags(&record.tags);
        state.news.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, record: &NewsRecord) -> Result<NewsRecord> {
        let mut state = self.state.write().await;
        if !state.news.contains_key(&record.id) {
            return Err(Error::NewsNotFound(record.id));
        }
        if state
            .news
            .values()
            .any(|r| r.slug == record.slug && r.id != record.id)
        {
            return Err(Error::InvalidInput(format!(
                "slug {} already in use",
                record.slug
            )));
        }
        let mut stored = record.clone();
        stored.tags = state.canonical_tags(&record.tags);
        state.news.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.state
            .write()
            .await
            .news
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::NewsNotFound(id))
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .news
            .values()
            .any(|r| r.slug == slug && Some(r.id) != exclude_id))
    }

    async fn remove_all(&self) -> Result<()> {
        self.state.write().await.news.clear();
        Ok(())
    }
}

#[async_trait]
impl TagRepository for MemoryNewsStore {
    async fn list(&self) -> Result<Vec<Tag>> {
        Ok(self.state.read().await.tags.values().cloned().collect())
    }

    async fn resolve_id(&self, name: &str) -> Result<Uuid> {
        Ok(self
            .state
            .read()
            .await
            .tags
            .get(name)
            .map(|t| t.id)
            .unwrap_or_else(Uuid::now_v7))
    }

    async fn remove_all(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.tags.clear();
        for record in state.news.values_mut() {
            record.tags.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use newsdesk_core::NewsText;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
    }

    fn record(title: &str, text: &str, tags: &[&str], hours: i64) -> NewsRecord {
        let at = base_time() + Duration::hours(hours);
        NewsRecord {
            id: Uuid::now_v7(),
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            author: "desk".to_string(),
            user_id: None,
            active: true,
            active_from: at,
            created_at: at,
            body: NewsText::new(text),
            text_json: None,
            tags: tags
                .iter()
                .map(|n| Tag {
                    id: Uuid::now_v7(),
                    name: n.to_string(),
                })
                .collect(),
            is_important: false,
            is_mailed: false,
        }
    }

    fn spec(predicates: Vec<Predicate>, sort: SortKey) -> SearchSpec {
        SearchSpec {
            predicates,
            sort,
            offset: 0,
            limit: 20,
        }
    }

    fn by_active_from() -> SortKey {
        SortKey::Field {
            field: SortField::ActiveFrom,
            order: SortOrder::Desc,
        }
    }

    #[tokio::test]
    async fn test_free_text_matches_title_body_and_tag() {
        let store = MemoryNewsStore::new();
        store.insert(&record("Budget news", "x", &[], 0)).await.unwrap();
        store.insert(&record("Other", "<p>the budget</p>", &[], 1)).await.unwrap();
        store.insert(&record("Third", "nothing", &["budget"], 2)).await.unwrap();
        store.insert(&record("Fourth", "unrelated", &[], 3)).await.unwrap();

        let page = store
            .query(&spec(
                vec![Predicate::FreeText("budget".to_string())],
                by_active_from(),
            ))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_relevance_ranks_title_above_body() {
        let store = MemoryNewsStore::new();
        let body_hit = record("Plain", "storm warning", &[], 5);
        let title_hit = record("Storm ahead", "details", &[], 0);
        store.insert(&body_hit).await.unwrap();
        store.insert(&title_hit).await.unwrap();

        let page = store
            .query(&spec(
                vec![Predicate::FreeText("storm".to_string())],
                SortKey::Relevance {
                    text: "storm".to_string(),
                    order: SortOrder::Desc,
                },
            ))
            .await
            .unwrap();
        assert_eq!(page.records[0].id, title_hit.id);
        assert_eq!(page.records[1].id, body_hit.id);
    }

    #[tokio::test]
    async fn test_pagination_and_total() {
        let store = MemoryNewsStore::new();
        for i in 0..5 {
            store
                .insert(&record(&format!("News {}", i), "body", &[], i))
                .await
                .unwrap();
        }
        let mut s = spec(vec![], by_active_from());
        s.offset = 1;
        s.limit = 2;
        let page = store.query(&s).await.unwrap();
        assert_eq!(page.total, 5);
        let titles: Vec<_> = page.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["News 3", "News 2"]);
    }

    #[tokio::test]
    async fn test_ties_break_on_id_descending() {
        let store = MemoryNewsStore::new();
        let a = record("Same A", "b", &[], 0);
        let b = record("Same B", "b", &[], 0);
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();
        let page = store.query(&spec(vec![], by_active_from())).await.unwrap();
        let expected_first = if a.id > b.id { a.id } else { b.id };
        assert_eq!(page.records[0].id, expected_first);
    }

    #[tokio::test]
    async fn test_any_tag_and_scalar_predicates() {
        let store = MemoryNewsStore::new();
        let mut draft = record("Draft", "b", &["alpha"], 0);
        draft.active = false;
        let live = record("Live", "b", &["alpha", "beta"], 1);
        let untagged = record("Untagged", "b", &[], 2);
        store.insert(&draft).await.unwrap();
        store.insert(&live).await.unwrap();
        store.insert(&untagged).await.unwrap();

        let page = store
            .query(&spec(
                vec![
                    Predicate::Active(true),
                    Predicate::AnyTag(vec!["alpha".to_string(), "gamma".to_string()]),
                ],
                by_active_from(),
            ))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].id, live.id);

        let page = store
            .query(&spec(
                vec![Predicate::ActiveFromBefore(base_time() + Duration::hours(1))],
                by_active_from(),
            ))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].id, draft.id);
    }

    #[tokio::test]
    async fn test_tags_are_shared_by_name() {
        let store = MemoryNewsStore::new();
        store.insert(&record("One", "b", &["shared"], 0)).await.unwrap();
        store.insert(&record("Two", "b", &["shared"], 1)).await.unwrap();

        let tags = TagRepository::list(&store).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(store.resolve_id("shared").await.unwrap(), tags[0].id);
        assert_ne!(store.resolve_id("fresh").await.unwrap(), tags[0].id);
    }

    #[tokio::test]
    async fn test_published_by_slug() {
        let store = MemoryNewsStore::new();
        let live = record("Live", "b", &[], 0);
        let mut draft = record("Draft", "b", &[], 0);
        draft.active = false;
        store.insert(&live).await.unwrap();
        store.insert(&draft).await.unwrap();

        let now = base_time() + Duration::minutes(1);
        assert_eq!(
            store.fetch_published_by_slug("live", now).await.unwrap().id,
            live.id
        );
        assert!(store.fetch_published_by_slug("draft", now).await.is_err());
        assert!(store
            .fetch_published_by_slug("live", base_time())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_update_delete_missing() {
        let store = MemoryNewsStore::new();
        let r = record("Ghost", "b", &[], 0);
        assert!(matches!(
            store.update(&r).await.unwrap_err(),
            Error::NewsNotFound(_)
        ));
        assert!(matches!(
            store.delete(r.id).await.unwrap_err(),
            Error::NewsNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_slug_exists_excludes_self() {
        let store = MemoryNewsStore::new();
        let r = record("Taken", "b", &[], 0);
        store.insert(&r).await.unwrap();
        assert!(store.slug_exists("taken", None).await.unwrap());
        assert!(!store.slug_exists("taken", Some(r.id)).await.unwrap());
        assert!(!store.slug_exists("free", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_returns_stored_tag_ids() {
        let store = MemoryNewsStore::new();
        let first = store
            .insert(&record("One", "b", &["shared"], 0))
            .await
            .unwrap();
        // a second writer that resolved the name before the first insert landed
        let second = store
            .insert(&record("Two", "b", &["shared"], 1))
            .await
            .unwrap();
        assert_eq!(second.tags, first.tags);
    }

    #[tokio::test]
    async fn test_record_matching_several_tags_listed_once() {
        let store = MemoryNewsStore::new();
        store
            .insert(&record("Both", "b", &["alpha", "beta"], 0))
            .await
            .unwrap();
        let spec = SearchSpec {
            predicates: vec![Predicate::AnyTag(vec!["alpha".into(), "beta".into()])],
            sort: SortKey::Field {
                field: SortField::ActiveFrom,
                order: SortOrder::Desc,
            },
            offset: 0,
            limit: 20,
        };
        let page = store.query(&spec).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records.len(), 1);
    }
}
