//! News repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, trace};
use uuid::Uuid;

use newsdesk_core::defaults::TEXT_SEARCH_CONFIG;
use newsdesk_core::{
    Error, NewsRecord, NewsRepository, NewsText, Result, ResultPage, SearchSpec, Tag,
};

use crate::search_filter::{NewsQueryBuilder, QueryParam};

const NEWS_COLUMNS: &str = "n.id, n.title, n.slug, n.author, n.user_id, n.active, \
     n.active_from, n.created_at, n.text, n.search_text, n.text_json, \
     n.is_important, n.is_mailed";

/// PostgreSQL implementation of NewsRepository.
pub struct PgNewsRepository {
    pool: Pool<Postgres>,
    text_search_config: String,
}

impl PgNewsRepository {
    /// Create a new PgNewsRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            text_search_config: TEXT_SEARCH_CONFIG.to_string(),
        }
    }

    /// Use a different PostgreSQL text-search configuration for relevance matching.
    pub fn with_text_search_config(mut self, config: impl Into<String>) -> Self {
        self.text_search_config = config.into();
        self
    }

    /// Load tags for a batch of records in one round trip.
    async fn load_tags(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT nt.news_id, t.id, t.name
            FROM news_tag nt
            JOIN tag t ON t.id = nt.tag_id
            WHERE nt.news_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut by_news: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in rows {
            by_news
                .entry(row.get("news_id"))
                .or_default()
                .push(Tag {
                    id: row.get("id"),
                    name: row.get("name"),
                });
        }
        Ok(by_news)
    }

    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<NewsRecord>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.get("id")).collect();
        let mut tags = self.load_tags(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                row_to_record(row, tags.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    async fn fetch_one(&self, sql: &str, params: &[QueryParam]) -> Result<Option<NewsRecord>> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

fn bind_params<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    params: &'q [QueryParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        q = match param {
            QueryParam::Uuid(id) => q.bind(id),
            QueryParam::BigInt(v) => q.bind(v),
            QueryParam::Timestamp(ts) => q.bind(ts),
            QueryParam::Bool(b) => q.bind(b),
            QueryParam::String(s) => q.bind(s),
            QueryParam::StringArray(arr) => q.bind(arr),
        };
    }
    q
}

fn row_to_record(row: PgRow, tags: Vec<Tag>) -> NewsRecord {
    NewsRecord {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        author: row.get("author"),
        user_id: row.get("user_id"),
        active: row.get("active"),
        active_from: row.get("active_from"),
        created_at: row.get("created_at"),
        body: NewsText::from_stored(row.get("text"), row.get("search_text")),
        text_json: row.get("text_json"),
        tags,
        is_important: row.get("is_important"),
        is_mailed: row.get("is_mailed"),
    }
}

/// Ensure each tag exists by name and link it to the record.
///
/// Returns the tags as stored, ordered by name. A tag whose name already
/// exists keeps its stored id even when a concurrent writer created it under a
/// different id than the one in `tags`.
async fn link_tags(
    tx: &mut Transaction<'_, Postgres>,
    news_id: Uuid,
    tags: &[Tag],
) -> Result<Vec<Tag>> {
    let mut linked = Vec::with_capacity(tags.len());
    for tag in tags {
        // DO UPDATE rather than DO NOTHING so RETURNING yields the existing row
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO tag (id, name) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(tag.id)
        .bind(&tag.name)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("INSERT INTO news_tag (news_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(news_id)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        linked.push(Tag {
            id,
            name: tag.name.clone(),
        });
    }
    linked.sort_by(|a, b| a.name.cmp(&b.name));
    linked.dedup_by(|a, b| a.id == b.id);
    Ok(linked)
}

#[async_trait]
impl NewsRepository for PgNewsRepository {
    async fn query(&self, spec: &SearchSpec) -> Result<ResultPage> {
        let compiled = NewsQueryBuilder::new(spec, &self.text_search_config).build();

        let count_sql = compiled.count_sql();
        trace!(subsystem = "db", component = "news", sql = %count_sql, "Count query");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for param in &compiled.where_params {
            count_q = match param {
                QueryParam::Uuid(id) => count_q.bind(id),
                QueryParam::BigInt(v) => count_q.bind(v),
                QueryParam::Timestamp(ts) => count_q.bind(ts),
                QueryParam::Bool(b) => count_q.bind(b),
                QueryParam::String(s) => count_q.bind(s),
                QueryParam::StringArray(arr) => count_q.bind(arr),
            };
        }
        let total = count_q
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let page_sql = compiled.page_sql(NEWS_COLUMNS);
        trace!(subsystem = "db", component = "news", sql = %page_sql, "Page query");
        let mut page_q = bind_params(sqlx::query(&page_sql), &compiled.where_params);
        page_q = bind_params(page_q, &compiled.order_params);
        page_q = page_q.bind(compiled.limit).bind(compiled.offset);

        let rows = page_q
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        let records = self.hydrate(rows).await?;

        debug!(
            subsystem = "db",
            component = "news",
            op = "query",
            result_count = records.len(),
            total = total,
            "Listing query complete"
        );

        Ok(ResultPage { records, total })
    }

    async fn fetch(&self, id: Uuid) -> Result<NewsRecord> {
        let sql = format!("SELECT {} FROM news n WHERE n.id = $1", NEWS_COLUMNS);
        self.fetch_one(&sql, &[QueryParam::Uuid(id)])
            .await?
            .ok_or(Error::NewsNotFound(id))
    }

    async fn fetch_published_by_slug(
        &self,
        slug: &str,
        now: DateTime<Utc>,
    ) -> Result<NewsRecord> {
        let sql = format!(
            "SELECT {} FROM news n WHERE n.slug = $1 AND n.active AND n.active_from < $2",
            NEWS_COLUMNS
        );
        let params = [
            QueryParam::String(slug.to_string()),
            QueryParam::Timestamp(now),
        ];
        self.fetch_one(&sql, &params)
            .await?
            .ok_or_else(|| Error::NotFound(format!("news with slug {}", slug)))
    }

    async fn insert(&self, record: &NewsRecord) -> Result<NewsRecord> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            r#"
            INSERT INTO news (id, title, slug, author, user_id, active, active_from,
                              created_at, text, search_text, text_json, is_important, is_mailed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.author)
        .bind(&record.user_id)
        .bind(record.active)
        .bind(record.active_from)
        .bind(record.created_at)
        .bind(record.body.text())
        .bind(record.body.search_text())
        .bind(&record.text_json)
        .bind(record.is_important)
        .bind(record.is_mailed)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let tags = link_tags(&mut tx, record.id, &record.tags).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(NewsRecord {
            tags,
            ..record.clone()
        })
    }

    async fn update(&self, record: &NewsRecord) -> Result<NewsRecord> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let result = sqlx::query(
            r#"
            UPDATE news
            SET title = $2, slug = $3, author = $4, active = $5, active_from = $6,
                text = $7, search_text = $8, text_json = $9, is_important = $10,
                is_mailed = $11
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.slug)
        .bind(&record.author)
        .bind(record.active)
        .bind(record.active_from)
        .bind(record.body.text())
        .bind(record.body.search_text())
        .bind(&record.text_json)
        .bind(record.is_important)
        .bind(record.is_mailed)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NewsNotFound(record.id));
        }

        sqlx::query("DELETE FROM news_tag WHERE news_id = $1")
            .bind(record.id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let tags = link_tags(&mut tx, record.id, &record.tags).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(NewsRecord {
            tags,
            ..record.clone()
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // news_tag rows go with the record through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NewsNotFound(id));
        }
        Ok(())
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<Uuid>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM news WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn remove_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query("DELETE FROM news_tag")
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query("DELETE FROM news")
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
