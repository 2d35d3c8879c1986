//! SQL compilation of listing search specs.
//!
//! [`NewsQueryBuilder`] turns a [`SearchSpec`] into parameterized SQL for the
//! `news n` table alias. Only values travel as bind parameters; column names
//! and sort directions come from closed enums.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use newsdesk_core::defaults::{BODY_WEIGHT_LABEL, TITLE_WEIGHT_LABEL};
use newsdesk_core::{Predicate, SearchSpec, SortField, SortKey};

use crate::escape_like;

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Uuid(Uuid),
    BigInt(i64),
    Timestamp(DateTime<Utc>),
    Bool(bool),
    String(String),
    /// Array of strings (tag names).
    StringArray(Vec<String>),
}

/// Compiled listing query.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// WHERE clause body; `TRUE` when the spec has no predicates.
    pub where_sql: String,
    /// Parameters referenced by `where_sql`, starting at `$1`.
    pub where_params: Vec<QueryParam>,
    /// ORDER BY clause body, always ending with the id tiebreak.
    pub order_sql: String,
    /// Extra parameters referenced only by `order_sql`, numbered after `where_params`.
    pub order_params: Vec<QueryParam>,
    pub limit: i64,
    pub offset: i64,
}

impl CompiledQuery {
    /// `SELECT COUNT(*)` over every match.
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM news n WHERE {}", self.where_sql)
    }

    /// One page of matching rows; binds `where_params`, `order_params`, limit, offset.
    pub fn page_sql(&self, columns: &str) -> String {
        let next = self.where_params.len() + self.order_params.len();
        format!(
            "SELECT {} FROM news n WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
            columns,
            self.where_sql,
            self.order_sql,
            next + 1,
            next + 2
        )
    }
}

/// Generates SQL for a [`SearchSpec`].
///
/// ```rust,ignore
/// let builder = NewsQueryBuilder::new(&spec, "russian");
/// let compiled = builder.build();
/// // compiled.where_sql: "n.active = $1 AND n.active_from < $2"
/// ```
pub struct NewsQueryBuilder<'a> {
    spec: &'a SearchSpec,
    text_search_config: &'a str,
}

/// Parameter slots shared by the text predicate and the relevance sort.
struct TextSlots {
    text: String,
    config_idx: usize,
    text_idx: usize,
}

impl<'a> NewsQueryBuilder<'a> {
    pub fn new(spec: &'a SearchSpec, text_search_config: &'a str) -> Self {
        Self {
            spec,
            text_search_config,
        }
    }

    pub fn build(&self) -> CompiledQuery {
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        let mut text_slots: Option<TextSlots> = None;

        for predicate in &self.spec.predicates {
            match predicate {
                Predicate::Active(active) => {
                    params.push(QueryParam::Bool(*active));
                    clauses.push(format!("n.active = ${}", params.len()));
                }
                Predicate::UserId(user_id) => {
                    params.push(QueryParam::String(user_id.clone()));
                    clauses.push(format!("n.user_id = ${}", params.len()));
                }
                Predicate::IsMailed(is_mailed) => {
                    params.push(QueryParam::Bool(*is_mailed));
                    clauses.push(format!("n.is_mailed = ${}", params.len()));
                }
                Predicate::ActiveFromBefore(before) => {
                    params.push(QueryParam::Timestamp(*before));
                    clauses.push(format!("n.active_from < ${}", params.len()));
                }
                Predicate::AnyTag(tags) => {
                    params.push(QueryParam::StringArray(tags.clone()));
                    clauses.push(format!(
                        "EXISTS (SELECT 1 FROM news_tag nt JOIN tag t ON t.id = nt.tag_id \
                         WHERE nt.news_id = n.id AND t.name = ANY(${}::text[]))",
                        params.len()
                    ));
                }
                Predicate::FreeText(text) => {
                    let slots = self.text_slots(text, &mut params);
                    params.push(QueryParam::String(format!("%{}%", escape_like(text))));
                    let like_idx = params.len();
                    clauses.push(format!(
                        "({doc} @@ plainto_tsquery(${cfg}::regconfig, ${txt}) \
                         OR n.title ILIKE ${like} \
                         OR n.search_text ILIKE ${like} \
                         OR EXISTS (SELECT 1 FROM news_tag nt JOIN tag t ON t.id = nt.tag_id \
                         WHERE nt.news_id = n.id AND t.name = ${txt}))",
                        doc = weighted_document(slots.config_idx),
                        cfg = slots.config_idx,
                        txt = slots.text_idx,
                        like = like_idx,
                    ));
                    text_slots = Some(slots);
                }
            }
        }

        let where_sql = if clauses.is_empty() {
            "TRUE".to_string()
        } else {
            clauses.join(" AND ")
        };

        let where_len = params.len();
        let order_sql = match &self.spec.sort {
            SortKey::Field { field, order } => {
                let column = sort_column(*field);
                if *field == SortField::Id {
                    format!("{} {}", column, order.as_sql())
                } else {
                    format!("{} {}, n.id DESC", column, order.as_sql())
                }
            }
            SortKey::Relevance { text, order } => {
                let slots = match text_slots {
                    Some(slots) if slots.text == *text => slots,
                    _ => self.text_slots(text, &mut params),
                };
                format!(
                    "ts_rank({doc}, plainto_tsquery(${cfg}::regconfig, ${txt})) {dir}, n.id DESC",
                    doc = weighted_document(slots.config_idx),
                    cfg = slots.config_idx,
                    txt = slots.text_idx,
                    dir = order.as_sql(),
                )
            }
        };
        let order_params = params.split_off(where_len);

        CompiledQuery {
            where_sql,
            where_params: params,
            order_sql,
            order_params,
            limit: self.spec.limit,
            offset: self.spec.offset,
        }
    }

    fn text_slots(&self, text: &str, params: &mut Vec<QueryParam>) -> TextSlots {
        params.push(QueryParam::String(self.text_search_config.to_string()));
        let config_idx = params.len();
        params.push(QueryParam::String(text.to_string()));
        let text_idx = params.len();
        TextSlots {
            text: text.to_string(),
            config_idx,
            text_idx,
        }
    }
}

/// Title weighted above search text.
fn weighted_document(config_idx: usize) -> String {
    format!(
        "(setweight(to_tsvector(${cfg}::regconfig, n.title), '{title}') || \
         setweight(to_tsvector(${cfg}::regconfig, n.search_text), '{body}'))",
        cfg = config_idx,
        title = TITLE_WEIGHT_LABEL,
        body = BODY_WEIGHT_LABEL,
    )
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::ActiveFrom => "n.active_from",
        SortField::CreatedAt => "n.created_at",
        SortField::Title => "n.title",
        SortField::Id => "n.id",
    }
}
