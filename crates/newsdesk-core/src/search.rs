//! Listing search specification and the builder that derives it from a request.
//!
//! A [`SearchSpec`] is a storage-neutral description of a listing query: a
//! conjunction of [`Predicate`]s, a sort key and a page window. Storage
//! engines translate it into their own query language.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{ListRequest, ResultPage, SortOrder, VisibilityMode};
use crate::traits::NewsRepository;

/// Columns a caller may sort by explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    ActiveFrom,
    CreatedAt,
    Title,
    Id,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::ActiveFrom => "active_from",
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::Id => "id",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "active_from" | "activeFrom" => Ok(SortField::ActiveFrom),
            "created_at" | "createdAt" | "date_create" | "dateCreate" => Ok(SortField::CreatedAt),
            "title" | "name" => Ok(SortField::Title),
            "id" => Ok(SortField::Id),
            other => Err(Error::InvalidInput(format!("unsupported sort field: {}", other))),
        }
    }
}

/// One conjunct of a listing predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// `active == value`.
    Active(bool),
    /// Owner identity equality.
    UserId(String),
    /// `is_mailed == value`.
    IsMailed(bool),
    /// `active_from < value`.
    ActiveFromBefore(DateTime<Utc>),
    /// The record carries at least one of the named tags.
    AnyTag(Vec<String>),
    /// Relevance match on the weighted title/body document, OR substring match
    /// in title, OR substring match in search text, OR exact tag-name equality.
    FreeText(String),
}

/// Primary ordering; the record id always breaks ties, descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    Field { field: SortField, order: SortOrder },
    Relevance { text: String, order: SortOrder },
}

/// Storage-neutral listing query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub predicates: Vec<Predicate>,
    pub sort: SortKey,
    pub offset: i64,
    pub limit: i64,
}

impl SearchSpec {
    /// The free-text term, when the spec carries one.
    pub fn free_text(&self) -> Option<&str> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::FreeText(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Builds a [`SearchSpec`] from a defaulted, parsed [`ListRequest`] and runs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchFilterBuilder;

impl SearchFilterBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Compose predicates, sort and pagination.
    ///
    /// `request.text` and `request.tags` must already hold the parser output.
    pub fn build(&self, request: &ListRequest) -> Result<SearchSpec> {
        if request.offset < 0 {
            return Err(Error::InvalidInput(format!(
                "offset must be non-negative, got {}",
                request.offset
            )));
        }
        if request.limit < 0 {
            return Err(Error::InvalidInput(format!(
                "limit must be non-negative, got {}",
                request.limit
            )));
        }

        let mut predicates = Vec::new();
        let filter = &request.filter;

        match filter.mode {
            VisibilityMode::Active => predicates.push(Predicate::Active(true)),
            VisibilityMode::Inactive => predicates.push(Predicate::Active(false)),
            VisibilityMode::Unset => {}
        }
        if let Some(user_id) = filter.user_id.as_deref().filter(|u| !u.is_empty()) {
            predicates.push(Predicate::UserId(user_id.to_string()));
        }
        if let Some(is_mailed) = filter.is_mailed {
            predicates.push(Predicate::IsMailed(is_mailed));
        }
        if let Some(before) = filter.active_from_before {
            predicates.push(Predicate::ActiveFromBefore(before));
        }
        if !request.tags.is_empty() {
            predicates.push(Predicate::AnyTag(request.tags.clone()));
        }

        let text = request.text.trim();
        if !text.is_empty() {
            predicates.push(Predicate::FreeText(text.to_string()));
        }

        let order = request.order.unwrap_or_default();
        let sort = if !request.sort.trim().is_empty() {
            SortKey::Field {
                field: request.sort.parse()?,
                order,
            }
        } else if !text.is_empty() {
            SortKey::Relevance {
                text: text.to_string(),
                order,
            }
        } else {
            SortKey::Field {
                field: SortField::ActiveFrom,
                order,
            }
        };

        let spec = SearchSpec {
            predicates,
            sort,
            offset: request.offset,
            limit: defaults::effective_limit(request.limit),
        };

        trace!(
            subsystem = "search",
            component = "filter_builder",
            predicates = spec.predicates.len(),
            sort = ?spec.sort,
            offset = spec.offset,
            limit = spec.limit,
            "Built search spec"
        );

        Ok(spec)
    }

    /// Build the spec and run it against `store`.
    pub async fn execute(
        &self,
        store: &dyn NewsRepository,
        request: &ListRequest,
    ) -> Result<ResultPage> {
        let spec = self.build(request)?;
        let page = store.query(&spec).await?;
        debug!(
            subsystem = "search",
            component = "filter_builder",
            op = "execute",
            result_count = page.records.len(),
            total = page.total,
            "Listing query executed"
        );
        Ok(page)
    }
}
