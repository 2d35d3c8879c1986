//! Domain models: news records, tags, listing requests and result pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::markup::strip_markup;
use crate::scopes::{self, ScopeSet};

// =============================================================================
// TAGS
// =============================================================================

/// A tag shared between news records; unique by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

// =============================================================================
// NEWS RECORDS
// =============================================================================

/// Record body together with its search projection.
///
/// The search text is derived from the raw text when the body is built and is
/// carried unchanged from then on; there is no setter for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsText {
    text: String,
    search_text: String,
}

impl NewsText {
    /// Build a body from freshly written text, deriving the search projection.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let search_text = strip_markup(&text);
        Self { text, search_text }
    }

    /// Rebuild a body from values previously produced by [`NewsText::new`] and
    /// persisted by a storage backend.
    pub fn from_stored(text: String, search_text: String) -> Self {
        Self { text, search_text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }
}

/// A news record as stored and returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub author: String,
    /// Owner identity; the `user_id` listing filter matches against it.
    pub user_id: Option<String>,
    pub active: bool,
    pub active_from: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: NewsText,
    /// Serialized state of the visual editor, stored verbatim.
    pub text_json: Option<String>,
    pub tags: Vec<Tag>,
    pub is_important: bool,
    pub is_mailed: bool,
}

impl NewsRecord {
    /// Whether the record is published and its publication time has passed.
    pub fn is_published_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.active_from <= now
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }
}

/// Caller-supplied content for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsDraft {
    pub title: String,
    pub author: String,
    pub active: bool,
    pub active_from: Option<DateTime<Utc>>,
    pub text: String,
    pub text_json: Option<String>,
    /// Tag names; ids are resolved by name when the draft is persisted.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default)]
    pub is_mailed: bool,
}

// =============================================================================
// LISTING
// =============================================================================

/// Visibility filter on the `active` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityMode {
    /// Both published records and drafts.
    #[default]
    #[serde(alias = "")]
    Unset,
    Active,
    Inactive,
}

impl VisibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityMode::Unset => "unset",
            VisibilityMode::Active => "active",
            VisibilityMode::Inactive => "inactive",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filters a caller may put on a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    #[serde(default)]
    pub mode: VisibilityMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Only records with `active_from` strictly before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_from_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mailed: Option<bool>,
}

impl ListFilter {
    /// Whether the caller asked to filter on owner or visibility.
    pub fn uses_sensitive_fields(&self) -> bool {
        self.mode != VisibilityMode::Unset
            || self.user_id.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// A listing request.
///
/// `text` and `tags` are derived from `query` by the query parser; callers
/// leave them empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default)]
    pub query: String,
    #[serde(skip)]
    pub text: String,
    #[serde(skip)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub filter: ListFilter,
    /// Explicit sort field; empty means "choose by query".
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub order: Option<SortOrder>,
    #[serde(default)]
    pub offset: i64,
    /// Page size; 0 selects the default.
    #[serde(default)]
    pub limit: i64,
    #[serde(default, deserialize_with = "scopes::deserialize_lenient")]
    pub privileges: ScopeSet,
}

impl ListRequest {
    pub fn new(query: impl Into<String>, privileges: ScopeSet) -> Self {
        Self {
            query: query.into(),
            privileges,
            ..Default::default()
        }
    }
}

/// One page of listing results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub records: Vec<NewsRecord>,
    /// Number of matches before pagination.
    pub total: i64,
}
