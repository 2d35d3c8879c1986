//! Listing query parsing: free text plus hashtags.
//!
//! A query such as `"budget  #finance #q3"` is split into the free-text part
//! (`"budget"`) and the hashtag list (`["finance"]`; `#q3` is too short).

use serde::{Deserialize, Serialize};

/// Minimum code-point length a hashtag needs (after stripping `#`) to count.
pub const MIN_TAG_CHARS: usize = 3;

/// Result of splitting a raw query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Non-hashtag terms joined by single spaces.
    pub text: String,
    /// Hashtags without the leading `#`, in first-occurrence order.
    pub tags: Vec<String>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.tags.is_empty()
    }
}

/// Split a raw query string into free text and hashtags.
///
/// # Rules
///
/// 1. Terms are separated by any run of whitespace; empty terms are dropped
/// 2. A term whose first character is `#` is a hashtag candidate
/// 3. A hashtag candidate with fewer than [`MIN_TAG_CHARS`] characters after
///    the `#` is discarded entirely; it does not fall back to free text
/// 4. All other terms form the free text
///
/// # Examples
///
/// ```
/// use newsdesk_core::query::parse_query;
///
/// let parsed = parse_query("a   #tag1  #tag2");
/// assert_eq!(parsed.text, "a");
/// assert_eq!(parsed.tags, vec!["tag1", "tag2"]);
///
/// assert!(parse_query("#ab").is_empty());
/// ```
pub fn parse_query(raw: &str) -> ParsedQuery {
    let mut text_terms: Vec<&str> = Vec::new();
    let mut tags = Vec::new();

    // split_whitespace trims, collapses runs and never yields empty terms
    for term in raw.split_whitespace() {
        if let Some(tag) = term.strip_prefix('#') {
            if tag.chars().count() >= MIN_TAG_CHARS {
                tags.push(tag.to_string());
            }
        } else {
            text_terms.push(term);
        }
    }

    ParsedQuery {
        text: text_terms.join(" "),
        tags,
    }
}
