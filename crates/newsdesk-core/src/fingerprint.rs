//! Request fingerprints used as result-cache keys.
//!
//! The digest covers the whole normalized request including the caller's
//! scope set: callers with different scopes never share a cache entry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::defaults;
use crate::models::{ListRequest, SortOrder};
use crate::query::parse_query;

/// Bumped whenever the digest input layout changes.
const FINGERPRINT_VERSION: &[u8] = b"newsdesk-list-v2";

/// Hex-encoded SHA-256 digest of a normalized listing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a request after access defaults have been applied.
    ///
    /// Normalization:
    /// - `query` is reduced to its parsed text and tag list, so queries that
    ///   differ only in whitespace or discarded short hashtags coincide
    /// - `limit = 0` is replaced by the default page size
    /// - scopes are hashed in their canonical order
    ///
    /// The caller's user id is not part of the digest; listing results do not
    /// depend on it.
    pub fn of(request: &ListRequest) -> Self {
        let parsed = parse_query(&request.query);
        let limit = defaults::effective_limit(request.limit);

        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_VERSION);

        write_field(&mut hasher, b"text", parsed.text.as_bytes());
        write_field(
            &mut hasher,
            b"tags",
            &(parsed.tags.len() as u64).to_be_bytes(),
        );
        for tag in &parsed.tags {
            write_field(&mut hasher, b"tag", tag.as_bytes());
        }

        let filter = &request.filter;
        write_field(&mut hasher, b"mode", filter.mode.as_str().as_bytes());
        write_optional(&mut hasher, b"user_id", filter.user_id.as_deref().map(str::as_bytes));
        write_optional(
            &mut hasher,
            b"active_from_before",
            filter
                .active_from_before
                .map(|t| instant_bytes(&t))
                .as_ref()
                .map(|b| b.as_slice()),
        );
        write_optional(
            &mut hasher,
            b"is_mailed",
            filter.is_mailed.map(|m| if m { b"1" } else { b"0" }).map(|b| b.as_slice()),
        );

        write_field(&mut hasher, b"sort", request.sort.trim().as_bytes());
        let order = match request.order {
            None => b"".as_slice(),
            Some(SortOrder::Asc) => b"asc".as_slice(),
            Some(SortOrder::Desc) => b"desc".as_slice(),
        };
        write_field(&mut hasher, b"order", order);
        write_field(&mut hasher, b"offset", &request.offset.to_be_bytes());
        write_field(&mut hasher, b"limit", &limit.to_be_bytes());

        write_field(
            &mut hasher,
            b"scopes",
            &(request.privileges.len() as u64).to_be_bytes(),
        );
        for scope in request.privileges.iter() {
            write_field(&mut hasher, b"scope", scope.as_str().as_bytes());
        }

        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length-prefixed framing so no two field sequences share a byte stream.
fn write_field(hasher: &mut Sha256, name: &[u8], value: &[u8]) {
    hasher.update((name.len() as u32).to_be_bytes());
    hasher.update(name);
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value);
}

fn write_optional(hasher: &mut Sha256, name: &[u8], value: Option<&[u8]>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            write_field(hasher, name, v);
        }
        None => {
            hasher.update([0u8]);
            write_field(hasher, name, b"");
        }
    }
}

/// Seconds and sub-second nanos; exact over chrono's whole range.
fn instant_bytes(at: &DateTime<Utc>) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[..8].copy_from_slice(&at.timestamp().to_be_bytes());
    out[8..].copy_from_slice(&at.timestamp_subsec_nanos().to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VisibilityMode;
    use crate::scopes::{Scope, ScopeSet};
    use chrono::{TimeZone, Utc};

    fn base() -> ListRequest {
        let mut req = ListRequest::new("hello #tagone", ScopeSet::new().with(Scope::ShowActive));
        req.filter.mode = VisibilityMode::Active;
        req.filter.active_from_before = Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        req
    }

    #[test]
    fn test_identical_requests_share_fingerprint() {
        assert_eq!(Fingerprint::of(&base()), Fingerprint::of(&base()));
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = Fingerprint::of(&base());
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_privileges_change_fingerprint() {
        let mut privileged = base();
        privileged.privileges = ScopeSet::parse_strict([
            "show_active",
            "show_deactivated",
            "show_delayed",
            "filter",
        ])
        .unwrap();
        assert_ne!(Fingerprint::of(&base()), Fingerprint::of(&privileged));
    }

    #[test]
    fn test_scope_insertion_order_is_irrelevant() {
        let mut a = base();
        a.privileges = ScopeSet::parse_strict(["filter", "show_delayed"]).unwrap();
        let mut b = base();
        b.privileges = ScopeSet::parse_strict(["show_delayed", "filter"]).unwrap();
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_user_id_does_not_split_cache() {
        let mut a = base();
        a.privileges = a.privileges.clone().with_user_id("alice");
        let mut b = base();
        b.privileges = b.privileges.clone().with_user_id("bob");
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_each_field_changes_fingerprint() {
        let original = Fingerprint::of(&base());
        let variants: Vec<Box<dyn Fn(&mut ListRequest)>> = vec![
            Box::new(|r| r.query = "other #tagone".into()),
            Box::new(|r| r.query = "hello #tagtwo".into()),
            Box::new(|r| r.filter.mode = VisibilityMode::Inactive),
            Box::new(|r| r.filter.user_id = Some("u".into())),
            Box::new(|r| r.filter.active_from_before = None),
            Box::new(|r| r.filter.is_mailed = Some(false)),
            Box::new(|r| r.sort = "title".into()),
            Box::new(|r| r.order = Some(SortOrder::Asc)),
            Box::new(|r| r.offset = 20),
            Box::new(|r| r.limit = 5),
        ];
        for (i, mutate) in variants.iter().enumerate() {
            let mut req = base();
            mutate(&mut req);
            assert_ne!(Fingerprint::of(&req), original, "variant {} collided", i);
        }
    }

    #[test]
    fn test_mailed_true_and_false_differ() {
        let mut yes = base();
        yes.filter.is_mailed = Some(true);
        let mut no = base();
        no.filter.is_mailed = Some(false);
        assert_ne!(Fingerprint::of(&yes), Fingerprint::of(&no));
    }

    #[test]
    fn test_tag_order_matters() {
        let mut a = base();
        a.query = "#alpha #beta".into();
        let mut b = base();
        b.query = "#beta #alpha".into();
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_query_whitespace_is_normalized() {
        let mut a = base();
        a.query = "  hello    #tagone ".into();
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&base()));
    }

    #[test]
    fn test_default_limit_is_normalized() {
        let mut zero = base();
        zero.limit = 0;
        let mut explicit = base();
        explicit.limit = defaults::PAGE_LIMIT;
        assert_eq!(Fingerprint::of(&zero), Fingerprint::of(&explicit));
    }

    #[test]
    fn test_text_and_tag_cannot_alias() {
        let mut a = base();
        a.query = "abc".into();
        let mut b = base();
        b.query = "#abc".into();
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_far_future_bounds_stay_distinct() {
        let at = |year| Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let mut a = ListRequest::new("", ScopeSet::new());
        let mut b = a.clone();
        a.filter.active_from_before = Some(at(2300));
        b.filter.active_from_before = Some(at(2400));
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }
}
