//! Access policy for news records, evaluated against the caller's scopes.
//!
//! The policy is stateless: each decision depends only on its arguments and the
//! current time from the injected [`Clock`].

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ListRequest, NewsRecord, VisibilityMode};
use crate::scopes::{MutationVerb, Scope, ScopeSet};

/// Source of "now" for publication checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a fixed instant (tests, replays).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Authorization decisions for listing, reading and mutating news.
pub trait AccessPolicy: Send + Sync {
    /// Whether the caller may see drafts.
    fn can_see_drafts(&self, scopes: &ScopeSet) -> bool;

    /// Whether the caller may see records scheduled for the future.
    fn can_see_delayed(&self, scopes: &ScopeSet) -> bool;

    /// Whether the caller may filter by owner or visibility mode.
    fn can_filter_by_sensitive_fields(&self, scopes: &ScopeSet) -> bool;

    /// Reject forbidden filters and force the visibility limits the caller is
    /// subject to.
    fn apply_listing_defaults(&self, request: ListRequest) -> Result<ListRequest>;

    /// Check that the caller may read `record`.
    fn authorize_read(&self, scopes: &ScopeSet, record: &NewsRecord) -> Result<()>;

    fn authorize_create(&self, scopes: &ScopeSet) -> Result<()>;

    /// Check the exact `{verb}_active` / `{verb}_deactivated` scope for `record`.
    fn authorize_mutate(
        &self,
        scopes: &ScopeSet,
        record: &NewsRecord,
        verb: MutationVerb,
    ) -> Result<()>;

    fn authorize_detail_view(&self, scopes: &ScopeSet) -> Result<()>;

    /// Current time as seen by the policy.
    fn now(&self) -> DateTime<Utc>;
}

/// Scope-set based policy.
#[derive(Clone)]
pub struct ScopeAccessPolicy {
    clock: Arc<dyn Clock>,
}

impl Default for ScopeAccessPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScopeAccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeAccessPolicy").finish_non_exhaustive()
    }
}

impl ScopeAccessPolicy {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn require(scopes: &ScopeSet, scope: Scope) -> Result<()> {
        if scopes.contains(scope) {
            Ok(())
        } else {
            debug!(
                subsystem = "access",
                op = "require",
                scope = %scope,
                "Permission denied"
            );
            Err(Error::permission_denied())
        }
    }
}

impl AccessPolicy for ScopeAccessPolicy {
    fn can_see_drafts(&self, scopes: &ScopeSet) -> bool {
        scopes.contains(Scope::ShowDeactivated)
    }

    fn can_see_delayed(&self, scopes: &ScopeSet) -> bool {
        scopes.contains(Scope::ShowDelayed)
    }

    fn can_filter_by_sensitive_fields(&self, scopes: &ScopeSet) -> bool {
        scopes.contains(Scope::Filter)
    }

    fn apply_listing_defaults(&self, mut request: ListRequest) -> Result<ListRequest> {
        let scopes = &request.privileges;

        if request.filter.uses_sensitive_fields() && !self.can_filter_by_sensitive_fields(scopes)
        {
            debug!(
                subsystem = "access",
                op = "apply_listing_defaults",
                mode = request.filter.mode.as_str(),
                "Sensitive filter without filter scope"
            );
            return Err(Error::permission_denied());
        }

        let see_drafts = self.can_see_drafts(scopes);
        let see_delayed = self.can_see_delayed(scopes);

        if !see_drafts {
            request.filter.mode = VisibilityMode::Active;
        }
        if !see_delayed {
            // Whole seconds keep the bound stable within a second, so requests
            // arriving together share a fingerprint.
            request.filter.active_from_before = Some(self.clock.now().trunc_subsecs(0));
        }

        Ok(request)
    }

    fn authorize_read(&self, scopes: &ScopeSet, record: &NewsRecord) -> Result<()> {
        if !record.active && !self.can_see_drafts(scopes) {
            return Err(Error::permission_denied());
        }
        if record.active_from > self.clock.now() && !self.can_see_delayed(scopes) {
            return Err(Error::permission_denied());
        }
        Ok(())
    }

    fn authorize_create(&self, scopes: &ScopeSet) -> Result<()> {
        Self::require(scopes, Scope::Create)
    }

    fn authorize_mutate(
        &self,
        scopes: &ScopeSet,
        record: &NewsRecord,
        verb: MutationVerb,
    ) -> Result<()> {
        Self::require(scopes, verb.required_scope(record.active))
    }

    fn authorize_detail_view(&self, scopes: &ScopeSet) -> Result<()> {
        Self::require(scopes, Scope::ShowNewsDetail)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListFilter, NewsText};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap() + Duration::milliseconds(750)
    }

    fn policy() -> ScopeAccessPolicy {
        ScopeAccessPolicy::with_clock(Arc::new(FixedClock(fixed_now())))
    }

    fn record(active: bool, active_from: DateTime<Utc>) -> NewsRecord {
        NewsRecord {
            id: Uuid::nil(),
            title: "t".to_string(),
            slug: "t".to_string(),
            author: "a".to_string(),
            user_id: None,
            active,
            active_from,
            created_at: active_from,
            body: NewsText::new("body"),
            text_json: None,
            tags: vec![],
            is_important: false,
            is_mailed: false,
        }
    }

    fn scopes(names: &[&str]) -> ScopeSet {
        ScopeSet::parse_strict(names.iter().copied()).unwrap()
    }

    #[test]
    fn test_capability_checks() {
        let p = policy();
        let none = ScopeSet::new();
        let all = scopes(&["show_deactivated", "show_delayed", "filter"]);
        assert!(!p.can_see_drafts(&none));
        assert!(!p.can_see_delayed(&none));
        assert!(!p.can_filter_by_sensitive_fields(&none));
        assert!(p.can_see_drafts(&all));
        assert!(p.can_see_delayed(&all));
        assert!(p.can_filter_by_sensitive_fields(&all));
    }

    #[test]
    fn test_defaults_for_unprivileged_caller() {
        let req = ListRequest::new("hello", scopes(&["show_active"]));
        let req = policy().apply_listing_defaults(req).unwrap();
        assert_eq!(req.filter.mode, VisibilityMode::Active);
        assert_eq!(
            req.filter.active_from_before,
            Some(fixed_now().trunc_subsecs(0))
        );
    }

    #[test]
    fn test_defaults_leave_privileged_caller_alone() {
        let req = ListRequest::new(
            "hello",
            scopes(&["show_deactivated", "show_delayed", "filter"]),
        );
        let req = policy().apply_listing_defaults(req).unwrap();
        assert_eq!(req.filter.mode, VisibilityMode::Unset);
        assert_eq!(req.filter.active_from_before, None);
    }

    #[test]
    fn test_drafts_only_without_delayed() {
        let req = ListRequest::new("", scopes(&["show_deactivated"]));
        let req = policy().apply_listing_defaults(req).unwrap();
        assert_eq!(req.filter.mode, VisibilityMode::Unset);
        assert!(req.filter.active_from_before.is_some());
    }

    #[test]
    fn test_mode_filter_requires_filter_scope() {
        let mut req = ListRequest::new("", scopes(&["show_deactivated", "show_delayed"]));
        req.filter = ListFilter {
            mode: VisibilityMode::Inactive,
            ..Default::default()
        };
        let err = policy().apply_listing_defaults(req).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_user_filter_requires_filter_scope() {
        let mut req = ListRequest::new("", ScopeSet::new());
        req.filter.user_id = Some("owner-1".to_string());
        assert!(policy().apply_listing_defaults(req).is_err());
    }

    #[test]
    fn test_filter_scope_allows_filter_but_still_forces_active() {
        let mut req = ListRequest::new("", scopes(&["filter"]));
        req.filter.mode = VisibilityMode::Inactive;
        req.filter.user_id = Some("owner-1".to_string());
        let req = policy().apply_listing_defaults(req).unwrap();
        assert_eq!(req.filter.mode, VisibilityMode::Active);
        assert_eq!(req.filter.user_id.as_deref(), Some("owner-1"));
    }

    #[test]
    fn test_explicit_before_is_replaced_without_delayed_scope() {
        let mut req = ListRequest::new("", ScopeSet::new());
        req.filter.active_from_before = Some(fixed_now() + Duration::days(30));
        let req = policy().apply_listing_defaults(req).unwrap();
        assert_eq!(
            req.filter.active_from_before,
            Some(fixed_now().trunc_subsecs(0))
        );
    }

    #[test]
    fn test_authorize_read_matches_invariant_for_all_combinations() {
        let p = policy();
        let now = fixed_now();
        let scope_sets = [
            ScopeSet::new(),
            scopes(&["show_deactivated"]),
            scopes(&["show_delayed"]),
            scopes(&["show_deactivated", "show_delayed"]),
        ];
        let records = [
            record(true, now - Duration::hours(1)),
            record(true, now),
            record(true, now + Duration::hours(1)),
            record(false, now - Duration::hours(1)),
            record(false, now + Duration::hours(1)),
        ];
        for s in &scope_sets {
            for r in &records {
                let expected = (r.active || s.contains(Scope::ShowDeactivated))
                    && (r.active_from <= now || s.contains(Scope::ShowDelayed));
                assert_eq!(
                    p.authorize_read(s, r).is_ok(),
                    expected,
                    "scopes {:?}, active {}, from {}",
                    s,
                    r.active,
                    r.active_from
                );
            }
        }
    }

    #[test]
    fn test_authorize_create() {
        let p = policy();
        assert!(p.authorize_create(&scopes(&["create"])).is_ok());
        assert!(p.authorize_create(&scopes(&["update_active"])).is_err());
    }

    #[test]
    fn test_authorize_mutate_requires_exact_scope() {
        let p = policy();
        let now = fixed_now();
        let active = record(true, now);
        let draft = record(false, now);

        let update_active = scopes(&["update_active"]);
        assert!(p
            .authorize_mutate(&update_active, &active, MutationVerb::Update)
            .is_ok());
        assert!(p
            .authorize_mutate(&update_active, &draft, MutationVerb::Update)
            .is_err());

        let update_draft = scopes(&["update_deactivated"]);
        assert!(p
            .authorize_mutate(&update_draft, &draft, MutationVerb::Update)
            .is_ok());
        assert!(p
            .authorize_mutate(&update_draft, &active, MutationVerb::Update)
            .is_err());

        let delete_both = scopes(&["delete_active", "delete_deactivated"]);
        assert!(p
            .authorize_mutate(&delete_both, &active, MutationVerb::Delete)
            .is_ok());
        assert!(p
            .authorize_mutate(&delete_both, &draft, MutationVerb::Delete)
            .is_ok());
        assert!(p
            .authorize_mutate(&delete_both, &active, MutationVerb::Update)
            .is_err());
    }

    #[test]
    fn test_authorize_detail_view() {
        let p = policy();
        assert!(p
            .authorize_detail_view(&scopes(&["show_news_detail"]))
            .is_ok());
        assert!(p.authorize_detail_view(&scopes(&["show_active"])).is_err());
    }
}
