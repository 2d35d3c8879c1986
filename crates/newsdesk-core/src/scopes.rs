//! Capability scopes granted to a caller for the news entity.
//!
//! Scopes arrive from the authorization source as strings. They are parsed into
//! the closed [`Scope`] enum at the boundary so that policy code never compares
//! raw strings.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// A single capability on news records.
///
/// No scope implies another: holding `UpdateActive` says nothing about
/// `UpdateDeactivated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Read published records. Callers always send it; it grants nothing beyond the public default.
    ShowActive,
    /// Read drafts (`active = false`).
    ShowDeactivated,
    /// Read records whose `active_from` lies in the future.
    ShowDelayed,
    /// Filter listings by owner or visibility mode.
    Filter,
    Create,
    UpdateActive,
    UpdateDeactivated,
    DeleteActive,
    DeleteDeactivated,
    /// Open the public detail page (lookup by slug).
    ShowNewsDetail,
}

impl Scope {
    pub const ALL: [Scope; 10] = [
        Scope::ShowActive,
        Scope::ShowDeactivated,
        Scope::ShowDelayed,
        Scope::Filter,
        Scope::Create,
        Scope::UpdateActive,
        Scope::UpdateDeactivated,
        Scope::DeleteActive,
        Scope::DeleteDeactivated,
        Scope::ShowNewsDetail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::ShowActive => "show_active",
            Scope::ShowDeactivated => "show_deactivated",
            Scope::ShowDelayed => "show_delayed",
            Scope::Filter => "filter",
            Scope::Create => "create",
            Scope::UpdateActive => "update_active",
            Scope::UpdateDeactivated => "update_deactivated",
            Scope::DeleteActive => "delete_active",
            Scope::DeleteDeactivated => "delete_deactivated",
            Scope::ShowNewsDetail => "show_news_detail",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Scope::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown scope: {}", s)))
    }
}

/// Mutating verbs whose required scope depends on the record's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationVerb {
    Update,
    Delete,
}

impl MutationVerb {
    /// The exact scope needed to apply this verb to a record with the given `active` flag.
    pub fn required_scope(self, active: bool) -> Scope {
        match (self, active) {
            (MutationVerb::Update, true) => Scope::UpdateActive,
            (MutationVerb::Update, false) => Scope::UpdateDeactivated,
            (MutationVerb::Delete, true) => Scope::DeleteActive,
            (MutationVerb::Delete, false) => Scope::DeleteDeactivated,
        }
    }
}

impl fmt::Display for MutationVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationVerb::Update => f.write_str("update"),
            MutationVerb::Delete => f.write_str("delete"),
        }
    }
}

/// The caller's resolved scopes plus the identity they act as.
///
/// Scopes are kept in a `BTreeSet` so iteration order is stable, which the
/// request fingerprint relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeSet {
    #[serde(default)]
    scopes: BTreeSet<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse scope names, rejecting anything outside the vocabulary.
    pub fn parse_strict<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let scopes = names
            .into_iter()
            .map(|name| name.as_ref().parse::<Scope>())
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self {
            scopes,
            user_id: None,
        })
    }

    /// Parse scope names, dropping names this service does not know.
    ///
    /// Authorization sources hand out scopes for many services; unknown names
    /// grant nothing here.
    pub fn parse_lenient<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut scopes = BTreeSet::new();
        for name in names {
            match name.as_ref().parse::<Scope>() {
                Ok(scope) => {
                    scopes.insert(scope);
                }
                Err(_) => {
                    tracing::trace!(scope = name.as_ref(), "Ignoring unknown scope");
                }
            }
        }
        Self {
            scopes,
            user_id: None,
        }
    }

    /// Attach the caller's identity (stored as owner on created records).
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with(mut self, scope: Scope) -> Self {
        self.scopes.insert(scope);
        self
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Scopes in stable order.
    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.scopes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = Scope>>(iter: T) -> Self {
        Self {
            scopes: iter.into_iter().collect(),
            user_id: None,
        }
    }
}

/// Wire shapes accepted for a caller's scopes.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientScopes {
    /// Bare list of scope names, as authorization sources send them.
    Names(Vec<String>),
    /// The serialized form of [`ScopeSet`] itself.
    Full {
        #[serde(default)]
        scopes: Vec<String>,
        #[serde(default)]
        user_id: Option<String>,
    },
}

/// Deserialize scopes leniently (unknown names are dropped).
///
/// Accepts either a bare list of names or the map [`ScopeSet`] serializes to,
/// so a serialized request reads back with its scopes and user id intact.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> std::result::Result<ScopeSet, D::Error>
where
    D: Deserializer<'de>,
{
    match LenientScopes::deserialize(deserializer)? {
        LenientScopes::Names(names) => Ok(ScopeSet::parse_lenient(names)),
        LenientScopes::Full { scopes, user_id } => {
            let mut set = ScopeSet::parse_lenient(scopes);
            set.user_id = user_id;
            Ok(set)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_round_trips_through_name() {
        for scope in Scope::ALL {
            assert_eq!(scope.as_str().parse::<Scope>().unwrap(), scope);
        }
    }

    #[test]
    fn test_unknown_scope_is_rejected_strictly() {
        let err = ScopeSet::parse_strict(["show_deactivated", "show_everything"]).unwrap_err();
        assert!(err.to_string().contains("show_everything"));
    }

    #[test]
    fn test_unknown_scope_is_dropped_leniently() {
        let set = ScopeSet::parse_lenient(["show_deactivated", "promo_create"]);
        assert_eq!(set.len(), 1);
        assert!(set.contains(Scope::ShowDeactivated));
    }

    #[test]
    fn test_iteration_order_is_stable() {
        let a = ScopeSet::parse_lenient(["filter", "show_delayed", "show_active"]);
        let b = ScopeSet::parse_lenient(["show_active", "filter", "show_delayed"]);
        assert_eq!(a.iter().collect::<Vec<_>>(), b.iter().collect::<Vec<_>>());
        assert_eq!(a, b);
    }

    #[test]
    fn test_required_scope_has_no_sibling_fallback() {
        assert_eq!(
            MutationVerb::Update.required_scope(true),
            Scope::UpdateActive
        );
        assert_eq!(
            MutationVerb::Update.required_scope(false),
            Scope::UpdateDeactivated
        );
        assert_eq!(
            MutationVerb::Delete.required_scope(true),
            Scope::DeleteActive
        );
        assert_eq!(
            MutationVerb::Delete.required_scope(false),
            Scope::DeleteDeactivated
        );
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&Scope::ShowNewsDetail).unwrap();
        assert_eq!(json, "\"show_news_detail\"");
    }

    #[test]
    fn test_lenient_deserializer() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "deserialize_lenient")]
            scopes: ScopeSet,
        }
        let w: Wrapper =
            serde_json::from_str(r#"{"scopes":["create","unknown","filter"]}"#).unwrap();
        assert!(w.scopes.contains(Scope::Create));
        assert!(w.scopes.contains(Scope::Filter));
        assert_eq!(w.scopes.len(), 2);
    }

    #[test]
    fn test_lenient_deserializer_reads_serialized_form() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "deserialize_lenient")]
            scopes: ScopeSet,
        }
        let set = ScopeSet::parse_lenient(["filter", "show_active"]).with_user_id("editor-1");
        let json = format!(r#"{{"scopes":{}}}"#, serde_json::to_string(&set).unwrap());
        let w: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(w.scopes, set);
        assert_eq!(w.scopes.user_id(), Some("editor-1"));
    }
}
