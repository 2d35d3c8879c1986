//! # newsdesk-core
//!
//! Core types, traits and policies for the newsdesk listing engine.
//!
//! This crate holds everything that does not touch a concrete backend: the
//! domain models, the scope model and [`AccessPolicy`], the listing query
//! parser, request fingerprints, the storage-neutral [`SearchSpec`] and the
//! repository and cache traits the other crates implement.

pub mod access;
pub mod defaults;
pub mod error;
pub mod fingerprint;
pub mod markup;
pub mod models;
pub mod query;
pub mod scopes;
pub mod search;
pub mod slug;
pub mod traits;

// Re-export commonly used types at crate root
pub use access::{AccessPolicy, Clock, FixedClock, ScopeAccessPolicy, SystemClock};
pub use error::{Error, ErrorKind, Result};
pub use fingerprint::Fingerprint;
pub use markup::strip_markup;
pub use models::*;
pub use query::{parse_query, ParsedQuery};
pub use scopes::{MutationVerb, Scope, ScopeSet};
pub use search::{Predicate, SearchFilterBuilder, SearchSpec, SortField, SortKey};
pub use slug::{slug_candidate, slugify};
pub use traits::*;
