//! Method dispatch: lookup, call-site caching and the `method_missing`
//! protocol.
//!
//! - **Three tiers**:
//!   1. Call-site cache (per site, guard chain of up to N entries)
//!   2. Lookup cache (per context, keyed by class and name)
//!   3. Full ancestor walk
//!
//! - **Two actions** share every tier: `CALL` invokes the resolved method,
//!   `RESPOND_TO` reports whether a callable method exists.
//!
//! - **Foreign receivers** skip all three tiers and go to the interop
//!   delegate.

pub mod call_site;
pub mod config;
pub mod foreign_call;
pub mod lookup;
pub mod meta_class;
pub mod method_cache;
pub mod method_missing;
pub mod uncached;

pub use call_site::{CallSiteStats, DispatchCache};
pub use config::{DispatchAction, DispatchConfiguration, MissingBehavior};
pub use lookup::{LookupResult, MethodLookup, WalkResult};
pub use meta_class::MetaClassResolver;
pub use method_cache::MethodCache;
pub use method_missing::LookupMiss;
pub use uncached::UncachedDispatcher;

use garnet_runtime::Value;

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// `CALL` returned a value.
    Returned(Value),
    /// `RESPOND_TO` answer.
    Responds(bool),
    /// Lookup failed under `MissingBehavior::ReturnMissing`.
    Missing,
}

impl Dispatched {
    /// Value of a call; `true`/`false` for `RESPOND_TO`, `nil` for missing.
    pub fn into_value(self) -> Value {
        match self {
            Dispatched::Returned(value) => value,
            Dispatched::Responds(answer) => Value::Bool(answer),
            Dispatched::Missing => Value::Nil,
        }
    }

    /// Boolean view: the `RESPOND_TO` answer or the value's truthiness.
    pub fn into_bool(self) -> bool {
        match self {
            Dispatched::Returned(value) => value.is_truthy(),
            Dispatched::Responds(answer) => answer,
            Dispatched::Missing => false,
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Dispatched::Missing)
    }
}
