//! Method dispatch engine for the Garnet runtime.
//!
//! A dynamically-typed call `recv.name(args)` goes through a call-site
//! [`DispatchCache`](ops::method_dispatch::DispatchCache):
//!
//! ```text
//!   receiver ──► MetaClassResolver ──► effective class
//!                                         │
//!            ┌────────────────────────────┴──────────────┐
//!            │ guard chain (insertion order, ≤ N entries)│
//!            └───────┬───────────────────────┬───────────┘
//!                hit │                       │ miss
//!                    ▼                       ▼
//!            cached MethodEntry       MethodLookup (ancestors walk)
//!                                            │
//!                            found ──► install entry or go megamorphic
//!                        not found ──► method_missing protocol
//! ```
//!
//! Once a site has seen more than N receiver classes it stops caching and
//! routes every call through the shared
//! [`UncachedDispatcher`](ops::method_dispatch::UncachedDispatcher).
//! Foreign receivers bypass class dispatch entirely.
//!
//! [`RuntimeContext`] owns the class arena, the lookup cache and the
//! safepoint manager, and is the [`RuntimeHost`](garnet_runtime::RuntimeHost)
//! handed to method bodies.

pub mod context;
pub mod inline_cache;
pub mod kernel;
pub mod ops;
pub mod options;
pub mod safepoint;

pub use context::RuntimeContext;
pub use inline_cache::{CacheEntry, CacheGuard, CacheState, CacheStateKind, CachedTarget};
pub use ops::method_dispatch::{
    DispatchAction, DispatchCache, DispatchConfiguration, Dispatched, LookupResult, MethodCache,
    MethodLookup, MissingBehavior, UncachedDispatcher,
};
pub use options::{OptionsError, RuntimeOptions};
pub use safepoint::{PauseGuard, SafepointManager};
