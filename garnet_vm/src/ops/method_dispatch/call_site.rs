//! Call-site dispatch cache.
//!
//! Each dynamically-typed call expression owns one [`DispatchCache`]. The
//! hot path reads the site's chain under a shared lock, finds the first
//! entry whose guard holds and compares its generation with the class's
//! current one:
//!
//! ```text
//! execute(recv, name)
//!   ├─ poll safepoint
//!   ├─ foreign receiver ───────────────► foreign delegate
//!   ├─ megamorphic ────────────────────► UncachedDispatcher
//!   ├─ guard hit + fresh generation ───► invoke cached method
//!   └─ miss
//!        ├─ lookup found ──► install (≤ N) or go megamorphic, invoke
//!        └─ not found ─────► method_missing protocol
//! ```
//!
//! # Concurrency
//!
//! Installs take the site's write lock and recompute the next state from
//! the current one, so concurrent misses cannot push the chain past N. The
//! generation used for an entry is read before its lookup begins; if a
//! redefinition lands during the lookup the entry is already stale and is
//! purged on the next install.

use super::Dispatched;
use super::config::DispatchConfiguration;
use super::foreign_call::dispatch_foreign;
use super::lookup::LookupResult;
use super::method_missing::{LookupMiss, handle_missing};
use super::uncached::invoke_entry;
use crate::context::RuntimeContext;
use crate::inline_cache::{CacheEntry, CacheGuard, CacheState, CacheStateKind, CachedTarget};
use garnet_runtime::{Block, ClassId, RubyError, RubyResult, Symbol, Value};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, error};

// =============================================================================
// Statistics
// =============================================================================

/// Per-site counters.
#[derive(Debug, Default)]
pub struct CallSiteStats {
    accesses: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    megamorphic: AtomicU64,
}

impl CallSiteStats {
    /// Dispatches through this site (foreign receivers included).
    pub fn accesses(&self) -> u64 {
        self.accesses.load(Ordering::Relaxed)
    }

    /// Guard hits on a fresh entry.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Guard misses and stale entries.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Dispatches routed to the uncached path after degradation.
    pub fn megamorphic(&self) -> u64 {
        self.megamorphic.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Dispatch Cache
// =============================================================================

/// Inline cache for one call site.
pub struct DispatchCache {
    id: u32,
    config: DispatchConfiguration,
    limit: usize,
    state: RwLock<CacheState>,
    /// Set once the state becomes megamorphic; lets the hot path skip the lock.
    megamorphic: AtomicBool,
    stats: CallSiteStats,
}

impl DispatchCache {
    /// Create an empty site holding at most `limit` entries.
    pub fn new(id: u32, config: DispatchConfiguration, limit: usize) -> Self {
        Self {
            id,
            config,
            limit,
            state: RwLock::new(CacheState::Empty),
            megamorphic: AtomicBool::new(false),
            stats: CallSiteStats::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn config(&self) -> &DispatchConfiguration {
        &self.config
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn state_kind(&self) -> CacheStateKind {
        self.state.read().kind()
    }

    pub fn entry_count(&self) -> usize {
        self.state.read().len()
    }

    /// Guarded classes in chain order.
    pub fn cached_classes(&self) -> Vec<ClassId> {
        self.state
            .read()
            .entries()
            .iter()
            .map(|entry| entry.guard().class)
            .collect()
    }

    #[inline]
    pub fn is_megamorphic(&self) -> bool {
        self.megamorphic.load(Ordering::Acquire)
    }

    #[inline]
    pub fn stats(&self) -> &CallSiteStats {
        &self.stats
    }

    /// Guard hit rate as a percentage; 0.0 before any dispatch.
    pub fn hit_rate(&self) -> f64 {
        let accesses = self.stats.accesses();
        if accesses == 0 {
            0.0
        } else {
            (self.stats.hits() as f64 / accesses as f64) * 100.0
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatch `name` on `receiver` through this site.
    pub fn execute(
        &self,
        ctx: &RuntimeContext,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
        block: Option<&Block>,
    ) -> RubyResult<Dispatched> {
        ctx.safepoints().poll()?;
        self.stats.accesses.fetch_add(1, Ordering::Relaxed);

        if let Value::Foreign(foreign) = receiver {
            return dispatch_foreign(foreign, name, args, &self.config);
        }

        if self.is_megamorphic() {
            self.stats.megamorphic.fetch_add(1, Ordering::Relaxed);
            return ctx
                .uncached()
                .dispatch_polled(ctx, receiver, name, args, block, &self.config);
        }

        let class = ctx.effective_class_of(receiver);
        let generation = ctx.classes().record(class)?.current_generation();

        if let Some(target) = self.guard_hit(class, name, generation) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return self.run(ctx, &target, receiver, name, args, block);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        self.miss(ctx, class, generation, receiver, name, args, block)
    }

    /// `CALL` convenience: the returned value.
    pub fn call(
        &self,
        ctx: &RuntimeContext,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
    ) -> RubyResult<Value> {
        self.execute(ctx, receiver, name, args, None)
            .map(Dispatched::into_value)
    }

    /// `RESPOND_TO` convenience. Only valid on a `RESPOND_TO` site; a `CALL`
    /// site would run the method body.
    pub fn respond_to(&self, ctx: &RuntimeContext, receiver: &Value, name: Symbol) -> RubyResult<bool> {
        if !self.config.is_respond_to() {
            error!(site = self.id, name = %name, "respond_to on a CALL site");
            return Err(RubyError::InternalInvariantViolation(format!(
                "call site {} is not a respond_to? site",
                self.id
            )));
        }
        self.execute(ctx, receiver, name, &[], None)
            .map(Dispatched::into_bool)
    }

    #[inline]
    fn guard_hit(&self, class: ClassId, name: Symbol, generation: u64) -> Option<CachedTarget> {
        let state = self.state.read();
        state
            .find_entry(class, name)
            .filter(|entry| entry.is_fresh(generation))
            .map(|entry| entry.target().clone())
    }

    fn run(
        &self,
        ctx: &RuntimeContext,
        target: &CachedTarget,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
        block: Option<&Block>,
    ) -> RubyResult<Dispatched> {
        match target {
            CachedTarget::Method(entry) => invoke_entry(ctx, entry, receiver, args, block, &self.config),
            CachedTarget::NotFound => {
                let miss = LookupMiss {
                    receiver,
                    name,
                    args,
                    block,
                };
                handle_missing(ctx, miss, &self.config)
            }
        }
    }

    #[cold]
    #[allow(clippy::too_many_arguments)]
    fn miss(
        &self,
        ctx: &RuntimeContext,
        class: ClassId,
        generation: u64,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
        block: Option<&Block>,
    ) -> RubyResult<Dispatched> {
        let guard = CacheGuard::new(class, name);
        match ctx.lookup().lookup(class, name, &self.config) {
            LookupResult::Found(entry) => {
                self.install(ctx, CacheEntry::new(guard, CachedTarget::Method(entry.clone()), generation))?;
                invoke_entry(ctx, &entry, receiver, args, block, &self.config)
            }
            _ => {
                if self.config.is_respond_to() {
                    self.install(ctx, CacheEntry::new(guard, CachedTarget::NotFound, generation))?;
                }
                let miss = LookupMiss {
                    receiver,
                    name,
                    args,
                    block,
                };
                handle_missing(ctx, miss, &self.config)
            }
        }
    }

    /// Add `entry` to the chain, purging stale entries first.
    fn install(&self, ctx: &RuntimeContext, entry: CacheEntry) -> RubyResult<()> {
        let mut state = self.state.write();
        if state.is_megamorphic() {
            return Ok(());
        }

        let classes = ctx.classes();
        let before = state.kind();
        let next = state
            .retain_fresh(|class| classes.get(class).map(|record| record.current_generation()))
            .with_entry(entry, self.limit);

        if next.len() > self.limit {
            error!(site = self.id, entries = next.len(), limit = self.limit, "call-site chain over limit");
            return Err(RubyError::InternalInvariantViolation(format!(
                "call site {} holds {} entries (limit {})",
                self.id,
                next.len(),
                self.limit
            )));
        }

        let after = next.kind();
        if after != before {
            debug!(site = self.id, from = %before, to = %after, entries = next.len(), "call-site transition");
        }
        if next.is_megamorphic() {
            self.megamorphic.store(true, Ordering::Release);
            debug!(site = self.id, limit = self.limit, "call site degraded to uncached dispatch");
        }
        *state = next;
        Ok(())
    }
}

impl std::fmt::Debug for DispatchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCache")
            .field("id", &self.id)
            .field("state", &self.state_kind())
            .field("entries", &self.entry_count())
            .field("limit", &self.limit)
            .finish()
    }
}
