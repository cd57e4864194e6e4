//! Dispatch without call-site memoization.
//!
//! Every call does a fresh lookup (through the context's lookup cache when
//! enabled). Used by megamorphic call sites, by reflective `send` with a
//! dynamic name, and by embedders that have no call site to hand.

use super::Dispatched;
use super::config::DispatchConfiguration;
use super::foreign_call::dispatch_foreign;
use super::lookup::LookupResult;
use super::method_missing::{LookupMiss, handle_missing};
use crate::context::RuntimeContext;
use garnet_runtime::{Block, MethodEntry, RubyResult, Symbol, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared uncached dispatcher.
#[derive(Debug, Default)]
pub struct UncachedDispatcher {
    dispatches: AtomicU64,
}

impl UncachedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll for safepoints, then dispatch.
    pub fn dispatch(
        &self,
        ctx: &RuntimeContext,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
        block: Option<&Block>,
        config: &DispatchConfiguration,
    ) -> RubyResult<Dispatched> {
        ctx.safepoints().poll()?;
        self.dispatch_polled(ctx, receiver, name, args, block, config)
    }

    /// Dispatch for a caller that has already polled.
    pub(crate) fn dispatch_polled(
        &self,
        ctx: &RuntimeContext,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
        block: Option<&Block>,
        config: &DispatchConfiguration,
    ) -> RubyResult<Dispatched> {
        self.dispatches.fetch_add(1, Ordering::Relaxed);

        if let Value::Foreign(foreign) = receiver {
            return dispatch_foreign(foreign, name, args, config);
        }

        let class = ctx.effective_class_of(receiver);
        match ctx.lookup().lookup(class, name, config) {
            LookupResult::Found(entry) => invoke_entry(ctx, &entry, receiver, args, block, config),
            _ => {
                let miss = LookupMiss {
                    receiver,
                    name,
                    args,
                    block,
                };
                handle_missing(ctx, miss, config)
            }
        }
    }

    /// Number of dispatches performed.
    pub fn dispatches(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }
}

/// Apply `config`'s action to a resolved method.
#[inline]
pub(crate) fn invoke_entry(
    ctx: &RuntimeContext,
    entry: &MethodEntry,
    receiver: &Value,
    args: &[Value],
    block: Option<&Block>,
    config: &DispatchConfiguration,
) -> RubyResult<Dispatched> {
    if config.is_respond_to() {
        return Ok(Dispatched::Responds(!entry.is_unimplemented()));
    }
    entry
        .invoke(ctx, receiver, args, block)
        .map(Dispatched::Returned)
}
