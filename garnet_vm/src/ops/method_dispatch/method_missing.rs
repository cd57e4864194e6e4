//! The `method_missing` protocol.
//!
//! When ordinary lookup fails, a `CALL` dispatch looks up `method_missing`
//! on the receiver, ignoring visibility, and invokes it with the attempted
//! name prepended to the original arguments. `BasicObject#method_missing`
//! raises `NoMethodError`; user classes override it to respond to
//! arbitrary names.
//!
//! `RESPOND_TO` never consults the hook and `ReturnMissing` sites stop
//! before it. The hook decides how to describe the failure; the default
//! one classifies it from a visibility-blind lookup.

use super::Dispatched;
use super::config::DispatchConfiguration;
use crate::context::RuntimeContext;
use garnet_runtime::{Block, RubyError, RubyResult, Symbol, Value, core_symbols};
use smallvec::SmallVec;
use tracing::{error, trace};

/// A failed lookup, carried from the dispatcher to the protocol.
#[derive(Clone, Copy)]
pub struct LookupMiss<'a> {
    pub receiver: &'a Value,
    pub name: Symbol,
    pub args: &'a [Value],
    pub block: Option<&'a Block>,
}

/// Resolve a lookup miss according to `config`.
pub fn handle_missing(
    ctx: &RuntimeContext,
    miss: LookupMiss<'_>,
    config: &DispatchConfiguration,
) -> RubyResult<Dispatched> {
    if config.is_respond_to() {
        return Ok(Dispatched::Responds(false));
    }
    if config.returns_missing() {
        return Ok(Dispatched::Missing);
    }

    let hook_name = core_symbols().method_missing;
    let class = ctx.effective_class_of(miss.receiver);
    let Some(hook) = ctx.lookup().lookup_ignoring_visibility(class, hook_name).found() else {
        let receiver = ctx.core().describe_value(ctx.classes(), miss.receiver);
        error!(name = %miss.name, receiver = %receiver, "no method_missing in ancestors");
        return Err(RubyError::InternalInvariantViolation(format!(
            "method_missing not found for {} while dispatching '{}'",
            receiver, miss.name
        )));
    };

    trace!(name = %miss.name, owner = hook.owner().raw(), "routing to method_missing");
    let mut argv: SmallVec<[Value; 8]> = SmallVec::with_capacity(miss.args.len() + 1);
    argv.push(Value::Symbol(miss.name));
    argv.extend(miss.args.iter().cloned());

    hook.invoke(ctx, miss.receiver, &argv, miss.block)
        .map(Dispatched::Returned)
}
