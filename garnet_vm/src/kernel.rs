//! Reflective kernel methods installed at bootstrap.
//!
//! | Method | Owner | Visibility |
//! |---|---|---|
//! | `method_missing` | `BasicObject` | private |
//! | `__send__` | `BasicObject` | public |
//! | `send`, `public_send` | `Kernel` | public |
//! | `respond_to?` | `Kernel` | public |
//! | `respond_to_missing?` | `Kernel` | private |
//! | `class`, `singleton_class` | `Kernel` | public |

use garnet_runtime::{
    CallTarget, ClassArena, CoreLibrary, Invocation, MethodFlags, NoMethodReason, RubyError,
    RubyResult, Symbol, Value, Visibility, core_symbols, intern,
};

/// Install the kernel methods into the core classes.
pub fn install(classes: &ClassArena, core: &CoreLibrary) -> RubyResult<()> {
    let syms = core_symbols();
    let builtin = |owner, name, visibility, body: CallTarget| {
        classes
            .define_method_with_flags(owner, name, visibility, body, MethodFlags::BUILTIN)
            .map(|_| ())
    };

    builtin(core.basic_object, syms.method_missing, Visibility::Private, CallTarget::native(method_missing))?;
    builtin(core.basic_object, syms.underscore_send, Visibility::Public, CallTarget::native(send))?;
    builtin(core.kernel, syms.send, Visibility::Public, CallTarget::native(send))?;
    builtin(core.kernel, syms.public_send, Visibility::Public, CallTarget::native(public_send))?;
    builtin(core.kernel, syms.respond_to, Visibility::Public, CallTarget::native(respond_to))?;
    builtin(
        core.kernel,
        syms.respond_to_missing,
        Visibility::Private,
        CallTarget::native(respond_to_missing),
    )?;
    builtin(core.kernel, syms.class, Visibility::Public, CallTarget::native(class))?;
    builtin(core.kernel, syms.singleton_class, Visibility::Public, CallTarget::native(singleton_class))?;
    Ok(())
}

// =============================================================================
// Argument Helpers
// =============================================================================

fn check_arity(args: &[Value], min: usize, max: usize) -> RubyResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("{}+", min)
        } else {
            format!("{}..{}", min, max)
        };
        return Err(RubyError::wrong_arity(args.len(), &expected));
    }
    Ok(())
}

/// Method name argument: a symbol or a string.
fn method_name(value: &Value) -> RubyResult<Symbol> {
    match value {
        Value::Symbol(symbol) => Ok(*symbol),
        Value::String(name) => Ok(intern(name)),
        other => Err(RubyError::TypeError(format!(
            "{:?} is not a symbol nor a string",
            other
        ))),
    }
}

// =============================================================================
// Method Bodies
// =============================================================================

/// `BasicObject#method_missing(name, *args)`: always raises.
///
/// The reason is recomputed from a visibility-blind lookup so that calling a
/// private method reports "private method called" rather than "undefined".
fn method_missing(inv: &Invocation<'_>) -> RubyResult<Value> {
    let Some((first, rest)) = inv.args.split_first() else {
        return Err(RubyError::ArgumentError("no method name given".into()));
    };
    let name = method_name(first)?;

    let reason = match inv.host.find_method(inv.receiver, name) {
        Some(entry) => match entry.visibility() {
            Visibility::Private => NoMethodReason::PrivateCalled,
            Visibility::Protected => NoMethodReason::ProtectedCalled,
            Visibility::Public => NoMethodReason::Undefined,
        },
        None => NoMethodReason::Undefined,
    };

    Err(RubyError::NoMethodError {
        receiver: inv.host.core().describe_value(inv.host.classes(), inv.receiver),
        name,
        args: rest.to_vec(),
        reason,
    })
}

/// `__send__` / `send`: dispatch ignoring visibility.
fn send(inv: &Invocation<'_>) -> RubyResult<Value> {
    check_arity(inv.args, 1, usize::MAX)?;
    let name = method_name(&inv.args[0])?;
    inv.host.send(inv.receiver, name, &inv.args[1..], inv.block, true)
}

/// `public_send`: dispatch public methods only.
fn public_send(inv: &Invocation<'_>) -> RubyResult<Value> {
    check_arity(inv.args, 1, usize::MAX)?;
    let name = method_name(&inv.args[0])?;
    inv.host.send(inv.receiver, name, &inv.args[1..], inv.block, false)
}

/// `respond_to?(name, include_all = false)`.
fn respond_to(inv: &Invocation<'_>) -> RubyResult<Value> {
    check_arity(inv.args, 1, 2)?;
    let name = method_name(&inv.args[0])?;
    let include_all = inv.args.get(1).is_some_and(Value::is_truthy);

    if inv.host.responds_to(inv.receiver, name, include_all)? {
        return Ok(Value::Bool(true));
    }

    let hook = core_symbols().respond_to_missing;
    if !inv.host.responds_to(inv.receiver, hook, true)? {
        return Ok(Value::Bool(false));
    }
    let answer = inv.host.send(
        inv.receiver,
        hook,
        &[Value::Symbol(name), Value::Bool(include_all)],
        None,
        true,
    )?;
    Ok(Value::Bool(answer.is_truthy()))
}

/// `respond_to_missing?(name, include_all)`: false unless overridden.
fn respond_to_missing(inv: &Invocation<'_>) -> RubyResult<Value> {
    check_arity(inv.args, 2, 2)?;
    Ok(Value::Bool(false))
}

fn class(inv: &Invocation<'_>) -> RubyResult<Value> {
    check_arity(inv.args, 0, 0)?;
    Ok(Value::Module(inv.host.core().class_of(inv.host.classes(), inv.receiver)))
}

fn singleton_class(inv: &Invocation<'_>) -> RubyResult<Value> {
    check_arity(inv.args, 0, 0)?;
    inv.host
        .core()
        .singleton_class_of(inv.host.classes(), inv.receiver)
        .map(Value::Module)
}
