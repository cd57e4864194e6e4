//! Runtime context: one isolated runtime instance.
//!
//! Owns the class arena, the core classes, the lookup cache, the shared
//! uncached dispatcher and the safepoint manager. Call sites are created
//! from a context and must only be executed against it.

use crate::kernel;
use crate::ops::method_dispatch::{
    DispatchAction, DispatchCache, DispatchConfiguration, Dispatched, MetaClassResolver,
    MethodCache, MethodLookup, MissingBehavior, UncachedDispatcher,
};
use crate::options::RuntimeOptions;
use crate::safepoint::SafepointManager;
use garnet_runtime::{
    Block, ClassArena, ClassId, CoreLibrary, MethodEntry, RObject, RubyResult, RuntimeHost, Symbol,
    Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// A runtime instance.
pub struct RuntimeContext {
    options: RuntimeOptions,
    classes: ClassArena,
    core: CoreLibrary,
    meta_class: MetaClassResolver,
    method_cache: MethodCache,
    uncached: UncachedDispatcher,
    safepoints: SafepointManager,
    next_site_id: AtomicU32,
}

impl RuntimeContext {
    /// Create a context with default options.
    pub fn new() -> RubyResult<Self> {
        Self::with_options(RuntimeOptions::default())
    }

    /// Create a context, bootstrapping the core classes and kernel methods.
    pub fn with_options(options: RuntimeOptions) -> RubyResult<Self> {
        options.log_options();

        let classes = ClassArena::new();
        let core = CoreLibrary::bootstrap(&classes)?;
        kernel::install(&classes, &core)?;

        Ok(Self {
            options,
            classes,
            core,
            meta_class: MetaClassResolver::new(core),
            method_cache: MethodCache::new(),
            uncached: UncachedDispatcher::new(),
            safepoints: SafepointManager::new(),
            next_site_id: AtomicU32::new(0),
        })
    }

    // =========================================================================
    // Components
    // =========================================================================

    #[inline]
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    #[inline]
    pub fn classes(&self) -> &ClassArena {
        &self.classes
    }

    #[inline]
    pub fn core(&self) -> &CoreLibrary {
        &self.core
    }

    #[inline]
    pub fn meta_class(&self) -> &MetaClassResolver {
        &self.meta_class
    }

    #[inline]
    pub fn method_cache(&self) -> &MethodCache {
        &self.method_cache
    }

    #[inline]
    pub fn uncached(&self) -> &UncachedDispatcher {
        &self.uncached
    }

    #[inline]
    pub fn safepoints(&self) -> &SafepointManager {
        &self.safepoints
    }

    /// Method lookup bound to this context's arena and lookup cache.
    #[inline]
    pub fn lookup(&self) -> MethodLookup<'_> {
        let cache = self.options.lookup_cache.then_some(&self.method_cache);
        MethodLookup::new(&self.classes, cache)
    }

    /// Effective class of `value`.
    #[inline]
    pub fn effective_class_of(&self, value: &Value) -> ClassId {
        self.meta_class.resolve(&self.classes, value)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Create a call site using the configured cache limit.
    pub fn new_call_site(&self, config: DispatchConfiguration) -> DispatchCache {
        self.new_call_site_with_limit(config, self.options.dispatch_cache_limit)
    }

    /// Create a call site with an explicit cache limit.
    pub fn new_call_site_with_limit(&self, config: DispatchConfiguration, limit: usize) -> DispatchCache {
        let id = self.next_site_id.fetch_add(1, Ordering::Relaxed);
        DispatchCache::new(id, config, limit)
    }

    /// Dispatch without a call site.
    pub fn dispatch(
        &self,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
        block: Option<&Block>,
        config: &DispatchConfiguration,
    ) -> RubyResult<Dispatched> {
        self.uncached
            .dispatch(self, receiver, name, args, block, config)
    }

    /// Whether `receiver` responds to `name` under `config`'s visibility.
    ///
    /// `config`'s action and missing behavior are ignored; this is always a
    /// `RESPOND_TO` dispatch with the same visibility filter.
    pub fn respond_to(
        &self,
        receiver: &Value,
        name: Symbol,
        config: &DispatchConfiguration,
    ) -> RubyResult<bool> {
        let respond = DispatchConfiguration {
            action: DispatchAction::RespondTo,
            missing_behavior: MissingBehavior::Raise,
            ..*config
        };
        self.dispatch(receiver, name, &[], None, &respond)
            .map(Dispatched::into_bool)
    }

    /// Explicit-receiver call: `receiver.name(*args)`.
    pub fn call(&self, receiver: &Value, name: Symbol, args: &[Value]) -> RubyResult<Value> {
        self.dispatch(receiver, name, args, None, &DispatchConfiguration::PUBLIC)
            .map(Dispatched::into_value)
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// Allocate an instance of `class`.
    pub fn new_object(&self, class: ClassId) -> Value {
        Value::Object(RObject::new(class))
    }

    /// Define a class whose superclass defaults to `Object`.
    pub fn define_class(&self, name: &str, superclass: Option<ClassId>) -> ClassId {
        self.classes
            .define_class(name, Some(superclass.unwrap_or(self.core.object)))
    }

    /// Singleton class of `value`, created on first request.
    pub fn singleton_class_of(&self, value: &Value) -> RubyResult<ClassId> {
        self.core.singleton_class_of(&self.classes, value)
    }
}

impl RuntimeHost for RuntimeContext {
    fn classes(&self) -> &ClassArena {
        &self.classes
    }

    fn core(&self) -> &CoreLibrary {
        &self.core
    }

    fn effective_class_of(&self, value: &Value) -> ClassId {
        RuntimeContext::effective_class_of(self, value)
    }

    fn send(
        &self,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
        block: Option<&Block>,
        ignore_visibility: bool,
    ) -> RubyResult<Value> {
        let config = if ignore_visibility {
            DispatchConfiguration::PRIVATE
        } else {
            DispatchConfiguration::PUBLIC
        };
        self.dispatch(receiver, name, args, block, &config)
            .map(Dispatched::into_value)
    }

    fn responds_to(&self, receiver: &Value, name: Symbol, include_private: bool) -> RubyResult<bool> {
        let config = if include_private {
            DispatchConfiguration::PRIVATE_DOES_RESPOND
        } else {
            DispatchConfiguration::PUBLIC_DOES_RESPOND
        };
        self.dispatch(receiver, name, &[], None, &config)
            .map(Dispatched::into_bool)
    }

    fn find_method(&self, receiver: &Value, name: Symbol) -> Option<Arc<MethodEntry>> {
        let class = RuntimeContext::effective_class_of(self, receiver);
        self.lookup().lookup_ignoring_visibility(class, name).found()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_runtime::intern;

    #[test]
    fn test_site_ids_are_unique() {
        let ctx = RuntimeContext::new().unwrap();
        let a = ctx.new_call_site(DispatchConfiguration::PUBLIC);
        let b = ctx.new_call_site(DispatchConfiguration::PUBLIC);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.limit(), 8);
    }

    #[test]
    fn test_options_flow_into_sites_and_lookup() {
        let ctx = RuntimeContext::with_options(RuntimeOptions {
            dispatch_cache_limit: 2,
            lookup_cache: false,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ctx.new_call_site(DispatchConfiguration::PUBLIC).limit(), 2);

        let foo = ctx.define_class("Foo", None);
        let obj = ctx.new_object(foo);
        assert!(ctx.respond_to(&obj, intern("respond_to?"), &DispatchConfiguration::PUBLIC).unwrap());
        assert!(ctx.method_cache().is_empty());
    }

    #[test]
    fn test_define_class_defaults_to_object() {
        let ctx = RuntimeContext::new().unwrap();
        let foo = ctx.define_class("Foo", None);
        assert_eq!(ctx.classes().get(foo).unwrap().superclass(), Some(ctx.core().object));
    }
}
