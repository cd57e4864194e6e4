//! Property tests for call-site caching.
//!
//! Properties:
//! 1. Cache transparency: a call site returns what an uncached dispatch
//!    returns, across random receiver sequences and redefinitions
//! 2. A site never holds more entries than its limit
//! 3. Once megamorphic, a site stays megamorphic with an empty chain

use garnet_runtime::{CallTarget, ClassId, RubyResult, Value, Visibility, intern};
use garnet_vm::{CacheStateKind, DispatchConfiguration, Dispatched, RuntimeContext};
use proptest::prelude::*;

const CLASS_COUNT: usize = 10;

/// One step of a generated program.
#[derive(Debug, Clone)]
enum Step {
    /// Dispatch on an instance of class `n`.
    Call(usize),
    /// Redefine `m` on class `n` to return `value`.
    Redefine(usize, i64),
    /// Make `m` private on class `n`.
    Hide(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        8 => (0..CLASS_COUNT).prop_map(Step::Call),
        1 => (0..CLASS_COUNT, -100i64..100).prop_map(|(n, v)| Step::Redefine(n, v)),
        1 => (0..CLASS_COUNT).prop_map(Step::Hide),
    ]
}

/// A base class defining `m` and a mix of subclasses, some overriding it.
fn world() -> (RuntimeContext, Vec<ClassId>) {
    let ctx = RuntimeContext::new().expect("bootstrap");
    let base = ctx.define_class("Base", None);
    ctx.classes()
        .define_method(base, intern("m"), Visibility::Public, CallTarget::constant(Value::Integer(0)))
        .expect("define");
    let mut classes = vec![base];
    for i in 1..CLASS_COUNT {
        let parent = if i % 3 == 0 { classes[i - 1] } else { base };
        let class = ctx.define_class(&format!("K{i}"), Some(parent));
        if i % 2 == 0 {
            ctx.classes()
                .define_method(class, intern("m"), Visibility::Public, CallTarget::constant(Value::Integer(i as i64)))
                .expect("define");
        }
        classes.push(class);
    }
    (ctx, classes)
}

/// Comparable shape of a dispatch outcome.
fn outcome(result: RubyResult<Dispatched>) -> Result<Dispatched, (String, String)> {
    result.map_err(|err| (err.class_name().to_string(), err.to_string()))
}

fn apply(ctx: &RuntimeContext, classes: &[ClassId], step: &Step) {
    match *step {
        Step::Call(_) => {}
        Step::Redefine(n, value) => {
            ctx.classes()
                .define_method(classes[n], intern("m"), Visibility::Public, CallTarget::constant(Value::Integer(value)))
                .expect("redefine");
        }
        Step::Hide(n) => {
            // Only valid once `m` is reachable from the class.
            let _ = ctx.classes().set_visibility(classes[n], intern("m"), Visibility::Private);
        }
    }
}

proptest! {
    #[test]
    fn prop_site_matches_uncached_dispatch(
        limit in 0usize..6,
        steps in prop::collection::vec(step(), 1..60),
    ) {
        let (ctx, classes) = world();
        let site = ctx.new_call_site_with_limit(DispatchConfiguration::PUBLIC, limit);
        let m = intern("m");

        for step in &steps {
            apply(&ctx, &classes, step);
            if let Step::Call(n) = *step {
                let receiver = ctx.new_object(classes[n]);
                let cached = outcome(site.execute(&ctx, &receiver, m, &[], None));
                let uncached = outcome(ctx.dispatch(&receiver, m, &[], None, &DispatchConfiguration::PUBLIC));
                prop_assert_eq!(cached, uncached);
            }
        }
    }

    #[test]
    fn prop_respond_to_site_matches_uncached(
        limit in 0usize..6,
        steps in prop::collection::vec(step(), 1..60),
    ) {
        let (ctx, classes) = world();
        let site = ctx.new_call_site_with_limit(DispatchConfiguration::PUBLIC_DOES_RESPOND, limit);
        let m = intern("m");

        for step in &steps {
            apply(&ctx, &classes, step);
            if let Step::Call(n) = *step {
                let receiver = ctx.new_object(classes[n]);
                let cached = site.respond_to(&ctx, &receiver, m).expect("respond_to");
                let uncached = ctx.respond_to(&receiver, m, &DispatchConfiguration::PUBLIC).expect("respond_to");
                prop_assert_eq!(cached, uncached);
            }
        }
    }

    #[test]
    fn prop_chain_never_exceeds_limit(
        limit in 0usize..6,
        picks in prop::collection::vec(0..CLASS_COUNT, 1..80),
    ) {
        let (ctx, classes) = world();
        let site = ctx.new_call_site_with_limit(DispatchConfiguration::PUBLIC, limit);
        let m = intern("m");

        for n in picks {
            site.call(&ctx, &ctx.new_object(classes[n]), m, &[]).expect("call");
            prop_assert!(site.entry_count() <= limit);
        }
    }

    #[test]
    fn prop_megamorphic_is_terminal(
        limit in 1usize..5,
        picks in prop::collection::vec(0..CLASS_COUNT, 1..40),
    ) {
        let (ctx, classes) = world();
        let site = ctx.new_call_site_with_limit(DispatchConfiguration::PUBLIC, limit);
        let m = intern("m");

        // Distinct receivers past the limit force the transition.
        for class in classes.iter().take(limit + 1) {
            site.call(&ctx, &ctx.new_object(*class), m, &[]).expect("call");
        }
        prop_assert_eq!(site.state_kind(), CacheStateKind::Megamorphic);

        for n in picks {
            site.call(&ctx, &ctx.new_object(classes[n]), m, &[]).expect("call");
            prop_assert_eq!(site.state_kind(), CacheStateKind::Megamorphic);
            prop_assert_eq!(site.entry_count(), 0);
        }
    }
}
