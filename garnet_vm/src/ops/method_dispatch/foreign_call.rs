//! Calls on values owned by an embedding host.
//!
//! Host failures, including panics inside the host's `invoke`, come back
//! as `TypeError`. A raw [`ForeignError`] never reaches Ruby code.

use super::Dispatched;
use super::config::DispatchConfiguration;
use garnet_runtime::{ForeignError, ForeignRef, RubyError, RubyResult, Symbol, Value};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::trace;

/// Dispatch `name` on a foreign receiver.
pub fn dispatch_foreign(
    foreign: &ForeignRef,
    name: Symbol,
    args: &[Value],
    config: &DispatchConfiguration,
) -> RubyResult<Dispatched> {
    let member = name.as_str();

    if config.is_respond_to() {
        return Ok(Dispatched::Responds(foreign.has_member(&member)));
    }
    if config.returns_missing() && !foreign.has_member(&member) {
        return Ok(Dispatched::Missing);
    }

    trace!(type_name = foreign.type_name(), member = %member, "foreign call");
    match catch_unwind(AssertUnwindSafe(|| foreign.invoke(&member, args))) {
        Ok(Ok(value)) => Ok(Dispatched::Returned(value)),
        Ok(Err(err)) => Err(translate(foreign, &member, &err)),
        Err(_) => Err(RubyError::TypeError(format!(
            "foreign call {}.{} aborted in host",
            foreign.type_name(),
            member
        ))),
    }
}

fn translate(foreign: &ForeignRef, member: &str, err: &ForeignError) -> RubyError {
    RubyError::TypeError(format!(
        "foreign call {}.{} failed: {}",
        foreign.type_name(),
        member,
        err
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_runtime::intern;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Point {
        x: i64,
    }

    impl garnet_runtime::ForeignObject for Point {
        fn type_name(&self) -> &str {
            "Point"
        }

        fn has_member(&self, name: &str) -> bool {
            matches!(name, "x" | "explode")
        }

        fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, ForeignError> {
            match name {
                "x" if args.is_empty() => Ok(Value::Integer(self.x)),
                "x" => Err(ForeignError::Arity {
                    expected: 0,
                    actual: args.len(),
                }),
                "explode" => panic!("host bug"),
                other => Err(ForeignError::UnknownIdentifier(other.into())),
            }
        }
    }

    fn point() -> ForeignRef {
        Arc::new(Point { x: 3 })
    }

    #[test]
    fn test_call_delegates_to_host() {
        let result = dispatch_foreign(&point(), intern("x"), &[], &DispatchConfiguration::PUBLIC).unwrap();
        assert_eq!(result, Dispatched::Returned(Value::Integer(3)));
    }

    #[test]
    fn test_host_error_becomes_type_error() {
        let err = dispatch_foreign(
            &point(),
            intern("x"),
            &[Value::Nil],
            &DispatchConfiguration::PUBLIC,
        )
        .unwrap_err();
        assert!(matches!(err, RubyError::TypeError(ref m) if m.contains("arity mismatch")));

        let err = dispatch_foreign(&point(), intern("y"), &[], &DispatchConfiguration::PUBLIC).unwrap_err();
        assert!(matches!(err, RubyError::TypeError(ref m) if m.contains("unknown identifier")));
    }

    #[test]
    fn test_host_panic_becomes_type_error() {
        let err = dispatch_foreign(&point(), intern("explode"), &[], &DispatchConfiguration::PUBLIC)
            .unwrap_err();
        assert_eq!(err.class_name(), "TypeError");
    }

    #[test]
    fn test_respond_to_uses_has_member() {
        let config = DispatchConfiguration::PUBLIC_DOES_RESPOND;
        assert_eq!(
            dispatch_foreign(&point(), intern("x"), &[], &config).unwrap(),
            Dispatched::Responds(true)
        );
        assert_eq!(
            dispatch_foreign(&point(), intern("z"), &[], &config).unwrap(),
            Dispatched::Responds(false)
        );
    }

    #[test]
    fn test_return_missing_checks_membership() {
        let config = DispatchConfiguration::PUBLIC_RETURN_MISSING;
        assert!(dispatch_foreign(&point(), intern("z"), &[], &config).unwrap().is_missing());
    }
}
