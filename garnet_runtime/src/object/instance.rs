//! Native object instances.

use crate::object::class::ClassId;
use crate::symbol::Symbol;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};

/// Shared handle to an instance.
pub type ObjectRef = Arc<RObject>;

/// An instance of a user or core class.
///
/// The declared class never changes. A singleton class may be attached once;
/// after that it is the object's effective class for lookup.
#[derive(Debug)]
pub struct RObject {
    class: ClassId,
    singleton: OnceLock<ClassId>,
    ivars: RwLock<FxHashMap<Symbol, Value>>,
}

impl RObject {
    /// Allocate a new instance of `class`.
    pub fn new(class: ClassId) -> ObjectRef {
        Arc::new(Self {
            class,
            singleton: OnceLock::new(),
            ivars: RwLock::new(FxHashMap::default()),
        })
    }

    /// Declared class.
    #[inline]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Singleton class, if one has been attached.
    #[inline]
    pub fn singleton_class(&self) -> Option<ClassId> {
        self.singleton.get().copied()
    }

    pub(crate) fn singleton_slot(&self) -> &OnceLock<ClassId> {
        &self.singleton
    }

    pub fn ivar_get(&self, name: Symbol) -> Value {
        self.ivars.read().get(&name).cloned().unwrap_or(Value::Nil)
    }

    pub fn ivar_set(&self, name: Symbol, value: Value) {
        self.ivars.write().insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::intern;

    #[test]
    fn test_ivars_default_to_nil() {
        let obj = RObject::new(ClassId::from_raw(1));
        let name = intern("@count");
        assert!(obj.ivar_get(name).is_nil());
        obj.ivar_set(name, Value::Integer(3));
        assert_eq!(obj.ivar_get(name), Value::Integer(3));
    }

    #[test]
    fn test_no_singleton_by_default() {
        let obj = RObject::new(ClassId::from_raw(1));
        assert_eq!(obj.class(), ClassId::from_raw(1));
        assert!(obj.singleton_class().is_none());
    }
}
