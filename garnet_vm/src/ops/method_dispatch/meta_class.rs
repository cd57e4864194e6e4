//! Receiver to effective class resolution.

use garnet_runtime::{ClassArena, ClassId, CoreLibrary, Value};

/// Maps a receiver to the class method lookup starts from.
///
/// Never allocates: an instance without a singleton class resolves to its
/// declared class. A class without a metaclass of its own resolves to the
/// nearest metaclass along its superclass chain, so class methods defined
/// higher up stay reachable; `Class` or `Module` when there is none.
/// Primitives map to their fixed built-in class and foreign values to the
/// `ForeignObject` marker.
#[derive(Debug, Clone, Copy)]
pub struct MetaClassResolver {
    core: CoreLibrary,
}

impl MetaClassResolver {
    pub fn new(core: CoreLibrary) -> Self {
        Self { core }
    }

    #[inline]
    pub fn resolve(&self, classes: &ClassArena, receiver: &Value) -> ClassId {
        match receiver {
            Value::Object(object) => object.singleton_class().unwrap_or_else(|| object.class()),
            Value::Module(id) => Self::nearest_metaclass(classes, *id)
                .unwrap_or_else(|| self.core.class_of(classes, receiver)),
            _ => self.core.class_of(classes, receiver),
        }
    }

    fn nearest_metaclass(classes: &ClassArena, id: ClassId) -> Option<ClassId> {
        let mut current = Some(id);
        while let Some(class) = current {
            let record = classes.get(class)?;
            if let Some(metaclass) = record.singleton_class() {
                return Some(metaclass);
            }
            if record.is_module() {
                return None;
            }
            current = record.superclass();
        }
        None
    }
}
