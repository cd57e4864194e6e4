//! Core class bootstrap.
//!
//! ```text
//! BasicObject
//!     └── Object  (includes Kernel)
//!           ├── Module
//!           │     └── Class
//!           ├── NilClass, TrueClass, FalseClass
//!           ├── Integer, Float, Symbol, String
//!           └── ForeignObject   (marker for interop values)
//! ```
//!
//! The classes of immediates carry [`ClassFlags::IMMEDIATE`] and the
//! interop marker carries [`ClassFlags::FOREIGN`]. Instances of either
//! cannot have singleton classes.

use crate::error::{RubyError, RubyResult};
use crate::object::class::{ClassFlags, ClassId};
use crate::object::registry::ClassArena;
use crate::value::Value;

/// IDs of the built-in classes and modules.
#[derive(Debug, Clone, Copy)]
pub struct CoreLibrary {
    pub basic_object: ClassId,
    pub object: ClassId,
    pub kernel: ClassId,
    pub module: ClassId,
    pub class: ClassId,
    pub nil_class: ClassId,
    pub true_class: ClassId,
    pub false_class: ClassId,
    pub integer: ClassId,
    pub float: ClassId,
    pub symbol: ClassId,
    pub string: ClassId,
    pub foreign_object: ClassId,
}

impl CoreLibrary {
    /// Create the core hierarchy in `arena`.
    pub fn bootstrap(arena: &ClassArena) -> RubyResult<Self> {
        let basic_object = arena.define_class("BasicObject", None);
        let object = arena.define_class("Object", Some(basic_object));
        let kernel = arena.define_module("Kernel");
        arena.include_module(object, kernel)?;
        let module = arena.define_class("Module", Some(object));
        let class = arena.define_class("Class", Some(module));

        let immediate = |name: &str| arena.define_with_flags(name, Some(object), ClassFlags::IMMEDIATE);

        Ok(Self {
            basic_object,
            object,
            kernel,
            module,
            class,
            nil_class: immediate("NilClass"),
            true_class: immediate("TrueClass"),
            false_class: immediate("FalseClass"),
            integer: immediate("Integer"),
            float: immediate("Float"),
            symbol: immediate("Symbol"),
            string: immediate("String"),
            foreign_object: arena.define_with_flags(
                "ForeignObject",
                Some(object),
                ClassFlags::FOREIGN,
            ),
        })
    }

    /// Logical (non-singleton) class of `value`.
    pub fn class_of(&self, arena: &ClassArena, value: &Value) -> ClassId {
        match value {
            Value::Nil => self.nil_class,
            Value::Bool(true) => self.true_class,
            Value::Bool(false) => self.false_class,
            Value::Integer(_) => self.integer,
            Value::Float(_) => self.float,
            Value::Symbol(_) => self.symbol,
            Value::String(_) => self.string,
            Value::Module(id) => match arena.get(*id) {
                Some(record) if record.is_module() => self.module,
                _ => self.class,
            },
            Value::Object(object) => object.class(),
            Value::Foreign(_) => self.foreign_object,
        }
    }

    /// Singleton class of `value`, creating it on first request.
    ///
    /// Metaclasses mirror the superclass chain: the metaclass of `B < A` has
    /// the metaclass of `A` as its superclass.
    pub fn singleton_class_of(&self, arena: &ClassArena, value: &Value) -> RubyResult<ClassId> {
        let class = arena.record(self.class_of(arena, value))?;
        if class.flags().intersects(ClassFlags::IMMEDIATE | ClassFlags::FOREIGN) {
            return Err(RubyError::TypeError(format!(
                "can't define singleton for an instance of {}",
                class.name()
            )));
        }

        match value {
            Value::Object(object) => Ok(arena.singleton_class_for_object(object, || {
                format!("#<Class:#<{}>>", class.name())
            })),
            Value::Module(id) => self.metaclass_of(arena, *id),
            _ => Err(RubyError::InternalInvariantViolation(format!(
                "{} has no singleton slot but is not flagged immediate",
                class.name()
            ))),
        }
    }

    fn metaclass_of(&self, arena: &ClassArena, id: ClassId) -> RubyResult<ClassId> {
        let record = arena.record(id)?;
        if let Some(existing) = record.singleton_class() {
            return Ok(existing);
        }
        // Resolved before taking the definition lock; it is not reentrant.
        let superclass = match record.superclass() {
            Some(parent) if !record.is_module() => self.metaclass_of(arena, parent)?,
            _ if record.is_module() => self.module,
            _ => self.class,
        };
        arena.singleton_class_for_module(id, superclass)
    }

    /// Receiver description used in `NoMethodError` messages.
    pub fn describe_value(&self, arena: &ClassArena, value: &Value) -> String {
        match value {
            Value::Nil => "nil".into(),
            Value::Bool(true) => "true".into(),
            Value::Bool(false) => "false".into(),
            Value::Module(id) => {
                let kind = if self.class_of(arena, value) == self.module {
                    "module"
                } else {
                    "class"
                };
                format!("{} {}", kind, arena.name_of(*id))
            }
            Value::Foreign(foreign) => format!("foreign {}", foreign.type_name()),
            _ => format!("an instance of {}", arena.name_of(self.class_of(arena, value))),
        }
    }
}
