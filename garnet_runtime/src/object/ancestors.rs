//! Ancestor linearization.
//!
//! Single inheritance plus mixins: a record's ancestors are the record
//! itself, then its included modules (last included first, each expanded to
//! its own ancestors), then its superclass's ancestors. A module that is
//! already reachable through the superclass chain is not repeated.
//!
//! ```text
//! class C < S; include A; include B; end
//! C.ancestors == [C, B, <B's includes>, A, <A's includes>, S, ...]
//! ```

use crate::object::class::{Ancestors, ClassId, ModuleRecord};
use crate::object::registry::ClassArena;
use std::sync::Arc;

/// Compute the ancestor list of `record`.
///
/// Ancestor lists of the superclass and included modules come from the
/// arena's cache, so building a deep hierarchy is linear overall.
pub(crate) fn linearize(arena: &ClassArena, record: &ModuleRecord) -> Vec<ClassId> {
    let inherited: Ancestors = match record.superclass() {
        Some(superclass) => arena.ancestors(superclass),
        None => Arc::from(Vec::new()),
    };

    let mut list = vec![record.id()];
    for &module in record.includes().iter().rev() {
        for &ancestor in arena.ancestors(module).iter() {
            if !list.contains(&ancestor) && !inherited.contains(&ancestor) {
                list.push(ancestor);
            }
        }
    }
    list.extend(inherited.iter().copied());
    list
}

/// Whether making `descendant` inherit from or include `ancestor` would
/// create a cycle.
pub(crate) fn would_cycle(arena: &ClassArena, descendant: ClassId, ancestor: ClassId) -> bool {
    descendant == ancestor || arena.ancestors(ancestor).contains(&descendant)
}
