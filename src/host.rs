//! The collaboration boundary between the dispatch engine and its embedding host.
//!
//! `plum` never sees a concrete value type or a concrete class hierarchy: the
//! host supplies both through [`RuntimeTypeOf`]. This mirrors the way the
//! runtime crate this engine is modelled on treats its own value/type seam as
//! something supplied by the surrounding VM rather than baked into the
//! dispatch logic itself.

use std::fmt::Debug;
use std::hash::Hash;

/// What the engine needs to know about a host's runtime values and classes.
///
/// - `ClassId` identifies a runtime class (an interned name, an enum
///   discriminant, a `TypeId` — whatever the host already uses). It must be
///   cheap to clone since it is the dispatch cache key.
/// - `Value` is the host's dynamic value representation.
pub trait RuntimeTypeOf {
    /// Identifies a runtime class.
    type ClassId: Eq + Hash + Clone + Debug + std::fmt::Display;
    /// A host value that can be dispatched on.
    type Value: Clone + PartialEq + Debug;

    /// The runtime class of a value.
    fn class_of(value: &Self::Value) -> Self::ClassId;

    /// Whether `sub` is a (non-strict) nominal subclass of `sup`.
    ///
    /// Must be reflexive (`is_subclass(c, c)` is always `true`) for the
    /// predicate lattice's reflexivity invariant to hold.
    fn is_subclass(sub: &Self::ClassId, sup: &Self::ClassId) -> bool;
}

/// Callback a host supplies to resolve a forward-referenced class name.
///
/// Used by [`crate::function::Function`] to retry pending registrations whose
/// signature mentioned the owning class before it was fully defined (spec
/// §4.1, "owner self-reference").
pub trait ClassResolver<T: RuntimeTypeOf> {
    /// Attempt to resolve `name` to a class id. Returns `None` if the class
    /// is not yet known to the host.
    fn resolve(&self, name: &str) -> Option<T::ClassId>;
}

/// A host's method-resolution order, used only for the no-method-found
/// fallback (spec §4.5.4): when no registered signature matches a call and
/// the function is owned by a class, walk the owner's ancestors looking for
/// one that owns a same-named function with a matching method.
///
/// Mirrors the upstream `type(instance).__mro__[1:]` walk, but the host
/// decides what "ancestor" means and is responsible for excluding whatever
/// its own universal base classes are (the upstream skips `object` and
/// `type`; a host with no such root classes returns an empty tail there).
pub trait ClassHierarchy<T: RuntimeTypeOf> {
    /// Ancestors of `class`, nearest first, excluding `class` itself.
    fn ancestors(&self, class: &T::ClassId) -> Vec<T::ClassId>;
}
