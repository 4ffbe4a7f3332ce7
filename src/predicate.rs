//! Type predicates and the subtype lattice over them (spec §3, §4.1).
//!
//! A [`TypePredicate`] answers two questions about a host value `v` and a
//! candidate refinement `q`: does `v` match this predicate, and is this
//! predicate a refinement of `q`? The variants mirror the closed `JuliaType`
//! hierarchy this engine is descended from (see `DESIGN.md`), generalized so
//! `Nominal`/`Parametric` carry a host-supplied class id instead of one fixed
//! at compile time.

use std::fmt;
use std::rc::Rc;

use crate::host::{ClassResolver, RuntimeTypeOf};

/// An element-level runtime check for a [`TypePredicate::Parametric`]
/// predicate, e.g. "every element of this collection is an `i64`".
///
/// Presence of a probe makes the predicate unfaithful (spec §3): whether `v`
/// matches then depends on inspecting `v`'s contents, not just its class.
pub type Probe<T> = Rc<dyn Fn(&<T as RuntimeTypeOf>::Value) -> bool>;

/// A predicate over runtime values, used as one positional parameter type in
/// a [`crate::signature::Signature`].
pub enum TypePredicate<T: RuntimeTypeOf> {
    /// A nominal class, e.g. `Int`.
    Nominal(T::ClassId),
    /// A union of alternatives; matches if any alternative matches.
    Union(Vec<TypePredicate<T>>),
    /// A parametric type, e.g. `Vector<Int>`, with an optional element-level
    /// probe for cases the class alone cannot decide.
    Parametric {
        class: T::ClassId,
        params: Vec<TypePredicate<T>>,
        probe: Option<Probe<T>>,
    },
    /// A single concrete value used as a singleton type.
    Literal(T::Value),
    /// Matches everything; the top of the lattice.
    Any,
    /// A class name that could not yet be resolved to a `T::ClassId` (spec
    /// §4.1, "owner self-reference"). Matches nothing and compares as
    /// incomparable until resolved.
    Pending(String),
}

impl<T: RuntimeTypeOf> Clone for TypePredicate<T> {
    fn clone(&self) -> Self {
        match self {
            TypePredicate::Nominal(c) => TypePredicate::Nominal(c.clone()),
            TypePredicate::Union(ps) => TypePredicate::Union(ps.clone()),
            TypePredicate::Parametric {
                class,
                params,
                probe,
            } => TypePredicate::Parametric {
                class: class.clone(),
                params: params.clone(),
                probe: probe.clone(),
            },
            TypePredicate::Literal(v) => TypePredicate::Literal(v.clone()),
            TypePredicate::Any => TypePredicate::Any,
            TypePredicate::Pending(name) => TypePredicate::Pending(name.clone()),
        }
    }
}

impl<T: RuntimeTypeOf> fmt::Debug for TypePredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypePredicate::Nominal(c) => write!(f, "Nominal({:?})", c),
            TypePredicate::Union(ps) => f.debug_tuple("Union").field(ps).finish(),
            TypePredicate::Parametric { class, params, .. } => f
                .debug_struct("Parametric")
                .field("class", class)
                .field("params", params)
                .finish(),
            TypePredicate::Literal(v) => write!(f, "Literal({:?})", v),
            TypePredicate::Any => write!(f, "Any"),
            TypePredicate::Pending(name) => write!(f, "Pending({:?})", name),
        }
    }
}

impl<T: RuntimeTypeOf> fmt::Display for TypePredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypePredicate::Nominal(c) => write!(f, "{}", c),
            TypePredicate::Union(ps) => {
                write!(f, "Union{{")?;
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, "}}")
            }
            TypePredicate::Parametric { class, params, .. } => {
                write!(f, "{}{{", class)?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, "}}")
            }
            TypePredicate::Literal(v) => write!(f, "{:?}", v),
            TypePredicate::Any => write!(f, "Any"),
            TypePredicate::Pending(name) => write!(f, "{}", name),
        }
    }
}

/// Predicates compare equal when they are structurally equal. Probes compare
/// by pointer identity of the `Rc` (two distinct closures are never equal,
/// even if behaviorally identical — mirrors comparing Python callables by
/// identity).
impl<T: RuntimeTypeOf> PartialEq for TypePredicate<T> {
    fn eq(&self, other: &Self) -> bool {
        use TypePredicate::*;
        match (self, other) {
            (Nominal(a), Nominal(b)) => a == b,
            (Union(a), Union(b)) => a == b,
            (
                Parametric {
                    class: c1,
                    params: p1,
                    probe: pr1,
                },
                Parametric {
                    class: c2,
                    params: p2,
                    probe: pr2,
                },
            ) => {
                c1 == c2
                    && p1 == p2
                    && match (pr1, pr2) {
                        (None, None) => true,
                        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                        _ => false,
                    }
            }
            (Literal(a), Literal(b)) => a == b,
            (Any, Any) => true,
            (Pending(a), Pending(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: RuntimeTypeOf> TypePredicate<T> {
    /// Whether this predicate's truth on a value depends only on the value's
    /// runtime class (spec §3: faithfulness).
    pub fn is_faithful(&self) -> bool {
        match self {
            TypePredicate::Nominal(_) | TypePredicate::Any | TypePredicate::Literal(_) => true,
            TypePredicate::Union(ps) => ps.iter().all(TypePredicate::is_faithful),
            TypePredicate::Parametric { params, probe, .. } => {
                probe.is_none() && params.iter().all(TypePredicate::is_faithful)
            }
            TypePredicate::Pending(_) => false,
        }
    }

    /// Whether `value` satisfies this predicate.
    pub fn matches(&self, value: &T::Value) -> bool {
        match self {
            TypePredicate::Any => true,
            TypePredicate::Nominal(class) => T::is_subclass(&T::class_of(value), class),
            TypePredicate::Union(ps) => ps.iter().any(|p| p.matches(value)),
            TypePredicate::Parametric { class, probe, .. } => {
                T::is_subclass(&T::class_of(value), class)
                    && probe.as_ref().is_none_or(|probe| probe(value))
            }
            TypePredicate::Literal(v0) => value == v0,
            TypePredicate::Pending(_) => false,
        }
    }

    /// Whether `self` is a refinement of `other` (`self <= other`): every
    /// value matching `self` also matches `other`.
    pub fn le(&self, other: &Self) -> bool {
        use TypePredicate::*;

        // Any is the top of the lattice.
        if matches!(other, Any) {
            return true;
        }
        if matches!(self, Any) {
            // `other` is not `Any` here (handled above).
            return false;
        }

        if let Union(ps) = self {
            return ps.iter().all(|p| p.le(other));
        }
        if let Union(qs) = other {
            return qs.iter().any(|q| self.le(q));
        }

        match (self, other) {
            (Nominal(a), Nominal(b)) => T::is_subclass(a, b),
            (Literal(v), q) => q.matches(v),
            (
                Parametric {
                    class: c1,
                    params: p1,
                    ..
                },
                Parametric {
                    class: c2,
                    params: p2,
                    ..
                },
            ) => {
                // Covariant, elementwise comparison when both sides share a
                // base class and the same arity (spec §4.1).
                if c1 == c2 && p1.len() == p2.len() {
                    p1.iter().zip(p2.iter()).all(|(x, y)| x.le(y))
                } else {
                    T::is_subclass(c1, c2)
                }
            }
            (Parametric { class, .. }, Nominal(b)) => T::is_subclass(class, b),
            (Pending(_), _) | (_, Pending(_)) => false,
            _ => false,
        }
    }

    /// `self == other` iff `self <= other` and `other <= self`.
    pub fn type_eq(&self, other: &Self) -> bool {
        self.le(other) && other.le(self)
    }

    /// `self < other` iff `self <= other` and not `other <= self`.
    pub fn lt(&self, other: &Self) -> bool {
        self.le(other) && !other.le(self)
    }

    /// Whether `self` and `other` are comparable under `<=` in either
    /// direction.
    pub fn is_comparable(&self, other: &Self) -> bool {
        self.le(other) || other.le(self)
    }

    /// Whether this predicate (or a predicate nested inside it) still
    /// contains an unresolved [`TypePredicate::Pending`] reference.
    pub fn has_pending(&self) -> bool {
        match self {
            TypePredicate::Pending(_) => true,
            TypePredicate::Union(ps) => ps.iter().any(TypePredicate::has_pending),
            TypePredicate::Parametric { params, .. } => {
                params.iter().any(TypePredicate::has_pending)
            }
            TypePredicate::Nominal(_) | TypePredicate::Literal(_) | TypePredicate::Any => false,
        }
    }

    /// The first unresolved annotation name nested in this predicate, if
    /// any, used to name a [`crate::error::PlumError::UnresolvableAnnotation`]
    /// when a call forces resolution of a registration that never resolved.
    pub fn first_pending_name(&self) -> Option<&str> {
        match self {
            TypePredicate::Pending(name) => Some(name),
            TypePredicate::Union(ps) => ps.iter().find_map(TypePredicate::first_pending_name),
            TypePredicate::Parametric { params, .. } => {
                params.iter().find_map(TypePredicate::first_pending_name)
            }
            TypePredicate::Nominal(_) | TypePredicate::Literal(_) | TypePredicate::Any => None,
        }
    }

    /// Attempts to resolve every [`TypePredicate::Pending`] reference using
    /// `resolver`. Returns `None` if at least one name is still
    /// unresolvable, leaving `self` untouched (the caller keeps the
    /// registration pending).
    pub fn resolve_pending(&self, resolver: &dyn ClassResolver<T>) -> Option<Self> {
        match self {
            TypePredicate::Pending(name) => resolver.resolve(name).map(TypePredicate::Nominal),
            TypePredicate::Nominal(_) | TypePredicate::Any | TypePredicate::Literal(_) => {
                Some(self.clone())
            }
            TypePredicate::Union(ps) => {
                let mut out = Vec::with_capacity(ps.len());
                for p in ps {
                    out.push(p.resolve_pending(resolver)?);
                }
                Some(TypePredicate::Union(out))
            }
            TypePredicate::Parametric {
                class,
                params,
                probe,
            } => {
                let mut out = Vec::with_capacity(params.len());
                for p in params {
                    out.push(p.resolve_pending(resolver)?);
                }
                Some(TypePredicate::Parametric {
                    class: class.clone(),
                    params: out,
                    probe: probe.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct V(i64);

    struct Host;

    thread_local! {
        static HIERARCHY: RefCell<Vec<(&'static str, &'static str)>> = RefCell::new(vec![
            ("Rat", "Re"),
            ("Re", "Num"),
        ]);
    }

    impl RuntimeTypeOf for Host {
        type ClassId = &'static str;
        type Value = V;

        fn class_of(_value: &Self::Value) -> Self::ClassId {
            "Num"
        }

        fn is_subclass(sub: &Self::ClassId, sup: &Self::ClassId) -> bool {
            if sub == sup {
                return true;
            }
            HIERARCHY.with(|h| {
                let mut cur = *sub;
                loop {
                    match h.borrow().iter().find(|(c, _)| *c == cur) {
                        Some((_, parent)) => {
                            if *parent == *sup {
                                return true;
                            }
                            cur = parent;
                        }
                        None => return false,
                    }
                }
            })
        }
    }

    #[test]
    fn nominal_subclass_lattice() {
        let rat = TypePredicate::<Host>::Nominal("Rat");
        let num = TypePredicate::<Host>::Nominal("Num");
        assert!(rat.le(&num));
        assert!(!num.le(&rat));
        assert!(rat.lt(&num));
    }

    #[test]
    fn any_is_top() {
        let rat = TypePredicate::<Host>::Nominal("Rat");
        let any = TypePredicate::<Host>::Any;
        assert!(rat.le(&any));
        assert!(!any.le(&rat));
        assert!(any.type_eq(&TypePredicate::<Host>::Any));
    }

    #[test]
    fn union_rules() {
        let rat = TypePredicate::<Host>::Nominal("Rat");
        let re = TypePredicate::<Host>::Nominal("Re");
        let u = TypePredicate::<Host>::Union(vec![rat.clone(), re.clone()]);
        assert!(rat.le(&u));
        assert!(u.le(&TypePredicate::Nominal("Num")));
        assert!(!u.le(&rat));
    }

    #[test]
    fn literal_matches_exact_value() {
        let lit = TypePredicate::<Host>::Literal(V(1));
        assert!(lit.matches(&V(1)));
        assert!(!lit.matches(&V(2)));
        assert!(lit.le(&TypePredicate::Any));
    }

    #[test]
    fn faithfulness() {
        assert!(TypePredicate::<Host>::Nominal("Rat").is_faithful());
        assert!(TypePredicate::<Host>::Any.is_faithful());
        let unfaithful = TypePredicate::<Host>::Parametric {
            class: "Vec",
            params: vec![TypePredicate::Nominal("Rat")],
            probe: Some(Rc::new(|_v: &V| true)),
        };
        assert!(!unfaithful.is_faithful());
        let faithful_parametric = TypePredicate::<Host>::Parametric {
            class: "Vec",
            params: vec![TypePredicate::Nominal("Rat")],
            probe: None,
        };
        assert!(faithful_parametric.is_faithful());
    }
}
