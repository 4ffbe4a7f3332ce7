//! Method signatures and the partial order over them (spec §4.2).

use std::fmt;

use crate::host::{ClassResolver, RuntimeTypeOf};
use crate::predicate::TypePredicate;

/// The parameter-type pattern a [`crate::method::Method`] is registered
/// under.
///
/// `precedence` is a tie-break hint set by the host at registration time
/// (spec §4.4.2); it plays no part in arity or subtype comparisons, only in
/// breaking ties between otherwise-incomparable candidates.
pub struct Signature<T: RuntimeTypeOf> {
    params: Vec<TypePredicate<T>>,
    vararg: Option<TypePredicate<T>>,
    precedence: i32,
}

impl<T: RuntimeTypeOf> Signature<T> {
    pub fn new(params: Vec<TypePredicate<T>>, vararg: Option<TypePredicate<T>>) -> Self {
        Signature {
            params,
            vararg,
            precedence: 0,
        }
    }

    pub fn with_precedence(mut self, precedence: i32) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn precedence(&self) -> i32 {
        self.precedence
    }

    pub fn params(&self) -> &[TypePredicate<T>] {
        &self.params
    }

    pub fn vararg(&self) -> Option<&TypePredicate<T>> {
        self.vararg.as_ref()
    }

    /// Number of required positional parameters.
    pub fn min_arity(&self) -> usize {
        self.params.len()
    }

    pub fn has_varargs(&self) -> bool {
        self.vararg.is_some()
    }

    /// Expands this signature's parameter types to exactly `n` positions by
    /// repeating the vararg type, if it has one. `None` if `n` is not an
    /// arity this signature can accept.
    fn expand_to(&self, n: usize) -> Option<Vec<&TypePredicate<T>>> {
        if n < self.params.len() {
            return None;
        }
        if n == self.params.len() {
            return Some(self.params.iter().collect());
        }
        let vararg = self.vararg.as_ref()?;
        let mut expanded: Vec<&TypePredicate<T>> = self.params.iter().collect();
        expanded.extend(std::iter::repeat(vararg).take(n - self.params.len()));
        Some(expanded)
    }

    /// Whether this signature accepts a call of `arity` arguments at all,
    /// independent of the argument types.
    pub fn is_compatible(&self, arity: usize) -> bool {
        self.expand_to(arity).is_some()
    }

    /// Whether `values` satisfy this signature position-by-position.
    pub fn matches(&self, values: &[T::Value]) -> bool {
        match self.expand_to(values.len()) {
            Some(types) => types.iter().zip(values).all(|(p, v)| p.matches(v)),
            None => false,
        }
    }

    /// Count of positions at which `values` fails to match, used to rank
    /// near-miss candidates in a "no method found" diagnostic (spec §7). A
    /// signature whose arity is incompatible counts as maximally distant.
    pub fn mismatches(&self, values: &[T::Value]) -> usize {
        match self.expand_to(values.len()) {
            Some(types) => types
                .iter()
                .zip(values)
                .filter(|(p, v)| !p.matches(v))
                .count(),
            None => usize::MAX,
        }
    }

    /// `self <= other`: every call accepted by `self` is also accepted by
    /// `other`, and `self`'s parameter types are at least as specific at
    /// every position (spec §4.2, grounded on the upstream `Signature.__le__`,
    /// `signature.py:44-59`).
    ///
    /// A variadic `self` is never `<=` a non-variadic `other`: `self` accepts
    /// arities `other` rejects outright, so it cannot be a refinement of it
    /// (point 1). When both sides are variadic at the same fixed arity, the
    /// comparison additionally requires `self`'s vararg predicate to be `<=`
    /// `other`'s (point 2) — otherwise two signatures whose vararg tails
    /// differ in type would wrongly compare equal once expanded to their
    /// shared fixed arity.
    pub fn le(&self, other: &Self) -> bool {
        if self.has_varargs() && !other.has_varargs() {
            return false;
        }

        if !other.has_varargs() {
            // Neither side is variadic (guarded above): comparable only at
            // equal fixed arity.
            if self.params.len() != other.params.len() {
                return false;
            }
            return self.params.iter().zip(other.params.iter()).all(|(a, b)| a.le(b));
        }

        if !self.has_varargs() {
            // `self` fixed, `other` variadic: `self <= other.expand_to(|self|)`.
            let other_types = match other.expand_to(self.params.len()) {
                Some(t) => t,
                None => return false,
            };
            return self.params.iter().zip(other_types.iter()).all(|(a, b)| a.le(b));
        }

        // Both variadic: positional predicates compare at the larger of the
        // two fixed arities, and the vararg tails compare directly.
        let n = self.params.len().max(other.params.len());
        let self_types = match self.expand_to(n) {
            Some(t) => t,
            None => return false,
        };
        let other_types = match other.expand_to(n) {
            Some(t) => t,
            None => return false,
        };
        if !self_types.iter().zip(other_types.iter()).all(|(a, b)| a.le(b)) {
            return false;
        }
        self.vararg
            .as_ref()
            .expect("has_varargs")
            .le(other.vararg.as_ref().expect("has_varargs"))
    }

    pub fn lt(&self, other: &Self) -> bool {
        self.le(other) && !other.le(self)
    }

    pub fn is_comparable(&self, other: &Self) -> bool {
        self.le(other) || other.le(self)
    }

    /// Whether a positional or vararg parameter type still references an
    /// unresolved owner class (spec §4.1, "owner self-reference").
    pub fn has_pending(&self) -> bool {
        self.params.iter().any(TypePredicate::has_pending)
            || self.vararg.as_ref().is_some_and(TypePredicate::has_pending)
    }

    /// The first unresolved annotation name in this signature, if any.
    pub fn first_pending_name(&self) -> Option<&str> {
        self.params
            .iter()
            .chain(self.vararg.as_ref())
            .find_map(TypePredicate::first_pending_name)
    }

    /// Attempts to resolve every pending parameter type. Returns `None`,
    /// leaving `self` untouched, if any parameter is still unresolvable.
    pub fn resolve_pending(&self, resolver: &dyn ClassResolver<T>) -> Option<Self> {
        let mut params = Vec::with_capacity(self.params.len());
        for p in &self.params {
            params.push(p.resolve_pending(resolver)?);
        }
        let vararg = match &self.vararg {
            Some(v) => Some(v.resolve_pending(resolver)?),
            None => None,
        };
        Some(Signature {
            params,
            vararg,
            precedence: self.precedence,
        })
    }
}

impl<T: RuntimeTypeOf> Clone for Signature<T> {
    fn clone(&self) -> Self {
        Signature {
            params: self.params.clone(),
            vararg: self.vararg.clone(),
            precedence: self.precedence,
        }
    }
}

impl<T: RuntimeTypeOf> fmt::Debug for Signature<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("params", &self.params)
            .field("vararg", &self.vararg)
            .field("precedence", &self.precedence)
            .finish()
    }
}

impl<T: RuntimeTypeOf> fmt::Display for Signature<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        if let Some(v) = &self.vararg {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "{}...", v)?;
        }
        write!(f, ")")
    }
}

/// Two signatures are equal when each is a refinement of the other.
/// `precedence` is deliberately excluded — it is a registration-time hint,
/// not part of a signature's identity (spec §4.4.1's "replace on equal
/// signature" rule keys on this, not on precedence).
impl<T: RuntimeTypeOf> PartialEq for Signature<T> {
    fn eq(&self, other: &Self) -> bool {
        self.le(other) && other.le(self)
    }
}
