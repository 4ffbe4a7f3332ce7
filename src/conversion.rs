//! `convert` and `promote` (spec §4.7).
//!
//! Grounded on the upstream `plum.promotion` module, generalized: that
//! module seeds conversions between Python's built-in container types
//! (`object -> tuple`, `list <-> tuple`, `bytes -> str`). `plum`'s host value
//! type has no built-in containers of its own — the mechanism (subtype
//! fallback, explicit conversion methods, pairwise-fold promotion) is what
//! carries over; a host seeds whatever conversions its own value type needs.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{PlumError, PlumResult};
use crate::host::RuntimeTypeOf;

type ConversionFn<T> = Rc<dyn Fn(&<T as RuntimeTypeOf>::Value) -> PlumResult<<T as RuntimeTypeOf>::Value>>;

/// A table of explicit conversion methods and promotion rules, plus the
/// `convert`/`promote` operations defined over it.
pub struct ConversionTable<T: RuntimeTypeOf> {
    conversions: HashMap<(T::ClassId, T::ClassId), ConversionFn<T>>,
    promotion_rules: HashMap<(T::ClassId, T::ClassId), T::ClassId>,
}

impl<T: RuntimeTypeOf> Default for ConversionTable<T> {
    fn default() -> Self {
        ConversionTable {
            conversions: HashMap::new(),
            promotion_rules: HashMap::new(),
        }
    }
}

impl<T: RuntimeTypeOf> ConversionTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an explicit conversion from `from` to `to` (spec §4.7.1,
    /// `add_conversion_method`/`conversion_method`).
    pub fn add_conversion_method(
        &mut self,
        from: T::ClassId,
        to: T::ClassId,
        f: impl Fn(&T::Value) -> PlumResult<T::Value> + 'static,
    ) {
        self.conversions.insert((from, to), Rc::new(f));
    }

    /// Converts `value` to `to`. If `value` is already a (non-strict)
    /// subtype of `to` it is returned unchanged; otherwise an explicit
    /// conversion method is required (spec §4.7.1).
    pub fn convert(&self, value: &T::Value, to: &T::ClassId) -> PlumResult<T::Value> {
        let from = T::class_of(value);
        if T::is_subclass(&from, to) {
            return Ok(value.clone());
        }
        match self.conversions.get(&(from.clone(), to.clone())) {
            Some(f) => f(value),
            None => Err(PlumError::ConversionFailure {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    /// Declares that promoting an `a` and a `b` together targets `result`.
    /// Symmetric: also registers the `(b, a)` direction (spec §4.7.2,
    /// `add_promotion_rule`).
    pub fn add_promotion_rule(&mut self, a: T::ClassId, b: T::ClassId, result: T::ClassId) {
        self.promotion_rules
            .insert((a.clone(), b.clone()), result.clone());
        self.promotion_rules.insert((b, a), result);
    }

    /// The common type to promote `a` and `b` to: `a` itself if they're
    /// equal, an explicitly registered rule if one exists, and otherwise the
    /// more general of the two if they're mutually comparable — mirroring
    /// the upstream `_promotion_rule`'s fallback to whichever of the pair
    /// subclasses the other when no rule was registered (spec §4.7,
    /// `promotion.py:102-107`). `None` only when neither applies.
    fn promotion_target(&self, a: &T::ClassId, b: &T::ClassId) -> Option<T::ClassId> {
        if a == b {
            return Some(a.clone());
        }
        if let Some(target) = self.promotion_rules.get(&(a.clone(), b.clone())) {
            return Some(target.clone());
        }
        if T::is_subclass(a, b) {
            return Some(b.clone());
        }
        if T::is_subclass(b, a) {
            return Some(a.clone());
        }
        None
    }

    /// Promotes a pair of values to a shared type and converts both to it.
    pub fn promote2(&self, a: &T::Value, b: &T::Value) -> PlumResult<(T::Value, T::Value)> {
        let (ca, cb) = (T::class_of(a), T::class_of(b));
        let target = self
            .promotion_target(&ca, &cb)
            .ok_or_else(|| PlumError::NoPromotionRule {
                a: ca.to_string(),
                b: cb.to_string(),
            })?;
        Ok((self.convert(a, &target)?, self.convert(b, &target)?))
    }

    /// Promotes every value in `values` to one common type: the class-level
    /// fold of `promotion_target` across all of their classes, then
    /// converts every value to it (spec §4.7.2). `promote(&[])` is `[]`;
    /// `promote(&[x])` is `[x]` — neither requires a promotion rule,
    /// mirroring the upstream arity-zero/one special cases.
    pub fn promote(&self, values: &[T::Value]) -> PlumResult<Vec<T::Value>> {
        let (first, rest) = match values.split_first() {
            Some(split) => split,
            None => return Ok(Vec::new()),
        };
        if rest.is_empty() {
            return Ok(vec![first.clone()]);
        }

        let mut target = T::class_of(first);
        for v in rest {
            let class = T::class_of(v);
            target = self
                .promotion_target(&target, &class)
                .ok_or_else(|| PlumError::NoPromotionRule {
                    a: target.to_string(),
                    b: class.to_string(),
                })?;
        }
        values.iter().map(|v| self.convert(v, &target)).collect()
    }
}
