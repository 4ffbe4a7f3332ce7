//! A named, overloaded callable (spec §4.5).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::config::PlumConfig;
use crate::conversion::ConversionTable;
use crate::error::{PlumError, PlumResult};
use crate::host::{ClassResolver, RuntimeTypeOf};
use crate::method::Method;
use crate::resolver::Resolver;
use crate::signature::Signature;

/// One overloaded function: the name it is called by, the class that owns
/// it (if any — spec §9's "owner captured at registration time" decision),
/// its registered methods, and a dispatch cache.
///
/// `I` is the host's callable representation, e.g. `Rc<dyn Fn(&[Value]) ->
/// Value>`. `Function` never calls `I` itself — it only chooses which `I` to
/// hand back to the host, which invokes it (spec §6: `plum` does not own
/// the call boundary).
pub struct Function<T: RuntimeTypeOf, I> {
    name: Rc<str>,
    owner: Option<T::ClassId>,
    resolver: RefCell<Resolver<T, I>>,
    /// Registrations whose signature mentioned a class name the host could
    /// not yet resolve (spec §4.1, "owner self-reference"), awaiting a call
    /// to [`Function::resolve_pending_registrations`].
    pending: RefCell<Vec<(Rc<str>, Signature<T>, Option<T::ClassId>, I)>>,
    /// Populated only while every registered signature is faithful; keyed
    /// by the exact runtime class tuple of a call's arguments (spec §3).
    cache: RefCell<HashMap<Vec<T::ClassId>, usize>>,
    config: PlumConfig,
    /// Host callback to retry pending registrations against, set once via
    /// [`Function::set_class_resolver`]; drained automatically on the next
    /// call (spec §4.1, "retried on first call").
    class_resolver: RefCell<Option<Rc<dyn ClassResolver<T>>>>,
}

impl<T: RuntimeTypeOf, I> Function<T, I> {
    pub fn new(name: impl Into<Rc<str>>, owner: Option<T::ClassId>) -> Self {
        Self::with_config(name, owner, PlumConfig::default())
    }

    pub fn with_config(name: impl Into<Rc<str>>, owner: Option<T::ClassId>, config: PlumConfig) -> Self {
        Function {
            name: name.into(),
            owner,
            resolver: RefCell::new(Resolver::new()),
            pending: RefCell::new(Vec::new()),
            cache: RefCell::new(HashMap::new()),
            config,
            class_resolver: RefCell::new(None),
        }
    }

    /// Registers the callback `resolve`/`call` retry pending registrations
    /// against automatically on their next invocation, rather than only when
    /// the host explicitly calls [`Function::resolve_pending_registrations`]
    /// (spec §4.1, "retried on first call and on each subsequent
    /// cache-invalidation").
    pub fn set_class_resolver(&self, resolver: Rc<dyn ClassResolver<T>>) {
        *self.class_resolver.borrow_mut() = Some(resolver);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> Option<&T::ClassId> {
        self.owner.as_ref()
    }

    fn owner_name(&self) -> Option<String> {
        self.owner.as_ref().map(|c| c.to_string())
    }

    /// Registers a method. If its signature still references an unresolved
    /// class name, the registration is queued instead (spec §4.1) until
    /// [`Function::resolve_pending_registrations`] is called.
    pub fn register(
        &self,
        signature: Signature<T>,
        return_type: Option<T::ClassId>,
        implementation: I,
    ) where
        I: Clone,
    {
        if signature.has_pending() {
            self.pending
                .borrow_mut()
                .push((self.name.clone(), signature, return_type, implementation));
            return;
        }
        self.register_resolved(signature, return_type, implementation);
    }

    /// Registers one implementation under `defaults.len() + 1` signatures,
    /// one per arity from `required.len()` up to `required.len() +
    /// defaults.len()`, by registering `required` extended with successive
    /// prefixes of `defaults` (spec §4.5.1, "expand defaults"). Mirrors a
    /// host's trailing-default-valued parameters without the engine ever
    /// needing to know what a default value is — only how many trailing
    /// parameters have one.
    pub fn register_with_defaults(
        &self,
        required: Vec<crate::predicate::TypePredicate<T>>,
        defaults: Vec<crate::predicate::TypePredicate<T>>,
        return_type: Option<T::ClassId>,
        implementation: I,
    ) where
        I: Clone,
        T::ClassId: Clone,
    {
        for arity in 0..=defaults.len() {
            let mut params = required.clone();
            params.extend(defaults[..arity].iter().cloned());
            self.register(
                Signature::new(params, None),
                return_type.clone(),
                implementation.clone(),
            );
        }
    }

    fn register_resolved(&self, signature: Signature<T>, return_type: Option<T::ClassId>, implementation: I) {
        let method = Method::new(self.name.clone(), signature, return_type, implementation);
        let mut resolver = self.resolver.borrow_mut();
        if let Some(old) = resolver.register(method) {
            if self.config.warn_on_redefinition {
                tracing::warn!(function = %self.name, signature = %old.signature(), "method redefined");
            }
        }
        drop(resolver);
        self.cache.borrow_mut().clear();
    }

    /// Retries every pending registration, moving the ones `resolver` can
    /// now resolve into the resolver proper. Returns the number still
    /// pending afterward.
    pub fn resolve_pending_registrations(&self, resolver: &dyn ClassResolver<T>) -> usize
    where
        I: Clone,
    {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let mut still_pending = Vec::new();
        for (name, signature, return_type, implementation) in pending {
            match signature.resolve_pending(resolver) {
                Some(resolved) => self.register_resolved(resolved, return_type, implementation),
                None => still_pending.push((name, signature, return_type, implementation)),
            }
        }
        let remaining = still_pending.len();
        *self.pending.borrow_mut() = still_pending;
        remaining
    }

    /// The first still-unresolved annotation name among pending
    /// registrations, if any, used to name an [`PlumError::UnresolvableAnnotation`]
    /// once a call forces resolution and finds it still unresolved.
    fn first_pending_annotation(&self) -> Option<String> {
        self.pending
            .borrow()
            .iter()
            .find_map(|(_, signature, _, _)| signature.first_pending_name().map(str::to_string))
    }

    /// Drops every cached dispatch decision. Registration already does this
    /// implicitly; exposed for the host-facing `clear_cache` surface (spec
    /// §4.5.3) and for [`crate::registry::clear_all_cache`].
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Number of entries currently in the dispatch cache. Stays at zero for
    /// the lifetime of a `Function` whose resolver is unfaithful, since
    /// [`Function::resolve`] never populates the cache in that case (spec
    /// §8, testable property: "faithfulness implies cacheability").
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Resolves the implementation (and its declared return type) to invoke
    /// for a call with these argument values, consulting (and, on a miss,
    /// populating) the dispatch cache (spec §4.5.2 steps 2-5).
    ///
    /// The return type is surfaced alongside the implementation so a caller
    /// can apply [`ConversionTable::convert`] to the invocation result
    /// itself (step 6) — `Function` never calls `I`, so it cannot perform
    /// that conversion on the host's behalf; see [`Function::call`] for the
    /// combinator that does both in one step.
    pub fn resolve(&self, values: &[T::Value]) -> Result<(I, Option<T::ClassId>), PlumError>
    where
        I: Clone,
    {
        // Spec §4.5.2 step 1: if pending is non-empty, drain it before
        // resolving, so a forward-referenced registration that has since
        // become resolvable is visible to this call.
        if !self.pending.borrow().is_empty() {
            if let Some(resolver) = self.class_resolver.borrow().clone() {
                self.resolve_pending_registrations(resolver.as_ref());
            }
        }

        let faithful = self.resolver.borrow().is_faithful();
        let key = if faithful {
            let key: Vec<T::ClassId> = values.iter().map(T::class_of).collect();
            if let Some(&idx) = self.cache.borrow().get(&key) {
                let resolver = self.resolver.borrow();
                let method = &resolver.methods()[idx];
                return Ok((method.implementation().clone(), method.return_type().cloned()));
            }
            Some(key)
        } else {
            None
        };

        tracing::debug!(function = %self.name, cached = false, "resolving dispatch");
        let resolver = self.resolver.borrow();
        match resolver.resolve(&self.name, values, self.config.max_suggestions) {
            Ok(method) => {
                let implementation = method.implementation().clone();
                let return_type = method.return_type().cloned();
                if let Some(key) = key {
                    let idx = resolver
                        .methods()
                        .iter()
                        .position(|m| std::ptr::eq(m, method))
                        .expect("resolved method belongs to this resolver's method list");
                    drop(resolver);
                    self.cache.borrow_mut().insert(key, idx);
                }
                Ok((implementation, return_type))
            }
            Err(err) => {
                drop(resolver);
                // Spec §4.1 / §7: a call forces resolution of any still-
                // pending registration; one that remains unresolvable after
                // the drain above is reported as `UnresolvableAnnotation`
                // rather than folded into an ordinary `NotFound`.
                let err = match (&err, self.first_pending_annotation()) {
                    (PlumError::NotFound { .. }, Some(name)) => PlumError::UnresolvableAnnotation { name },
                    _ => err,
                };
                Err(err.with_function_context(self.name.to_string(), self.owner_name()))
            }
        }
    }

    /// Explicit-type dispatch (spec §4.5.3): resolves against a
    /// [`Signature`] built from type hints rather than runtime argument
    /// values, bypassing the dispatch cache entirely. Used to reach a
    /// superclass method explicitly or to dispatch without having concrete
    /// argument values in hand.
    pub fn invoke(&self, target: &Signature<T>) -> Result<(I, Option<T::ClassId>), PlumError>
    where
        I: Clone,
    {
        let resolver = self.resolver.borrow();
        resolver
            .resolve_signature(&self.name, target)
            .map(|method| (method.implementation().clone(), method.return_type().cloned()))
            .map_err(|err| err.with_function_context(self.name.to_string(), self.owner_name()))
    }

    /// Resolves, invokes, and converts in one step (spec §2's control-flow
    /// summary: "invokes, converts the result to return-type, and caches").
    /// `invoke` is the host-supplied step that actually calls the opaque
    /// implementation handle `I` — `Function` only knows how to choose
    /// *which* `I`, not how to run it.
    pub fn call(
        &self,
        values: &[T::Value],
        conversions: &ConversionTable<T>,
        invoke: impl FnOnce(&I, &[T::Value]) -> PlumResult<T::Value>,
    ) -> PlumResult<T::Value>
    where
        I: Clone,
    {
        let (implementation, return_type) = self.resolve(values)?;
        let result = invoke(&implementation, values)
            .map_err(|err| err.with_function_context(self.name.to_string(), self.owner_name()))?;
        match return_type {
            Some(target) => conversions
                .convert(&result, &target)
                .map_err(|err| err.with_function_context(self.name.to_string(), self.owner_name())),
            None => Ok(result),
        }
    }
}

impl<T: RuntimeTypeOf, I> fmt::Debug for Function<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("methods", &self.resolver.borrow().methods().len())
            .field("pending", &self.pending.borrow().len())
            .finish_non_exhaustive()
    }
}

/// A [`Function`] bound to a receiver, projected so every subsequent call
/// implicitly supplies that receiver as its first argument (spec §4.5.4,
/// grounded on the upstream `_BoundFunction`).
pub struct BoundFunction<'f, T: RuntimeTypeOf, I> {
    function: &'f Function<T, I>,
    receiver: T::Value,
}

impl<'f, T: RuntimeTypeOf, I> BoundFunction<'f, T, I> {
    pub fn new(function: &'f Function<T, I>, receiver: T::Value) -> Self {
        BoundFunction { function, receiver }
    }

    pub fn resolve(&self, rest: &[T::Value]) -> Result<(I, Option<T::ClassId>), PlumError>
    where
        I: Clone,
    {
        let values = self.values_with_receiver(rest);
        self.function.resolve(&values)
    }

    /// Invokes the receiver-prepended call (spec §4.5.4: "on every call and
    /// on `invoke`") and converts its return value, the bound analogue of
    /// [`Function::call`].
    pub fn call(
        &self,
        rest: &[T::Value],
        conversions: &ConversionTable<T>,
        invoke: impl FnOnce(&I, &[T::Value]) -> PlumResult<T::Value>,
    ) -> PlumResult<T::Value>
    where
        I: Clone,
    {
        let values = self.values_with_receiver(rest);
        self.function.call(&values, conversions, invoke)
    }

    fn values_with_receiver(&self, rest: &[T::Value]) -> Vec<T::Value> {
        let mut values = Vec::with_capacity(rest.len() + 1);
        values.push(self.receiver.clone());
        values.extend_from_slice(rest);
        values
    }
}
