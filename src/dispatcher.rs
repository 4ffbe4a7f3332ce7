//! Namespaces of [`Function`]s, and the MRO fallback for owned functions
//! (spec §4.5.4, §4.6).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::config::PlumConfig;
use crate::error::PlumError;
use crate::function::Function;
use crate::host::{ClassHierarchy, RuntimeTypeOf};
use crate::signature::Signature;

/// A namespace of [`Function`]s, keyed by name and (for methods) by owning
/// class. Mirrors the upstream `Dispatcher`: a thin registry plus
/// get-or-create lookup, not a place where dispatch logic itself lives.
pub struct Dispatcher<T: RuntimeTypeOf, I> {
    free: RefCell<HashMap<String, Rc<Function<T, I>>>>,
    owned: RefCell<HashMap<(T::ClassId, String), Rc<Function<T, I>>>>,
    config: PlumConfig,
}

impl<T: RuntimeTypeOf, I> Default for Dispatcher<T, I> {
    fn default() -> Self {
        Self::with_config(PlumConfig::default())
    }
}

impl<T: RuntimeTypeOf, I> Dispatcher<T, I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PlumConfig) -> Self {
        Dispatcher {
            free: RefCell::new(HashMap::new()),
            owned: RefCell::new(HashMap::new()),
            config,
        }
    }

    /// The function registered under `name` with no owning class, creating
    /// an empty one on first use (spec §4.6, "abstract" functions included).
    pub fn function(&self, name: &str) -> Rc<Function<T, I>> {
        if let Some(f) = self.free.borrow().get(name) {
            return f.clone();
        }
        let f = Rc::new(Function::with_config(name, None, self.config.clone()));
        self.free.borrow_mut().insert(name.to_string(), f.clone());
        f
    }

    /// The function registered under `name` and owned by `class`.
    pub fn method_of(&self, class: T::ClassId, name: &str) -> Rc<Function<T, I>> {
        let key = (class.clone(), name.to_string());
        if let Some(f) = self.owned.borrow().get(&key) {
            return f.clone();
        }
        let f = Rc::new(Function::with_config(name, Some(class), self.config.clone()));
        self.owned.borrow_mut().insert(key, f.clone());
        f
    }

    /// Registers one method on the free function `name` and returns it, for
    /// the `dispatcher.multi(name, [...])`-style bulk form (spec §4.6.2).
    pub fn register(
        &self,
        name: &str,
        signature: Signature<T>,
        return_type: Option<T::ClassId>,
        implementation: I,
    ) -> Rc<Function<T, I>>
    where
        I: Clone,
    {
        let f = self.function(name);
        f.register(signature, return_type, implementation);
        f
    }

    /// Registers several signatures against the same implementation-per-
    /// signature list in one call, mirroring `Dispatcher.multi` (spec
    /// §4.6.2: a convenience, not new semantics over repeated `register`).
    pub fn multi(
        &self,
        name: &str,
        methods: impl IntoIterator<Item = (Signature<T>, Option<T::ClassId>, I)>,
    ) -> Rc<Function<T, I>>
    where
        I: Clone,
    {
        let f = self.function(name);
        for (signature, return_type, implementation) in methods {
            f.register(signature, return_type, implementation);
        }
        f
    }

    /// Declares `name` as dispatched with zero methods so far — a function
    /// the host plans to extend later, never invoked directly (spec §4.6.2,
    /// `Dispatcher.abstract`).
    pub fn declare(&self, name: &str) -> Rc<Function<T, I>> {
        self.function(name)
    }

    /// Calls a free (unowned) function, returning the chosen implementation
    /// and its declared return type (spec §4.5.2 steps 2-5) for the caller
    /// to invoke and convert — see [`Function::call`] for a combinator that
    /// does both in one step.
    pub fn call(&self, name: &str, values: &[T::Value]) -> Result<(I, Option<T::ClassId>), PlumError>
    where
        I: Clone,
    {
        self.function(name).resolve(values)
    }

    /// Calls a method owned by `class`. If no method of `class`'s own
    /// function matches, walks `hierarchy`'s ancestors of `class` looking
    /// for an ancestor-owned function of the same name with a matching
    /// method (spec §4.5.4), returning the original (most specific) error if
    /// none is found anywhere in the chain.
    ///
    /// A method found only via the ancestor walk is returned with return
    /// type `Any` (`None`) regardless of what its own function declares for
    /// it — spec §4.5.2 point 4 is explicit that the MRO fallback ignores
    /// the found method's own return-type annotation.
    pub fn call_owned(
        &self,
        class: &T::ClassId,
        name: &str,
        values: &[T::Value],
        hierarchy: &dyn ClassHierarchy<T>,
    ) -> Result<(I, Option<T::ClassId>), PlumError>
    where
        I: Clone,
    {
        let own_err = match self.owned.borrow().get(&(class.clone(), name.to_string())) {
            Some(f) => match f.resolve(values) {
                Ok(resolved) => return Ok(resolved),
                Err(err) => err,
            },
            None => PlumError::NotFound {
                function: name.to_string(),
                arg_types: values.iter().map(|v| T::class_of(v).to_string()).collect(),
                suggestions: Vec::new(),
            },
        };

        for ancestor in hierarchy.ancestors(class) {
            let found = self
                .owned
                .borrow()
                .get(&(ancestor, name.to_string()))
                .cloned();
            if let Some(f) = found {
                if let Ok((implementation, _)) = f.resolve(values) {
                    return Ok((implementation, None));
                }
            }
        }

        Err(own_err)
    }

    /// Drops every function's dispatch cache (spec §4.5.3 / §9).
    pub fn clear_cache(&self) {
        for f in self.free.borrow().values() {
            f.clear_cache();
        }
        for f in self.owned.borrow().values() {
            f.clear_cache();
        }
    }

    /// Retries every function's pending (owner-self-reference) registrations
    /// once the host can resolve more class names.
    pub fn resolve_pending_registrations(&self, resolver: &dyn crate::host::ClassResolver<T>) -> usize
    where
        I: Clone,
    {
        let mut remaining = 0;
        for f in self.free.borrow().values() {
            remaining += f.resolve_pending_registrations(resolver);
        }
        for f in self.owned.borrow().values() {
            remaining += f.resolve_pending_registrations(resolver);
        }
        remaining
    }

    /// Combines `a` with `b` into a bundle that broadcasts registration and
    /// cache-clearing to both (spec §4.6.3, `Dispatcher.__or__`).
    pub fn bundle(a: Rc<Self>, b: Rc<Self>) -> DispatcherBundle<T, I> {
        DispatcherBundle {
            dispatchers: vec![a, b],
        }
    }
}

impl<T: RuntimeTypeOf, I> fmt::Debug for Dispatcher<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("free_functions", &self.free.borrow().len())
            .field("owned_functions", &self.owned.borrow().len())
            .finish()
    }
}

/// Several dispatchers treated as one namespace. Composing a bundle with
/// another dispatcher or bundle flattens rather than nests (spec §4.6.3,
/// grounded on the upstream `DispatcherBundle.flatten`): a bundle never
/// contains another bundle as a direct member.
pub struct DispatcherBundle<T: RuntimeTypeOf, I> {
    dispatchers: Vec<Rc<Dispatcher<T, I>>>,
}

impl<T: RuntimeTypeOf, I> DispatcherBundle<T, I> {
    pub fn from_dispatchers(dispatchers: impl IntoIterator<Item = Rc<Dispatcher<T, I>>>) -> Self {
        DispatcherBundle {
            dispatchers: dispatchers.into_iter().collect(),
        }
    }

    pub fn dispatchers(&self) -> &[Rc<Dispatcher<T, I>>] {
        &self.dispatchers
    }

    /// Adds another dispatcher (or the flattened members of another bundle)
    /// to this one.
    pub fn push(&mut self, dispatcher: Rc<Dispatcher<T, I>>) {
        self.dispatchers.push(dispatcher);
    }

    pub fn extend(&mut self, other: DispatcherBundle<T, I>) {
        self.dispatchers.extend(other.dispatchers);
    }

    /// Registers the same method against every member and returns the last
    /// member's `Function`, mirroring the upstream bundle's documented
    /// "returns the rightmost member's result" behavior.
    pub fn register(
        &self,
        name: &str,
        signature: Signature<T>,
        return_type: Option<T::ClassId>,
        implementation: I,
    ) -> Option<Rc<Function<T, I>>>
    where
        T::ClassId: Clone,
        I: Clone,
    {
        let mut last = None;
        for d in &self.dispatchers {
            last = Some(d.register(name, signature.clone(), return_type.clone(), implementation.clone()));
        }
        last
    }

    pub fn clear_cache(&self) {
        for d in &self.dispatchers {
            d.clear_cache();
        }
    }
}
