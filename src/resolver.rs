//! Candidate-set minimization and precedence tie-breaking (spec §4.4).

use crate::error::PlumError;
use crate::host::RuntimeTypeOf;
use crate::method::Method;
use crate::signature::Signature;

/// The method list owned by one [`crate::function::Function`], plus the
/// minimization logic that turns "every signature that matches this call"
/// into "the one method to invoke".
pub struct Resolver<T: RuntimeTypeOf, I> {
    methods: Vec<Method<T, I>>,
}

impl<T: RuntimeTypeOf, I> Default for Resolver<T, I> {
    fn default() -> Self {
        Resolver { methods: Vec::new() }
    }
}

impl<T: RuntimeTypeOf, I> Resolver<T, I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn methods(&self) -> &[Method<T, I>] {
        &self.methods
    }

    /// Whether every registered signature is faithful (spec §3): if so, a
    /// dispatch cache keyed purely by the runtime class tuple of the
    /// arguments is sound.
    pub fn is_faithful(&self) -> bool {
        self.methods.iter().all(|m| {
            m.signature()
                .params()
                .iter()
                .chain(m.signature().vararg())
                .all(|p| p.is_faithful())
        })
    }

    /// Registers `method`, replacing any existing method with an equal
    /// signature (spec §4.4.1). Returns the replaced method, if any, so the
    /// caller can log a redefinition warning the way the upstream resolver
    /// does (`MethodRedefinitionWarning`) — the decision of whether to warn
    /// belongs to the owning [`crate::function::Function`], which holds the
    /// host's `warn_on_redefinition` policy; `Resolver` itself has no config.
    pub fn register(&mut self, method: Method<T, I>) -> Option<Method<T, I>> {
        if let Some(slot) = self
            .methods
            .iter()
            .position(|m| m.signature() == method.signature())
        {
            Some(std::mem::replace(&mut self.methods[slot], method))
        } else {
            self.methods.push(method);
            None
        }
    }

    /// Narrows a matching set to its antichain of most-specific members: no
    /// retained method's signature is a strict refinement of another
    /// retained member's (spec §4.4.2 point 2).
    fn minimize<'a>(matching: Vec<&'a Method<T, I>>) -> Vec<&'a Method<T, I>> {
        matching
            .iter()
            .copied()
            .filter(|candidate| {
                !matching
                    .iter()
                    .any(|other| other.signature().lt(candidate.signature()))
            })
            .collect()
    }

    /// Breaks a tie among an already-minimized, non-empty candidate set by
    /// precedence (spec §4.4.2 point 3), shared between [`Resolver::resolve`]
    /// and [`Resolver::resolve_signature`] since both targets reach this
    /// step identically once filtered down to an antichain.
    fn break_tie<'a>(
        function: &str,
        candidates: Vec<&'a Method<T, I>>,
        arg_types: Vec<String>,
    ) -> Result<&'a Method<T, I>, PlumError> {
        if candidates.len() == 1 {
            return Ok(candidates[0]);
        }

        let max_precedence = candidates
            .iter()
            .map(|m| m.signature().precedence())
            .max()
            .expect("candidates is non-empty");
        let mut at_max: Vec<&Method<T, I>> = candidates
            .into_iter()
            .filter(|m| m.signature().precedence() == max_precedence)
            .collect();

        if at_max.len() == 1 {
            return Ok(at_max.remove(0));
        }

        tracing::debug!(function, candidates = at_max.len(), "ambiguous dispatch");
        Err(PlumError::Ambiguous {
            function: function.to_string(),
            arg_types,
            candidates: at_max
                .into_iter()
                .map(|m| format!("{}{}", function, m.signature()))
                .collect(),
        })
    }

    /// Resolves the method to invoke for a call with these argument values
    /// (spec §4.4.2, `target` is a runtime argument tuple).
    ///
    /// Builds the matching set, narrows it to the minimal antichain under
    /// the signature partial order, and if more than one candidate remains,
    /// breaks the tie by precedence. A tie that survives that is reported as
    /// [`PlumError::Ambiguous`]; an empty candidate set as
    /// [`PlumError::NotFound`], with up to `max_suggestions` near-miss
    /// candidates ranked by ascending positional distance (spec §4.2, §7).
    pub fn resolve(
        &self,
        function: &str,
        values: &[T::Value],
        max_suggestions: usize,
    ) -> Result<&Method<T, I>, PlumError> {
        let matching: Vec<&Method<T, I>> = self
            .methods
            .iter()
            .filter(|m| m.signature().matches(values))
            .collect();
        let candidates = Self::minimize(matching);

        if candidates.is_empty() {
            let mut ranked: Vec<&Method<T, I>> = self.methods.iter().collect();
            ranked.sort_by_key(|m| m.signature().mismatches(values));
            let suggestions = ranked
                .into_iter()
                .take(max_suggestions)
                .map(|m| format!("{}{}", function, m.signature()))
                .collect();
            return Err(PlumError::NotFound {
                function: function.to_string(),
                arg_types: values.iter().map(|v| T::class_of(v).to_string()).collect(),
                suggestions,
            });
        }

        let arg_types = values.iter().map(|v| T::class_of(v).to_string()).collect();
        Self::break_tie(function, candidates, arg_types)
    }

    /// Resolves the method for an explicit-type target (spec §4.4.2, `target`
    /// is a [`Signature`] — used by [`crate::function::Function::invoke`] to
    /// dispatch on type hints rather than runtime values). A method is a
    /// candidate iff `target <= m.signature()`; minimization and tie-break
    /// are otherwise identical to [`Resolver::resolve`].
    pub fn resolve_signature(
        &self,
        function: &str,
        target: &Signature<T>,
    ) -> Result<&Method<T, I>, PlumError> {
        let matching: Vec<&Method<T, I>> = self
            .methods
            .iter()
            .filter(|m| target.le(m.signature()))
            .collect();
        let candidates = Self::minimize(matching);

        let arg_types: Vec<String> = target.params().iter().map(|p| p.to_string()).collect();
        if candidates.is_empty() {
            return Err(PlumError::NotFound {
                function: function.to_string(),
                arg_types,
                suggestions: Vec::new(),
            });
        }

        Self::break_tie(function, candidates, arg_types)
    }
}
