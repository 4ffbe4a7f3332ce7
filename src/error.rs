//! Error taxonomy (spec §7).

use thiserror::Error;

/// Everything that can go wrong resolving or invoking a dispatched call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlumError {
    /// No registered method's signature matches the call, and (if the
    /// function is owned by a class) no ancestor in the class's MRO owns a
    /// matching method either.
    #[error("no method matching {function}({arg_types})", arg_types = arg_types.join(", "))]
    NotFound {
        function: String,
        arg_types: Vec<String>,
        /// Up to three near-miss candidates, closest first (spec §7,
        /// ascending mismatch-count suggestion rule).
        suggestions: Vec<String>,
    },

    /// More than one method is minimal under the specificity partial order
    /// and none has strictly higher precedence than the rest.
    #[error("ambiguous call to {function}({arg_types}); candidates: {candidates}",
        arg_types = arg_types.join(", "),
        candidates = candidates.join(", "))]
    Ambiguous {
        function: String,
        arg_types: Vec<String>,
        candidates: Vec<String>,
    },

    /// A signature was rejected at registration time (e.g. a vararg
    /// parameter that is not the last one).
    #[error("invalid signature for {function}: {reason}")]
    InvalidSignature { function: String, reason: String },

    /// `convert`/`promote` could not find a conversion method and the source
    /// was not already a subtype of the destination.
    #[error("cannot convert {from} to {to}")]
    ConversionFailure { from: String, to: String },

    /// `promote` found no rule describing a common type for these two
    /// classes.
    #[error("no promotion rule for {a} and {b}")]
    NoPromotionRule { a: String, b: String },

    /// A forward-referenced class name (spec §4.1, owner self-reference)
    /// never resolved.
    #[error("could not resolve type annotation {name:?}")]
    UnresolvableAnnotation { name: String },

    /// Wraps another error with the owning function's name, mirroring the
    /// upstream `"For function {name}[ of {owner}]: ..."` prefix (spec
    /// §4.5.5).
    #[error("For function {function}{owner}: {source}",
        owner = owner.as_ref().map(|o| format!(" of {o}")).unwrap_or_default())]
    Context {
        function: String,
        owner: Option<String>,
        #[source]
        source: Box<PlumError>,
    },
}

pub type PlumResult<T> = Result<T, PlumError>;

impl PlumError {
    /// Wraps `self` with the name (and, if owned, the owner) of the
    /// function being resolved, unless it is already wrapped.
    pub fn with_function_context(self, function: impl Into<String>, owner: Option<String>) -> Self {
        if matches!(self, PlumError::Context { .. }) {
            return self;
        }
        PlumError::Context {
            function: function.into(),
            owner,
            source: Box::new(self),
        }
    }
}
