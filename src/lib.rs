//! `plum`: multiple dispatch for a dynamically-typed host.
//!
//! The engine never sees a concrete value or class type of its own — a host
//! implements [`host::RuntimeTypeOf`] (and, for owner-self-reference and MRO
//! fallback, [`host::ClassResolver`] / [`host::ClassHierarchy`]) and gets
//! back a [`dispatcher::Dispatcher`] it can register methods against and
//! call through.

pub mod config;
pub mod conversion;
pub mod dispatcher;
pub mod error;
pub mod function;
pub mod host;
pub mod method;
pub mod predicate;
pub mod registry;
pub mod resolver;
pub mod signature;

/// The commonly-needed set, for a `use plum::prelude::*;` in a host crate.
pub mod prelude {
    pub use crate::config::PlumConfig;
    pub use crate::conversion::ConversionTable;
    pub use crate::dispatcher::{Dispatcher, DispatcherBundle};
    pub use crate::error::{PlumError, PlumResult};
    pub use crate::function::{BoundFunction, Function};
    pub use crate::host::{ClassHierarchy, ClassResolver, RuntimeTypeOf};
    pub use crate::method::Method;
    pub use crate::predicate::{Probe, TypePredicate};
    pub use crate::registry::{clear_all_cache, track};
    pub use crate::resolver::Resolver;
    pub use crate::signature::Signature;
}
