//! A single registered implementation (spec §4.3).

use std::fmt;
use std::rc::Rc;

use crate::host::RuntimeTypeOf;
use crate::signature::Signature;

/// One registered implementation of a [`crate::function::Function`]: a
/// signature to match against, the callable to invoke when it is chosen, and
/// the return type the host declared for it (used by
/// [`crate::conversion::convert`] to coerce the result, spec §4.3.2).
///
/// `I` is the host's callable representation — an `Rc<dyn Fn(...)>`, a
/// bytecode offset, a closure over an interpreter frame, whatever the host
/// already uses to represent "a function body".
pub struct Method<T: RuntimeTypeOf, I> {
    function_name: Rc<str>,
    signature: Signature<T>,
    return_type: Option<T::ClassId>,
    implementation: I,
}

impl<T: RuntimeTypeOf, I> Method<T, I> {
    pub fn new(
        function_name: impl Into<Rc<str>>,
        signature: Signature<T>,
        return_type: Option<T::ClassId>,
        implementation: I,
    ) -> Self {
        Method {
            function_name: function_name.into(),
            signature,
            return_type,
            implementation,
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn signature(&self) -> &Signature<T> {
        &self.signature
    }

    pub fn return_type(&self) -> Option<&T::ClassId> {
        self.return_type.as_ref()
    }

    pub fn implementation(&self) -> &I {
        &self.implementation
    }
}

impl<T: RuntimeTypeOf, I: Clone> Clone for Method<T, I> {
    fn clone(&self) -> Self {
        Method {
            function_name: self.function_name.clone(),
            signature: self.signature.clone(),
            return_type: self.return_type.clone(),
            implementation: self.implementation.clone(),
        }
    }
}

impl<T: RuntimeTypeOf, I> fmt::Debug for Method<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("function_name", &self.function_name)
            .field("signature", &self.signature)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// Methods are compared by every field but the implementation itself, which
/// the host's callable type need not be comparable (spec §4.3, grounded on
/// the upstream `Method.__eq__`, which does compare the implementation
/// because Python functions are always hashable/comparable by identity — in
/// Rust we cannot assume that of an arbitrary `I`, so identity of a method is
/// its name + signature + return type).
impl<T: RuntimeTypeOf, I> PartialEq for Method<T, I> {
    fn eq(&self, other: &Self) -> bool {
        self.function_name == other.function_name
            && self.signature == other.signature
            && self.return_type == other.return_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::TypePredicate;

    #[derive(Debug, Clone, PartialEq)]
    struct V(i64);

    struct Host;

    impl RuntimeTypeOf for Host {
        type ClassId = &'static str;
        type Value = V;

        fn class_of(_value: &Self::Value) -> Self::ClassId {
            "Int"
        }

        fn is_subclass(sub: &Self::ClassId, sup: &Self::ClassId) -> bool {
            sub == sup
        }
    }

    #[test]
    fn equality_ignores_implementation() {
        let sig = Signature::new(vec![TypePredicate::Nominal("Int")], None);
        let a = Method::<Host, i32>::new("f", sig.clone(), None, 1);
        let b = Method::<Host, i32>::new("f", sig, None, 2);
        assert_eq!(a, b);
    }
}
