//! Process-wide (thread-local) registry backing [`clear_all_cache`] (spec §9).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use once_cell::unsync::Lazy;

use crate::function::Function;
use crate::host::RuntimeTypeOf;

/// Anything with a dispatch cache that [`clear_all_cache`] can sweep,
/// independent of its host value/class types.
pub trait Clearable {
    fn clear_cache(&self);
}

impl<T: RuntimeTypeOf, I> Clearable for Function<T, I> {
    fn clear_cache(&self) {
        Function::clear_cache(self)
    }
}

thread_local! {
    static REGISTRY: Lazy<RefCell<Vec<Weak<dyn Clearable>>>> =
        Lazy::new(|| RefCell::new(Vec::new()));
}

/// Tracks `function` so a future [`clear_all_cache`] call sweeps it too.
///
/// `plum` holds no intrinsic locks (spec §5) and this registry is no
/// exception: it lives in thread-local storage, since `Function`'s `Rc`s
/// are not `Send`. A host sharing functions across threads is responsible
/// for its own synchronization, as elsewhere.
pub fn track<T: RuntimeTypeOf + 'static, I: 'static>(function: &Rc<Function<T, I>>) {
    let weak: Weak<dyn Clearable> = Rc::downgrade(function) as Weak<dyn Clearable>;
    REGISTRY.with(|r| r.borrow_mut().push(weak));
}

/// Clears every tracked function's dispatch cache and drops registry
/// entries whose function has since been dropped, mirroring the upstream
/// module-level `clear_all_cache()` sweep over `Function._instances`.
pub fn clear_all_cache() {
    REGISTRY.with(|r| {
        let mut entries = r.borrow_mut();
        entries.retain(|weak| {
            if let Some(f) = weak.upgrade() {
                f.clear_cache();
                true
            } else {
                false
            }
        });
    });
}
