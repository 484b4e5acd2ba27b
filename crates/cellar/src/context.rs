//! Thread-scoped store context for the convenience functions in
//! [`cells`](crate::cells).
//!
//! Code that holds a [`Cellar`](crate::Cellar) or a store should use it
//! directly. The context exists for call sites that cannot thread a store
//! through, such as deep inside cell-processing callbacks.

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use cellar_store::{MemoryStore, Store};

thread_local! {
    static CURRENT: RefCell<Option<Arc<dyn Store>>> = const { RefCell::new(None) };
}

static DEFAULT: OnceLock<Arc<dyn Store>> = OnceLock::new();

/// The process-wide default store, created on first use.
pub fn default_store() -> Arc<dyn Store> {
    DEFAULT
        .get_or_init(|| {
            tracing::debug!("creating default in-memory store");
            Arc::new(MemoryStore::new())
        })
        .clone()
}

/// The store for the current thread: the innermost [`with_store`] override,
/// or the default store.
pub fn current() -> Arc<dyn Store> {
    CURRENT
        .with(|current| current.borrow().clone())
        .unwrap_or_else(default_store)
}

/// Run `f` with `store` as the current thread's store. The previous store is
/// restored afterwards, even if `f` panics.
pub fn with_store<T>(store: Arc<dyn Store>, f: impl FnOnce() -> T) -> T {
    struct Restore(Option<Arc<dyn Store>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            CURRENT.with(|current| *current.borrow_mut() = previous);
        }
    }

    let previous = CURRENT.with(|current| current.borrow_mut().replace(store));
    let _restore = Restore(previous);
    f()
}
