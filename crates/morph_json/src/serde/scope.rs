//! The thread-scoped codec state.
//!
//! serde trait impls take no arguments, so per-call options travel through a
//! thread-local stack of frames. [`Codec`](super::Codec) entry points push a
//! frame for the duration of the call; the generated impls read the top one.
//! An empty stack means plain `serde_json` usage: the global catalog, all
//! fields, no reference preservation.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::catalog::TypeCatalog;

use super::refs::ReferenceTable;
use super::shaped::SetFilterCache;

// -----------------------------------------------------------------------------
// Frames

pub(crate) struct ScopeFrame {
    pub catalog: Option<Arc<TypeCatalog>>,
    pub property_set: Option<Arc<str>>,
    pub set_filters: Option<Arc<SetFilterCache>>,
    pub refs: Option<Rc<RefCell<ReferenceTable>>>,
}

thread_local! {
    static SCOPES: RefCell<Vec<ScopeFrame>> = const { RefCell::new(Vec::new()) };
}

/// Pops its frame on drop, restoring the enclosing scope.
pub(crate) struct ScopeGuard(());

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

pub(crate) fn enter(frame: ScopeFrame) -> ScopeGuard {
    SCOPES.with(|scopes| scopes.borrow_mut().push(frame));
    ScopeGuard(())
}

// -----------------------------------------------------------------------------
// Accessors
//
// Each accessor clones the handle out and releases the thread-local borrow
// before the caller runs, so user (de)serialization code may reenter.

/// Runs `f` against the active catalog, or the global one outside a scope.
pub(crate) fn with_catalog<R>(f: impl FnOnce(&TypeCatalog) -> R) -> R {
    let scoped = SCOPES.with(|scopes| {
        scopes
            .borrow()
            .last()
            .and_then(|frame| frame.catalog.clone())
    });
    match scoped {
        Some(catalog) => f(&catalog),
        None => f(TypeCatalog::global()),
    }
}

/// The active property set and the cache that filters by it, if any.
pub(crate) fn active_set() -> Option<(Arc<str>, Arc<SetFilterCache>)> {
    SCOPES.with(|scopes| {
        let scopes = scopes.borrow();
        let frame = scopes.last()?;
        Some((frame.property_set.clone()?, frame.set_filters.clone()?))
    })
}

/// The active reference table, if preservation is on.
pub(crate) fn active_refs() -> Option<Rc<RefCell<ReferenceTable>>> {
    SCOPES.with(|scopes| scopes.borrow().last().and_then(|frame| frame.refs.clone()))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> ScopeFrame {
        ScopeFrame {
            catalog: None,
            property_set: Some(Arc::from("Edit")),
            set_filters: Some(Arc::new(SetFilterCache::new())),
            refs: None,
        }
    }

    #[test]
    fn guard_restores_the_enclosing_scope() {
        assert!(active_set().is_none());
        {
            let _outer = enter(frame());
            assert_eq!(active_set().map(|(set, _)| set), Some(Arc::from("Edit")));
            {
                let inner = ScopeFrame {
                    property_set: Some(Arc::from("View")),
                    ..frame()
                };
                let _inner = enter(inner);
                assert_eq!(active_set().map(|(set, _)| set), Some(Arc::from("View")));
            }
            assert_eq!(active_set().map(|(set, _)| set), Some(Arc::from("Edit")));
        }
        assert!(active_set().is_none());
    }
}
