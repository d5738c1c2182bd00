//! The type catalog: which concrete shapes are decode candidates for which
//! resolvable traits.
//!
//! Registration order is significant: the matcher breaks score ties in
//! favor of the earliest registration.

use core::any::TypeId;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use morph_utils::TypeIdMap;

use crate::info::{DecodeFn, Nomination, Shape, ShapeInfo};

mod matcher;

pub(crate) use matcher::select_best_match;

// -----------------------------------------------------------------------------
// Candidate

/// One concrete type nominated for an interface, as handed to the matcher.
#[derive(Clone, Copy)]
pub struct Candidate {
    shape: &'static ShapeInfo,
    decode: DecodeFn,
}

impl Candidate {
    /// The candidate's field table.
    #[inline]
    pub const fn shape(&self) -> &'static ShapeInfo {
        self.shape
    }

    #[inline]
    pub(crate) const fn decode(&self) -> DecodeFn {
        self.decode
    }
}

// -----------------------------------------------------------------------------
// TypeCatalog

struct RegisteredShape {
    shape: &'static ShapeInfo,
    nominations: &'static [Nomination],
}

/// An ordered collection of registered shapes, indexed by the traits they
/// implement.
///
/// Candidate lists per interface are computed on first [`lookup`] and
/// memoized for the catalog's lifetime.
///
/// [`lookup`]: TypeCatalog::lookup
#[derive(Default)]
pub struct TypeCatalog {
    registered: Vec<RegisteredShape>,
    seen: TypeIdMap<()>,
    memo: RwLock<TypeIdMap<Arc<[Candidate]>>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `T`'s shape and nominations.
    ///
    /// Returns `false` without side effects if `T` is already registered.
    pub fn register<T: Shape>(&mut self) -> bool {
        if !self.seen.try_insert(TypeId::of::<T>(), || ()) {
            return false;
        }
        self.registered.push(RegisteredShape {
            shape: T::shape_info(),
            nominations: T::nominations(),
        });
        // A new shape invalidates previously memoized candidate lists.
        *self.memo.get_mut().unwrap_or_else(PoisonError::into_inner) = TypeIdMap::new();
        true
    }

    /// The number of registered shapes.
    #[inline]
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// The candidates nominated for the given interface, in registration
    /// order. An unknown interface yields an empty slice.
    pub fn lookup(&self, interface: TypeId) -> Arc<[Candidate]> {
        if let Some(found) = self
            .memo
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&interface)
        {
            return found.clone();
        }
        let collected: Arc<[Candidate]> = self
            .registered
            .iter()
            .flat_map(|entry| {
                entry
                    .nominations
                    .iter()
                    .filter(|nomination| nomination.interface() == interface)
                    .map(|nomination| Candidate {
                        shape: entry.shape,
                        decode: nomination.decode(),
                    })
            })
            .collect::<Vec<_>>()
            .into();
        // A racing recompute is wasted work, never a different value.
        let mut memo = self.memo.write().unwrap_or_else(PoisonError::into_inner);
        memo.get_or_insert(interface, || collected).clone()
    }

    /// The process-wide catalog.
    ///
    /// Populated from `#[shape(auto_register)]` submissions when the
    /// `auto_register` feature is enabled, empty otherwise. Used by every
    /// decode that runs outside an explicit [`Codec`](crate::Codec) scope.
    pub fn global() -> &'static TypeCatalog {
        &GLOBAL
    }
}

#[cfg(feature = "auto_register")]
static GLOBAL: LazyLock<TypeCatalog> = LazyLock::new(|| {
    let mut catalog = TypeCatalog::new();
    for entry in inventory::iter::<CatalogEntry> {
        entry.apply(&mut catalog);
    }
    catalog
});

#[cfg(not(feature = "auto_register"))]
static GLOBAL: LazyLock<TypeCatalog> = LazyLock::new(TypeCatalog::new);

// -----------------------------------------------------------------------------
// Auto registration

/// A registration thunk collected by `inventory`.
///
/// Submitted by `#[shape(auto_register)]`; applied once when the global
/// catalog is first touched.
#[cfg(feature = "auto_register")]
pub struct CatalogEntry(fn(&mut TypeCatalog));

#[cfg(feature = "auto_register")]
impl CatalogEntry {
    pub const fn of<T: Shape>() -> Self {
        Self(|catalog| {
            catalog.register::<T>();
        })
    }

    fn apply(&self, catalog: &mut TypeCatalog) {
        (self.0)(catalog);
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(CatalogEntry);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::any::Any;

    use super::*;
    use crate::info::FieldInfo;

    fn stub(
        _deserializer: &mut dyn erased_serde::Deserializer,
    ) -> Result<Box<dyn Any>, erased_serde::Error> {
        Ok(Box::new(()))
    }

    trait Target {}

    static SHAPE_A: ShapeInfo = ShapeInfo::new("A", &[FieldInfo::new("id", &[])]);
    static SHAPE_B: ShapeInfo = ShapeInfo::new("B", &[FieldInfo::new("id", &[])]);

    struct A;
    impl Shape for A {
        fn shape_info() -> &'static ShapeInfo {
            &SHAPE_A
        }
        fn nominations() -> &'static [Nomination] {
            static NOMS: [Nomination; 1] = [Nomination::of::<dyn Target>("Target", stub)];
            &NOMS
        }
    }

    struct B;
    impl Shape for B {
        fn shape_info() -> &'static ShapeInfo {
            &SHAPE_B
        }
        fn nominations() -> &'static [Nomination] {
            static NOMS: [Nomination; 1] = [Nomination::of::<dyn Target>("Target", stub)];
            &NOMS
        }
    }

    #[test]
    fn register_is_insert_if_absent() {
        let mut catalog = TypeCatalog::new();
        assert!(catalog.register::<A>());
        assert!(!catalog.register::<A>());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn lookup_returns_candidates_in_registration_order() {
        let mut catalog = TypeCatalog::new();
        catalog.register::<B>();
        catalog.register::<A>();
        let candidates = catalog.lookup(TypeId::of::<dyn Target>());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].shape().ident(), "B");
        assert_eq!(candidates[1].shape().ident(), "A");
    }

    #[test]
    fn lookup_of_unknown_interface_is_empty() {
        let catalog = TypeCatalog::new();
        assert!(catalog.lookup(TypeId::of::<dyn Target>()).is_empty());
    }

    #[test]
    fn registration_after_lookup_refreshes_candidates() {
        let mut catalog = TypeCatalog::new();
        catalog.register::<A>();
        assert_eq!(catalog.lookup(TypeId::of::<dyn Target>()).len(), 1);
        catalog.register::<B>();
        assert_eq!(catalog.lookup(TypeId::of::<dyn Target>()).len(), 2);
    }
}
