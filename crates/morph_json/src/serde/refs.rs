//! Reference preservation.
//!
//! [`Shared<T>`] is the aliasing-aware handle: inside a preserving codec
//! call, the first encounter of an allocation writes `{"$id":"<n>", ...}`
//! and every repeat writes `{"$ref":"<n>"}`. Decoding registers the fresh
//! handle under its id before reading the fields, so cycles resolve to the
//! object under construction.

use core::any::Any;
use core::cell::{Ref, RefCell, RefMut};
use core::fmt;
use core::marker::PhantomData;
use std::rc::Rc;

use serde_core::de::{Error as _, IgnoredAny, MapAccess, Visitor};
use serde_core::ser::{Error as _, SerializeMap};
use serde_core::{Deserialize, Deserializer, Serialize, Serializer};

use morph_utils::hash::HashMap;

use crate::error::{DecodeErrorKind, EncodeErrorKind};

use super::scope;
use super::shaped::{self, Shaped};

pub(crate) const ID_MARKER: &str = "$id";
pub(crate) const REF_MARKER: &str = "$ref";

// -----------------------------------------------------------------------------
// ReferenceTable

/// Per-call id bookkeeping. One table per top-level preserving codec call.
///
/// The write side keys on object identity (the shared allocation's address),
/// never on value equality. Ids are sequential, starting at 1, assigned on
/// first sighting; the wire form is the id as a decimal string.
#[derive(Default)]
pub struct ReferenceTable {
    identity_to_id: HashMap<usize, u32>,
    id_to_object: HashMap<u32, Rc<dyn Any>>,
    next_id: u32,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id for this identity, allocating one on first sighting.
    /// The flag reports whether the identity had been seen before.
    pub fn get_or_create(&mut self, identity: usize) -> (u32, bool) {
        if let Some(&id) = self.identity_to_id.get(&identity) {
            return (id, true);
        }
        self.next_id += 1;
        self.identity_to_id.insert(identity, self.next_id);
        (self.next_id, false)
    }

    /// Associates a decoded object with its `$id`.
    pub fn register(&mut self, id: u32, object: Rc<dyn Any>) -> Result<(), DecodeErrorKind> {
        if self.id_to_object.contains_key(&id) {
            return Err(DecodeErrorKind::DuplicateReferenceId { id });
        }
        self.id_to_object.insert(id, object);
        Ok(())
    }

    /// Looks a `$ref` id back up as a `T` allocation.
    pub fn resolve<T: Any>(&self, id: u32) -> Result<Rc<T>, DecodeErrorKind> {
        let object = self
            .id_to_object
            .get(&id)
            .ok_or(DecodeErrorKind::UnknownReferenceId { id })?;
        object
            .clone()
            .downcast::<T>()
            .map_err(|_| DecodeErrorKind::MismatchedReference { id })
    }
}

// -----------------------------------------------------------------------------
// Shared

/// A shared, mutable handle to a shaped value.
///
/// Clones alias the same allocation. Under a preserving codec the aliasing
/// survives the wire; outside one, every handle serializes as a plain body,
/// and a cyclic graph is refused with an encode error instead of recursing
/// without end.
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Returns `true` if both handles alias the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    fn from_cell(cell: Rc<RefCell<T>>) -> Self {
        Self(cell)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => f.debug_tuple("Shared").field(&*value).finish(),
            Err(_) => f.write_str("Shared(<borrowed>)"),
        }
    }
}

// -----------------------------------------------------------------------------
// Write path

std::thread_local! {
    /// Identities of the `Shared` allocations currently being written as
    /// plain bodies. A repeat on this stack is a cycle, not an alias.
    static ENCODING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks an allocation as in progress on the plain-body write path for the
/// guard's lifetime.
struct EncodeGuard;

impl EncodeGuard {
    fn enter(identity: usize) -> Result<Self, EncodeErrorKind> {
        ENCODING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&identity) {
                return Err(EncodeErrorKind::CyclicGraph);
            }
            stack.push(identity);
            Ok(Self)
        })
    }
}

impl Drop for EncodeGuard {
    fn drop(&mut self) {
        ENCODING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl<T: Shaped> Serialize for Shared<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let Some(refs) = scope::active_refs() else {
            let _in_progress = EncodeGuard::enter(self.identity()).map_err(S::Error::custom)?;
            return shaped::serialize_shaped(&*self.borrow(), serializer);
        };
        let (id, existed) = refs.borrow_mut().get_or_create(self.identity());
        if existed {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(REF_MARKER, &id.to_string())?;
            map.end()
        } else {
            shaped::serialize_shaped_body(&*self.borrow(), Some(id), serializer)
        }
    }
}

// -----------------------------------------------------------------------------
// Read path

impl<'de, T: Shaped> Deserialize<'de> for Shared<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(SharedVisitor::<T>(PhantomData))
    }
}

struct SharedVisitor<T>(PhantomData<T>);

impl<'de, T: Shaped> Visitor<'de> for SharedVisitor<T> {
    type Value = Shared<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "an object for `{}`", T::shape_info().ident())
    }

    fn visit_map<A>(self, mut map: A) -> Result<Shared<T>, A::Error>
    where
        A: MapAccess<'de>,
    {
        let first = map.next_key::<String>()?;
        match first.as_deref() {
            Some(REF_MARKER) => {
                let id = parse_marker_id(map.next_value::<String>()?)?;
                let refs = scope::active_refs()
                    .ok_or_else(|| A::Error::custom(DecodeErrorKind::ReferencesInactive))?;
                let cell = refs
                    .borrow()
                    .resolve::<RefCell<T>>(id)
                    .map_err(A::Error::custom)?;
                while map.next_key::<IgnoredAny>()?.is_some() {
                    map.next_value::<IgnoredAny>()?;
                }
                Ok(Shared::from_cell(cell))
            }
            Some(ID_MARKER) => {
                let id = parse_marker_id(map.next_value::<String>()?)?;
                let shared = Shared::new(T::default());
                // Registered before the body is read, so a cyclic `$ref`
                // inside resolves to the value under construction.
                if let Some(refs) = scope::active_refs() {
                    refs.borrow_mut()
                        .register(id, shared.0.clone())
                        .map_err(A::Error::custom)?;
                }
                let mut value = shared.borrow_mut();
                shaped::fill_from_map(&mut *value, None, &mut map)?;
                drop(value);
                Ok(shared)
            }
            _ => {
                let shared = Shared::new(T::default());
                let mut value = shared.borrow_mut();
                shaped::fill_from_map(&mut *value, first, &mut map)?;
                drop(value);
                Ok(shared)
            }
        }
    }
}

fn parse_marker_id<E: serde_core::de::Error>(text: String) -> Result<u32, E> {
    text.parse()
        .map_err(|_| E::custom(format_args!("reference id `{text}` is not a decimal number")))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn ids_are_sequential_from_one() {
        let mut table = ReferenceTable::new();
        assert_eq!(table.get_or_create(0xA0), (1, false));
        assert_eq!(table.get_or_create(0xB0), (2, false));
        assert_eq!(table.get_or_create(0xA0), (1, true));
    }

    #[test]
    fn duplicate_registration_errors() {
        let mut table = ReferenceTable::new();
        let object: Rc<dyn core::any::Any> = Rc::new(RefCell::new(0_i32));
        assert!(table.register(1, object.clone()).is_ok());
        assert_eq!(
            table.register(1, object),
            Err(DecodeErrorKind::DuplicateReferenceId { id: 1 })
        );
    }

    #[test]
    fn resolve_checks_id_and_type() {
        let mut table = ReferenceTable::new();
        let object: Rc<dyn core::any::Any> = Rc::new(RefCell::new(7_i32));
        table.register(1, object).unwrap();
        assert_eq!(*table.resolve::<RefCell<i32>>(1).unwrap().borrow(), 7);
        assert_eq!(
            table.resolve::<RefCell<i32>>(2).err(),
            Some(DecodeErrorKind::UnknownReferenceId { id: 2 })
        );
        assert_eq!(
            table.resolve::<RefCell<String>>(1).err(),
            Some(DecodeErrorKind::MismatchedReference { id: 1 })
        );
    }

    #[test]
    fn clones_alias_and_ptr_eq_sees_it() {
        let left = Shared::new(1_i32);
        let right = left.clone();
        *right.borrow_mut() = 2;
        assert_eq!(*left.borrow(), 2);
        assert!(left.ptr_eq(&right));
        assert!(!left.ptr_eq(&Shared::new(2)));
    }
}
