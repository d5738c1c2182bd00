use core::any::TypeId;
use core::fmt::Debug;

use crate::hash::NoOpHashState;
use crate::hash::hashbrown::HashMap;
use crate::hash::hashbrown::hash_map::Entry;

// -----------------------------------------------------------------------------
// TypeIdMap

/// A specialized map container with [`TypeId`] as the fixed key type.
///
/// `TypeId` is already a high-quality hash, so the map runs over a
/// no-op hasher.
///
/// The container's interface is fully abstracted, exposing no [`HashMap`]
/// specific APIs. This allows for potential future changes to the underlying
/// implementation without breaking external code.
pub struct TypeIdMap<V>(HashMap<TypeId, V, NoOpHashState>);

impl<V> TypeIdMap<V> {
    /// Creates an empty `TypeIdMap`.
    ///
    /// # Examples
    ///
    /// ```
    /// use morph_utils::TypeIdMap;
    /// let map = TypeIdMap::<i32>::new();
    /// ```
    #[inline]
    pub const fn new() -> Self {
        Self(HashMap::with_hasher(NoOpHashState))
    }

    /// Attempts to insert a key-value pair into the map.
    ///
    /// - Returns `true` if the key was not present and the pair was successfully inserted.
    /// - Returns `false` if the key already exists, leaving the map unchanged.
    ///
    /// The closure `f` is only called if the key is not present.
    #[inline]
    pub fn try_insert(&mut self, type_id: TypeId, f: impl FnOnce() -> V) -> bool {
        match self.0.entry(type_id) {
            Entry::Vacant(entry) => {
                entry.insert(f());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Gets a mutable reference to the value associated with the given key,
    /// inserting the result of `f` if the key is not present.
    ///
    /// The closure `f` is only called if the key is not present.
    #[inline]
    pub fn get_or_insert(&mut self, type_id: TypeId, f: impl FnOnce() -> V) -> &mut V {
        match self.0.entry(type_id) {
            Entry::Vacant(entry) => entry.insert(f()),
            Entry::Occupied(entry) => entry.into_mut(),
        }
    }

    /// Returns a reference to the value corresponding to the type.
    pub fn get(&self, type_id: &TypeId) -> Option<&V> {
        self.0.get(type_id)
    }

    /// Returns a reference to the value corresponding to the type.
    #[inline(always)]
    pub fn get_type<T: ?Sized + 'static>(&self) -> Option<&V> {
        self.get(&TypeId::of::<T>())
    }

    /// Inserts a key-value pair into the map.
    pub fn insert(&mut self, type_id: TypeId, v: V) -> Option<V> {
        self.0.insert(type_id, v)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.0.contains_key(type_id)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[inline(always)]
    pub fn contains_type<T: ?Sized + 'static>(&self) -> bool {
        self.contains(&TypeId::of::<T>())
    }

    /// Returns the number of elements in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// An iterator visiting all key-value pairs in arbitrary order.
    ///
    /// The iterator element type is `(&'a K, &'a V)`.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&TypeId, &V)> {
        self.0.iter()
    }
}

// -----------------------------------------------------------------------------
// Traits

impl<T> Default for TypeIdMap<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for TypeIdMap<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Debug> Debug for TypeIdMap<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}
