//! The shape-directed struct codec.
//!
//! `#[derive(Shape)]` types serialize and deserialize through their static
//! [`FieldDef`] tables instead of generated per-type visitors. That keeps
//! the wire behavior data-driven: an active property set filters and sorts
//! the written fields, and the read loop tolerates unknown names and
//! first-character case differences.

use core::any::TypeId;
use core::fmt;
use core::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use serde_core::de::{DeserializeSeed, IgnoredAny, MapAccess, Visitor};
use serde_core::ser::SerializeMap;
use serde_core::{Deserializer, Serializer};

use morph_utils::hash::HashMap;
use morph_utils::string::first_char_flip_case;

use crate::info::{FieldInfo, Shape};

use super::refs;
use super::scope;

// -----------------------------------------------------------------------------
// Field vtables

/// Borrows one field as an erased serializable value.
pub type GetFn<T> = fn(&T) -> &dyn erased_serde::Serialize;

/// Assigns one field from an erased deserializer.
pub type SetFn<T> = fn(&mut T, &mut dyn erased_serde::Deserializer) -> Result<(), erased_serde::Error>;

/// One field's wire metadata plus its access fns. Emitted by the derive.
pub struct FieldDef<T> {
    info: &'static FieldInfo,
    get: GetFn<T>,
    set: SetFn<T>,
}

impl<T> FieldDef<T> {
    #[inline]
    pub const fn new(info: &'static FieldInfo, get: GetFn<T>, set: SetFn<T>) -> Self {
        Self { info, get, set }
    }

    #[inline]
    pub const fn info(&self) -> &'static FieldInfo {
        self.info
    }

    #[inline]
    pub fn get<'a>(&self, value: &'a T) -> &'a dyn erased_serde::Serialize {
        (self.get)(value)
    }

    pub fn set<'de, D>(&self, value: &mut T, deserializer: D) -> Result<(), erased_serde::Error>
    where
        D: Deserializer<'de>,
    {
        let mut erased = <dyn erased_serde::Deserializer>::erase(deserializer);
        (self.set)(value, &mut erased)
    }
}

/// A type whose fields are described by a static [`FieldDef`] table.
///
/// Decoding starts from [`Default::default`] and assigns the fields found in
/// the input; fields absent from the input keep their defaults.
pub trait Shaped: Shape + Default {
    fn field_defs() -> &'static [FieldDef<Self>];
}

// -----------------------------------------------------------------------------
// Set filters

/// Memoized per-`(type, set name)` allow-lists: the indices of the fields in
/// the set, sorted by wire name.
///
/// Compute-once, never evicted. Owned by the [`Codec`](super::Codec) so two
/// codecs never contend.
#[derive(Default)]
pub struct SetFilterCache {
    memo: RwLock<HashMap<(TypeId, Arc<str>), Arc<[usize]>>>,
}

impl SetFilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The allow-list for `T` under the named set.
    pub fn indices<T: Shaped>(&self, set: &Arc<str>) -> Arc<[usize]> {
        let key = (TypeId::of::<T>(), set.clone());
        if let Some(found) = self
            .memo
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return found.clone();
        }
        let defs = T::field_defs();
        let mut indices: Vec<usize> = (0..defs.len())
            .filter(|&index| defs[index].info().in_set(set))
            .collect();
        indices.sort_by_key(|&index| defs[index].info().name());
        let computed: Arc<[usize]> = indices.into();
        let mut memo = self.memo.write().unwrap_or_else(PoisonError::into_inner);
        memo.entry(key).or_insert(computed).clone()
    }
}

// -----------------------------------------------------------------------------
// Write path

/// Serializes a shaped value as a map of its fields.
///
/// With an active property set, only fields in the set are written, sorted
/// by wire name; otherwise all fields in declaration order. Emitted as a map
/// rather than a struct so a reference id entry can join dynamically.
pub fn serialize_shaped<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Shaped,
    S: Serializer,
{
    serialize_shaped_body(value, None, serializer)
}

pub(crate) fn serialize_shaped_body<T, S>(
    value: &T,
    reference_id: Option<u32>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    T: Shaped,
    S: Serializer,
{
    let defs = T::field_defs();
    let filtered = scope::active_set().map(|(set, cache)| cache.indices::<T>(&set));
    let count = filtered.as_ref().map_or(defs.len(), |allowed| allowed.len());
    let mut map = serializer.serialize_map(Some(count + usize::from(reference_id.is_some())))?;
    if let Some(id) = reference_id {
        map.serialize_entry(refs::ID_MARKER, &id.to_string())?;
    }
    match &filtered {
        Some(allowed) => {
            for &index in allowed.iter() {
                let def = &defs[index];
                map.serialize_entry(def.info().name(), def.get(value))?;
            }
        }
        None => {
            for def in defs {
                map.serialize_entry(def.info().name(), def.get(value))?;
            }
        }
    }
    map.end()
}

// -----------------------------------------------------------------------------
// Read path

/// Deserializes a shaped value from a map, starting from its default.
pub fn deserialize_shaped<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Shaped,
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(ShapedVisitor::<T>(PhantomData))
}

struct ShapedVisitor<T>(PhantomData<T>);

impl<'de, T: Shaped> Visitor<'de> for ShapedVisitor<T> {
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "an object for `{}`", T::shape_info().ident())
    }

    fn visit_map<A>(self, mut map: A) -> Result<T, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut value = T::default();
        fill_from_map(&mut value, None, &mut map)?;
        Ok(value)
    }
}

/// The streaming single-pass field loop, shared with the `Shared<T>` reader
/// which may have consumed the first key already.
///
/// Keys match exact-first, then with the first character's case flipped.
/// Keys outside the shape or outside the active set are skipped via
/// [`IgnoredAny`], which consumes arbitrarily nested values.
pub(crate) fn fill_from_map<'de, T, A>(
    value: &mut T,
    first_key: Option<String>,
    map: &mut A,
) -> Result<(), A::Error>
where
    T: Shaped,
    A: MapAccess<'de>,
{
    let filtered = scope::active_set().map(|(set, cache)| cache.indices::<T>(&set));
    let mut pending = first_key;
    loop {
        let key = match pending.take() {
            Some(key) => key,
            None => match map.next_key::<String>()? {
                Some(key) => key,
                None => break,
            },
        };
        match find_field::<T>(&key, filtered.as_deref()) {
            Some(def) => map.next_value_seed(FieldAssign { value, def })?,
            None => {
                map.next_value::<IgnoredAny>()?;
            }
        }
    }
    Ok(())
}

fn find_field<T: Shaped>(key: &str, allowed: Option<&[usize]>) -> Option<&'static FieldDef<T>> {
    let defs = T::field_defs();
    let position = defs
        .iter()
        .position(|def| def.info().name() == key)
        .or_else(|| {
            let flipped = first_char_flip_case(key);
            defs.iter().position(|def| def.info().name() == flipped)
        })?;
    match allowed {
        Some(allowed) if !allowed.contains(&position) => None,
        _ => Some(&defs[position]),
    }
}

struct FieldAssign<'a, T: 'static> {
    value: &'a mut T,
    def: &'static FieldDef<T>,
}

impl<'de, T: Shaped> DeserializeSeed<'de> for FieldAssign<'_, T> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        self.def
            .set(self.value, deserializer)
            .map_err(|error| field_error::<T, D::Error>(error, self.def))
    }
}

#[cfg(all(debug_assertions, feature = "debug"))]
fn field_error<T, E>(error: erased_serde::Error, def: &FieldDef<T>) -> E
where
    T: Shaped,
    E: serde_core::de::Error,
{
    E::custom(format_args!(
        "{error} (at {}.{})",
        T::shape_info().ident(),
        def.info().name()
    ))
}

#[cfg(not(all(debug_assertions, feature = "debug")))]
fn field_error<T, E>(error: erased_serde::Error, _def: &FieldDef<T>) -> E
where
    T: Shaped,
    E: serde_core::de::Error,
{
    E::custom(error)
}

// -----------------------------------------------------------------------------
// Tests
