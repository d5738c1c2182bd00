//! Static shape metadata.
//!
//! The `Shape` derive emits one [`ShapeInfo`] per struct plus a
//! [`Nomination`] for every trait named in `#[shape(implements(...))]`.
//! All tables are `'static` consts; the catalog and matcher only ever
//! read them.

use core::any::{Any, TypeId};

// -----------------------------------------------------------------------------
// Field info

/// Wire-level description of one struct field.
#[derive(Debug)]
pub struct FieldInfo {
    name: &'static str,
    sets: &'static [&'static str],
}

impl FieldInfo {
    #[inline]
    pub const fn new(name: &'static str, sets: &'static [&'static str]) -> Self {
        Self { name, sets }
    }

    /// The field's wire name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The property sets this field belongs to.
    #[inline]
    pub const fn sets(&self) -> &'static [&'static str] {
        self.sets
    }

    /// Returns `true` if the field belongs to the named property set.
    pub fn in_set(&self, set: &str) -> bool {
        self.sets.iter().any(|candidate| *candidate == set)
    }
}

// -----------------------------------------------------------------------------
// Shape info

/// Wire-level description of a whole struct.
#[derive(Debug)]
pub struct ShapeInfo {
    ident: &'static str,
    fields: &'static [FieldInfo],
}

impl ShapeInfo {
    #[inline]
    pub const fn new(ident: &'static str, fields: &'static [FieldInfo]) -> Self {
        Self { ident, fields }
    }

    /// The struct's type name, without module path.
    #[inline]
    pub const fn ident(&self) -> &'static str {
        self.ident
    }

    #[inline]
    pub const fn fields(&self) -> &'static [FieldInfo] {
        self.fields
    }
}

// -----------------------------------------------------------------------------
// Nominations

/// Decodes one concrete type from an erased deserializer into a boxed trait
/// object, double-boxed so it can travel as `Box<dyn Any>`.
pub type DecodeFn =
    fn(&mut dyn erased_serde::Deserializer) -> Result<Box<dyn Any>, erased_serde::Error>;

/// Declares a struct as a decode candidate for one trait.
pub struct Nomination {
    // `TypeId::of` is not const-stable, so the id is captured as the fn item
    // and evaluated on first use.
    interface: fn() -> TypeId,
    interface_name: &'static str,
    decode: DecodeFn,
}

impl Nomination {
    #[inline]
    pub const fn of<I: ?Sized + 'static>(interface_name: &'static str, decode: DecodeFn) -> Self {
        Self {
            interface: TypeId::of::<I>,
            interface_name,
            decode,
        }
    }

    /// The nominated trait's type id.
    #[inline]
    pub fn interface(&self) -> TypeId {
        (self.interface)()
    }

    /// The nominated trait's name, without module path.
    #[inline]
    pub const fn interface_name(&self) -> &'static str {
        self.interface_name
    }

    #[inline]
    pub const fn decode(&self) -> DecodeFn {
        self.decode
    }
}

// -----------------------------------------------------------------------------
// Shape

/// A type with static wire metadata. Implemented by the `Shape` derive.
pub trait Shape: 'static {
    /// The struct's field table.
    fn shape_info() -> &'static ShapeInfo;

    /// The traits this type is a decode candidate for.
    fn nominations() -> &'static [Nomination] {
        &[]
    }
}
