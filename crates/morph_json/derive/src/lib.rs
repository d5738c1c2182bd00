//! Derive and attribute macros for `morph_json`.
//!
//! - [`macro@Shape`] describes a struct's fields to the codecs and implements
//!   the serde traits through the shape tables.
//! - [`macro@resolvable`] turns a trait into a decode target whose concrete
//!   type is selected by field-name matching.
//! - [`macro@Described`] maps a unit-variant enum to and from its
//!   human-readable descriptions.

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemTrait, parse_macro_input};

mod described;
mod resolvable;
mod shape;

/// The helper attribute shared by the derives: `#[shape(...)]`.
const SHAPE_ATTRIBUTE: &str = "shape";

// -----------------------------------------------------------------------------
// Shape

/// Derives `Shape`, `Shaped`, `Serialize` and `Deserialize` for a struct with
/// named fields.
///
/// The struct must also implement [`Default`]; decoding starts from the
/// default value and assigns the fields found in the input.
///
/// # Container attributes
///
/// - `#[shape(implements(Trait, ...))]` nominates the struct as a decode
///   candidate for each listed [`macro@resolvable`] trait.
/// - `#[shape(auto_register)]` submits the struct to the global catalog at
///   startup (requires the `auto_register` feature).
///
/// # Field attributes
///
/// - `#[shape(rename = "name")]` changes the wire name of the field.
/// - `#[shape(sets("A", "B"))]` places the field in the named property sets.
/// - `#[shape(skip)]` hides the field from the codecs entirely.
#[proc_macro_derive(Shape, attributes(shape))]
pub fn derive_shape(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    shape::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

// -----------------------------------------------------------------------------
// Described

/// Derives `Described`, `Display`, `FromStr`, `Serialize` and `Deserialize`
/// for a unit-variant enum.
///
/// Each variant may carry `#[shape(description("..."))]`; variants without
/// one use the variant name as their description. The enum
/// serializes as its description string and deserializes from either a
/// description or a variant name, tolerating a flipped first-character case.
#[proc_macro_derive(Described, attributes(shape))]
pub fn derive_described(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    described::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

// -----------------------------------------------------------------------------
// Resolvable

/// Marks a trait as a polymorphic decode target.
///
/// Appends the `Resolved` supertrait and implements `Serialize` for
/// `dyn Trait` and `Deserialize` for `Box<dyn Trait>`. Decoding consults the
/// active catalog and picks the registered implementer whose field names best
/// match the input object.
#[proc_macro_attribute]
pub fn resolvable(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemTrait);
    resolvable::expand(item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
