#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Derive-generated code names this crate by its package name; the alias
// keeps those paths valid inside the crate itself.
extern crate self as morph_json;

// -----------------------------------------------------------------------------
// Modules

pub mod catalog;
pub mod convert;
pub mod diff;
pub mod error;
pub mod info;
pub mod serde;

#[doc(hidden)]
pub mod __macro_exports;

// -----------------------------------------------------------------------------
// Top-level exports

// Derive macros and the traits they implement share their names, as serde's
// do; the namespaces keep them apart.
pub use convert::Described;
pub use info::Shape;
pub use morph_json_derive::{Described, Shape, resolvable};
pub use serde::{Codec, Shared};
