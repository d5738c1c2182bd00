#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod hash;
pub mod string;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;
