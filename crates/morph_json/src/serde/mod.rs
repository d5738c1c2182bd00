//! The shape-directed codecs.
//!
//! Everything here runs inside ordinary serde calls. Per-call options (the
//! active catalog, property set and reference table) travel through a
//! thread-scoped stack installed by [`Codec`] entry points, so the generated
//! trait impls stay zero-argument.

mod codec;
mod refs;
mod resolve;
mod scope;
mod shaped;

pub use codec::Codec;
pub use refs::{ReferenceTable, Shared};
pub use resolve::{Resolved, deserialize_interface, serialize_interface};
pub use shaped::{FieldDef, GetFn, SetFilterCache, SetFn, Shaped, deserialize_shaped, serialize_shaped};
