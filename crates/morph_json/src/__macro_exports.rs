//! Re-exports used by derive-generated code. Not public API.

pub use erased_serde;
pub use serde_core;

#[cfg(feature = "auto_register")]
pub use inventory;
