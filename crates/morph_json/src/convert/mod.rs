//! Conversion helpers with forgiving wire formats.

pub mod lax_bool;

mod described;
mod long_date_time;

pub use described::{Described, UnknownDescription, text_matches};
pub use lax_bool::LaxBool;
pub use long_date_time::{LongDateTime, TimeError};
