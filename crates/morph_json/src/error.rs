//! Error types shared by the codecs.

use thiserror::Error;

// -----------------------------------------------------------------------------
// Decode failures

/// The reasons a shape-directed decode can fail beyond plain JSON errors.
///
/// Kinds surface mid-stream through `serde` custom errors, so they arrive
/// wrapped in the deserializer's error type with their message intact.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A trait object decode met something other than a JSON object.
    #[error("cannot resolve `{interface}` from a non-object value")]
    NotAnObject { interface: &'static str },

    /// The catalog holds no candidate for the requested trait.
    #[error("no types are registered as implementers of `{interface}`")]
    NoCandidates { interface: &'static str },

    /// A `$ref` pointed at an id no `$id` has introduced yet.
    #[error("reference id {id} has not been defined")]
    UnknownReferenceId { id: u32 },

    /// Two `$id` markers carried the same id in one document.
    #[error("reference id {id} is defined more than once")]
    DuplicateReferenceId { id: u32 },

    /// A `$ref` resolved to an object of a different type.
    #[error("reference id {id} points at a value of another type")]
    MismatchedReference { id: u32 },

    /// A `$ref` was met outside a reference-preserving decode.
    #[error("found a `$ref` marker but reference preservation is not active")]
    ReferencesInactive,

    /// A candidate decoded successfully but its boxed trait object was not
    /// the one the caller asked for.
    #[error("candidate `{candidate}` did not produce a `{interface}` trait object")]
    CandidateTypeMismatch {
        candidate: &'static str,
        interface: &'static str,
    },
}

// -----------------------------------------------------------------------------
// Encode failures

/// The reasons a shape-directed encode can fail beyond plain JSON errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// A cyclic `Shared` graph was met without an active reference table.
    #[error("found a reference cycle but reference preservation is not active")]
    CyclicGraph,
}

// -----------------------------------------------------------------------------
// Codec entry points

/// Failure of a [`Codec`](crate::Codec) encode call.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure of a [`Codec`](crate::Codec) decode call.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
