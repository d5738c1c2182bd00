//! Polymorphic encode and decode for resolvable traits.
//!
//! No type tag ever hits the wire. Encoding dispatches through the value's
//! own erased `Serialize`; decoding consults the active catalog and, with
//! more than one candidate, scores the payload's field names to pick the
//! concrete type.

use core::any::{Any, TypeId};

use serde_core::de::Error as _;
use serde_core::{Deserialize, Deserializer, Serializer};

use crate::catalog::{self, Candidate};
use crate::error::DecodeErrorKind;

use super::scope;

// -----------------------------------------------------------------------------
// Resolved

/// Erased serialize capability; the supertrait `#[resolvable]` appends.
///
/// Blanket-implemented, so implementers of a resolvable trait need nothing
/// beyond `Serialize`.
pub trait Resolved: erased_serde::Serialize {}

impl<T: ?Sized + erased_serde::Serialize> Resolved for T {}

// -----------------------------------------------------------------------------
// Encode

/// Serializes a trait object as its concrete type's body.
pub fn serialize_interface<S>(value: &dyn Resolved, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    erased_serde::serialize(value, serializer)
}

// -----------------------------------------------------------------------------
// Decode

/// Decodes `T` (a `Box<dyn Trait>`) by resolving the concrete type from the
/// payload's field names.
///
/// A sole candidate decodes streaming from the live deserializer. With
/// several, the payload buffers into a [`serde_json::Value`] first; the
/// matcher picks the winner and the buffered value replays through its
/// decode fn, so nested resolvable and shaped fields pass through the full
/// machinery uniformly.
pub fn deserialize_interface<'de, T, D>(
    interface: TypeId,
    interface_name: &'static str,
    deserializer: D,
) -> Result<T, D::Error>
where
    T: Any,
    D: Deserializer<'de>,
{
    let candidates = scope::with_catalog(|catalog| catalog.lookup(interface));
    let [sole] = &candidates[..] else {
        if candidates.is_empty() {
            return Err(D::Error::custom(DecodeErrorKind::NoCandidates {
                interface: interface_name,
            }));
        }
        return deserialize_scored(&candidates, interface_name, deserializer);
    };
    let mut erased = <dyn erased_serde::Deserializer>::erase(deserializer);
    let decoded = (sole.decode())(&mut erased).map_err(D::Error::custom)?;
    downcast_decoded(decoded, sole.shape().ident(), interface_name).map_err(D::Error::custom)
}

fn deserialize_scored<'de, T, D>(
    candidates: &[Candidate],
    interface_name: &'static str,
    deserializer: D,
) -> Result<T, D::Error>
where
    T: Any,
    D: Deserializer<'de>,
{
    let buffered = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Object(fields) = &buffered else {
        return Err(D::Error::custom(DecodeErrorKind::NotAnObject {
            interface: interface_name,
        }));
    };
    let observed: Vec<&str> = fields.keys().map(String::as_str).collect();
    let Some(winner) = catalog::select_best_match(candidates, &observed) else {
        return Err(D::Error::custom(DecodeErrorKind::NoCandidates {
            interface: interface_name,
        }));
    };
    let candidate_ident = winner.shape().ident();
    let decode = winner.decode();
    let mut erased = <dyn erased_serde::Deserializer>::erase(buffered);
    let decoded = decode(&mut erased).map_err(D::Error::custom)?;
    downcast_decoded(decoded, candidate_ident, interface_name).map_err(D::Error::custom)
}

/// Only a hand-built `Nomination` can make this fail; it is a decode error,
/// never a panic.
fn downcast_decoded<T: Any>(
    decoded: Box<dyn Any>,
    candidate: &'static str,
    interface: &'static str,
) -> Result<T, DecodeErrorKind> {
    decoded
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| DecodeErrorKind::CandidateTypeMismatch {
            candidate,
            interface,
        })
}
