//! The canonical comparison tree and the serializer that builds it.

use core::cmp::Ordering;
use core::fmt;

use serde_core::Serialize;
use serde_core::ser::{
    SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant, SerializeTuple,
    SerializeTupleStruct, SerializeTupleVariant, Serializer,
};

// -----------------------------------------------------------------------------
// Canon

/// A fully buffered, format-neutral rendering of a serializable value.
///
/// Structs keep their type name so structural comparison can require the
/// names to agree. Tuples stay distinct from lists: fixed-size arrays reach
/// the comparer through tuple serialization and read as sequences, while a
/// mixed-kind tuple is deliberately uncomparable.
#[derive(Debug, Clone, PartialEq)]
pub enum Canon {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Canon>),
    Tuple(Vec<Canon>),
    Map(Vec<(Canon, Canon)>),
    Object {
        ident: String,
        entries: Vec<(String, Canon)>,
    },
}

impl Canon {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Canon::Null => "null",
            Canon::Bool(_) => "bool",
            Canon::Int(_) => "integer",
            Canon::Float(_) => "float",
            Canon::Str(_) => "string",
            Canon::Bytes(_) => "bytes",
            Canon::List(_) => "list",
            Canon::Tuple(_) => "tuple",
            Canon::Map(_) => "map",
            Canon::Object { .. } => "object",
        }
    }
}

impl fmt::Display for Canon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Canon::Null => f.write_str("null"),
            Canon::Bool(value) => write!(f, "{value}"),
            Canon::Int(value) => write!(f, "{value}"),
            Canon::Float(value) => write!(f, "{value}"),
            Canon::Str(value) => write!(f, "\"{value}\""),
            Canon::Bytes(value) => write!(f, "<{} bytes>", value.len()),
            Canon::List(items) => render_joined(f, "[", items.iter(), "]"),
            Canon::Tuple(items) => render_joined(f, "(", items.iter(), ")"),
            Canon::Map(entries) => {
                f.write_str("{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Canon::Object { ident, entries } => {
                write!(f, "{ident} {{ ")?;
                for (index, (name, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

fn render_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Canon>,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (index, item) in items.enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

// -----------------------------------------------------------------------------
// Ordering

/// A total order over canon values, used to sort sequences before multiset
/// comparison. Objects order by type name, then an `id`-named entry if both
/// sides carry one, then the remaining entries.
pub(crate) fn cmp_canon(left: &Canon, right: &Canon) -> Ordering {
    match (left, right) {
        (Canon::Bool(l), Canon::Bool(r)) => l.cmp(r),
        (Canon::Int(l), Canon::Int(r)) => l.cmp(r),
        (Canon::Float(l), Canon::Float(r)) => l.total_cmp(r),
        (Canon::Str(l), Canon::Str(r)) => l.cmp(r),
        (Canon::Bytes(l), Canon::Bytes(r)) => l.cmp(r),
        (Canon::List(l), Canon::List(r)) | (Canon::Tuple(l), Canon::Tuple(r)) => {
            cmp_slices(l, r)
        }
        (Canon::Map(l), Canon::Map(r)) => {
            for ((lk, lv), (rk, rv)) in l.iter().zip(r.iter()) {
                let by_key = cmp_canon(lk, rk);
                if by_key != Ordering::Equal {
                    return by_key;
                }
                let by_value = cmp_canon(lv, rv);
                if by_value != Ordering::Equal {
                    return by_value;
                }
            }
            l.len().cmp(&r.len())
        }
        (
            Canon::Object {
                ident: li,
                entries: le,
            },
            Canon::Object {
                ident: ri,
                entries: re,
            },
        ) => {
            let by_ident = li.cmp(ri);
            if by_ident != Ordering::Equal {
                return by_ident;
            }
            if let (Some(lid), Some(rid)) = (id_entry(le), id_entry(re)) {
                let by_id = cmp_canon(lid, rid);
                if by_id != Ordering::Equal {
                    return by_id;
                }
            }
            for ((ln, lv), (rn, rv)) in le.iter().zip(re.iter()) {
                let by_name = ln.cmp(rn);
                if by_name != Ordering::Equal {
                    return by_name;
                }
                let by_value = cmp_canon(lv, rv);
                if by_value != Ordering::Equal {
                    return by_value;
                }
            }
            le.len().cmp(&re.len())
        }
        _ => rank(left).cmp(&rank(right)),
    }
}

fn cmp_slices(left: &[Canon], right: &[Canon]) -> Ordering {
    for (l, r) in left.iter().zip(right.iter()) {
        let by_item = cmp_canon(l, r);
        if by_item != Ordering::Equal {
            return by_item;
        }
    }
    left.len().cmp(&right.len())
}

fn id_entry(entries: &[(String, Canon)]) -> Option<&Canon> {
    entries
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("id"))
        .map(|(_, value)| value)
}

fn rank(value: &Canon) -> u8 {
    match value {
        Canon::Null => 0,
        Canon::Bool(_) => 1,
        Canon::Int(_) => 2,
        Canon::Float(_) => 3,
        Canon::Str(_) => 4,
        Canon::Bytes(_) => 5,
        Canon::List(_) => 6,
        Canon::Tuple(_) => 7,
        Canon::Map(_) => 8,
        Canon::Object { .. } => 9,
    }
}

// -----------------------------------------------------------------------------
// Errors

/// Canonicalization failure, surfaced as `DiffError::Canonicalize`.
#[derive(Debug)]
pub(crate) struct CanonError(String);

impl fmt::Display for CanonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CanonError {}

impl serde_core::ser::Error for CanonError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

// -----------------------------------------------------------------------------
// CanonSerializer

/// Serializes any value into a [`Canon`] tree.
pub(crate) struct CanonSerializer;

impl Serializer for CanonSerializer {
    type Ok = Canon;
    type Error = CanonError;

    type SerializeSeq = CanonItems;
    type SerializeTuple = CanonItems;
    type SerializeTupleStruct = CanonItems;
    type SerializeTupleVariant = CanonItems;
    type SerializeMap = CanonMapEntries;
    type SerializeStruct = CanonObjectEntries;
    type SerializeStructVariant = CanonObjectEntries;

    fn serialize_bool(self, v: bool) -> Result<Canon, CanonError> {
        Ok(Canon::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Canon, CanonError> {
        Ok(Canon::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Canon, CanonError> {
        Ok(Canon::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Canon, CanonError> {
        Ok(Canon::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Canon, CanonError> {
        Ok(Canon::Int(v.into()))
    }

    fn serialize_i128(self, v: i128) -> Result<Canon, CanonError> {
        Ok(Canon::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Canon, CanonError> {
        Ok(Canon::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Canon, CanonError> {
        Ok(Canon::Int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Canon, CanonError> {
        Ok(Canon::Int(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Canon, CanonError> {
        Ok(Canon::Int(v.into()))
    }

    fn serialize_u128(self, v: u128) -> Result<Canon, CanonError> {
        i128::try_from(v)
            .map(Canon::Int)
            .map_err(|_| serde_core::ser::Error::custom("u128 value exceeds the comparable range"))
    }

    fn serialize_f32(self, v: f32) -> Result<Canon, CanonError> {
        Ok(Canon::Float(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<Canon, CanonError> {
        Ok(Canon::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Canon, CanonError> {
        Ok(Canon::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Canon, CanonError> {
        Ok(Canon::Str(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Canon, CanonError> {
        Ok(Canon::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Canon, CanonError> {
        Ok(Canon::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Canon, CanonError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Canon, CanonError> {
        Ok(Canon::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Canon, CanonError> {
        Ok(Canon::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Canon, CanonError> {
        Ok(Canon::Str(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Canon, CanonError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Canon, CanonError> {
        Ok(Canon::Object {
            ident: variant.to_owned(),
            entries: vec![("0".to_owned(), value.serialize(CanonSerializer)?)],
        })
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<CanonItems, CanonError> {
        Ok(CanonItems {
            items: Vec::with_capacity(len.unwrap_or(0)),
            tuple: false,
            variant: None,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<CanonItems, CanonError> {
        Ok(CanonItems {
            items: Vec::with_capacity(len),
            tuple: true,
            variant: None,
        })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<CanonItems, CanonError> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<CanonItems, CanonError> {
        Ok(CanonItems {
            items: Vec::with_capacity(len),
            tuple: true,
            variant: Some(variant),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<CanonMapEntries, CanonError> {
        Ok(CanonMapEntries {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<CanonObjectEntries, CanonError> {
        Ok(CanonObjectEntries {
            ident: name.to_owned(),
            entries: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<CanonObjectEntries, CanonError> {
        self.serialize_struct(variant, len)
    }
}

// -----------------------------------------------------------------------------
// Compound builders

pub(crate) struct CanonItems {
    items: Vec<Canon>,
    tuple: bool,
    variant: Option<&'static str>,
}

impl CanonItems {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonError> {
        self.items.push(value.serialize(CanonSerializer)?);
        Ok(())
    }

    fn finish(self) -> Canon {
        let body = if self.tuple {
            Canon::Tuple(self.items)
        } else {
            Canon::List(self.items)
        };
        match self.variant {
            Some(variant) => Canon::Object {
                ident: variant.to_owned(),
                entries: vec![("0".to_owned(), body)],
            },
            None => body,
        }
    }
}

impl SerializeSeq for CanonItems {
    type Ok = Canon;
    type Error = CanonError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonError> {
        self.push(value)
    }

    fn end(self) -> Result<Canon, CanonError> {
        Ok(self.finish())
    }
}

impl SerializeTuple for CanonItems {
    type Ok = Canon;
    type Error = CanonError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonError> {
        self.push(value)
    }

    fn end(self) -> Result<Canon, CanonError> {
        Ok(self.finish())
    }
}

impl SerializeTupleStruct for CanonItems {
    type Ok = Canon;
    type Error = CanonError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonError> {
        self.push(value)
    }

    fn end(self) -> Result<Canon, CanonError> {
        Ok(self.finish())
    }
}

impl SerializeTupleVariant for CanonItems {
    type Ok = Canon;
    type Error = CanonError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonError> {
        self.push(value)
    }

    fn end(self) -> Result<Canon, CanonError> {
        Ok(self.finish())
    }
}

pub(crate) struct CanonMapEntries {
    entries: Vec<(Canon, Canon)>,
    pending_key: Option<Canon>,
}

impl SerializeMap for CanonMapEntries {
    type Ok = Canon;
    type Error = CanonError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), CanonError> {
        self.pending_key = Some(key.serialize(CanonSerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CanonError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| serde_core::ser::Error::custom("map value without a key"))?;
        self.entries.push((key, value.serialize(CanonSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Canon, CanonError> {
        Ok(Canon::Map(self.entries))
    }
}

pub(crate) struct CanonObjectEntries {
    ident: String,
    entries: Vec<(String, Canon)>,
}

impl SerializeStruct for CanonObjectEntries {
    type Ok = Canon;
    type Error = CanonError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CanonError> {
        self.entries
            .push((key.to_owned(), value.serialize(CanonSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Canon, CanonError> {
        Ok(Canon::Object {
            ident: self.ident,
            entries: self.entries,
        })
    }
}

impl SerializeStructVariant for CanonObjectEntries {
    type Ok = Canon;
    type Error = CanonError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CanonError> {
        SerializeStruct::serialize_field(self, key, value)
    }

    fn end(self) -> Result<Canon, CanonError> {
        SerializeStruct::end(self)
    }
}
