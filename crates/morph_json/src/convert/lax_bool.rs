//! Forgiving boolean decoding.
//!
//! Accepts a JSON bool, an integer (positive means `true`), or a string
//! holding `"true"`/`"false"` (any ASCII case) or an integer. Serializes as
//! a plain bool. Usable as a `#[serde(with = "...")]` module or through the
//! [`LaxBool`] newtype.
//!
//! # Examples
//!
//! ```
//! use morph_json::convert::LaxBool;
//!
//! let value: LaxBool = serde_json::from_str("\"TRUE\"").unwrap();
//! assert!(value.get());
//! let value: LaxBool = serde_json::from_str("\"0\"").unwrap();
//! assert!(!value.get());
//! ```

use core::fmt;

use serde_core::de::Visitor;
use serde_core::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(*value)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    deserializer.deserialize_any(LaxBoolVisitor)
}

struct LaxBoolVisitor;

impl Visitor<'_> for LaxBoolVisitor {
    type Value = bool;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a boolean, an integer, or a boolean-like string")
    }

    fn visit_bool<E: serde_core::de::Error>(self, v: bool) -> Result<bool, E> {
        Ok(v)
    }

    fn visit_i64<E: serde_core::de::Error>(self, v: i64) -> Result<bool, E> {
        Ok(v > 0)
    }

    fn visit_u64<E: serde_core::de::Error>(self, v: u64) -> Result<bool, E> {
        Ok(v > 0)
    }

    fn visit_str<E: serde_core::de::Error>(self, v: &str) -> Result<bool, E> {
        if v.eq_ignore_ascii_case("true") {
            return Ok(true);
        }
        if v.eq_ignore_ascii_case("false") {
            return Ok(false);
        }
        match v.trim().parse::<i64>() {
            Ok(number) => Ok(number > 0),
            Err(_) => Err(E::custom(format_args!(
                "string \"{v}\" cannot be read as a boolean"
            ))),
        }
    }
}

// -----------------------------------------------------------------------------
// LaxBool

/// A transparent bool with the lax wire format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LaxBool(pub bool);

impl LaxBool {
    #[inline]
    pub const fn get(self) -> bool {
        self.0
    }
}

impl From<bool> for LaxBool {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl From<LaxBool> for bool {
    fn from(value: LaxBool) -> Self {
        value.0
    }
}

impl Serialize for LaxBool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for LaxBool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize(deserializer).map(LaxBool)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<bool, serde_json::Error> {
        serde_json::from_str::<LaxBool>(input).map(LaxBool::get)
    }

    #[test]
    fn accepts_bools_integers_and_strings() {
        assert_eq!(parse("true").unwrap(), true);
        assert_eq!(parse("false").unwrap(), false);
        assert_eq!(parse("1").unwrap(), true);
        assert_eq!(parse("0").unwrap(), false);
        assert_eq!(parse("-3").unwrap(), false);
        assert_eq!(parse("\"TRUE\"").unwrap(), true);
        assert_eq!(parse("\"False\"").unwrap(), false);
        assert_eq!(parse("\"2\"").unwrap(), true);
        assert_eq!(parse("\"0\"").unwrap(), false);
    }

    #[test]
    fn rejects_unparseable_strings() {
        let error = parse("\"maybe\"").unwrap_err();
        assert!(error.to_string().contains("maybe"));
    }

    #[test]
    fn serializes_as_a_plain_bool() {
        assert_eq!(serde_json::to_string(&LaxBool(true)).unwrap(), "true");
    }

    #[test]
    fn works_as_a_with_module() {
        use serde::{Deserialize, Serialize};

        #[derive(Serialize, Deserialize)]
        struct Flags {
            #[serde(with = "crate::convert::lax_bool")]
            enabled: bool,
        }

        let flags: Flags = serde_json::from_str(r#"{"enabled": "1"}"#).unwrap();
        assert!(flags.enabled);
        assert_eq!(
            serde_json::to_string(&flags).unwrap(),
            r#"{"enabled":true}"#
        );
    }
}
