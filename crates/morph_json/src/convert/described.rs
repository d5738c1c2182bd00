//! Description-keyed enums.
//!
//! A `Described` enum travels over the wire as its human-readable
//! description rather than its variant name. The derive builds the const
//! lookup tables; decoding probes descriptions first, then variant names,
//! each tolerating a flipped first-character case.

use thiserror::Error;

use morph_utils::string::first_char_flip_case;

/// A unit-variant enum with per-variant description text.
/// Implemented by the `Described` derive.
pub trait Described: Sized {
    /// The variant's description; falls back to the variant name.
    fn description(&self) -> &'static str;

    /// The variant's identifier as written.
    fn variant_name(&self) -> &'static str;

    /// Matches `text` against descriptions, then variant names.
    fn from_text(text: &str) -> Option<Self>;
}

/// Returns `true` if `text` equals `candidate` exactly or with its first
/// character's case flipped.
pub fn text_matches(candidate: &str, text: &str) -> bool {
    text == candidate || first_char_flip_case(text) == candidate
}

/// Text that matched neither a description nor a variant name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("\"{text}\" is not a description or variant of `{ident}`")]
pub struct UnknownDescription {
    ident: &'static str,
    text: String,
}

impl UnknownDescription {
    pub fn new(ident: &'static str, text: impl Into<String>) -> Self {
        Self {
            ident,
            text: text.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use crate::Described;

    use super::*;

    #[derive(Described, Debug, PartialEq)]
    enum Status {
        #[shape(description("Not Started"))]
        Pending,
        #[shape(description("In Progress"))]
        Active,
        Done,
    }

    #[test]
    fn serializes_as_the_description() {
        assert_eq!(
            serde_json::to_string(&Status::Active).unwrap(),
            "\"In Progress\""
        );
        // No description falls back to the variant name.
        assert_eq!(serde_json::to_string(&Status::Done).unwrap(), "\"Done\"");
    }

    #[test]
    fn round_trips() {
        for status in [Status::Pending, Status::Active, Status::Done] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(serde_json::from_str::<Status>(&json).unwrap(), status);
        }
    }

    #[test]
    fn decodes_from_descriptions_names_and_case_variants() {
        let cases = [
            ("\"In Progress\"", Status::Active),
            ("\"in Progress\"", Status::Active),
            ("\"Active\"", Status::Active),
            ("\"active\"", Status::Active),
            ("\"done\"", Status::Done),
        ];
        for (input, expected) in cases {
            assert_eq!(serde_json::from_str::<Status>(input).unwrap(), expected);
        }
    }

    #[test]
    fn unknown_text_errors() {
        let error = serde_json::from_str::<Status>("\"Paused\"").unwrap_err();
        assert!(error.to_string().contains("Paused"));
    }

    #[test]
    fn display_and_from_str_follow_the_same_rules() {
        assert_eq!(Status::Pending.to_string(), "Not Started");
        assert_eq!(Status::from_str("not Started"), Ok(Status::Pending));
        assert_eq!(
            Status::from_str("nope"),
            Err(UnknownDescription::new("Status", "nope"))
        );
    }

    #[test]
    fn trait_accessors() {
        assert_eq!(Status::Active.description(), "In Progress");
        assert_eq!(Status::Active.variant_name(), "Active");
    }

    #[test]
    fn text_matching_tolerates_only_the_first_char() {
        assert!(text_matches("Value", "Value"));
        assert!(text_matches("Value", "value"));
        assert!(!text_matches("Value", "VALUE"));
    }
}
