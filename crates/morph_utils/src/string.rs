//! String case helpers.
//!
//! The first-character helpers back the tolerant field-name matching of the
//! `morph_json` codecs; [`camel_case_to_friendly`] turns identifiers into
//! display names.

use alloc::string::String;

// -----------------------------------------------------------------------------
// First character case

/// Returns `true` if the first character is not uppercase.
///
/// Empty input counts as lowercase.
#[inline]
pub fn first_char_is_lower(value: &str) -> bool {
    !first_char_is_upper(value)
}

/// Returns `true` if the first character is uppercase.
///
/// Empty input counts as lowercase.
#[inline]
pub fn first_char_is_upper(value: &str) -> bool {
    value.chars().next().is_some_and(char::is_uppercase)
}

/// Returns the string with its first character lowered.
///
/// Empty input passes through unchanged.
pub fn first_char_to_lower(value: &str) -> String {
    match value.chars().next() {
        Some(first) => {
            let mut out = String::with_capacity(value.len());
            out.extend(first.to_lowercase());
            out.push_str(&value[first.len_utf8()..]);
            out
        }
        None => String::new(),
    }
}

/// Returns the string with its first character uppered.
///
/// Empty input passes through unchanged.
pub fn first_char_to_upper(value: &str) -> String {
    match value.chars().next() {
        Some(first) => {
            let mut out = String::with_capacity(value.len());
            out.extend(first.to_uppercase());
            out.push_str(&value[first.len_utf8()..]);
            out
        }
        None => String::new(),
    }
}

/// Returns the string with its first character's case flipped.
///
/// `"value"` becomes `"Value"`, `"Value"` becomes `"value"`.
/// Empty input passes through unchanged.
#[inline]
pub fn first_char_flip_case(value: &str) -> String {
    if first_char_is_upper(value) {
        first_char_to_lower(value)
    } else {
        first_char_to_upper(value)
    }
}

// -----------------------------------------------------------------------------
// Friendly casing

/// Adds spaces at word boundaries of a camel-cased identifier.
///
/// A space is inserted before an uppercase letter when
///
/// - the previous character is a lowercase letter (`"WordAWord"`), or
/// - the previous character ends an acronym run and the uppercase letter
///   starts a new word (`"ACRONYMWord"`).
///
/// Already-spaced input is returned unchanged, so the function is idempotent.
///
/// # Examples
///
/// ```
/// use morph_utils::string::camel_case_to_friendly;
///
/// assert_eq!(camel_case_to_friendly("WordAWord"), "Word A Word");
/// assert_eq!(camel_case_to_friendly("ACRONYMWordyWord"), "ACRONYM Wordy Word");
/// ```
pub fn camel_case_to_friendly(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut prev: Option<char> = None;
    let mut chars = value.chars().peekable();

    while let Some(current) = chars.next() {
        if current.is_ascii_uppercase()
            && let Some(prev) = prev
        {
            let next_is_lower = chars.peek().is_some_and(char::is_ascii_lowercase);
            if prev.is_ascii_lowercase() || (prev != ' ' && next_is_lower) {
                out.push(' ');
            }
        }
        out.push(current);
        prev = Some(current);
    }
    out
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_char_case_checks() {
        assert!(first_char_is_upper("Value"));
        assert!(first_char_is_lower("value"));
        assert!(first_char_is_lower(""));
    }

    #[test]
    fn first_char_transforms() {
        assert_eq!(first_char_to_lower("Value"), "value");
        assert_eq!(first_char_to_upper("value"), "Value");
        assert_eq!(first_char_flip_case("value"), "Value");
        assert_eq!(first_char_flip_case("Value"), "value");
        assert_eq!(first_char_to_lower(""), "");
        assert_eq!(first_char_to_upper(""), "");
    }

    #[test]
    fn friendly_single_letter_word() {
        assert_eq!(camel_case_to_friendly("AWordyWord"), "A Wordy Word");
        assert_eq!(camel_case_to_friendly("WordAWord"), "Word A Word");
        assert_eq!(camel_case_to_friendly("WordyWordA"), "Wordy Word A");
    }

    #[test]
    fn friendly_acronym() {
        assert_eq!(camel_case_to_friendly("ACRONYMWordyWord"), "ACRONYM Wordy Word");
        assert_eq!(camel_case_to_friendly("WordACRONYMWord"), "Word ACRONYM Word");
        assert_eq!(camel_case_to_friendly("WordyWordACRONYM"), "Wordy Word ACRONYM");
    }

    #[test]
    fn friendly_is_idempotent() {
        for spaced in [
            "A Wordy Word",
            "Word A Word",
            "Wordy Word A",
            "ACRONYM Wordy Word",
            "Word ACRONYM Word",
            "Wordy Word ACRONYM",
        ] {
            assert_eq!(camel_case_to_friendly(spaced), spaced);
        }
    }
}
