//! Structural deep equality for anything serializable.
//!
//! Both sides are rendered into a [`Canon`] tree and walked together.
//! Sequences and maps compare as multisets, strings that fail a literal
//! compare retry as RFC 3339 timestamps, and every divergence lands in the
//! report's trail with a dotted member path.

use core::fmt;

use chrono::{DateTime, Utc};
use serde_core::Serialize;
use thiserror::Error;

mod canon;

use canon::{Canon, CanonSerializer, cmp_canon};

// -----------------------------------------------------------------------------
// Reports

/// One recorded divergence.
#[derive(Debug)]
pub struct Mismatch {
    path: String,
    what: &'static str,
    left: String,
    right: String,
}

impl Mismatch {
    /// The dotted member path, rooted at `$`.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} are not equal. {}: ( {} , {} ).",
            self.path, self.what, self.left, self.right
        )
    }
}

/// The outcome of a comparison. Empty trail means structurally equal.
#[derive(Debug, Default)]
pub struct DiffReport {
    trail: Vec<Mismatch>,
}

impl DiffReport {
    pub fn is_match(&self) -> bool {
        self.trail.is_empty()
    }

    pub fn trail(&self) -> &[Mismatch] {
        &self.trail
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, mismatch) in self.trail.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{mismatch}")?;
        }
        Ok(())
    }
}

/// A comparison that could not run to completion.
#[derive(Debug, Error)]
pub enum DiffError {
    /// A mixed-kind tuple has no order-insensitive interpretation; comparing
    /// one fails loudly rather than reporting a hollow "equal".
    #[error("comparison of {kind} values is not supported (at `{path}`)")]
    UnsupportedComparisonType { path: String, kind: &'static str },

    #[error("failed to canonicalize value: {0}")]
    Canonicalize(String),
}

// -----------------------------------------------------------------------------
// Entry point

/// Compares two serializable values structurally.
///
/// The sides may be different Rust types; only their serialized structure
/// matters.
///
/// # Examples
///
/// ```
/// let report = morph_json::diff::compare(&[3, 1, 2], &[2, 3, 1]).unwrap();
/// assert!(report.is_match());
///
/// let report = morph_json::diff::compare(&[1, 2], &[1, 5]).unwrap();
/// assert!(!report.is_match());
/// ```
pub fn compare<L, R>(left: &L, right: &R) -> Result<DiffReport, DiffError>
where
    L: ?Sized + Serialize,
    R: ?Sized + Serialize,
{
    let left = canonicalize(left)?;
    let right = canonicalize(right)?;
    let mut report = DiffReport::default();
    compare_canon(&left, &right, "$", &mut report)?;
    Ok(report)
}

fn canonicalize<T: ?Sized + Serialize>(value: &T) -> Result<Canon, DiffError> {
    value
        .serialize(CanonSerializer)
        .map_err(|error| DiffError::Canonicalize(error.to_string()))
}

// -----------------------------------------------------------------------------
// The walk

fn compare_canon(
    left: &Canon,
    right: &Canon,
    path: &str,
    report: &mut DiffReport,
) -> Result<(), DiffError> {
    match (left, right) {
        // serde renders fixed-size arrays through tuple serialization, so a
        // tuple whose elements share one kind reads as a sequence. Only a
        // mixed-kind tuple is refused.
        (Canon::Tuple(l), Canon::Tuple(r)) if homogeneous(l) && homogeneous(r) => {
            compare_lists(l, r, path, report)?
        }
        (Canon::Tuple(l), Canon::List(r)) if homogeneous(l) => compare_lists(l, r, path, report)?,
        (Canon::List(l), Canon::Tuple(r)) if homogeneous(r) => compare_lists(l, r, path, report)?,
        (Canon::Tuple(_), _) | (_, Canon::Tuple(_)) => {
            let offender = if matches!(left, Canon::Tuple(_)) { left } else { right };
            return Err(DiffError::UnsupportedComparisonType {
                path: path.to_owned(),
                kind: offender.kind(),
            });
        }
        (Canon::Null, Canon::Null) => {}
        (Canon::Bool(l), Canon::Bool(r)) if l == r => {}
        (Canon::Int(l), Canon::Int(r)) if l == r => {}
        (Canon::Float(l), Canon::Float(r)) if float_eq(*l, *r) => {}
        // Integer and float renderings of the same number count as equal.
        (Canon::Int(l), Canon::Float(r)) if float_eq(*l as f64, *r) => {}
        (Canon::Float(l), Canon::Int(r)) if float_eq(*l, *r as f64) => {}
        (Canon::Str(l), Canon::Str(r)) if l == r || timestamps_equal(l, r) => {}
        (Canon::Bytes(l), Canon::Bytes(r)) if l == r => {}
        (Canon::List(l), Canon::List(r)) => compare_lists(l, r, path, report)?,
        (Canon::Map(l), Canon::Map(r)) => compare_maps(l, r, path, report)?,
        (
            Canon::Object {
                ident: left_ident,
                entries: left_entries,
            },
            Canon::Object {
                ident: right_ident,
                entries: right_entries,
            },
        ) => {
            if left_ident != right_ident {
                report.trail.push(Mismatch {
                    path: path.to_owned(),
                    what: "type names",
                    left: left_ident.clone(),
                    right: right_ident.clone(),
                });
            }
            compare_entries(left_entries, right_entries, path, report)?;
        }
        _ => report.trail.push(Mismatch {
            path: path.to_owned(),
            what: "values",
            left: left.to_string(),
            right: right.to_string(),
        }),
    }
    Ok(())
}

/// Multiset comparison: both sides sort by the canon order first.
fn compare_lists(
    left: &[Canon],
    right: &[Canon],
    path: &str,
    report: &mut DiffReport,
) -> Result<(), DiffError> {
    if left.len() != right.len() {
        report.trail.push(Mismatch {
            path: path.to_owned(),
            what: "lengths",
            left: left.len().to_string(),
            right: right.len().to_string(),
        });
        return Ok(());
    }
    let mut left: Vec<&Canon> = left.iter().collect();
    let mut right: Vec<&Canon> = right.iter().collect();
    left.sort_by(|a, b| cmp_canon(a, b));
    right.sort_by(|a, b| cmp_canon(a, b));
    for (index, (l, r)) in left.iter().zip(right.iter()).enumerate() {
        compare_canon(l, r, &format!("{path}[{index}]"), report)?;
    }
    Ok(())
}

fn compare_maps(
    left: &[(Canon, Canon)],
    right: &[(Canon, Canon)],
    path: &str,
    report: &mut DiffReport,
) -> Result<(), DiffError> {
    if left.len() != right.len() {
        report.trail.push(Mismatch {
            path: path.to_owned(),
            what: "lengths",
            left: left.len().to_string(),
            right: right.len().to_string(),
        });
        return Ok(());
    }
    let mut left: Vec<&(Canon, Canon)> = left.iter().collect();
    let mut right: Vec<&(Canon, Canon)> = right.iter().collect();
    let by_pair = |a: &&(Canon, Canon), b: &&(Canon, Canon)| {
        cmp_canon(&a.0, &b.0).then_with(|| cmp_canon(&a.1, &b.1))
    };
    left.sort_by(by_pair);
    right.sort_by(by_pair);
    for ((left_key, left_value), (right_key, right_value)) in left.iter().zip(right.iter()) {
        let entry_path = format!("{path}.{}", member_name(left_key));
        if cmp_canon(left_key, right_key) != core::cmp::Ordering::Equal {
            report.trail.push(Mismatch {
                path: entry_path,
                what: "keys",
                left: left_key.to_string(),
                right: right_key.to_string(),
            });
            continue;
        }
        compare_canon(left_value, right_value, &entry_path, report)?;
    }
    Ok(())
}

/// Entry-wise comparison by name; one-sided entries are mismatches.
fn compare_entries(
    left: &[(String, Canon)],
    right: &[(String, Canon)],
    path: &str,
    report: &mut DiffReport,
) -> Result<(), DiffError> {
    let mut left: Vec<&(String, Canon)> = left.iter().collect();
    let mut right: Vec<&(String, Canon)> = right.iter().collect();
    left.sort_by(|a, b| a.0.cmp(&b.0));
    right.sort_by(|a, b| a.0.cmp(&b.0));

    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        match (left.peek(), right.peek()) {
            (Some((left_name, left_value)), Some((right_name, right_value))) => {
                match left_name.cmp(right_name) {
                    core::cmp::Ordering::Equal => {
                        compare_canon(
                            left_value,
                            right_value,
                            &format!("{path}.{left_name}"),
                            report,
                        )?;
                        left.next();
                        right.next();
                    }
                    core::cmp::Ordering::Less => {
                        one_sided(path, left_name, left_value, true, report);
                        left.next();
                    }
                    core::cmp::Ordering::Greater => {
                        one_sided(path, right_name, right_value, false, report);
                        right.next();
                    }
                }
            }
            (Some((name, value)), None) => {
                one_sided(path, name, value, true, report);
                left.next();
            }
            (None, Some((name, value))) => {
                one_sided(path, name, value, false, report);
                right.next();
            }
            (None, None) => break,
        }
    }
    Ok(())
}

fn one_sided(path: &str, name: &str, value: &Canon, on_left: bool, report: &mut DiffReport) {
    let rendered = value.to_string();
    let (left, right) = if on_left {
        (rendered, "<missing>".to_owned())
    } else {
        ("<missing>".to_owned(), rendered)
    };
    report.trail.push(Mismatch {
        path: format!("{path}.{name}"),
        what: "values",
        left,
        right,
    });
}

fn member_name(key: &Canon) -> String {
    match key {
        Canon::Str(name) => name.clone(),
        other => other.to_string(),
    }
}

fn homogeneous(items: &[Canon]) -> bool {
    items.windows(2).all(|pair| pair[0].kind() == pair[1].kind())
}

fn float_eq(left: f64, right: f64) -> bool {
    left == right || (left.is_nan() && right.is_nan())
}

/// Round-trip precision drift on timestamps must not read as inequality:
/// both sides parse as RFC 3339 and compare as UTC instants at microsecond
/// precision.
fn timestamps_equal(left: &str, right: &str) -> bool {
    let (Ok(left), Ok(right)) = (
        DateTime::parse_from_rfc3339(left),
        DateTime::parse_from_rfc3339(right),
    ) else {
        return false;
    };
    left.with_timezone(&Utc).timestamp_micros() == right.with_timezone(&Utc).timestamp_micros()
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        id: u32,
        name: String,
    }

    fn item(id: u32, name: &str) -> Item {
        Item {
            id,
            name: name.into(),
        }
    }

    #[test]
    fn primitives_compare_by_value() {
        assert!(compare(&1_u8, &1_i64).unwrap().is_match());
        assert!(compare(&"a", &"a").unwrap().is_match());
        assert!(!compare(&1, &2).unwrap().is_match());
        assert!(compare(&1_i32, &1.0_f64).unwrap().is_match());
    }

    #[test]
    fn sequences_are_order_insensitive() {
        assert!(compare(&[3, 1, 2], &[2, 3, 1]).unwrap().is_match());
        let items = vec![item(1, "a"), item(2, "b")];
        let shuffled = vec![item(2, "b"), item(1, "a")];
        assert!(compare(&items, &shuffled).unwrap().is_match());
    }

    #[test]
    fn fixed_size_arrays_compare_as_sequences() {
        assert!(compare(&[3, 1, 2], &vec![2, 3, 1]).unwrap().is_match());
        assert!(compare(&[[1, 2], [3, 4]], &[[4, 3], [2, 1]]).unwrap().is_match());
        let report = compare(&[1, 2], &vec![1, 5]).unwrap();
        assert!(!report.is_match());
    }

    #[test]
    fn length_mismatch_lands_in_the_trail() {
        let report = compare(&[1, 2], &[1, 2, 3]).unwrap();
        assert!(!report.is_match());
        assert_eq!(report.trail()[0].path(), "$");
        assert!(report.trail()[0].to_string().contains("are not equal"));
    }

    #[test]
    fn nested_divergence_names_the_member_path() {
        #[derive(Serialize)]
        struct Outer {
            item: Item,
        }

        let left = Outer {
            item: item(1, "a"),
        };
        let right = Outer {
            item: item(1, "b"),
        };
        let report = compare(&left, &right).unwrap();
        assert!(!report.is_match());
        assert_eq!(report.trail()[0].path(), "$.item.name");
    }

    #[test]
    fn type_names_must_agree() {
        #[derive(Serialize)]
        struct Other {
            id: u32,
            name: String,
        }

        let left = item(1, "a");
        let right = Other {
            id: 1,
            name: "a".into(),
        };
        let report = compare(&left, &right).unwrap();
        assert!(!report.is_match());
    }

    #[test]
    fn one_sided_entries_are_mismatches() {
        #[derive(Serialize)]
        struct Narrow {
            id: u32,
        }

        let report = compare(&item(1, "a"), &Narrow { id: 1 }).unwrap();
        // The type-name divergence plus the missing `name` entry.
        assert_eq!(report.trail().len(), 2);
        assert!(report.trail().iter().any(|m| m.path() == "$.name"));
    }

    #[test]
    fn tuples_fail_loudly() {
        let error = compare(&(1, "a"), &(1, "a")).unwrap_err();
        assert!(matches!(
            error,
            DiffError::UnsupportedComparisonType { kind: "tuple", .. }
        ));
    }

    #[test]
    fn timestamps_compare_as_instants() {
        assert!(
            compare(&"2024-05-01T12:00:00Z", &"2024-05-01T14:00:00+02:00")
                .unwrap()
                .is_match()
        );
        assert!(
            compare(&"2024-05-01T12:00:00.000Z", &"2024-05-01T12:00:00Z")
                .unwrap()
                .is_match()
        );
        assert!(
            !compare(&"2024-05-01T12:00:00Z", &"2024-05-01T12:00:01Z")
                .unwrap()
                .is_match()
        );
    }

    #[test]
    fn options_and_units_compare_as_null() {
        assert!(compare(&Option::<i32>::None, &()).unwrap().is_match());
        assert!(compare(&Some(5), &5).unwrap().is_match());
    }

    #[test]
    fn maps_compare_as_multisets_of_pairs() {
        use std::collections::BTreeMap;

        let left: BTreeMap<&str, i32> = [("a", 1), ("b", 2)].into();
        let right: BTreeMap<&str, i32> = [("b", 2), ("a", 1)].into();
        assert!(compare(&left, &right).unwrap().is_match());

        let altered: BTreeMap<&str, i32> = [("a", 1), ("b", 3)].into();
        let report = compare(&left, &altered).unwrap();
        assert_eq!(report.trail()[0].path(), "$.b");
    }
}
