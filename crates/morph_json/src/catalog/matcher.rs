//! Field-name overlap scoring.

use super::Candidate;

// -----------------------------------------------------------------------------
// MatchScore

/// One candidate's overlap with the observed payload.
pub(crate) struct MatchScore {
    observed_fields: usize,
    candidate_properties: usize,
    name_matches: usize,
}

impl MatchScore {
    pub(crate) fn measure(candidate: &Candidate, observed: &[&str]) -> Self {
        let properties = candidate.shape().fields();
        let name_matches = properties
            .iter()
            .filter(|property| {
                observed
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(property.name()))
            })
            .count();
        Self {
            observed_fields: observed.len(),
            candidate_properties: properties.len(),
            name_matches,
        }
    }

    /// In `0.0..=1.0`. Coverage of the observed names outweighs coverage of
    /// the candidate's own properties nine to one.
    pub(crate) fn score(&self) -> f32 {
        let field_coverage = ratio(self.name_matches, self.observed_fields);
        let property_coverage = ratio(self.name_matches, self.candidate_properties);
        (field_coverage * 9.0 + property_coverage) / 10.0
    }
}

/// A zero denominator scores 0, never NaN.
fn ratio(count: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        count as f32 / total as f32
    }
}

// -----------------------------------------------------------------------------
// Selection

/// Picks the candidate whose shape best covers the observed field names.
///
/// A sole candidate wins without scoring. Ties keep the earliest
/// registration.
pub(crate) fn select_best_match<'a>(
    candidates: &'a [Candidate],
    observed: &[&str],
) -> Option<&'a Candidate> {
    let (first, rest) = candidates.split_first()?;
    if rest.is_empty() {
        return Some(first);
    }
    let mut best = first;
    let mut best_score = MatchScore::measure(first, observed).score();
    for candidate in rest {
        let score = MatchScore::measure(candidate, observed).score();
        if score.total_cmp(&best_score).is_gt() {
            best = candidate;
            best_score = score;
        }
    }
    Some(best)
}

// -----------------------------------------------------------------------------
// Tests
