// WHY: month tokens are the most OCR-damaged part of a header, so they are matched
// by edit distance against a closed table rather than parsed

use crate::diagnostics::Issue;

/// Canonical abbreviations in calendar order; the index is the month minus one
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan.", "Feb.", "Mar.", "Apr.", "May", "June", "July", "Aug.", "Sept.", "Oct.", "Nov.", "Dec.",
];

/// Default upper bound on the edit distance accepted for a month token
pub const DEFAULT_MAX_MONTH_DISTANCE: usize = 2;

/// Canonical abbreviation for a month number (1-based)
pub fn month_abbreviation(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_ABBREVIATIONS.get(index).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthMatch {
    pub abbreviation: &'static str,
    pub month: u32,
    pub distance: usize,
}

/// Fuzzy month resolver
#[derive(Debug, Clone, Copy)]
pub struct MonthMatcher {
    max_distance: usize,
}

impl Default for MonthMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MONTH_DISTANCE)
    }
}

impl MonthMatcher {
    pub fn new(max_distance: usize) -> Self {
        Self { max_distance }
    }

    /// Resolve a month token to its closest abbreviation
    /// Commas read as periods; on equal distance the earlier month wins
    pub fn resolve(&self, token: &str) -> Result<MonthMatch, Issue> {
        let cleaned = token.trim().replace(',', ".");

        let mut best: Option<MonthMatch> = None;
        for (index, &abbreviation) in MONTH_ABBREVIATIONS.iter().enumerate() {
            let distance = strsim::damerau_levenshtein(&cleaned, abbreviation);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(MonthMatch {
                    abbreviation,
                    month: index as u32 + 1,
                    distance,
                });
            }
            if distance == 0 {
                break;
            }
        }

        match best {
            Some(found) if found.distance <= self.max_distance => Ok(found),
            _ => Err(Issue::AmbiguousMonth {
                token: token.to_string(),
                max_distance: self.max_distance,
            }),
        }
    }
}
