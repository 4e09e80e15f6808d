// WHY: one explicit statistics value replaces the running counters a batch
// tool would otherwise keep in globals; it is written beside the volume output

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, Issue};
use crate::volume::abstracts::{Abstract, AbstractId};
use crate::volume::headings::HeadingVariant;

/// Per-run reconstruction statistics
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Transcript the run read
    pub source: String,
    /// Year supplied for date construction
    pub year: i32,
    /// Raw lines read, blanks included
    pub lines_read: u64,
    /// Abstract and between units produced by the scanner
    pub units_scanned: u64,
    pub abstracts_parsed: u64,
    pub abstracts_malformed: u64,
    pub synthetic_abstracts: u64,
    pub headings: u64,
    pub subheadings1: u64,
    pub subheadings2: u64,
    pub cross_references: u64,
    pub headings_unclassified: u64,
    pub page_breaks: u64,
    pub max_page: u32,
    pub max_column: u32,
    pub max_inches: u32,
    pub highest_id: Option<AbstractId>,
    /// Places where consecutive abstract numbers jump by more than one
    pub id_breaks: u64,
    /// Abstract numbers skipped by the numbering sequence
    pub missing_ids: Vec<u32>,
    /// Ids that do not increase over their predecessor
    pub disordered_ids: Vec<AbstractId>,
    pub unresolved_references: u64,
    pub diagnostics: u64,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Processing status (clean, issues)
    pub status: String,
}

impl RunStats {
    pub fn new(source: impl Into<String>, year: i32) -> Self {
        Self {
            source: source.into(),
            year,
            ..Self::default()
        }
    }

    /// Fold one parsed abstract into the running maxima
    pub fn observe_abstract(&mut self, record: &Abstract) {
        if record.synthetic {
            self.synthetic_abstracts += 1;
            return;
        }
        self.abstracts_parsed += 1;
        self.max_page = self.max_page.max(record.max_page());
        self.max_column = self.max_column.max(record.max_column());
        self.max_inches = self.max_inches.max(record.inches);
        if self.highest_id.map_or(true, |highest| record.id > highest) {
            self.highest_id = Some(record.id);
        }
    }

    pub fn observe_heading(&mut self, variant: HeadingVariant) {
        match variant {
            HeadingVariant::Heading => self.headings += 1,
            HeadingVariant::Subheading1 => self.subheadings1 += 1,
            HeadingVariant::Subheading2 => self.subheadings2 += 1,
            HeadingVariant::See | HeadingVariant::SeeAlso | HeadingVariant::SeeAbstract => {
                self.cross_references += 1
            }
            HeadingVariant::Unclassified => self.headings_unclassified += 1,
        }
    }

    /// Numbering report over ids in source order
    ///
    /// A number that does not exceed its predecessor is disordered; a gap
    /// wider than one counts as a break and its whole numbers are missing.
    pub fn record_numbering(&mut self, ids: impl IntoIterator<Item = AbstractId>) {
        let mut last = 0.0_f64;
        for id in ids.into_iter().filter(|id| !id.is_insertion()) {
            let value = id.as_f64();
            if value <= last {
                self.disordered_ids.push(id);
                continue;
            }
            if value - last > 1.0 {
                self.id_breaks += 1;
                let first_missing = last.floor() as u32 + 1;
                self.missing_ids.extend(first_missing..id.number());
            }
            last = value;
        }
    }

    /// Close the run: copy diagnostic counts and set the status
    pub fn finish(&mut self, diagnostics: &Diagnostics, processing_time_ms: u64) {
        self.diagnostics = diagnostics.len() as u64;
        self.unresolved_references =
            diagnostics.count_where(|issue| matches!(issue, Issue::UnresolvedReference { .. })) as u64;
        self.processing_time_ms = processing_time_ms;
        self.status = if diagnostics.has_errors() {
            "issues".to_string()
        } else {
            "clean".to_string()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<AbstractId> {
        raw.iter().map(|r| r.parse().unwrap()).collect()
    }

    #[test]
    fn test_numbering_gaps_and_disorder() {
        let mut stats = RunStats::new("t", 1864);
        stats.record_numbering(ids(&["1", "2", "5", "5-1/2", "6", "4", "7"]));
        assert_eq!(stats.missing_ids, vec![3, 4]);
        assert_eq!(stats.id_breaks, 1);
        assert_eq!(stats.disordered_ids, ids(&["4"]));
    }

    #[test]
    fn test_half_ids_are_not_gaps() {
        let mut stats = RunStats::new("t", 1864);
        stats.record_numbering(ids(&["1", "1-1/2", "2", "2+1", "3"]));
        assert!(stats.missing_ids.is_empty());
        assert_eq!(stats.id_breaks, 0);
        assert!(stats.disordered_ids.is_empty());
    }

    #[test]
    fn test_heading_counts() {
        let mut stats = RunStats::default();
        for variant in [
            HeadingVariant::Heading,
            HeadingVariant::Subheading1,
            HeadingVariant::Subheading1,
            HeadingVariant::SeeAlso,
            HeadingVariant::Unclassified,
        ] {
            stats.observe_heading(variant);
        }
        assert_eq!(stats.headings, 1);
        assert_eq!(stats.subheadings1, 2);
        assert_eq!(stats.cross_references, 1);
        assert_eq!(stats.headings_unclassified, 1);
    }

    #[test]
    fn test_finish_sets_status() {
        let mut stats = RunStats::default();
        stats.finish(&Diagnostics::new(), 12);
        assert_eq!(stats.status, "clean");
        assert_eq!(stats.processing_time_ms, 12);

        let mut diagnostics = Diagnostics::new();
        diagnostics.record(3, "x", Issue::UnresolvedReference { target: "X".into() });
        stats.finish(&diagnostics, 1);
        assert_eq!(stats.status, "issues");
        assert_eq!(stats.unresolved_references, 1);
    }

    #[test]
    fn test_stats_roundtrip_through_json() {
        let mut stats = RunStats::new("source/1864/1864-corrected.txt", 1864);
        stats.highest_id = Some(AbstractId::half(12));
        let json = serde_json::to_string(&stats).unwrap();
        let back: RunStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
