// WHY: reconstruction is a fixed pipeline (scan, parse, classify, nest, resolve,
// associate); this module owns the ordering and the single output value

pub mod abstracts;
pub mod headings;
pub mod intervals;
pub mod issues;
pub mod months;
pub mod nesting;
pub mod normalization;
pub mod scanner;
pub mod xref;

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::diagnostics::{Diagnostic, Diagnostics, Issue};
use crate::run_stats::RunStats;
use crate::source::{SourceLine, Transcript, DEFAULT_SECTION};

use abstracts::{AbstractCollection, AbstractId, AbstractParser, MalformedAbstract};
use headings::{Classification, HeadingClassifier, HeadingLine, HeadingVariant};
use intervals::IntervalIndex;
use issues::IssueIndex;
use months::{MonthMatcher, DEFAULT_MAX_MONTH_DISTANCE};
use nesting::{nest, HeadingTree, NestOutcome};
use scanner::{PageBreak, Unit, UnitScanner, DEFAULT_RUNNING_HEAD};
use xref::{materialize, CrossReferenceEntry, CrossReferenceResolver};

/// Knobs for one reconstruction run
#[derive(Debug, Clone)]
pub struct ReconstructionConfig {
    /// Year every abstract date is built in
    pub year: i32,
    /// Transcript section holding the abstracts
    pub section: String,
    /// Largest edit distance accepted for a month token
    pub max_month_distance: usize,
    /// Regex fragment for the page running head
    pub running_head: String,
    /// Mint synthetic records for resolved SeeAbstract lines
    pub materialize_see_abstracts: bool,
    /// Label carried into run statistics
    pub source_label: String,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            year: 1864,
            section: DEFAULT_SECTION.to_string(),
            max_month_distance: DEFAULT_MAX_MONTH_DISTANCE,
            running_head: DEFAULT_RUNNING_HEAD.to_string(),
            materialize_see_abstracts: true,
            source_label: String::new(),
        }
    }
}

/// Everything reconstructed from one transcript
#[derive(Debug, Clone, Serialize)]
pub struct Volume {
    pub year: i32,
    pub abstracts: AbstractCollection,
    pub malformed: Vec<MalformedAbstract>,
    pub headings: HeadingTree,
    pub cross_references: Vec<CrossReferenceEntry>,
    pub issues: IssueIndex,
    pub page_breaks: Vec<PageBreak>,
    pub diagnostics: Diagnostics,
    pub stats: RunStats,
}

impl Volume {
    /// Attach an index term produced by an external terms pass
    pub fn add_term(&mut self, id: &AbstractId, term: impl Into<String>) -> bool {
        self.abstracts.add_term(id, term)
    }

    /// False when anything was dropped, left unclassified or unresolved
    pub fn is_clean(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &CrossReferenceEntry> {
        self.cross_references.iter().filter(|entry| !entry.is_resolved())
    }
}

#[cfg(feature = "parallel")]
fn map_units<T, U, F>(items: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    items.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_units<T, U, F>(items: &[T], f: F) -> Vec<U>
where
    F: Fn(&T) -> U,
{
    items.iter().map(f).collect()
}

/// Reusable pipeline; patterns are compiled once in `new`
pub struct Reconstructor {
    config: ReconstructionConfig,
    parser: AbstractParser,
    scanner: UnitScanner,
    classifier: HeadingClassifier,
}

impl Reconstructor {
    pub fn new(config: ReconstructionConfig) -> Result<Self> {
        let months = MonthMatcher::new(config.max_month_distance);
        let parser = AbstractParser::new(config.year, months)?;
        let scanner = UnitScanner::new(parser.clone(), &config.running_head)?;
        let classifier = HeadingClassifier::new(parser.clone())?;
        info!(year = config.year, section = %config.section, "Reconstructor ready");
        Ok(Self {
            config,
            parser,
            scanner,
            classifier,
        })
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Reconstruct the configured section of a transcript
    pub fn reconstruct_transcript(&self, transcript: &Transcript) -> Volume {
        let mut volume = self.reconstruct(transcript.body(&self.config.section));
        volume.stats.lines_read = transcript.lines_read() as u64;
        volume
    }

    /// Reconstruct a volume from numbered lines in source order
    pub fn reconstruct(&self, lines: &[SourceLine]) -> Volume {
        let started = Instant::now();
        let mut diagnostics = Diagnostics::new();
        let mut stats = RunStats::new(self.config.source_label.clone(), self.config.year);
        stats.lines_read = lines.len() as u64;

        let scan = self.scanner.scan(lines);
        diagnostics.extend(scan.diagnostics);
        stats.units_scanned = scan.units.len() as u64;
        stats.page_breaks = scan.page_breaks.len() as u64;

        let (abstract_units, between_units): (Vec<Unit>, Vec<Unit>) =
            scan.units.into_iter().partition(Unit::is_abstract);

        // abstracts
        let parsed = map_units(&abstract_units, |unit| self.parser.parse(unit.lines()));
        let mut abstracts = AbstractCollection::new();
        let mut malformed = Vec::new();
        let mut issues = IssueIndex::new();
        for outcome in parsed {
            match outcome {
                Ok(record) => {
                    stats.observe_abstract(&record);
                    issues.add(&record);
                    let (line, header) = (record.line_num, record.canonical_header());
                    if let Err(issue) = abstracts.insert(record) {
                        diagnostics.record(line, header, issue);
                    }
                }
                Err(record) => {
                    let text = record.lines.first().cloned().unwrap_or_default();
                    diagnostics.record(record.line_num, text, record.issue.clone());
                    malformed.push(record);
                }
            }
        }
        stats.abstracts_malformed = malformed.len() as u64;
        stats.record_numbering(abstracts.iter().map(|record| record.id));
        info!(
            parsed = abstracts.len(),
            malformed = malformed.len(),
            "Parsed abstracts"
        );

        // headings
        let units: Vec<SourceLine> = between_units
            .iter()
            .flat_map(|unit| self.classifier.heading_units(unit.lines()))
            .collect();
        let classified = map_units(&units, |unit| self.classifier.classify(unit));
        let mut heading_lines: Vec<HeadingLine> = Vec::with_capacity(classified.len());
        for classification in classified {
            let Classification::Line(line) = classification else {
                continue;
            };
            stats.observe_heading(line.variant);
            if line.variant == HeadingVariant::Unclassified {
                diagnostics.record(line.start_line, line.raw.clone(), Issue::UnclassifiedHeading);
                continue;
            }
            heading_lines.push(line);
        }

        let NestOutcome {
            tree: mut headings,
            diagnostics: nest_diagnostics,
        } = nest(&heading_lines);
        diagnostics.extend(nest_diagnostics);
        let heading_index = headings.heading_intervals();
        info!(nodes = headings.len(), roots = headings.roots().len(), "Nested headings");

        // cross-references
        let mut cross_references: Vec<CrossReferenceEntry> = heading_lines
            .iter()
            .filter_map(CrossReferenceEntry::from_line)
            .collect();
        {
            let resolver = CrossReferenceResolver::new(&headings, &abstracts, &heading_index);
            for entry in cross_references.iter_mut() {
                resolver.resolve(entry, &mut diagnostics);
            }
        }
        if self.config.materialize_see_abstracts {
            for entry in cross_references.iter_mut() {
                if let Some(record) = materialize(entry, &abstracts) {
                    stats.observe_abstract(&record);
                    let (line, header) = (record.line_num, record.canonical_header());
                    if let Err(issue) = abstracts.insert(record) {
                        diagnostics.record(line, header, issue);
                    }
                }
            }
        }
        for entry in &cross_references {
            if let Some(node) = entry.attached_to {
                headings.node_mut(node).see_also.extend(entry.targets.iter().cloned());
            }
        }

        // association
        let page_index = IntervalIndex::from_boundaries(
            scan.page_breaks
                .iter()
                .map(|page_break| (page_break.line, page_break.source_page))
                .collect(),
        );
        page_index.assign(abstracts.iter_mut(), |record, page| {
            record.source_page = Some(*page);
        });
        page_index.assign(headings.nodes_mut().iter_mut(), |node, page| {
            node.source_page = Some(*page);
        });
        let members = heading_index.assign(abstracts.iter_mut(), |record, heading| {
            record.heading = Some(heading.clone());
            record.id
        });
        for (interval, ids) in heading_index.iter().zip(members) {
            headings.node_mut(interval.payload.node).abstracts = ids;
        }

        diagnostics.sort_by_line();
        stats.finish(&diagnostics, started.elapsed().as_millis() as u64);
        info!(
            abstracts = abstracts.len(),
            headings = headings.len(),
            diagnostics = diagnostics.len(),
            status = %stats.status,
            "Reconstruction complete"
        );

        Volume {
            year: self.config.year,
            abstracts,
            malformed,
            headings,
            cross_references,
            issues,
            page_breaks: scan.page_breaks,
            diagnostics,
            stats,
        }
    }
}
