// WHY: every per-record failure lands here instead of aborting the batch
// The stream is what an editor walks to fix the source transcript

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::source::LineNum;

/// How much a diagnostic should affect the run's exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Structure was still built; worth a look
    Warning,
    /// Something was dropped or could not be resolved
    Error,
}

/// Everything that can go wrong with a single record or heading line
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    #[error("abstract header does not match the metadata grammar")]
    MalformedHeader,

    #[error("month token {token:?} is not within distance {max_distance} of any abbreviation")]
    AmbiguousMonth { token: String, max_distance: usize },

    #[error("invalid calendar date {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("abstract has no closing inch count")]
    UnterminatedAbstract { next_line: Option<LineNum> },

    #[error("abstract id {id} already used at line {first_line}")]
    DuplicateId { id: String, first_line: LineNum },

    #[error("heading line matches no classification rule")]
    UnclassifiedHeading,

    #[error("bad heading sequence: {detail}")]
    HeadingSequence { detail: String },

    #[error("see-also line has no preceding heading to attach to")]
    OrphanSeeAlso,

    #[error("cross-reference target {target:?} could not be resolved")]
    UnresolvedReference { target: String },
}

impl Issue {
    pub fn severity(&self) -> Severity {
        match self {
            Issue::UnterminatedAbstract { .. } | Issue::HeadingSequence { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// One entry of the diagnostics stream, located by source line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line: LineNum,
    pub text: String,
    pub severity: Severity,
    pub message: String,
    pub issue: Issue,
}

/// Ordered collection of diagnostics produced during one run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue against a source line, logging it as it happens
    pub fn record(&mut self, line: LineNum, text: impl Into<String>, issue: Issue) {
        let text = text.into();
        let message = issue.to_string();
        warn!(line, text = %text, "{}", message);
        self.entries.push(Diagnostic {
            line,
            text,
            severity: issue.severity(),
            message,
            issue,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when anything at error severity was recorded
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn count_where(&self, predicate: impl Fn(&Issue) -> bool) -> usize {
        self.entries.iter().filter(|d| predicate(&d.issue)).count()
    }

    /// Stable sort by source line so the report reads top to bottom
    pub fn sort_by_line(&mut self) {
        self.entries.sort_by_key(|d| d.line);
    }
}
