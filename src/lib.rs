pub mod diagnostics;
pub mod output;
pub mod reader;
pub mod run_stats;
pub mod source;
pub mod volume;

// Re-export main types for convenient access
pub use diagnostics::{Diagnostic, Diagnostics, Issue, Severity};
pub use run_stats::RunStats;
pub use source::{LineNum, SourceLine, Transcript};

// Re-export the reconstruction pipeline and its output
pub use volume::{
    abstracts::{Abstract, AbstractCollection, AbstractId, Blocks, MalformedAbstract},
    headings::{CrossReference, HeadingTarget, HeadingVariant},
    issues::IssueIndex,
    nesting::{HeadingNode, HeadingTree, NodeId},
    scanner::PageBreak,
    xref::CrossReferenceEntry,
    ReconstructionConfig, Reconstructor, Volume,
};

// Re-export I/O helpers used by the binary and integration tests
pub use output::write_json;
pub use reader::{infer_year, read_transcript, ReaderConfig, TranscriptReader};
