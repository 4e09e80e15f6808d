// WHY: line numbers are the only stable coordinate shared by every later stage,
// so they are fixed here, counting blank lines, before anything is dropped

use serde::{Deserialize, Serialize};

use crate::volume::normalization::normalize_line;

/// 1-based line number in the original transcript
pub type LineNum = u32;

/// Prefix of a line that opens a named section, e.g. `#START_ABSTRACTS`
pub const SECTION_MARKER: &str = "#START_";

/// Section holding lines that precede the first marker
pub const PREAMBLE_SECTION: &str = "PREAMBLE";

/// Section the reconstruction reads by default
pub const DEFAULT_SECTION: &str = "ABSTRACTS";

/// One non-blank, normalized transcript line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLine {
    pub number: LineNum,
    pub text: String,
}

impl SourceLine {
    pub fn new(number: LineNum, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// Parse the `N|text` form used by pre-numbered transcripts
    pub fn parse_numbered(raw: &str) -> Option<Self> {
        let (number, text) = raw.split_once('|')?;
        let number = number.trim().parse().ok()?;
        Some(Self::new(number, text))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Section {
    pub name: String,
    pub lines: Vec<SourceLine>,
}

/// A transcript split into named sections of numbered lines
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    sections: Vec<Section>,
    lines_read: usize,
}

impl Transcript {
    /// Number raw lines from 1, split on section markers and drop blanks
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut transcript = Self::default();
        let mut current = Section {
            name: PREAMBLE_SECTION.to_string(),
            lines: Vec::new(),
        };

        for (index, raw) in lines.into_iter().enumerate() {
            transcript.lines_read += 1;
            let number = index as LineNum + 1;
            let raw = raw.as_ref();

            if let Some(name) = raw.trim().strip_prefix(SECTION_MARKER) {
                transcript.push_section(current);
                current = Section {
                    name: name.trim().to_string(),
                    lines: Vec::new(),
                };
                continue;
            }

            let text = normalize_line(raw);
            if !text.is_empty() {
                current.lines.push(SourceLine::new(number, text));
            }
        }
        transcript.push_section(current);
        transcript
    }

    /// Build from lines already in `N|text` form; unnumbered lines are skipped
    pub fn from_numbered<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut transcript = Self::default();
        let mut section = Section {
            name: DEFAULT_SECTION.to_string(),
            lines: Vec::new(),
        };
        for raw in lines {
            transcript.lines_read += 1;
            if let Some(line) = SourceLine::parse_numbered(raw.as_ref()) {
                let text = normalize_line(&line.text);
                if !text.is_empty() {
                    section.lines.push(SourceLine::new(line.number, text));
                }
            }
        }
        transcript.push_section(section);
        transcript
    }

    fn push_section(&mut self, section: Section) {
        if section.name == PREAMBLE_SECTION && section.lines.is_empty() {
            return;
        }
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    /// Raw line count, blanks and markers included
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Lines of the named section; a transcript with no markers at all
    /// is treated as one body
    pub fn body(&self, name: &str) -> &[SourceLine] {
        if let Some(section) = self.section(name) {
            return &section.lines;
        }
        match self.sections.as_slice() {
            [only] if only.name == PREAMBLE_SECTION => &only.lines,
            _ => &[],
        }
    }
}
