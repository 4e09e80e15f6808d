// WHY: page furniture is cut out before records are delimited, so an abstract
// that runs across a page break is still read as one unit

use anyhow::Result;
use regex_automata::meta::Regex;
use serde::Serialize;
use tracing::{debug, info};

use super::abstracts::AbstractParser;
use super::normalization::convert_ocr_number;
use crate::diagnostics::{Diagnostics, Issue};
use crate::source::{LineNum, SourceLine};

/// Running head printed at the top of every page of the digest
pub const DEFAULT_RUNNING_HEAD: &str = r"CLEVELAND\s+NEWSPAPER\s+DIGEST";

/// A printed page boundary recovered from excised running matter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageBreak {
    pub line: LineNum,
    pub source_page: u32,
}

/// Contiguous run of lines: an abstract record or the text between records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Abstract {
        lines: Vec<SourceLine>,
        terminated: bool,
    },
    Between(Vec<SourceLine>),
}

impl Unit {
    pub fn lines(&self) -> &[SourceLine] {
        match self {
            Unit::Abstract { lines, .. } => lines,
            Unit::Between(lines) => lines,
        }
    }

    pub fn start_line(&self) -> Option<LineNum> {
        self.lines().first().map(|line| line.number)
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, Unit::Abstract { .. })
    }
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub page_breaks: Vec<PageBreak>,
    pub units: Vec<Unit>,
    pub excised_lines: usize,
    pub diagnostics: Diagnostics,
}

/// What a line of page furniture is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunningMatter {
    PageNumber(u32),
    Head(Option<u32>),
    Boilerplate,
}

pub struct UnitScanner {
    parser: AbstractParser,
    running_head: Regex,
    page_number: Regex,
    boilerplate: Regex,
}

impl UnitScanner {
    /// `running_head` is a regex fragment matched case-insensitively
    pub fn new(parser: AbstractParser, running_head: &str) -> Result<Self> {
        let running_head = format!(
            r"(?i)^(?:(?P<lead>[0-9]{{1,4}})\s+)?(?:{})\b.*?(?:\s(?P<trail>[0-9]{{1,4}}))?\s*$",
            running_head
        );
        Ok(Self {
            parser,
            running_head: Regex::new(&running_head)?,
            page_number: Regex::new(r"^[0-9OlI]{0,3}[0-9][0-9OlI]{0,3}$")?,
            boilerplate: Regex::new(concat!(
                r"^(?:",
                r"Abstracts?\s+[0-9OlI]+\b.*",
                r"|.*\(\s*Co[nr]t['\u{2019}]?d\.?\s*\)[.\-\s]*",
                r"|CLASSIFICATION\s+LISTS?\b.*",
                r"|[IVXL]{1,6}\.?",
                r")$"
            ))?,
        })
    }

    fn running_matter(&self, text: &str) -> Option<RunningMatter> {
        let text = text.trim();
        if self.page_number.is_match(text) {
            if text.len() <= 4 {
                return convert_ocr_number(text).map(RunningMatter::PageNumber);
            }
            return None;
        }
        let mut caps = self.running_head.create_captures();
        self.running_head.captures(text, &mut caps);
        if caps.is_match() {
            let page = ["lead", "trail"]
                .iter()
                .filter_map(|name| caps.get_group_by_name(name))
                .find_map(|span| text[span.start..span.end].parse().ok());
            return Some(RunningMatter::Head(page));
        }
        self.boilerplate
            .is_match(text)
            .then_some(RunningMatter::Boilerplate)
    }

    /// Excise page furniture, then split the remaining lines into units
    pub fn scan(&self, lines: &[SourceLine]) -> ScanResult {
        let mut result = ScanResult::default();
        let working = self.excise_page_breaks(lines, &mut result);
        self.split_units(&working, &mut result);
        info!(
            units = result.units.len(),
            page_breaks = result.page_breaks.len(),
            excised = result.excised_lines,
            "Scanned transcript"
        );
        result
    }

    /// A run of furniture is a page break when it holds exactly one page
    /// number and at least one other furniture line; the break is recorded
    /// at the run's first line. Runs without a page number are still cut.
    fn excise_page_breaks<'a>(&self, lines: &'a [SourceLine], result: &mut ScanResult) -> Vec<&'a SourceLine> {
        let mut working = Vec::with_capacity(lines.len());
        let mut index = 0;

        while index < lines.len() {
            let mut end = index;
            let mut page: Option<u32> = None;
            let mut page_lines = 0;
            let mut furniture = 0;

            while let Some(line) = lines.get(end) {
                match self.running_matter(&line.text) {
                    Some(RunningMatter::PageNumber(number)) => {
                        if page.is_some() {
                            break;
                        }
                        page = Some(number);
                        page_lines += 1;
                    }
                    Some(RunningMatter::Head(number)) => {
                        if let (Some(number), None) = (number, page) {
                            page = Some(number);
                        }
                        furniture += 1;
                    }
                    Some(RunningMatter::Boilerplate) => furniture += 1,
                    None => break,
                }
                end += 1;
            }

            if furniture == 0 {
                // a bare number is body text unless furniture surrounds it
                working.push(&lines[index]);
                index += 1;
                continue;
            }
            if let Some(source_page) = page.filter(|_| page_lines <= 1) {
                debug!(line = lines[index].number, source_page, "Page break");
                result.page_breaks.push(PageBreak {
                    line: lines[index].number,
                    source_page,
                });
            }
            result.excised_lines += end - index;
            index = end;
        }
        working
    }

    fn split_units(&self, lines: &[&SourceLine], result: &mut ScanResult) {
        let mut between: Vec<SourceLine> = Vec::new();
        let mut open: Option<Vec<SourceLine>> = None;

        for &line in lines {
            if line.text.trim().is_empty() {
                continue;
            }
            match open.as_mut() {
                None => {
                    if self.parser.opens_record(&line.text) {
                        if !between.is_empty() {
                            result.units.push(Unit::Between(std::mem::take(&mut between)));
                        }
                        open = Some(vec![line.clone()]);
                    } else {
                        between.push(line.clone());
                        continue;
                    }
                }
                Some(record) => {
                    if self.parser.is_record_header(&line.text) {
                        let unterminated = std::mem::replace(record, vec![line.clone()]);
                        Self::close_unterminated(unterminated, Some(line.number), result);
                    } else {
                        record.push(line.clone());
                    }
                }
            }

            if self.parser.closes_record(&line.text) {
                if let Some(record) = open.take() {
                    result.units.push(Unit::Abstract {
                        lines: record,
                        terminated: true,
                    });
                }
            }
        }

        if let Some(record) = open.take() {
            Self::close_unterminated(record, None, result);
        }
        if !between.is_empty() {
            result.units.push(Unit::Between(between));
        }
    }

    fn close_unterminated(record: Vec<SourceLine>, next_line: Option<LineNum>, result: &mut ScanResult) {
        if let Some(first) = record.first() {
            result.diagnostics.record(
                first.number,
                first.text.clone(),
                Issue::UnterminatedAbstract { next_line },
            );
        }
        result.units.push(Unit::Abstract {
            lines: record,
            terminated: false,
        });
    }
}
