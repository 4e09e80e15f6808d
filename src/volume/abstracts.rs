// WHY: the metadata header is the one reliably structured part of an abstract;
// everything downstream (issue index, SeeAbstract matching) keys off its canonical form

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;

use anyhow::Result;
use chrono::NaiveDate;
use regex_automata::meta::Regex;
use regex_automata::util::captures::Captures;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use super::intervals::LineKeyed;
use super::months::{month_abbreviation, MonthMatcher};
use super::nesting::HeadingRef;
use super::normalization::{
    convert_ocr_number, is_ocr_dash, is_ocr_digit, OCR_COLON, OCR_DASH, OCR_DIGIT,
};
use crate::diagnostics::Issue;
use crate::source::{LineNum, SourceLine};

/// Page number to the set of columns an article occupies on it
pub type Blocks = BTreeMap<u32, BTreeSet<u32>>;

/// Widest column range accepted from a `c-c` continuation before it is read as junk
const MAX_COLUMN_SPAN: u32 = 16;

/// Abstract number with an optional `-1/2` marker and an insertion ordinal
/// Ordering is numeric: 24 < 24-1/2 < 24-1/2+1 < 25
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbstractId {
    number: u32,
    half: bool,
    insertion: u16,
}

impl AbstractId {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            half: false,
            insertion: 0,
        }
    }

    /// Id for an item printed as `N-1/2`
    pub fn half(number: u32) -> Self {
        Self {
            number,
            half: true,
            insertion: 0,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn is_half(&self) -> bool {
        self.half
    }

    pub fn insertion(&self) -> u16 {
        self.insertion
    }

    /// True for ids minted for synthetic records
    pub fn is_insertion(&self) -> bool {
        self.insertion > 0
    }

    pub fn with_insertion(self, insertion: u16) -> Self {
        Self { insertion, ..self }
    }

    /// Rational view used for numbering reports
    pub fn as_f64(&self) -> f64 {
        let half = if self.half { 0.5 } else { 0.0 };
        self.number as f64 + half + self.insertion as f64 * 0.001
    }
}

impl fmt::Display for AbstractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number)?;
        if self.half {
            f.write_str("-1/2")?;
        }
        if self.insertion > 0 {
            write!(f, "+{}", self.insertion)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid abstract id {0:?}")]
pub struct ParseIdError(String);

impl FromStr for AbstractId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseIdError(s.to_string());
        let (base, insertion) = match s.rsplit_once('+') {
            Some((base, ordinal)) => (base, ordinal.parse::<u16>().map_err(|_| invalid())?),
            None => (s, 0),
        };
        let (digits, half) = match base.strip_suffix("-1/2") {
            Some(digits) => (digits, true),
            None => (base, false),
        };
        let number = digits.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self {
            number,
            half,
            insertion,
        })
    }
}

impl Serialize for AbstractId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AbstractId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parsed metadata header of an abstract or a SeeAbstract placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub id: Option<AbstractId>,
    pub newspaper: String,
    pub month_token: String,
    pub date: NaiveDate,
    pub kind: String,
    pub blocks: Blocks,
    pub remainder: String,
    pub normalized: String,
}

impl Metadata {
    /// `"{id} - {normalized}"`, or just the normalized form without an id
    pub fn canonical_header(&self) -> String {
        match self.id {
            Some(id) => format!("{} - {}", id, self.normalized),
            None => self.normalized.clone(),
        }
    }
}

/// One parsed newspaper abstract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Abstract {
    pub id: AbstractId,
    pub line_num: LineNum,
    pub date: NaiveDate,
    pub display_date: String,
    pub newspaper: String,
    pub kind: String,
    pub blocks: Blocks,
    pub inches: u32,
    pub body_lines: Vec<String>,
    pub normalized_metadata: String,
    pub heading: Option<HeadingRef>,
    pub source_page: Option<u32>,
    pub terms: Vec<String>,
    pub references: Vec<AbstractId>,
    pub synthetic: bool,
}

impl Abstract {
    pub fn from_metadata(
        id: AbstractId,
        line_num: LineNum,
        metadata: Metadata,
        body_lines: Vec<String>,
        inches: u32,
    ) -> Self {
        Self {
            id,
            line_num,
            date: metadata.date,
            display_date: display_date(metadata.date),
            newspaper: metadata.newspaper,
            kind: metadata.kind,
            blocks: metadata.blocks,
            inches,
            body_lines,
            normalized_metadata: metadata.normalized,
            heading: None,
            source_page: None,
            terms: Vec::new(),
            references: Vec::new(),
            synthetic: false,
        }
    }

    pub fn canonical_header(&self) -> String {
        format!("{} - {}", self.id, self.normalized_metadata)
    }

    /// Every (page, column) the article occupies
    pub fn placements(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.blocks
            .iter()
            .flat_map(|(page, columns)| columns.iter().map(move |column| (*page, *column)))
    }

    pub fn max_page(&self) -> u32 {
        self.blocks.keys().next_back().copied().unwrap_or(0)
    }

    pub fn max_column(&self) -> u32 {
        self.placements().map(|(_, column)| column).max().unwrap_or(0)
    }
}

impl LineKeyed for Abstract {
    fn line_num(&self) -> LineNum {
        self.line_num
    }
}

pub fn display_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Abstract unit whose header could not be parsed; kept for the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedAbstract {
    pub line_num: LineNum,
    pub lines: Vec<String>,
    pub issue: Issue,
}

fn header_pattern(id_required: bool) -> String {
    let id_part = format!(
        r"(?P<id>{d}*[0-9]{d}*)(?P<half>-1/2)?\s*{dash}+\s*",
        d = OCR_DIGIT,
        dash = OCR_DASH
    );
    let id_part = if id_required {
        id_part
    } else {
        format!("(?:{})?", id_part)
    };
    format!(
        r#"^\s*{id_part}(?P<paper>[A-Za-z]+)[.,]?\s+(?P<month>\S+)\s+(?P<day>{d}+){colon}+\s?(?:(?P<kind>[A-Za-z]+){colon}?\s?)?(?P<page>{d}+)[/"'\u{{2019}}](?P<column>{d}+)(?P<rest>.*)$"#,
        id_part = id_part,
        d = OCR_DIGIT,
        colon = OCR_COLON
    )
}

fn group<'h>(caps: &Captures, haystack: &'h str, name: &str) -> Option<&'h str> {
    caps.get_group_by_name(name)
        .map(|span| &haystack[span.start..span.end])
}

/// Header grammar plus the record-boundary patterns derived from it
#[derive(Debug, Clone)]
pub struct AbstractParser {
    header: Regex,
    record_header: Regex,
    record_start: Regex,
    inches: Regex,
    months: MonthMatcher,
    year: i32,
}

impl AbstractParser {
    pub fn new(year: i32, months: MonthMatcher) -> Result<Self> {
        let record_start = format!(
            r"^\s*{d}*[0-9]{d}*(?:-1/2)?\s*{dash}",
            d = OCR_DIGIT,
            dash = OCR_DASH
        );
        let inches = format!(
            r"\(\s*(?P<inches>{d}*[0-9]{d}*)\s*\)[^A-Za-z0-9(]*$",
            d = OCR_DIGIT
        );
        Ok(Self {
            header: Regex::new(&header_pattern(false))?,
            record_header: Regex::new(&header_pattern(true))?,
            record_start: Regex::new(&record_start)?,
            inches: Regex::new(&inches)?,
            months,
            year,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Loose start test: a number and a dash at the start of the line
    pub fn opens_record(&self, text: &str) -> bool {
        self.record_start.is_match(text)
    }

    /// Strict start test: the full header grammar with an id
    pub fn is_record_header(&self, text: &str) -> bool {
        self.record_header.is_match(text)
    }

    /// True when the line ends with an `(N)` inch count
    pub fn closes_record(&self, text: &str) -> bool {
        self.inches.is_match(text)
    }

    pub fn inches_in(&self, text: &str) -> Option<u32> {
        let mut caps = self.inches.create_captures();
        self.inches.captures(text, &mut caps);
        if !caps.is_match() {
            return None;
        }
        group(&caps, text, "inches").and_then(convert_ocr_number)
    }

    /// Parse a metadata header; `require_id` is false for SeeAbstract placeholders
    pub fn parse_header(&self, text: &str, require_id: bool) -> Result<Metadata, Issue> {
        let regex = if require_id {
            &self.record_header
        } else {
            &self.header
        };
        let mut caps = regex.create_captures();
        regex.captures(text, &mut caps);
        if !caps.is_match() {
            return Err(Issue::MalformedHeader);
        }
        let field = |name: &str| group(&caps, text, name);
        let number = |name: &str| field(name).and_then(convert_ocr_number).ok_or(Issue::MalformedHeader);

        let id = match field("id") {
            Some(raw) => {
                let value = convert_ocr_number(raw).ok_or(Issue::MalformedHeader)?;
                Some(if field("half").is_some() {
                    AbstractId::half(value)
                } else {
                    AbstractId::new(value)
                })
            }
            None => None,
        };

        let month_token = field("month").ok_or(Issue::MalformedHeader)?;
        let month = self.months.resolve(month_token)?;
        let day = number("day")?;
        let date = NaiveDate::from_ymd_opt(self.year, month.month, day).ok_or(Issue::InvalidDate {
            year: self.year,
            month: month.month,
            day,
        })?;

        let page = number("page")?;
        let column = number("column")?;
        let mut blocks = Blocks::new();
        blocks.entry(page).or_default().insert(column);
        let rest = parse_block_continuations(field("rest").unwrap_or(""), page, column, &mut blocks);

        let newspaper = field("paper").unwrap_or("").to_string();
        let kind = field("kind").unwrap_or("").to_string();
        let normalized = normalize_metadata(&newspaper, month.month, day, &kind, &blocks);

        Ok(Metadata {
            id,
            newspaper,
            month_token: month_token.to_string(),
            date,
            kind,
            blocks,
            remainder: rest
                .trim_start_matches(|c: char| c.is_whitespace() || is_ocr_dash(c))
                .to_string(),
            normalized,
        })
    }

    /// Parse one abstract unit; failures come back as a malformed record
    pub fn parse(&self, lines: &[SourceLine]) -> Result<Abstract, MalformedAbstract> {
        let malformed = |issue: Issue| MalformedAbstract {
            line_num: lines.first().map_or(0, |l| l.number),
            lines: lines.iter().map(|l| l.text.clone()).collect(),
            issue,
        };
        let (first, last) = match (lines.first(), lines.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(malformed(Issue::MalformedHeader)),
        };

        let metadata = self.parse_header(&first.text, true).map_err(&malformed)?;
        let id = metadata.id.ok_or_else(|| malformed(Issue::MalformedHeader))?;
        let inches = self.inches_in(&last.text).unwrap_or(0);

        let mut body_lines = Vec::with_capacity(lines.len());
        if !metadata.remainder.is_empty() {
            body_lines.push(metadata.remainder.clone());
        }
        body_lines.extend(lines[1..].iter().map(|l| l.text.clone()));

        debug!(line = first.number, id = %id, "Parsed abstract");
        Ok(Abstract::from_metadata(id, first.number, metadata, body_lines, inches))
    }
}

/// Split a leading OCR-digit token that holds at least one real digit
/// and ends at a non-alphanumeric boundary
fn take_number(text: &str) -> Option<(u32, &str)> {
    let end = text.find(|c: char| !is_ocr_digit(c)).unwrap_or(text.len());
    let (token, tail) = text.split_at(end);
    if !token.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if tail.chars().next().map_or(false, char::is_alphanumeric) {
        return None;
    }
    Some((convert_ocr_number(token)?, tail))
}

fn strip_column_separator(text: &str) -> Option<&str> {
    text.strip_prefix(['/', '"', '\'', '\u{2019}'])
}

/// Consume `,c`, `, p/c` and `-c` continuations after the first block
/// Returns the unconsumed remainder of the line
fn parse_block_continuations<'a>(rest: &'a str, page: u32, column: u32, blocks: &mut Blocks) -> &'a str {
    let mut current_page = page;
    let mut last_column = column;
    let mut cursor = rest;

    loop {
        if let Some(after) = cursor.strip_prefix(',') {
            let Some((first, tail)) = take_number(after.trim_start_matches(' ')) else {
                break;
            };
            match strip_column_separator(tail) {
                Some(after_page) => {
                    let Some((new_column, tail)) = take_number(after_page) else {
                        break;
                    };
                    current_page = first;
                    last_column = new_column;
                    blocks.entry(current_page).or_default().insert(new_column);
                    cursor = tail;
                }
                None => {
                    last_column = first;
                    blocks.entry(current_page).or_default().insert(first);
                    cursor = tail;
                }
            }
        } else if let Some(after) = cursor.strip_prefix('-') {
            let Some((to, tail)) = take_number(after) else {
                break;
            };
            let (low, high) = (last_column.min(to), last_column.max(to));
            // too wide for a column range: the dash belongs to the text
            if high - low > MAX_COLUMN_SPAN {
                break;
            }
            blocks.entry(current_page).or_default().extend(low..=high);
            last_column = to;
            cursor = tail;
        } else {
            break;
        }
    }
    cursor
}

pub fn format_blocks(blocks: &Blocks) -> String {
    blocks
        .iter()
        .map(|(page, columns)| {
            let columns: Vec<String> = columns.iter().map(u32::to_string).collect();
            format!("{}/{}", page, columns.join(","))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Canonical `"{paper} {Mon.} {day}[; {kind}]:{blocks}"`
pub fn normalize_metadata(newspaper: &str, month: u32, day: u32, kind: &str, blocks: &Blocks) -> String {
    let mut normalized = format!("{} {} {}", newspaper, month_abbreviation(month).unwrap_or("?"), day);
    if !kind.is_empty() {
        normalized.push_str("; ");
        normalized.push_str(kind);
    }
    normalized.push(':');
    normalized.push_str(&format_blocks(blocks));
    normalized
}

/// Abstracts keyed by line (source order) with an id index beside it
#[derive(Debug, Clone, Default)]
pub struct AbstractCollection {
    by_line: BTreeMap<LineNum, Abstract>,
    by_id: BTreeMap<AbstractId, LineNum>,
}

impl AbstractCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record; an id already taken keeps pointing at its first
    /// holder and the collision comes back as an issue
    pub fn insert(&mut self, record: Abstract) -> Result<(), Issue> {
        let id = record.id;
        let collision = match self.by_id.get(&id) {
            Some(&first_line) => Some(Issue::DuplicateId {
                id: id.to_string(),
                first_line,
            }),
            None => {
                self.by_id.insert(id, record.line_num);
                None
            }
        };
        self.by_line.insert(record.line_num, record);
        match collision {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    pub fn get(&self, id: &AbstractId) -> Option<&Abstract> {
        self.by_id.get(id).and_then(|line| self.by_line.get(line))
    }

    pub fn get_mut(&mut self, id: &AbstractId) -> Option<&mut Abstract> {
        let line = *self.by_id.get(id)?;
        self.by_line.get_mut(&line)
    }

    pub fn at_line(&self, line: LineNum) -> Option<&Abstract> {
        self.by_line.get(&line)
    }

    pub fn len(&self) -> usize {
        self.by_line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }

    /// Records in source-line order
    pub fn iter(&self) -> impl Iterator<Item = &Abstract> {
        self.by_line.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Abstract> {
        self.by_line.values_mut()
    }

    /// Ids in numeric order
    pub fn ids(&self) -> impl Iterator<Item = AbstractId> + '_ {
        self.by_id.keys().copied()
    }

    /// Records with `start <= line_num < end`; an open end runs to the last record
    pub fn in_lines(&self, start: LineNum, end: Option<LineNum>) -> impl Iterator<Item = &Abstract> {
        let upper = end.map_or(Bound::Unbounded, Bound::Excluded);
        self.by_line
            .range((Bound::Included(start), upper))
            .map(|(_, record)| record)
    }

    /// Closest parsed (non-synthetic) record strictly before a line
    pub fn preceding_real(&self, line: LineNum) -> Option<&Abstract> {
        self.by_line
            .range(..line)
            .rev()
            .map(|(_, record)| record)
            .find(|record| !record.synthetic)
    }

    /// Next free insertion id after the closest preceding real record
    pub fn next_insertion_id(&self, line: LineNum) -> AbstractId {
        let base = self
            .preceding_real(line)
            .map_or(AbstractId::new(0), |record| record.id.with_insertion(0));
        let used = self
            .by_id
            .range(base..)
            .take_while(|(id, _)| id.number == base.number && id.half == base.half)
            .map(|(id, _)| id.insertion)
            .max()
            .unwrap_or(0);
        base.with_insertion(used.saturating_add(1))
    }

    /// Attach an index term; false when the id is unknown
    pub fn add_term(&mut self, id: &AbstractId, term: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(record) => {
                record.terms.push(term.into());
                true
            }
            None => false,
        }
    }
}

impl Serialize for AbstractCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.by_line.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> AbstractParser {
        AbstractParser::new(1864, MonthMatcher::default()).unwrap()
    }

    fn unit(lines: &[(LineNum, &str)]) -> Vec<SourceLine> {
        lines.iter().map(|(n, t)| SourceLine::new(*n, *t)).collect()
    }

    fn blocks(entries: &[(u32, &[u32])]) -> Blocks {
        entries
            .iter()
            .map(|(page, columns)| (*page, columns.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_parse_simple_abstract() {
        let transcript = crate::source::Transcript::from_numbered([
            "1|24 - L Mar. 5:4/4 - George Miller was arrested on a charge of entering",
            "2|the shop of Humbert Droz, a watchmaker, and running off with a watch",
            "3|which was later recovered. (3)",
        ]);
        let record = parser().parse(transcript.body("ABSTRACTS")).unwrap();

        assert_eq!(record.id, AbstractId::new(24));
        assert_eq!(record.line_num, 1);
        assert_eq!(record.newspaper, "L");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(1864, 3, 5).unwrap());
        assert_eq!(record.display_date, "5 March 1864");
        assert_eq!(record.blocks, blocks(&[(4, &[4])]));
        assert_eq!(record.inches, 3);
        assert_eq!(record.normalized_metadata, "L Mar. 5:4/4");
        assert_eq!(
            record.body_lines[0],
            "George Miller was arrested on a charge of entering"
        );
        assert_eq!(record.body_lines.len(), 3);
        assert!(!record.synthetic);
    }

    #[test]
    fn test_column_list() {
        let meta = parser().parse_header("213 - L May 28; ed: 1/1,2 - Wallandigham", true).unwrap();
        assert_eq!(meta.blocks, blocks(&[(1, &[1, 2])]));
        assert_eq!(meta.kind, "ed");
        assert_eq!(meta.normalized, "L May 28; ed:1/1,2");
        assert_eq!(meta.remainder, "Wallandigham");
    }

    #[test]
    fn test_column_range() {
        let meta = parser().parse_header("30 - H June 3:1/1-3 - Text", true).unwrap();
        assert_eq!(meta.blocks, blocks(&[(1, &[1, 2, 3])]));
    }

    #[test]
    fn test_range_then_new_page() {
        let meta = parser().parse_header("31 - H June 3:1/1-3, 2/5 - Text", true).unwrap();
        assert_eq!(meta.blocks, blocks(&[(1, &[1, 2, 3]), (2, &[5])]));
        assert_eq!(meta.normalized, "H June 3:1/1,2,3, 2/5");
        assert_eq!(meta.remainder, "Text");
    }

    #[test]
    fn test_wide_range_left_in_remainder() {
        let meta = parser().parse_header("7 - H Mar. 5:4/4-1864 riots - Text", true).unwrap();
        assert_eq!(meta.blocks, blocks(&[(4, &[4])]));
        assert_eq!(meta.normalized, "H Mar. 5:4/4");
        assert_eq!(meta.remainder, "1864 riots - Text");
    }

    #[test]
    fn test_ocr_substitutions_in_header() {
        let meta = parser().parse_header("2l \u{2013} L. Mar. S: 4/l \u{2022} Text", true).unwrap();
        assert_eq!(meta.id, Some(AbstractId::new(21)));
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(1864, 3, 5).unwrap());
        assert_eq!(meta.blocks, blocks(&[(4, &[1])]));
        assert_eq!(meta.remainder, "Text");
    }

    #[test]
    fn test_fuzzy_month() {
        let meta = parser().parse_header("25 - H Mav 17:2/1 - Text", true).unwrap();
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(1864, 5, 17).unwrap());
        assert_eq!(meta.normalized, "H May 17:2/1");
    }

    #[test]
    fn test_kind_without_space() {
        let meta = parser().parse_header("26 - L May 17: ed;2/l \u{2022} The slavery", true).unwrap();
        assert_eq!(meta.kind, "ed");
        assert_eq!(meta.blocks, blocks(&[(2, &[1])]));
        assert_eq!(meta.remainder, "The slavery");
    }

    #[test]
    fn test_invalid_date() {
        let err = parser().parse_header("27 - H Feb. 30:1/1 - Text", true).unwrap_err();
        assert_eq!(err, Issue::InvalidDate { year: 1864, month: 2, day: 30 });
    }

    #[test]
    fn test_ambiguous_month() {
        let err = parser().parse_header("27 - H Xyzzyq 3:1/1 - Text", true).unwrap_err();
        assert!(matches!(err, Issue::AmbiguousMonth { .. }));
    }

    #[test]
    fn test_malformed_unit_keeps_lines() {
        let lines = unit(&[(7, "24 L Mar 5 - no grammar here"), (8, "still nothing (2)")]);
        let malformed = parser().parse(&lines).unwrap_err();
        assert_eq!(malformed.line_num, 7);
        assert_eq!(malformed.lines.len(), 2);
        assert_eq!(malformed.issue, Issue::MalformedHeader);
    }

    #[test]
    fn test_degenerate_header() {
        let meta = parser().parse_header("H Feb. 28:3/3", false).unwrap();
        assert_eq!(meta.id, None);
        assert_eq!(meta.normalized, "H Feb. 28:3/3");
        assert!(parser().parse_header("H Feb. 28:3/3", true).is_err());
    }

    #[test]
    fn test_canonical_header_reparses() {
        let headers = [
            "24 - L Mar. 5:4/4 - text",
            "213 - L May 28; ed: 1/1,2 - text",
            "31 - H Jun3 3:1/1-3, 2/5 - text",
            "24-1/2 \u{2014} H Sept, 9:2/6 - text",
        ];
        let parser = parser();
        for header in headers {
            let meta = parser.parse_header(header, true).unwrap();
            let reparsed = parser.parse_header(&meta.canonical_header(), true).unwrap();
            assert_eq!(reparsed.normalized, meta.normalized, "header {:?}", header);
            assert_eq!(reparsed.id, meta.id);
        }
    }

    #[test]
    fn test_half_ids_order_between_neighbours() {
        let meta = parser().parse_header("24-1/2 - H Mar. 5:1/1 - text", true).unwrap();
        let half = meta.id.unwrap();
        assert_eq!(half, AbstractId::half(24));
        assert!(AbstractId::new(24) < half);
        assert!(half < AbstractId::new(25));
        assert!(half < half.with_insertion(1));
        assert!(half.with_insertion(1) < AbstractId::new(25));
    }

    #[test]
    fn test_id_display_and_parse() {
        for raw in ["24", "24-1/2", "24+1", "24-1/2+3"] {
            let id: AbstractId = raw.parse().unwrap();
            assert_eq!(id.to_string(), raw);
        }
        assert!("x".parse::<AbstractId>().is_err());
        assert!("24+".parse::<AbstractId>().is_err());
        assert_eq!(serde_json::to_string(&AbstractId::half(7)).unwrap(), "\"7-1/2\"");
        let back: AbstractId = serde_json::from_str("\"7+2\"").unwrap();
        assert_eq!(back, AbstractId::new(7).with_insertion(2));
    }

    #[test]
    fn test_inches_needs_real_digit() {
        let parser = parser();
        assert_eq!(parser.inches_in("running off with a watch. (3)"), Some(3));
        assert_eq!(parser.inches_in("a watch. (l2) ."), Some(12));
        assert_eq!(parser.inches_in("(IS)"), None);
        assert_eq!(parser.inches_in("no count"), None);
        assert!(parser.closes_record("text (14)"));
        assert!(!parser.closes_record("(Bandits & Guerillas)"));
    }

    #[test]
    fn test_record_start_markers() {
        let parser = parser();
        assert!(parser.opens_record("24 - L Mar. 5:4/4"));
        assert!(parser.opens_record("24-1/2 - garbled"));
        assert!(!parser.opens_record("ADVERTISING -"));
        assert!(!parser.opens_record("1864 ELECTIONS"));
        assert!(parser.is_record_header("24 - L Mar. 5:4/4 - x"));
        assert!(!parser.is_record_header("24 - garbled"));
    }

    #[test]
    fn test_collection_reports_duplicates() {
        let parser = parser();
        let first = parser.parse(&unit(&[(1, "24 - L Mar. 5:4/4 - a (1)")])).unwrap();
        let second = parser.parse(&unit(&[(5, "24 - H Mar. 6:1/1 - b (1)")])).unwrap();
        let mut collection = AbstractCollection::new();
        assert!(collection.insert(first).is_ok());
        let err = collection.insert(second).unwrap_err();
        assert_eq!(err, Issue::DuplicateId { id: "24".into(), first_line: 1 });
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(&AbstractId::new(24)).unwrap().line_num, 1);
    }

    #[test]
    fn test_insertion_ids() {
        let parser = parser();
        let mut collection = AbstractCollection::new();
        collection
            .insert(parser.parse(&unit(&[(1, "24 - L Mar. 5:4/4 - a (1)")])).unwrap())
            .unwrap();
        collection
            .insert(parser.parse(&unit(&[(9, "25 - L Mar. 6:4/4 - b (1)")])).unwrap())
            .unwrap();

        let id = collection.next_insertion_id(4);
        assert_eq!(id, AbstractId::new(24).with_insertion(1));
        assert_eq!(id.to_string(), "24+1");

        let mut synthetic = collection.get(&AbstractId::new(24)).unwrap().clone();
        synthetic.id = id;
        synthetic.line_num = 4;
        synthetic.synthetic = true;
        collection.insert(synthetic).unwrap();

        assert_eq!(collection.next_insertion_id(6), AbstractId::new(24).with_insertion(2));
        assert_eq!(collection.next_insertion_id(1), AbstractId::new(0).with_insertion(1));
    }

    #[test]
    fn test_in_lines_and_terms() {
        let parser = parser();
        let mut collection = AbstractCollection::new();
        for (line, text) in [(1, "1 - L Mar. 5:4/4 - a (1)"), (5, "2 - L Mar. 5:4/4 - b (1)"), (9, "3 - L Mar. 5:4/4 - c (1)")] {
            collection.insert(parser.parse(&unit(&[(line, text)])).unwrap()).unwrap();
        }
        let inside: Vec<_> = collection.in_lines(2, Some(9)).map(|a| a.id.number()).collect();
        assert_eq!(inside, vec![2]);
        let open: Vec<_> = collection.in_lines(5, None).map(|a| a.id.number()).collect();
        assert_eq!(open, vec![2, 3]);

        assert!(collection.add_term(&AbstractId::new(3), "Theft"));
        assert!(!collection.add_term(&AbstractId::new(99), "Theft"));
        assert_eq!(collection.get(&AbstractId::new(3)).unwrap().terms, vec!["Theft"]);
    }
}
