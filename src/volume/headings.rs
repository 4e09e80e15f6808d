// WHY: heading lines carry no explicit level; their level is read off typography
// (capitals, parentheses, leading "See") by an ordered rule list, first match wins

use anyhow::Result;
use regex_automata::meta::Regex;
use regex_automata::util::captures::Captures;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::abstracts::{AbstractParser, Metadata};
use super::normalization::{is_ocr_dash, slugify, strip_closing_punctuation, title_case, OCR_DASH};
use crate::source::{LineNum, SourceLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingVariant {
    Heading,
    Subheading1,
    Subheading2,
    See,
    SeeAlso,
    SeeAbstract,
    Unclassified,
}

impl HeadingVariant {
    /// Nesting depth for the three structural variants
    pub fn depth(&self) -> Option<usize> {
        match self {
            HeadingVariant::Heading => Some(0),
            HeadingVariant::Subheading1 => Some(1),
            HeadingVariant::Subheading2 => Some(2),
            _ => None,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.depth().is_some()
    }

    pub fn is_cross_reference(&self) -> bool {
        matches!(
            self,
            HeadingVariant::See | HeadingVariant::SeeAlso | HeadingVariant::SeeAbstract
        )
    }
}

/// Reference to a heading, optionally narrowed to one of its subheadings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingTarget {
    pub text: String,
    pub heading: String,
    pub heading_slug: String,
    pub subheading: Option<String>,
    pub subheading_slug: Option<String>,
    pub resolved_path: Option<String>,
}

impl HeadingTarget {
    /// Slug path the target should resolve to
    pub fn path(&self) -> String {
        match &self.subheading_slug {
            Some(sub) => format!("{}/{}", self.heading_slug, sub),
            None => self.heading_slug.clone(),
        }
    }
}

/// Parsed cross-reference target: either a heading in this volume or free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrossReference {
    Structural(HeadingTarget),
    Generic { text: String },
}

impl CrossReference {
    pub fn text(&self) -> &str {
        match self {
            CrossReference::Structural(target) => &target.text,
            CrossReference::Generic { text } => text,
        }
    }

    pub fn structural(&self) -> Option<&HeadingTarget> {
        match self {
            CrossReference::Structural(target) => Some(target),
            CrossReference::Generic { .. } => None,
        }
    }
}

/// A classified heading unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadingLine {
    pub start_line: LineNum,
    pub raw: String,
    pub text: String,
    pub variant: HeadingVariant,
    pub slug: String,
    pub editorial: bool,
    pub targets: Vec<CrossReference>,
    pub placeholder: Option<Metadata>,
}

impl HeadingLine {
    fn new(unit: &SourceLine, variant: HeadingVariant, text: String) -> Self {
        Self {
            start_line: unit.number,
            raw: unit.text.clone(),
            slug: slugify(&text),
            text,
            variant,
            editorial: false,
            targets: Vec::new(),
            placeholder: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// `===` separators and similar transcript furniture
    Ignored,
    Line(HeadingLine),
}

/// `"MANUFACT-"` gives `Some("MANUFACT")`; a spaced dash is not a hyphen
fn hyphenated_stem(text: &str) -> Option<&str> {
    let stem = text.strip_suffix('-')?;
    stem.chars().next_back().filter(|c| c.is_alphabetic())?;
    Some(stem)
}

fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}

/// `"Paving"`: a capital followed by lowercase starts a new word, not a fragment
fn starts_capitalized_word(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(first), Some(second)) if first.is_uppercase() && second.is_lowercase()
    )
}

type Rule = fn(&HeadingClassifier, &SourceLine, &str) -> Option<Classification>;

fn group<'h>(caps: &Captures, haystack: &'h str, name: &str) -> Option<&'h str> {
    caps.get_group_by_name(name)
        .map(|span| &haystack[span.start..span.end])
}

pub struct HeadingClassifier {
    parser: AbstractParser,
    editorial: Regex,
    caps_heading: Regex,
    see: Regex,
    see_abstract: Regex,
    see_also: Regex,
    word: Regex,
    sub2_word: Regex,
    rules: Vec<(&'static str, Rule)>,
}

impl HeadingClassifier {
    pub fn new(parser: AbstractParser) -> Result<Self> {
        let rules: Vec<(&'static str, Rule)> = vec![
            ("separator", Self::separator),
            ("editorial", Self::editorial_insert),
            ("capitals", Self::capital_heading),
            ("see", Self::see_reference),
            ("see-abstract", Self::see_abstract_reference),
            ("see-also", Self::see_also_reference),
            ("subheading1", Self::first_subheading),
            ("subheading2", Self::second_subheading),
        ];
        Ok(Self {
            parser,
            editorial: Regex::new(r"^(?P<marks>\+{1,3})\s*(?P<text>.+)$")?,
            caps_heading: Regex::new(r"^[A-Z&',\-\s\u{2019}]*[A-Z][A-Z&',\-\s\u{2019}]*[.\-\s]*$")?,
            see: Regex::new(r"^(?P<head>[A-Z&',\-\s\u{2019}]+)[.,]\s+See\s+(?P<targets>.+)$")?,
            see_abstract: Regex::new(&format!(
                r"^(?P<meta>.*\S)\s+{dash}\s+See\s+(?P<targets>.+)$",
                dash = OCR_DASH
            ))?,
            see_also: Regex::new(r"^See\s+[Aa]l[s\u{a7}5][Qqo0]\s+(?P<targets>.+)$")?,
            word: Regex::new(r"^[A-Za-z&][a-z'\u{2019}]*$")?,
            sub2_word: Regex::new(r"^[A-Za-z&][a-z'\u{2019}]*,?$")?,
            rules,
        })
    }

    /// Join the lines of a between-abstract run into heading units
    ///
    /// An unfinished line (ending in `;`, `,` or `&`) takes the next line.
    /// A lowercase line continues only an unfinished line or a `See also`.
    /// A trailing letter plus hyphen joins the next fragment with the hyphen
    /// dropped, unless the hyphenated line already reads as a heading and the
    /// next line is not an all-caps fragment of it. Never joined across a
    /// capitalized word or a metadata header.
    pub fn heading_units(&self, lines: &[SourceLine]) -> Vec<SourceLine> {
        let mut units: Vec<SourceLine> = Vec::new();
        for line in lines {
            let text = line.text.trim();
            if text.is_empty() {
                continue;
            }
            if let Some(previous) = units.last_mut() {
                if let Some(stem) = self.hyphen_join(&previous.text, text) {
                    let joined = format!("{}{}", stem, text);
                    previous.text = joined;
                    continue;
                }
                if self.continues(&previous.text, text) {
                    previous.text.push(' ');
                    previous.text.push_str(text);
                    continue;
                }
            }
            units.push(SourceLine::new(line.number, text));
        }
        units
    }

    fn hyphen_join<'p>(&self, previous: &'p str, next: &str) -> Option<&'p str> {
        let stem = hyphenated_stem(previous)?;
        if starts_capitalized_word(next) || self.looks_like_metadata(next) {
            return None;
        }
        let heading_alone = self.caps_heading.is_match(strip_closing_punctuation(previous));
        if heading_alone && !(is_all_caps(stem) && is_all_caps(next)) {
            return None;
        }
        Some(stem)
    }

    fn continues(&self, previous: &str, next: &str) -> bool {
        if previous.ends_with([';', ',', '&']) {
            return !self.looks_like_metadata(next);
        }
        next.chars().next().map_or(false, char::is_lowercase) && self.see_also.is_match(previous)
    }

    fn looks_like_metadata(&self, text: &str) -> bool {
        self.parser.opens_record(text) || self.see_abstract.is_match(text)
    }

    /// Classify one heading unit; unmatched units come back as Unclassified
    pub fn classify(&self, unit: &SourceLine) -> Classification {
        let cleaned = strip_closing_punctuation(unit.text.trim());
        for (name, rule) in &self.rules {
            if let Some(found) = rule(self, unit, cleaned) {
                debug!(line = unit.number, rule = *name, "Classified heading unit");
                return found;
            }
        }
        Classification::Line(HeadingLine::new(
            unit,
            HeadingVariant::Unclassified,
            cleaned.to_string(),
        ))
    }

    fn separator(&self, unit: &SourceLine, _cleaned: &str) -> Option<Classification> {
        unit.text.trim_start().starts_with("===").then_some(Classification::Ignored)
    }

    fn editorial_insert(&self, unit: &SourceLine, cleaned: &str) -> Option<Classification> {
        let mut caps = self.editorial.create_captures();
        self.editorial.captures(cleaned, &mut caps);
        if !caps.is_match() {
            return None;
        }
        let variant = match group(&caps, cleaned, "marks")?.len() {
            1 => HeadingVariant::Heading,
            2 => HeadingVariant::Subheading1,
            _ => HeadingVariant::Subheading2,
        };
        let text = group(&caps, cleaned, "text")?.trim_matches(|c: char| c == '(' || c == ')');
        let mut line = HeadingLine::new(unit, variant, title_case(text));
        line.editorial = true;
        Some(Classification::Line(line))
    }

    fn capital_heading(&self, unit: &SourceLine, cleaned: &str) -> Option<Classification> {
        if !self.caps_heading.is_match(cleaned) {
            return None;
        }
        let text = cleaned.trim_end_matches(|c: char| c == '.' || c == '-' || c.is_whitespace());
        Some(Classification::Line(HeadingLine::new(
            unit,
            HeadingVariant::Heading,
            title_case(text),
        )))
    }

    fn see_reference(&self, unit: &SourceLine, cleaned: &str) -> Option<Classification> {
        let mut caps = self.see.create_captures();
        self.see.captures(cleaned, &mut caps);
        if !caps.is_match() {
            return None;
        }
        let mut line = HeadingLine::new(
            unit,
            HeadingVariant::See,
            title_case(group(&caps, cleaned, "head")?),
        );
        line.targets = parse_targets(group(&caps, cleaned, "targets")?);
        Some(Classification::Line(line))
    }

    fn see_abstract_reference(&self, unit: &SourceLine, cleaned: &str) -> Option<Classification> {
        let mut caps = self.see_abstract.create_captures();
        self.see_abstract.captures(cleaned, &mut caps);
        if !caps.is_match() {
            return None;
        }
        let meta = group(&caps, cleaned, "meta")?.replace(" & ", " and ");
        // a header that does not parse leaves the line to the later rules
        let placeholder = self.parser.parse_header(&meta, false).ok()?;
        let targets = group(&caps, cleaned, "targets")?;
        let targets = targets.strip_prefix("See ").unwrap_or(targets);

        let mut line = HeadingLine::new(unit, HeadingVariant::SeeAbstract, cleaned.to_string());
        line.slug = slugify(&placeholder.normalized);
        line.targets = parse_targets(targets);
        line.placeholder = Some(placeholder);
        Some(Classification::Line(line))
    }

    fn see_also_reference(&self, unit: &SourceLine, cleaned: &str) -> Option<Classification> {
        let mut caps = self.see_also.create_captures();
        self.see_also.captures(cleaned, &mut caps);
        if !caps.is_match() {
            return None;
        }
        let targets = group(&caps, cleaned, "targets")?;
        let mut line = HeadingLine::new(unit, HeadingVariant::SeeAlso, cleaned.to_string());
        line.slug = slugify(targets);
        line.targets = parse_targets(targets);
        Some(Classification::Line(line))
    }

    fn first_subheading(&self, unit: &SourceLine, cleaned: &str) -> Option<Classification> {
        let text = cleaned.trim_end_matches(|c: char| c == '.' || c == '-' || c.is_whitespace());
        let mut words = text.split_whitespace().peekable();
        words.peek()?;
        if !words.all(|word| self.word.is_match(word)) {
            return None;
        }
        Some(Classification::Line(HeadingLine::new(
            unit,
            HeadingVariant::Subheading1,
            title_case(text),
        )))
    }

    fn second_subheading(&self, unit: &SourceLine, cleaned: &str) -> Option<Classification> {
        let inner = cleaned.strip_prefix('(')?.strip_suffix(')')?.trim();
        let mut words = inner.split_whitespace().peekable();
        words.peek()?;
        if !words.all(|word| self.sub2_word.is_match(word)) {
            return None;
        }
        Some(Classification::Line(HeadingLine::new(
            unit,
            HeadingVariant::Subheading2,
            title_case(inner),
        )))
    }
}

/// Split `"A; B - Sub"` style target lists into cross-references
///
/// Units beginning with a capital name a heading (optionally `Heading - Sub`);
/// anything else is kept as generic text.
pub fn parse_targets(raw: &str) -> Vec<CrossReference> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = collapsed.replace(" & ", " and ");
    let collapsed = collapsed.trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    collapsed
        .split([';', ':'])
        .map(str::trim)
        .filter(|unit| !unit.is_empty())
        .map(|unit| {
            if !unit.chars().next().map_or(false, char::is_uppercase) {
                return CrossReference::Generic {
                    text: unit.to_string(),
                };
            }
            let (heading, subheading) = split_dash_pair(unit);
            let heading = title_case(heading);
            let subheading = subheading.map(title_case);
            CrossReference::Structural(HeadingTarget {
                text: unit.to_string(),
                heading_slug: slugify(&heading),
                heading,
                subheading_slug: subheading.as_deref().map(slugify),
                subheading,
                resolved_path: None,
            })
        })
        .collect()
}

/// Split at the first `" <dash> "` separator
fn split_dash_pair(unit: &str) -> (&str, Option<&str>) {
    let chars: Vec<(usize, char)> = unit.char_indices().collect();
    for window in chars.windows(3) {
        let [(start, before), (_, mark), (end, after)] = window else {
            continue;
        };
        if before.is_whitespace() && is_ocr_dash(*mark) && after.is_whitespace() {
            let heading = unit[..*start].trim();
            let sub = unit[*end..].trim();
            if !heading.is_empty() && !sub.is_empty() {
                return (heading, Some(sub));
            }
        }
    }
    (unit, None)
}
