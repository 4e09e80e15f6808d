// WHY: OCR damage is lexical and predictable, so it is repaired with fixed tables
// before any grammar sees the text; every later stage assumes these helpers ran

use std::borrow::Cow;

/// Character class matching a digit or a letter OCR commonly substitutes for one
pub const OCR_DIGIT: &str = "[0-9OlI!TGS]";

/// Character class for separators OCR renders in place of a dash
pub const OCR_DASH: &str = "[-\\u{2013}\\u{2014}.\\u{2022}\\u{25A0}]";

/// Character class for the punctuation that may stand in for a colon
pub const OCR_COLON: &str = "[;:,.]";

/// Words kept lowercase by `title_case` unless they open the title
const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "in", "of", "on", "or", "the", "to", "with",
];

/// Byte sequences left behind when UTF-8 punctuation was decoded as Windows-1252
const MOJIBAKE: &[(&str, &str)] = &[
    ("\u{e2}\u{20ac}\u{201c}", "\u{2013}"),
    ("\u{e2}\u{20ac}\u{201d}", "\u{2014}"),
    ("\u{e2}\u{20ac}\u{2122}", "\u{2019}"),
    ("\u{e2}\u{20ac}\u{a2}", "\u{2022}"),
];

/// Map one character to the digit it stands for, accepting OCR substitutions
pub fn ocr_digit(ch: char) -> Option<u32> {
    match ch {
        '0'..='9' => ch.to_digit(10),
        'O' => Some(0),
        'l' | 'I' | '!' | 'T' => Some(1),
        'G' | 'S' => Some(5),
        _ => None,
    }
}

pub fn is_ocr_digit(ch: char) -> bool {
    ocr_digit(ch).is_some()
}

/// True for the characters `OCR_DASH` matches
pub fn is_ocr_dash(ch: char) -> bool {
    matches!(ch, '-' | '\u{2013}' | '\u{2014}' | '.' | '\u{2022}' | '\u{25A0}')
}

/// Convert a token of OCR digits to a number
/// Returns None for empty tokens, foreign characters or overflow
pub fn convert_ocr_number(token: &str) -> Option<u32> {
    if token.is_empty() {
        return None;
    }
    token.chars().try_fold(0u32, |acc, ch| {
        let digit = ocr_digit(ch)?;
        acc.checked_mul(10)?.checked_add(digit)
    })
}

/// Decode HTML entities left in transcripts exported from markup
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}

/// Undo UTF-8 punctuation that was mis-decoded as Windows-1252
pub fn repair_mojibake(text: &str) -> Cow<'_, str> {
    if !text.contains('\u{e2}') {
        return Cow::Borrowed(text);
    }
    let mut repaired = text.to_string();
    for (broken, fixed) in MOJIBAKE {
        if repaired.contains(broken) {
            repaired = repaired.replace(broken, fixed);
        }
    }
    Cow::Owned(repaired)
}

/// Full per-line cleanup applied when the transcript is read
/// Decodes entities, repairs mojibake, collapses whitespace and trims
pub fn normalize_line(text: &str) -> String {
    let decoded = decode_entities(text);
    let repaired = repair_mojibake(&decoded);

    let mut result = String::with_capacity(repaired.len());
    let mut prev_was_space = false;
    for ch in repaired.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result.trim().to_string()
}

fn is_closing_mark(ch: char) -> bool {
    ch.is_ascii_punctuation() || matches!(ch, '\u{25A0}' | '\u{ba}' | '\u{2022}' | '\u{2013}' | '\u{2014}')
}

/// Strip the trailing run of whitespace, punctuation and OCR debris
/// The first character of the run is kept when it is punctuation, so
/// `"(Bandits & Guerillas) ."` keeps its closing parenthesis
pub fn strip_closing_punctuation(text: &str) -> &str {
    let trimmed = text.trim_end_matches(|c: char| c.is_whitespace() || is_closing_mark(c));
    let tail = &text[trimmed.len()..];
    match tail.chars().next() {
        Some(ch) if is_closing_mark(ch) => &text[..trimmed.len() + ch.len_utf8()],
        _ => trimmed,
    }
}

fn capitalize_first(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut done = false;
    for ch in word.chars() {
        if !done && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
            done = true;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Title-case a heading, spelling `&` as "and"
pub fn title_case(text: &str) -> String {
    let lowered = text.to_lowercase();
    lowered
        .split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            if word == "&" {
                "and".to_string()
            } else if index > 0 && SMALL_WORDS.contains(&word) {
                word.to_string()
            } else {
                capitalize_first(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase alphanumeric runs joined by `-`; apostrophes vanish, `&` reads as "and"
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else if ch == '&' {
            if !slug.is_empty() {
                slug.push('-');
            }
            slug.push_str("and");
            pending_dash = true;
        } else if ch == '\'' || ch == '\u{2019}' {
            continue;
        } else {
            pending_dash = true;
        }
    }
    slug
}
