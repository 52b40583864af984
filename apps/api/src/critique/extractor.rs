//! Section Extractor — pulls the score, list sections, and free-text sections
//! out of a loosely formatted critique response.
//!
//! The response is scanned line by line. A line is a *header* when, after
//! stripping leading `#` markers, whitespace, and `**` bold markers, it reads
//! `NAME:` where `NAME` is one to four words of letters, digits, or `_`.
//! Header names are compared case-insensitively with spaces folded to `_`,
//! so `## final verdict:` and `FINAL_VERDICT:` are the same header.
//!
//! Section bodies end differently depending on their kind:
//! - list sections end at the next known header or the next ALL-CAPS header;
//! - free-text sections (verdict, email, connection request) end only at a
//!   known header that follows them in [`KNOWN_HEADERS`], because their bodies
//!   routinely contain blank lines and `Label:` lines of their own.
//!
//! Extraction is total: every function here returns a (possibly empty)
//! result for any input, including the empty string.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Headers the critique prompt asks for, in the order they are requested.
pub const KNOWN_HEADERS: [&str; 7] = [
    "SCORE",
    "PROS",
    "CONS",
    "SUGGESTIONS",
    "FINAL_VERDICT",
    "HIRING_MANAGER_EMAIL",
    "CONNECTION_REQUEST",
];

/// Structured critique recovered from a generation response.
/// Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub score: Option<f64>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub suggestions: Vec<String>,
    pub final_verdict: Option<String>,
    pub email_to_hiring_manager: Option<String>,
    pub connection_request: Option<String>,
}

impl Critique {
    /// Names of the sections that could not be recovered.
    pub fn missing_sections(&self) -> Vec<&'static str> {
        let present = [
            self.score.is_some(),
            !self.pros.is_empty(),
            !self.cons.is_empty(),
            !self.suggestions.is_empty(),
            self.final_verdict.is_some(),
            self.email_to_hiring_manager.is_some(),
            self.connection_request.is_some(),
        ];
        KNOWN_HEADERS
            .iter()
            .zip(present)
            .filter(|(_, found)| !found)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.missing_sections().len() == KNOWN_HEADERS.len()
    }
}

/// Extracts a full [`Critique`] from a raw response. Never fails.
pub fn extract_critique(text: &str) -> Critique {
    let scan = SectionScan::new(text);

    let critique = Critique {
        score: scan.score(),
        pros: scan.list_items("PROS"),
        cons: scan.list_items("CONS"),
        suggestions: scan.list_items("SUGGESTIONS"),
        final_verdict: scan.free_text("FINAL_VERDICT"),
        email_to_hiring_manager: scan.free_text("HIRING_MANAGER_EMAIL"),
        connection_request: scan.free_text("CONNECTION_REQUEST"),
    };

    let missing = critique.missing_sections();
    if !missing.is_empty() {
        debug!(?missing, "Critique extraction incomplete");
    }
    critique
}

/// Returns the list items of one named section, in order.
/// An absent section yields an empty list.
pub fn extract_list_items(text: &str, section_name: &str) -> Vec<String> {
    SectionScan::new(text).list_items(section_name)
}

/// Parses `N/100` (or a bare `N`) into a score in `[0, 100]`.
pub fn parse_score(raw: &str) -> Option<f64> {
    let text = raw.trim().trim_matches('*').trim();
    let number_len = text
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    if number_len == 0 {
        return None;
    }

    let value: f64 = text[..number_len].parse().ok()?;
    let remainder = text[number_len..].trim_start();
    if !remainder.is_empty() {
        let denominator = remainder.strip_prefix('/')?.trim_start();
        let after = denominator.strip_prefix("100")?;
        if after.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
    }

    (0.0..=100.0).contains(&value).then_some(value)
}

// ────────────────────────────────────────────────────────────────────────────
// Line scanner
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct HeaderLine<'a> {
    /// Upper-cased name with whitespace folded to `_`.
    key: String,
    /// Text following the colon on the header line itself.
    rest: &'a str,
    all_caps: bool,
}

impl HeaderLine<'_> {
    fn is_known(&self) -> bool {
        KNOWN_HEADERS.contains(&self.key.as_str())
    }
}

struct ScannedLine<'a> {
    raw: &'a str,
    header: Option<HeaderLine<'a>>,
}

struct SectionScan<'a> {
    lines: Vec<ScannedLine<'a>>,
}

impl<'a> SectionScan<'a> {
    fn new(text: &'a str) -> Self {
        let lines = text
            .lines()
            .map(|raw| ScannedLine {
                raw,
                header: parse_header_line(raw),
            })
            .collect();
        Self { lines }
    }

    /// Index of the first header line named `name`.
    fn locate(&self, name: &str) -> Option<usize> {
        let key = normalize_key(name);
        self.lines
            .iter()
            .position(|line| line.header.as_ref().is_some_and(|h| h.key == key))
    }

    /// Header rest plus every following line until `ends_section` says stop.
    fn body<F>(&self, start: usize, ends_section: F) -> Vec<&'a str>
    where
        F: Fn(&HeaderLine<'_>) -> bool,
    {
        let mut body = Vec::new();
        if let Some(header) = &self.lines[start].header {
            if !header.rest.is_empty() {
                body.push(header.rest);
            }
        }
        for line in &self.lines[start + 1..] {
            if line.header.as_ref().is_some_and(&ends_section) {
                break;
            }
            body.push(line.raw);
        }
        body
    }

    fn list_items(&self, name: &str) -> Vec<String> {
        let Some(start) = self.locate(name) else {
            return Vec::new();
        };
        self.body(start, |h| h.is_known() || h.all_caps)
            .into_iter()
            .filter_map(list_item)
            .collect()
    }

    fn free_text(&self, name: &str) -> Option<String> {
        let start = self.locate(name)?;
        let key = normalize_key(name);
        let successors: &[&str] = match KNOWN_HEADERS.iter().position(|h| *h == key) {
            Some(pos) => &KNOWN_HEADERS[pos + 1..],
            None => &KNOWN_HEADERS,
        };

        let text = self
            .body(start, |h| successors.contains(&h.key.as_str()))
            .join("\n");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    fn score(&self) -> Option<f64> {
        let start = self.locate("SCORE")?;
        let candidate = self
            .body(start, |h| h.is_known() || h.all_caps)
            .into_iter()
            .map(str::trim)
            .find(|line| !line.is_empty())?;
        parse_score(candidate)
    }
}

fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_uppercase()
}

fn parse_header_line(line: &str) -> Option<HeaderLine<'_>> {
    let mut text = line.trim_start().trim_start_matches('#').trim_start();
    if let Some(stripped) = text.strip_prefix("**") {
        text = stripped;
    }

    let colon = text.find(':')?;
    let name = text[..colon].trim_end_matches('*').trim();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ')
    {
        return None;
    }
    if name.split_whitespace().count() > 4 {
        return None;
    }

    let all_caps = !name.chars().any(|c| c.is_ascii_lowercase());
    let rest = text[colon + 1..].trim_start_matches('*').trim();

    Some(HeaderLine {
        key: normalize_key(name),
        rest,
        all_caps,
    })
}

/// `- item` / `* item` → `item`. Lines opening with `**` are bold text, not items.
fn list_item(line: &str) -> Option<String> {
    let text = line.trim_start();
    if text.starts_with("**") {
        return None;
    }
    let rest = text.strip_prefix('-').or_else(|| text.strip_prefix('*'))?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest).trim();
    (!rest.is_empty()).then(|| rest.to_string())
}
