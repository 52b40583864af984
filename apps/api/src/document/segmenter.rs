//! Content Segmenter — splits a generated experience or project section into entries.
//!
//! # Entry grammar
//!
//! ```text
//! section   := title-line* entry (blank-line+ entry)*
//! entry     := header [date-line] body-line*
//! header    := ["**"] (UPPER | DIGIT) ... ("|" field)*       one line
//! date-line := (month-name | "Present" | year) [words, commas, dashes]
//! body-line := "*" text                                      a bullet
//!            | anything else                                 dropped
//! ```
//!
//! A new entry starts only at a header line that follows at least one blank
//! line. Experience headers must contain `|`; project headers may stand alone.
//! Leading markdown heading lines (`## Work Experience`, `# Projects`) are
//! ignored; a `#` with no space after it (`#1 ranked`) is content.
//!
//! Known limits: a title that starts lowercase, or an organisation whose name
//! contains `|`, is not recognised as a new entry boundary / is split into
//! extra fields.
//!
//! A header may also carry its date after a tab (`Title | Org\tJan 2020 - Now`),
//! which is how rendered documents write it back out.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

static EXPERIENCE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\*\*)?[A-Z0-9][^|]*\|").unwrap());

static PROJECT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*)?[A-Z0-9][\w\s\-()]*(?:\*\*)?\s*(?:\||$)").unwrap()
});

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}(?:\s|$)").unwrap());

static DATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec|present|(?:19|20)\d{2})[\w\s,–-]*$",
    )
    .unwrap()
});

/// Which header shape separates entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryGrammar {
    /// `Title | Organisation | Location` headers.
    Experience,
    /// `Name` or `Name | Tagline` headers.
    Project,
}

impl EntryGrammar {
    pub fn is_entry_header(self, line: &str) -> bool {
        let line = line.trim();
        match self {
            EntryGrammar::Experience => EXPERIENCE_HEADER.is_match(line),
            EntryGrammar::Project => PROJECT_HEADER.is_match(line),
        }
    }

    fn max_fields(self) -> usize {
        match self {
            EntryGrammar::Experience => usize::MAX,
            EntryGrammar::Project => 2,
        }
    }
}

/// One job, project, or similar record. Immutable once segmented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentEntry {
    header_fields: Vec<String>,
    date_range: Option<String>,
    bullets: Vec<String>,
}

impl ContentEntry {
    /// Title, organisation, ... in source order.
    pub fn header_fields(&self) -> &[String] {
        &self.header_fields
    }

    pub fn date_range(&self) -> Option<&str> {
        self.date_range.as_deref()
    }

    pub fn bullets(&self) -> &[String] {
        &self.bullets
    }

    /// Header fields joined by ` | `, with the date range after a tab.
    pub fn header_text(&self) -> String {
        let mut text = self.header_fields.join(" | ");
        if let Some(date) = &self.date_range {
            text.push('\t');
            text.push_str(date);
        }
        text
    }
}

/// Skips leading blank lines and markdown heading lines.
pub fn skip_leading_headings(text: &str) -> impl Iterator<Item = &str> {
    text.lines().skip_while(|line| {
        let line = line.trim();
        line.is_empty() || MARKDOWN_HEADING.is_match(line)
    })
}

/// A month/year range such as `Jan 2020 - Present`. Must carry a year or "present".
pub fn is_date_line(line: &str) -> bool {
    let line = line.trim();
    DATE_LINE.is_match(line)
        && (line.chars().any(|c| c.is_ascii_digit()) || line.to_lowercase().contains("present"))
}

/// Splits `text` into entries. Empty or whitespace-only input yields none.
pub fn segment_entries(text: &str, grammar: EntryGrammar) -> Vec<ContentEntry> {
    split_raw_entries(text, grammar)
        .into_iter()
        .filter_map(|lines| build_entry(&lines, grammar))
        .collect()
}

fn split_raw_entries(text: &str, grammar: EntryGrammar) -> Vec<Vec<&str>> {
    let mut entries: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut saw_blank = false;

    for line in skip_leading_headings(text) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            saw_blank = true;
            continue;
        }
        if saw_blank && !current.is_empty() && grammar.is_entry_header(trimmed) {
            entries.push(std::mem::take(&mut current));
        }
        current.push(trimmed);
        saw_blank = false;
    }
    if !current.is_empty() {
        entries.push(current);
    }
    entries
}

fn build_entry(lines: &[&str], grammar: EntryGrammar) -> Option<ContentEntry> {
    let (header, rest) = lines.split_first()?;

    let (head, tab_date) = match header.split_once('\t') {
        Some((head, date)) if is_date_line(date) => (head, Some(date.trim().to_string())),
        _ => (*header, None),
    };

    let header_fields: Vec<String> = head
        .splitn(grammar.max_fields(), '|')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect();

    let mut body = rest;
    let mut date_range = tab_date;
    if date_range.is_none() {
        if let Some((second, remaining)) = rest.split_first() {
            if is_date_line(second) {
                date_range = Some(second.to_string());
                body = remaining;
            }
        }
    }

    let mut bullets = Vec::new();
    for line in body {
        match bullet_text(line) {
            Some(text) => bullets.push(text),
            None => debug!("Dropping non-bullet line in entry {:?}: {:?}", head, line),
        }
    }

    Some(ContentEntry {
        header_fields,
        date_range,
        bullets,
    })
}

/// `* text` → `text`. A line opening with `**` is bold prose, not a bullet.
fn bullet_text(line: &str) -> Option<String> {
    if line.starts_with("**") {
        return None;
    }
    let text = line.strip_prefix('*')?.trim();
    (!text.is_empty()).then(|| text.to_string())
}
