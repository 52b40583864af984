//! Inline text → runs: markdown bold spans and embedded email links.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::model::Run;

static BOLD_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*[^*]+\*\*").unwrap());

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

/// Splits `text` on `**...**` spans. Spans become bold runs; the text around
/// them keeps the base style. Unmatched `**` never reaches the output.
pub fn markdown_runs(text: &str, bold: bool, italic: bool) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut push = |segment: &str, span_bold: bool| {
        let cleaned = segment.replace("**", "");
        if cleaned.is_empty() {
            return;
        }
        let mut run = Run::plain(cleaned);
        run.bold = span_bold;
        run.italic = italic;
        runs.push(run);
    };

    let mut cursor = 0;
    for span in BOLD_SPAN.find_iter(text) {
        push(&text[cursor..span.start()], bold);
        push(&text[span.start() + 2..span.end() - 2], true);
        cursor = span.end();
    }
    push(&text[cursor..], bold);
    runs
}

/// Splits a contact line around its first email address:
/// plain text before, a `mailto:` link, plain text after.
pub fn email_runs(line: &str) -> Vec<Run> {
    let Some(found) = EMAIL.find(line) else {
        return if line.is_empty() {
            Vec::new()
        } else {
            vec![Run::plain(line)]
        };
    };

    let mut runs = Vec::with_capacity(3);
    let before = &line[..found.start()];
    let after = &line[found.end()..];
    if !before.is_empty() {
        runs.push(Run::plain(before));
    }
    runs.push(Run::link(format!("mailto:{}", found.as_str()), found.as_str()));
    if !after.is_empty() {
        runs.push(Run::plain(after));
    }
    runs
}
