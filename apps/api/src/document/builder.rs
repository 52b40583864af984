//! Document Model Builder — turns generated section text plus the fixed
//! candidate profile into a styled `DocumentTree`.
//!
//! Building is deterministic and never fails: an empty section still gets its
//! heading, followed by an "N/A" placeholder paragraph.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::inline::{email_runs, markdown_runs};
use crate::document::model::{
    Alignment, Block, DocumentTree, PageSetup, Paragraph, Run, TabStop,
};
use crate::document::profile::{CandidateProfile, ContactProfile, EducationRecord};
use crate::document::segmenter::{
    segment_entries, skip_leading_headings, ContentEntry, EntryGrammar,
};

const PLACEHOLDER: &str = "N/A";
const EMPTY_LETTER_TEXT: &str = "Cover letter content could not be generated.";
const NAME_SIZE_PT: f32 = 16.0;
const LETTER_NAME_SIZE_PT: f32 = 12.0;
const BODY_LINE_SPACING: f32 = 1.15;

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

// ────────────────────────────────────────────────────────────────────────────
// Inputs / outputs
// ────────────────────────────────────────────────────────────────────────────

/// Generated resume sections, as free text. Any of them may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeSections {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub work_experience: String,
    #[serde(default)]
    pub technical_skills: String,
    #[serde(default)]
    pub projects: String,
}

/// Something the caller should know about, but that did not stop the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildWarning {
    /// A project title had no entry in the project-link table.
    UnmappedProject { name: String },
    /// A section had no usable content and was rendered as a placeholder.
    EmptySection { heading: String },
}

#[derive(Debug, Clone)]
pub struct BuiltDocument {
    pub tree: DocumentTree,
    pub warnings: Vec<BuildWarning>,
}

// ────────────────────────────────────────────────────────────────────────────
// Resume
// ────────────────────────────────────────────────────────────────────────────

/// Builds the resume: contact block, then summary, experience, skills,
/// projects, and education, in that order.
pub fn build_resume(profile: &CandidateProfile, sections: &ResumeSections) -> BuiltDocument {
    let mut builder = ResumeBuilder::new();
    builder.add_contact_block(&profile.contact);
    builder.add_summary(&sections.summary);
    builder.add_work_experience(&sections.work_experience);
    builder.add_technical_skills(&sections.technical_skills);
    builder.add_projects(&sections.projects, &profile.project_links);
    builder.add_education(&profile.education);

    let built = builder.finish();
    info!(
        "Built resume document: {} blocks, {} warnings",
        built.tree.blocks().len(),
        built.warnings.len()
    );
    built
}

struct ResumeBuilder {
    tree: DocumentTree,
    warnings: Vec<BuildWarning>,
}

impl ResumeBuilder {
    fn new() -> Self {
        Self {
            tree: DocumentTree::new(PageSetup::resume()),
            warnings: Vec::new(),
        }
    }

    fn finish(self) -> BuiltDocument {
        BuiltDocument {
            tree: self.tree,
            warnings: self.warnings,
        }
    }

    fn paragraph(&mut self, paragraph: Paragraph) {
        self.tree.push(Block::Paragraph(paragraph));
    }

    fn heading(&mut self, title: &str) {
        self.tree.push(Block::Heading(title.to_uppercase()));
    }

    fn placeholder(&mut self, heading: &str) {
        warn!("{} section is empty; rendering placeholder", heading);
        self.paragraph(Paragraph::new(vec![Run::plain(PLACEHOLDER)]));
        self.warnings.push(BuildWarning::EmptySection {
            heading: heading.to_string(),
        });
    }

    fn add_contact_block(&mut self, contact: &ContactProfile) {
        self.paragraph(
            Paragraph::new(vec![Run::plain(contact.name.as_str())
                .bold()
                .sized(NAME_SIZE_PT)])
            .aligned(Alignment::Center)
            .space_after(3.0),
        );

        self.paragraph(
            Paragraph::new(email_runs(&contact.contact_line()))
                .aligned(Alignment::Center)
                .space_after(1.0),
        );

        let mut link_runs = Vec::new();
        for link in [&contact.linkedin, &contact.github, &contact.portfolio] {
            if link.url.trim().is_empty() {
                continue;
            }
            if !link_runs.is_empty() {
                link_runs.push(Run::plain(" | "));
            }
            link_runs.push(Run::link(link.url.as_str(), link.text.as_str()));
        }
        self.paragraph(
            Paragraph::new(link_runs)
                .aligned(Alignment::Center)
                .space_after(18.0),
        );
    }

    fn add_summary(&mut self, text: &str) {
        self.heading("Summary");
        let folded = skip_leading_headings(text)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if folded.is_empty() {
            return self.placeholder("SUMMARY");
        }
        self.paragraph(
            Paragraph::new(markdown_runs(&folded, false, false))
                .line_spacing(BODY_LINE_SPACING)
                .space_after(6.0),
        );
    }

    fn add_work_experience(&mut self, text: &str) {
        self.heading("Work Experience");
        let entries = segment_entries(text, EntryGrammar::Experience);
        if entries.is_empty() {
            return self.placeholder("WORK EXPERIENCE");
        }
        for entry in &entries {
            let mut runs = Vec::new();
            for (i, field) in entry.header_fields().iter().enumerate() {
                if i > 0 {
                    runs.push(Run::plain(" | "));
                }
                // Title and organisation bold, anything after italic.
                let italic = i >= 2;
                runs.extend(markdown_runs(field, !italic, italic));
            }
            self.entry_header(runs, entry);
            self.entry_bullets(entry.bullets());
        }
    }

    fn add_technical_skills(&mut self, text: &str) {
        self.heading("Technical Skills");
        let mut added = 0;
        for line in skip_leading_headings(text).map(str::trim) {
            if line.is_empty() {
                continue;
            }
            let runs = match line.split_once(':') {
                Some((category, items)) => {
                    let mut runs = markdown_runs(&format!("{}: ", category.trim()), true, false);
                    let items = items.trim().trim_start_matches('*').trim();
                    runs.extend(markdown_runs(items, false, false));
                    runs
                }
                None => markdown_runs(line, false, false),
            };
            self.paragraph(Paragraph::new(runs).space_after(2.0));
            added += 1;
        }
        if added == 0 {
            self.placeholder("TECHNICAL SKILLS");
        }
    }

    fn add_projects(&mut self, text: &str, links: &BTreeMap<String, String>) {
        self.heading("Projects");
        let entries = segment_entries(text, EntryGrammar::Project);
        if entries.is_empty() {
            return self.placeholder("PROJECTS");
        }
        for entry in &entries {
            let Some(title) = entry.header_fields().first() else {
                continue;
            };
            let name = unwrap_bold(title);

            let mut runs = Vec::new();
            match links.get(name) {
                Some(url) => runs.push(Run::link(url.as_str(), name).bold()),
                None => {
                    warn!("No hyperlink found for project: {}", name);
                    self.warnings.push(BuildWarning::UnmappedProject {
                        name: name.to_string(),
                    });
                    runs.extend(markdown_runs(name, true, false));
                }
            }

            if let Some(tagline) = entry.header_fields().get(1) {
                let tagline = tagline.replace('_', "");
                let tagline = tagline.trim();
                if !tagline.is_empty() {
                    runs.push(Run::plain(" | "));
                    runs.extend(markdown_runs(tagline, false, true));
                }
            }

            self.entry_header(runs, entry);
            self.entry_bullets(entry.bullets());
        }
    }

    fn add_education(&mut self, records: &[EducationRecord]) {
        self.heading("Education");
        if records.is_empty() {
            return self.placeholder("EDUCATION");
        }
        for record in records {
            let mut runs = markdown_runs(&record.degree, true, false);
            runs.push(Run::plain(", "));
            runs.extend(markdown_runs(&record.institution, false, false));
            runs.push(Run::plain(format!("\t{}", record.dates)).italic());
            self.paragraph(
                Paragraph::new(runs)
                    .with_tab_stop(TabStop::right_flush())
                    .space_after(6.0),
            );
        }
    }

    /// Header line with the date pushed flush-right by a right tab stop.
    fn entry_header(&mut self, mut runs: Vec<Run>, entry: &ContentEntry) {
        if let Some(date) = entry.date_range() {
            runs.push(Run::plain(format!("\t{date}")).italic());
        }
        self.paragraph(
            Paragraph::new(runs)
                .with_tab_stop(TabStop::right_flush())
                .space_after(2.0)
                .keep_with_next(),
        );
    }

    fn entry_bullets(&mut self, bullets: &[String]) {
        for bullet in bullets {
            self.tree.push(Block::BulletItem(
                Paragraph::new(markdown_runs(bullet, false, false))
                    .space_after(2.0)
                    .line_spacing(BODY_LINE_SPACING),
            ));
        }
        // Extra gap after the entry's last bullet.
        if !bullets.is_empty() {
            if let Some(Block::BulletItem(last)) = self.tree.last_mut() {
                last.format.space_after_pt = Some(6.0);
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cover letter
// ────────────────────────────────────────────────────────────────────────────

/// Builds the cover letter: sender block, then the body split on blank lines.
pub fn build_cover_letter(contact: &ContactProfile, body: &str) -> DocumentTree {
    let mut tree = DocumentTree::new(PageSetup::cover_letter());
    let left = |runs: Vec<Run>| Paragraph::new(runs).aligned(Alignment::Left).space_after(0.0);

    if !contact.name.trim().is_empty() {
        tree.push(Block::Paragraph(left(vec![Run::plain(contact.name.as_str())
            .bold()
            .sized(LETTER_NAME_SIZE_PT)])));
    }
    if let Some(location) = contact.location() {
        tree.push(Block::Paragraph(left(vec![Run::plain(location)])));
    }
    if !contact.email.trim().is_empty() {
        tree.push(Block::Paragraph(left(vec![
            Run::plain("Email: "),
            Run::link(format!("mailto:{}", contact.email), contact.email.as_str()),
        ])));
    }
    if !contact.linkedin.url.trim().is_empty() {
        let text = if contact.linkedin.text.trim().is_empty() {
            contact.linkedin.url.as_str()
        } else {
            contact.linkedin.text.as_str()
        };
        tree.push(Block::Paragraph(
            left(vec![
                Run::plain("LinkedIn: "),
                Run::link(contact.linkedin.url.as_str(), text),
            ])
            .space_after(18.0),
        ));
    }

    let mut paragraphs = 0;
    for segment in BLANK_LINES.split(body.trim()) {
        let text = segment
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            continue;
        }
        tree.push(Block::Paragraph(
            Paragraph::new(markdown_runs(&text, false, false))
                .aligned(Alignment::Justify)
                .space_after(8.0),
        ));
        paragraphs += 1;
    }
    if paragraphs == 0 {
        warn!("Cover letter body is empty; rendering placeholder");
        tree.push(Block::Paragraph(Paragraph::new(vec![Run::plain(
            EMPTY_LETTER_TEXT,
        )])));
    }

    info!("Built cover letter document: {} paragraphs", paragraphs);
    tree
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn unwrap_bold(title: &str) -> &str {
    title
        .strip_prefix("**")
        .and_then(|t| t.strip_suffix("**"))
        .unwrap_or(title)
        .trim()
}
