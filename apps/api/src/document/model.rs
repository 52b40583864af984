//! In-memory styled document: an ordered list of blocks made of runs.
//!
//! A tree is assembled once by `document::builder` and is read-only after
//! that; only the builder can append blocks.

use serde::Serialize;

/// Position of the flush-right tab stop used for dates on header lines.
pub const RIGHT_TAB_STOP_IN: f32 = 7.4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Justify,
}

/// A right-aligned tab stop; text after the tab ends flush at `position_in`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TabStop {
    pub position_in: f32,
}

impl TabStop {
    pub fn right_flush() -> Self {
        Self {
            position_in: RIGHT_TAB_STOP_IN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hyperlink {
    pub url: String,
    pub display_text: String,
}

/// A stretch of text with one set of character styles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// Overrides the document's base size when set.
    pub size_pt: Option<f32>,
    pub hyperlink: Option<Hyperlink>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            size_pt: None,
            hyperlink: None,
        }
    }

    pub fn link(url: impl Into<String>, display_text: impl Into<String>) -> Self {
        let display_text = display_text.into();
        Self {
            text: display_text.clone(),
            hyperlink: Some(Hyperlink {
                url: url.into(),
                display_text,
            }),
            ..Self::plain("")
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn sized(mut self, size_pt: f32) -> Self {
        self.size_pt = Some(size_pt);
        self
    }
}

/// Paragraph-level layout. `None` means "inherit the document default".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParagraphFormat {
    pub alignment: Option<Alignment>,
    pub space_before_pt: Option<f32>,
    pub space_after_pt: Option<f32>,
    pub line_spacing: Option<f32>,
    pub keep_with_next: bool,
    pub tab_stops: Vec<TabStop>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub format: ParagraphFormat,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            format: ParagraphFormat::default(),
        }
    }

    pub fn aligned(mut self, alignment: Alignment) -> Self {
        self.format.alignment = Some(alignment);
        self
    }

    pub fn space_after(mut self, pt: f32) -> Self {
        self.format.space_after_pt = Some(pt);
        self
    }

    pub fn line_spacing(mut self, spacing: f32) -> Self {
        self.format.line_spacing = Some(spacing);
        self
    }

    pub fn keep_with_next(mut self) -> Self {
        self.format.keep_with_next = true;
        self
    }

    pub fn with_tab_stop(mut self, stop: TabStop) -> Self {
        self.format.tab_stops.push(stop);
        self
    }

    /// Concatenated run text, tabs included.
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Block {
    /// Upper-cased section title with a rule underneath.
    Heading(String),
    Paragraph(Paragraph),
    BulletItem(Paragraph),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub left_in: f32,
    pub right_in: f32,
    pub top_in: f32,
    pub bottom_in: f32,
}

/// Page geometry and the base text style.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSetup {
    pub margins: Margins,
    pub font_family: String,
    pub font_size_pt: f32,
    pub line_spacing: f32,
    pub space_after_pt: f32,
    pub body_alignment: Alignment,
}

impl PageSetup {
    /// Dense one-page resume layout.
    pub fn resume() -> Self {
        Self {
            margins: Margins {
                left_in: 0.51,
                right_in: 0.51,
                top_in: 0.13,
                bottom_in: 0.06,
            },
            font_family: "Times New Roman".to_string(),
            font_size_pt: 10.0,
            line_spacing: 1.15,
            space_after_pt: 2.0,
            body_alignment: Alignment::Justify,
        }
    }

    pub fn cover_letter() -> Self {
        Self {
            margins: Margins {
                left_in: 1.0,
                right_in: 1.0,
                top_in: 1.0,
                bottom_in: 1.0,
            },
            font_family: "Times New Roman".to_string(),
            font_size_pt: 11.0,
            line_spacing: 1.15,
            space_after_pt: 0.0,
            body_alignment: Alignment::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentTree {
    page: PageSetup,
    blocks: Vec<Block>,
}

impl DocumentTree {
    pub(crate) fn new(page: PageSetup) -> Self {
        Self {
            page,
            blocks: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Last block, for the builder's trailing-spacing adjustments.
    pub(crate) fn last_mut(&mut self) -> Option<&mut Block> {
        self.blocks.last_mut()
    }

    pub fn page(&self) -> &PageSetup {
        &self.page
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[cfg(test)]
    pub fn headings(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Plain-text rendering of the whole document.
    #[cfg(test)]
    pub fn plain_text(&self) -> String {
        render_plain(&self.blocks)
    }

    /// Plain text of the blocks under `heading`, up to the next heading.
    #[cfg(test)]
    pub fn section_text(&self, heading: &str) -> Option<String> {
        let start = self.blocks.iter().position(
            |b| matches!(b, Block::Heading(text) if text.eq_ignore_ascii_case(heading)),
        )?;
        let len = self.blocks[start + 1..]
            .iter()
            .position(|b| matches!(b, Block::Heading(_)))
            .unwrap_or(self.blocks.len() - start - 1);
        Some(render_plain(&self.blocks[start + 1..start + 1 + len]))
    }
}

/// One line per block; `* ` before bullets; a blank line before headings and
/// before a paragraph that follows a bullet, so entries stay separable.
#[cfg(test)]
fn render_plain(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut previous_was_bullet = false;
    for (i, block) in blocks.iter().enumerate() {
        let (line, blank_before, is_bullet) = match block {
            Block::Heading(text) => (text.clone(), true, false),
            Block::Paragraph(p) => (p.text(), previous_was_bullet, false),
            Block::BulletItem(p) => (format!("* {}", p.text()), false, true),
        };
        if i > 0 {
            out.push('\n');
            if blank_before {
                out.push('\n');
            }
        }
        out.push_str(&line);
        previous_was_bullet = is_bullet;
    }
    out
}
