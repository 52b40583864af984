//! `.docx` serialization of a `DocumentTree`, built with `docx-rs`.
//!
//! Page geometry and the base font come from the tree's `PageSetup`; every
//! paragraph carries its effective alignment and spacing explicitly, so the
//! conversion service never has to resolve style inheritance.

use std::io::{Seek, Write};

use chrono::{SecondsFormat, Utc};
use docx_rs::{
    AbstractNumbering, AlignmentType, BorderType, BreakType, Docx, Hyperlink, HyperlinkType,
    IndentLevel, Level, LevelJc, LevelText, LineSpacing, NumberFormat, Numbering, NumberingId,
    PageMargin, ParagraphBorder, ParagraphBorderPosition, RunFonts, SpecialIndentType, Start, Tab,
    TabValueType,
};
use thiserror::Error;

use crate::document::model::{self, Alignment, Block, DocumentTree, PageSetup, ParagraphFormat};

const TWIPS_PER_INCH: f32 = 1440.0;
/// US Letter.
const PAGE_WIDTH_TWIPS: u32 = 12240;
const PAGE_HEIGHT_TWIPS: u32 = 15840;

/// docx-rs always writes its own default list as numbering 1.
const BULLET_NUMBERING: usize = 2;
const BULLET_INDENT_TWIPS: i32 = 360;

const HEADING_SPACE_BEFORE: u32 = 120;
const HEADING_SPACE_AFTER: u32 = 60;
const LINK_COLOR: &str = "0563C1";

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("docx packaging error: {0}")]
    Package(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes `tree` as a complete `.docx` archive into `writer`.
pub fn write_docx<W: Write + Seek>(tree: &DocumentTree, writer: W) -> Result<(), DocxError> {
    let page = tree.page();
    let created = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut docx = Docx::new()
        .page_size(PAGE_WIDTH_TWIPS, PAGE_HEIGHT_TWIPS)
        .page_margin(page_margin(page))
        .default_fonts(fonts(&page.font_family))
        .default_size(half_points(page.font_size_pt))
        .add_abstract_numbering(bullet_list())
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING))
        .created_at(&created);

    for block in tree.blocks() {
        docx = docx.add_paragraph(block_paragraph(block, page));
    }

    docx.build()
        .pack(writer)
        .map_err(|e| DocxError::Package(Box::new(e)))
}

fn block_paragraph(block: &Block, page: &PageSetup) -> docx_rs::Paragraph {
    match block {
        Block::Heading(text) => heading(text, page),
        Block::Paragraph(p) => body_paragraph(p, page),
        Block::BulletItem(p) => body_paragraph(p, page)
            .numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0)),
    }
}

/// Bold, one point above body size, ruled underneath.
fn heading(text: &str, page: &PageSetup) -> docx_rs::Paragraph {
    docx_rs::Paragraph::new()
        .add_run(
            docx_rs::Run::new()
                .add_text(text)
                .bold()
                .size(half_points(page.font_size_pt + 1.0)),
        )
        .align(AlignmentType::Left)
        .keep_next(true)
        .line_spacing(
            LineSpacing::new()
                .before(HEADING_SPACE_BEFORE)
                .after(HEADING_SPACE_AFTER),
        )
        .set_borders(
            docx_rs::ParagraphBorders::with_empty().set(
                ParagraphBorder::new(ParagraphBorderPosition::Bottom)
                    .val(BorderType::Single)
                    .size(6)
                    .space(1)
                    .color("000000"),
            ),
        )
}

fn body_paragraph(paragraph: &model::Paragraph, page: &PageSetup) -> docx_rs::Paragraph {
    let format = &paragraph.format;
    let mut out = docx_rs::Paragraph::new()
        .align(alignment(format.alignment.unwrap_or(page.body_alignment)))
        .line_spacing(spacing(format, page));
    if format.keep_with_next {
        out = out.keep_next(true);
    }
    for stop in &format.tab_stops {
        out = out.add_tab(
            Tab::new()
                .val(TabValueType::Right)
                .pos(tab_position(stop.position_in)),
        );
    }

    for run in &paragraph.runs {
        out = match &run.hyperlink {
            Some(link) => out.add_hyperlink(
                Hyperlink::new(link.url.as_str(), HyperlinkType::External)
                    .add_run(text_run(run).color(LINK_COLOR).underline("single")),
            ),
            None => out.add_run(text_run(run)),
        };
    }
    out
}

/// Tabs and line breaks become `w:tab` / `w:br` elements, not characters.
fn text_run(run: &model::Run) -> docx_rs::Run {
    let mut out = docx_rs::Run::new();
    for (i, line) in run.text.split('\n').enumerate() {
        if i > 0 {
            out = out.add_break(BreakType::TextWrapping);
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                out = out.add_tab();
            }
            if !piece.is_empty() {
                out = out.add_text(piece);
            }
        }
    }
    if run.bold {
        out = out.bold();
    }
    if run.italic {
        out = out.italic();
    }
    if let Some(pt) = run.size_pt {
        out = out.size(half_points(pt));
    }
    out
}

fn bullet_list() -> AbstractNumbering {
    AbstractNumbering::new(BULLET_NUMBERING).add_level(
        Level::new(
            0,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("•"),
            LevelJc::new("left"),
        )
        .indent(
            Some(BULLET_INDENT_TWIPS),
            Some(SpecialIndentType::Hanging(BULLET_INDENT_TWIPS)),
            None,
            None,
        ),
    )
}

fn page_margin(page: &PageSetup) -> PageMargin {
    let m = &page.margins;
    PageMargin::new()
        .top(twips(m.top_in))
        .right(twips(m.right_in))
        .bottom(twips(m.bottom_in))
        .left(twips(m.left_in))
        .header(0)
        .footer(0)
}

fn fonts(family: &str) -> RunFonts {
    RunFonts::new()
        .ascii(family)
        .hi_ansi(family)
        .east_asia(family)
        .cs(family)
}

/// Paragraph overrides, else the page defaults.
fn spacing(format: &ParagraphFormat, page: &PageSetup) -> LineSpacing {
    let mut spacing = LineSpacing::new()
        .after(twentieths(format.space_after_pt.unwrap_or(page.space_after_pt)))
        .line(line_240ths(format.line_spacing.unwrap_or(page.line_spacing)));
    if let Some(pt) = format.space_before_pt {
        spacing = spacing.before(twentieths(pt));
    }
    spacing
}

fn alignment(alignment: Alignment) -> AlignmentType {
    match alignment {
        Alignment::Left => AlignmentType::Left,
        Alignment::Center => AlignmentType::Center,
        Alignment::Justify => AlignmentType::Both,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Units
// ────────────────────────────────────────────────────────────────────────────

fn twips(inches: f32) -> i32 {
    (inches * TWIPS_PER_INCH).round() as i32
}

fn tab_position(inches: f32) -> usize {
    (inches * TWIPS_PER_INCH).round() as usize
}

fn half_points(pt: f32) -> usize {
    (pt * 2.0).round() as usize
}

/// Points to twentieths of a point.
fn twentieths(pt: f32) -> u32 {
    (pt * 20.0).round() as u32
}

/// Line-spacing multiple in 240ths of a line (`lineRule="auto"`).
fn line_240ths(multiple: f32) -> i32 {
    (multiple * 240.0).round() as i32
}
