/*
 * block.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Block-level nodes of the document tree.
 */

use crate::style::{NamedStyleType, ParagraphStyle, TextStyle};
use crate::table::Table;
use serde::{Deserialize, Serialize};

/// A block inside a segment.
///
/// Pristine-side blocks carry `start_index`/`end_index` in containing-segment
/// coordinates (assigned by [`crate::assign_segment_indices`]); current-side
/// blocks never need them and leave the fields at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    SectionBreak(SectionBreak),
    Toc(Toc),
}

impl Block {
    pub fn start_index(&self) -> u32 {
        match self {
            Block::Paragraph(p) => p.start_index,
            Block::Table(t) => t.start_index,
            Block::SectionBreak(s) => s.start_index,
            Block::Toc(t) => t.start_index,
        }
    }

    pub fn end_index(&self) -> u32 {
        match self {
            Block::Paragraph(p) => p.end_index,
            Block::Table(t) => t.end_index,
            Block::SectionBreak(s) => s.end_index,
            Block::Toc(t) => t.end_index,
        }
    }
}

/// Classification of a paragraph, the structural key of the aligner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParagraphTag {
    Normal,
    Title,
    Subtitle,
    /// Heading level 1–6.
    Heading(u8),
    ListItem,
}

impl ParagraphTag {
    /// The named style implied by the tag.
    pub fn named_style(&self) -> NamedStyleType {
        match self {
            ParagraphTag::Normal | ParagraphTag::ListItem => NamedStyleType::NormalText,
            ParagraphTag::Title => NamedStyleType::Title,
            ParagraphTag::Subtitle => NamedStyleType::Subtitle,
            ParagraphTag::Heading(1) => NamedStyleType::Heading1,
            ParagraphTag::Heading(2) => NamedStyleType::Heading2,
            ParagraphTag::Heading(3) => NamedStyleType::Heading3,
            ParagraphTag::Heading(4) => NamedStyleType::Heading4,
            ParagraphTag::Heading(5) => NamedStyleType::Heading5,
            ParagraphTag::Heading(_) => NamedStyleType::Heading6,
        }
    }
}

/// Bullet descriptor of a list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    /// Glyph preset name, taken from the document's list table
    /// (e.g. `BULLET_DISC_CIRCLE_SQUARE`, `NUMBERED_DECIMAL_ALPHA_ROMAN`).
    pub preset: String,
    /// Nesting level, 0-based.
    pub level: u8,
}

/// A paragraph: ordered inline content plus paragraph-level attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub tag: ParagraphTag,
    pub content: Vec<Inline>,
    pub style: ParagraphStyle,
    pub bullet: Option<Bullet>,
    pub start_index: u32,
    pub end_index: u32,
}

impl Paragraph {
    /// Concatenated run text, excluding inline specials.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for inline in &self.content {
            if let Inline::Run(run) = inline {
                out.push_str(&run.text);
            }
        }
        out
    }

    /// Inline specials in document order.
    pub fn specials(&self) -> impl Iterator<Item = &SpecialKind> {
        self.content.iter().filter_map(|i| match i {
            Inline::Special(kind) => Some(kind),
            Inline::Run(_) => None,
        })
    }
}

/// Inline content of a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inline {
    Run(TextRun),
    Special(SpecialKind),
}

/// Contiguous text with a resolved style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub style: TextStyle,
}

/// Inline specials, each occupying exactly one UTF-16 unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialKind {
    PageBreak,
    ColumnBreak,
    HorizontalRule,
    Equation,
    Image { src: String },
    Person { email: String, name: Option<String> },
    Date { ts: String },
    FootnoteRef { id: String },
}

/// A section break. The implicit one at body index 0 is parsed like any
/// other; policy around touching them lives in the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionBreak {
    pub start_index: u32,
    pub end_index: u32,
}

/// A table of contents. Content is opaque and read-only; only wholesale
/// deletion is ever legal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toc {
    pub raw: String,
    pub start_index: u32,
    pub end_index: u32,
}
