/*
 * hash.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Structural hashing for block alignment.
 *
 * Hashes cover all semantic content (type, text, styles, ids) and exclude
 * pristine index annotations, so the same block parsed from either snapshot
 * hashes identically. Table hashes fold in the flattened cell text so that
 * two tables swapped within a segment stay distinguishable.
 */

use extradoc_model::{
    Block, Bullet, CellStyle, Inline, Paragraph, ParagraphStyle, SpecialKind, Table, TextStyle,
};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Structural key used by the aligner's second pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralKey {
    Paragraph(extradoc_model::ParagraphTag),
    Table,
    SectionBreak,
    Toc,
}

/// The structural key of a block.
pub fn structural_key(block: &Block) -> StructuralKey {
    match block {
        Block::Paragraph(p) => StructuralKey::Paragraph(p.tag),
        Block::Table(_) => StructuralKey::Table,
        Block::SectionBreak(_) => StructuralKey::SectionBreak,
        Block::Toc(_) => StructuralKey::Toc,
    }
}

/// Content hash of a block, index annotations excluded.
pub fn block_hash(block: &Block) -> u64 {
    let mut hasher = FxHasher::default();
    hash_block(block, &mut hasher);
    hasher.finish()
}

fn hash_block(block: &Block, hasher: &mut FxHasher) {
    std::mem::discriminant(block).hash(hasher);
    match block {
        Block::Paragraph(p) => hash_paragraph(p, hasher),
        Block::Table(t) => hash_table(t, hasher),
        Block::SectionBreak(_) => {}
        Block::Toc(t) => t.raw.hash(hasher),
    }
}

fn hash_paragraph(p: &Paragraph, hasher: &mut FxHasher) {
    p.tag.hash(hasher);
    hash_paragraph_style(&p.style, hasher);
    hash_bullet(&p.bullet, hasher);
    p.content.len().hash(hasher);
    for inline in &p.content {
        std::mem::discriminant(inline).hash(hasher);
        match inline {
            Inline::Run(run) => {
                run.text.hash(hasher);
                hash_text_style(&run.style, hasher);
            }
            Inline::Special(kind) => hash_special(kind, hasher),
        }
    }
}

fn hash_special(kind: &SpecialKind, hasher: &mut FxHasher) {
    std::mem::discriminant(kind).hash(hasher);
    match kind {
        SpecialKind::Image { src } => src.hash(hasher),
        SpecialKind::Person { email, name } => {
            email.hash(hasher);
            name.hash(hasher);
        }
        SpecialKind::Date { ts } => ts.hash(hasher),
        SpecialKind::FootnoteRef { id } => id.hash(hasher),
        SpecialKind::PageBreak
        | SpecialKind::ColumnBreak
        | SpecialKind::HorizontalRule
        | SpecialKind::Equation => {}
    }
}

fn hash_table(t: &Table, hasher: &mut FxHasher) {
    t.id.hash(hasher);
    t.columns.len().hash(hasher);
    for col in &t.columns {
        col.id.hash(hasher);
        hash_f64(&col.width, hasher);
    }
    t.rows.len().hash(hasher);
    for row in &t.rows {
        row.id.hash(hasher);
        row.cells.len().hash(hasher);
        for cell in &row.cells {
            hash_cell(cell, hasher);
        }
    }
}

fn hash_cell(cell: &extradoc_model::TableCell, hasher: &mut FxHasher) {
    cell.row_span.hash(hasher);
    cell.col_span.hash(hasher);
    hash_cell_style(&cell.style, hasher);
    cell.blocks.len().hash(hasher);
    for block in &cell.blocks {
        hash_block(block, hasher);
    }
}

fn hash_text_style(style: &TextStyle, hasher: &mut FxHasher) {
    style.bold.hash(hasher);
    style.italic.hash(hasher);
    style.underline.hash(hasher);
    style.strikethrough.hash(hasher);
    style.small_caps.hash(hasher);
    style.baseline_offset.map(|b| b as u8).hash(hasher);
    style.font_family.hash(hasher);
    style.weight.hash(hasher);
    hash_f64(&style.font_size, hasher);
    style.foreground_color.hash(hasher);
    style.background_color.hash(hasher);
    style.link.hash(hasher);
}

fn hash_paragraph_style(style: &ParagraphStyle, hasher: &mut FxHasher) {
    style.named_style_type.map(|n| n as u8).hash(hasher);
    style.alignment.map(|a| a as u8).hash(hasher);
    hash_f64(&style.line_spacing, hasher);
    hash_f64(&style.indent_start, hasher);
    hash_f64(&style.indent_first_line, hasher);
    hash_f64(&style.space_above, hasher);
    hash_f64(&style.space_below, hasher);
}

fn hash_cell_style(style: &CellStyle, hasher: &mut FxHasher) {
    style.background_color.hash(hasher);
    style.content_alignment.map(|a| a as u8).hash(hasher);
}

fn hash_bullet(bullet: &Option<Bullet>, hasher: &mut FxHasher) {
    match bullet {
        None => 0u8.hash(hasher),
        Some(b) => {
            1u8.hash(hasher);
            b.preset.hash(hasher);
            b.level.hash(hasher);
        }
    }
}

fn hash_f64(value: &Option<f64>, hasher: &mut FxHasher) {
    value.map(f64::to_bits).hash(hasher);
}

#[cfg(test)]
mod tests {
    use super::*;
    use extradoc_model::{ParagraphTag, TextRun};

    fn para(text: &str) -> Block {
        Block::Paragraph(Paragraph {
            tag: ParagraphTag::Normal,
            content: vec![Inline::Run(TextRun {
                text: text.to_string(),
                style: TextStyle::default(),
            })],
            style: ParagraphStyle::default(),
            bullet: None,
            start_index: 0,
            end_index: 0,
        })
    }

    #[test]
    fn test_indices_do_not_affect_hash() {
        let a = para("hello");
        let mut b = para("hello");
        if let Block::Paragraph(p) = &mut b {
            p.start_index = 17;
            p.end_index = 23;
        }
        assert_eq!(block_hash(&a), block_hash(&b));
    }

    #[test]
    fn test_text_affects_hash() {
        assert_ne!(block_hash(&para("hello")), block_hash(&para("world")));
    }

    #[test]
    fn test_style_affects_hash() {
        let plain = para("x");
        let mut bold = para("x");
        if let Block::Paragraph(p) = &mut bold {
            if let Inline::Run(run) = &mut p.content[0] {
                run.style.bold = Some(true);
            }
        }
        assert_ne!(block_hash(&plain), block_hash(&bold));
    }

    #[test]
    fn test_tag_affects_hash_and_key() {
        let normal = para("x");
        let mut heading = para("x");
        if let Block::Paragraph(p) = &mut heading {
            p.tag = ParagraphTag::Heading(1);
        }
        assert_ne!(block_hash(&normal), block_hash(&heading));
        assert_ne!(structural_key(&normal), structural_key(&heading));
    }
}
