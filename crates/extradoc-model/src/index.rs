/*
 * index.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * UTF-16 length formulas and pristine index assignment.
 *
 * The target API addresses content by UTF-16 code-unit index. Every length
 * here derives from the typed tree, never from serialized XML:
 *   paragraph = utf16(text) + specials + 1 terminator
 *   table     = 2 + sum over rows of (1 + sum over cells of (1 + content))
 *   cell      = sum of block lengths, minimum 1 (the cell-end newline)
 */

use crate::block::{Block, Inline, Paragraph};
use crate::segment::Segment;
use crate::table::{Table, TableCell};

/// UTF-16 code-unit length of a string. Characters above U+FFFF count as 2.
pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(|c| c.len_utf16() as u32).sum()
}

/// Length of a paragraph including its terminator.
pub fn paragraph_length(para: &Paragraph) -> u32 {
    let mut len = 1; // terminator
    for inline in &para.content {
        len += match inline {
            Inline::Run(run) => utf16_len(&run.text),
            Inline::Special(_) => 1,
        };
    }
    len
}

/// Length of a table including its start and end markers.
pub fn table_length(table: &Table) -> u32 {
    let mut len = 2; // table start + table end markers
    for row in &table.rows {
        len += 1; // row marker
        for cell in &row.cells {
            len += 1 + cell_content_length(cell); // cell marker + content
        }
    }
    len
}

/// Length of a cell's content. An empty cell still holds its mandatory
/// cell-end newline.
pub fn cell_content_length(cell: &TableCell) -> u32 {
    if cell.blocks.is_empty() {
        return 1;
    }
    cell.blocks.iter().map(block_length).sum()
}

/// Length of any block.
pub fn block_length(block: &Block) -> u32 {
    match block {
        Block::Paragraph(p) => paragraph_length(p),
        Block::Table(t) => table_length(t),
        Block::SectionBreak(_) => 1,
        Block::Toc(t) => utf16_len(&t.raw) + 1,
    }
}

/// Index of a cell's content start, walking rows top to bottom and cells
/// left to right from the table start marker.
///
/// `target_row` and `target_col` are grid positions. Nested tables recurse
/// through [`cell_content_length`].
pub fn cell_content_start(
    table_start: u32,
    table: &Table,
    target_row: usize,
    target_col: usize,
) -> u32 {
    let mut index = table_start + 1; // past the table start marker
    for (r, row) in table.rows.iter().enumerate() {
        index += 1; // row marker
        for (c, cell) in row.cells.iter().enumerate() {
            index += 1; // cell marker
            if r == target_row && c == target_col {
                return index;
            }
            index += cell_content_length(cell);
        }
    }
    index
}

/// Assign `start_index`/`end_index` to every block of a pristine segment
/// (recursing into tables and cells) and record the segment end.
pub fn assign_segment_indices(segment: &mut Segment) {
    let mut cursor = 0;
    for block in &mut segment.blocks {
        cursor = assign_block_indices(block, cursor);
    }
    segment.segment_end = cursor;
}

fn assign_block_indices(block: &mut Block, at: u32) -> u32 {
    match block {
        Block::Paragraph(p) => {
            p.start_index = at;
            p.end_index = at + paragraph_length(p);
            p.end_index
        }
        Block::SectionBreak(s) => {
            s.start_index = at;
            s.end_index = at + 1;
            s.end_index
        }
        Block::Toc(t) => {
            t.start_index = at;
            t.end_index = at + utf16_len(&t.raw) + 1;
            t.end_index
        }
        Block::Table(t) => {
            t.start_index = at;
            let mut cursor = at + 1;
            for row in &mut t.rows {
                cursor += 1;
                for cell in &mut row.cells {
                    cursor += 1;
                    for cell_block in &mut cell.blocks {
                        cursor = assign_block_indices(cell_block, cursor);
                    }
                    if cell.blocks.is_empty() {
                        cursor += 1;
                    }
                }
            }
            t.end_index = cursor + 1; // table end marker
            t.end_index
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{ParagraphTag, SectionBreak, SpecialKind, TextRun};
    use crate::segment::SegmentKind;
    use crate::style::{ParagraphStyle, TextStyle};
    use crate::table::{Column, TableRow};
    use proptest::prelude::*;

    fn para(text: &str) -> Paragraph {
        Paragraph {
            tag: ParagraphTag::Normal,
            content: vec![Inline::Run(TextRun {
                text: text.to_string(),
                style: TextStyle::default(),
            })],
            style: ParagraphStyle::default(),
            bullet: None,
            start_index: 0,
            end_index: 0,
        }
    }

    fn cell(text: &str) -> TableCell {
        TableCell::new(vec![Block::Paragraph(para(text))])
    }

    fn grid(rows: &[&[&str]]) -> Table {
        Table {
            id: None,
            columns: (0..rows[0].len())
                .map(|i| Column {
                    id: format!("c{}", i),
                    width: None,
                })
                .collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, cells)| TableRow {
                    id: format!("r{}", i),
                    cells: cells.iter().map(|t| cell(t)).collect(),
                })
                .collect(),
            start_index: 0,
            end_index: 0,
        }
    }

    #[test]
    fn test_utf16_len_ascii() {
        assert_eq!(utf16_len(""), 0);
        assert_eq!(utf16_len("Hello world"), 11);
    }

    proptest::proptest! {
        #[test]
        fn utf16_len_matches_encoding(text in "\\PC{0,24}") {
            prop_assert_eq!(utf16_len(&text) as usize, text.encode_utf16().count());
        }

        #[test]
        fn utf16_len_is_additive(a in "\\PC{0,12}", b in "\\PC{0,12}") {
            let joined = format!("{}{}", a, b);
            prop_assert_eq!(utf16_len(&joined), utf16_len(&a) + utf16_len(&b));
        }
    }

    #[test]
    fn test_utf16_len_surrogate_pairs() {
        // U+1F600 is above the BMP and takes two code units.
        assert_eq!(utf16_len("\u{1F600}"), 2);
        assert_eq!(utf16_len("a\u{1F600}b"), 4);
        // BMP characters outside ASCII still count as one.
        assert_eq!(utf16_len("é\u{FFFD}"), 2);
    }

    #[test]
    fn test_paragraph_length() {
        assert_eq!(paragraph_length(&para("Hello")), 6);
        assert_eq!(paragraph_length(&para("")), 1);

        let mut p = para("ab");
        p.content.push(Inline::Special(SpecialKind::PageBreak));
        assert_eq!(paragraph_length(&p), 4);
    }

    #[test]
    fn test_table_length_2x2() {
        // 2 markers + 2 rows * (1 + 2 cells * (1 + 2)) = 2 + 2*7 = 16
        let table = grid(&[&["X", "Y"], &["Z", "W"]]);
        assert_eq!(table_length(&table), 16);
    }

    #[test]
    fn test_empty_cell_has_length_one() {
        let empty = TableCell::new(vec![]);
        assert_eq!(cell_content_length(&empty), 1);
        // An explicit empty paragraph is the same size.
        assert_eq!(cell_content_length(&cell("")), 1);
    }

    #[test]
    fn test_cell_content_start_walk() {
        let table = grid(&[&["X", "Y"], &["Z", "W"]]);
        // start=10: [10 tbl, 11 row, 12 cellmark, 13 "X" 14 \n, 15 cellmark, ...]
        assert_eq!(cell_content_start(10, &table, 0, 0), 13);
        assert_eq!(cell_content_start(10, &table, 0, 1), 16);
        assert_eq!(cell_content_start(10, &table, 1, 0), 20);
        assert_eq!(cell_content_start(10, &table, 1, 1), 23);
    }

    #[test]
    fn test_nested_table_length() {
        let inner = grid(&[&["a"]]); // 2 + (1 + (1 + 2)) = 6
        assert_eq!(table_length(&inner), 6);

        let mut outer = grid(&[&["b"]]);
        outer.rows[0].cells[0]
            .blocks
            .push(Block::Table(inner.clone()));
        // cell content = "b\n" (2) + inner (6) = 8; total 2 + (1 + (1 + 8)) = 12
        assert_eq!(table_length(&outer), 12);
    }

    #[test]
    fn test_assign_segment_indices_body() {
        let mut segment = Segment {
            kind: SegmentKind::Body,
            id: "body".to_string(),
            blocks: vec![
                Block::SectionBreak(SectionBreak::default()),
                Block::Paragraph(para("Hello world")),
                Block::Table(grid(&[&["X"]])),
                Block::Paragraph(para("tail")),
            ],
            segment_end: 0,
        };
        assign_segment_indices(&mut segment);

        assert_eq!(segment.blocks[0].start_index(), 0);
        assert_eq!(segment.blocks[0].end_index(), 1);
        assert_eq!(segment.blocks[1].start_index(), 1);
        assert_eq!(segment.blocks[1].end_index(), 13);
        assert_eq!(segment.blocks[2].start_index(), 13);
        assert_eq!(segment.blocks[2].end_index(), 19);
        assert_eq!(segment.blocks[3].start_index(), 19);
        assert_eq!(segment.blocks[3].end_index(), 24);
        assert_eq!(segment.segment_end, 24);
    }

    #[test]
    fn test_assign_indices_inside_cells() {
        let mut segment = Segment {
            kind: SegmentKind::Header,
            id: "h.1".to_string(),
            blocks: vec![Block::Table(grid(&[&["ab", "c"]])), Block::Paragraph(para(""))],
            segment_end: 0,
        };
        assign_segment_indices(&mut segment);

        let Block::Table(table) = &segment.blocks[0] else {
            panic!("expected table");
        };
        // [0 tbl, 1 row, 2 cellmark, 3 'a' 4 'b' 5 \n, 6 cellmark, 7 'c' 8 \n, 9 tblend]
        let Block::Paragraph(first) = &table.rows[0].cells[0].blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(first.start_index, 3);
        assert_eq!(first.end_index, 6);
        assert_eq!(table.end_index, 10);
        assert_eq!(cell_content_start(0, table, 0, 1), 7);
        assert_eq!(segment.segment_end, 11);
    }
}
