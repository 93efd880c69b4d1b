/*
 * change.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Change tree construction from an alignment list.
 *
 * Consecutive paragraph alignments with the same op and tag collapse into a
 * single ContentChange so multi-paragraph inserts and deletes travel as one
 * request group (preserving list identity and reducing API churn).
 * Unchanged blocks are hard separators: they emit nothing but advance the
 * insertion point. The tree is immutable once built; the walker only reads.
 */

use crate::align::{AlignOp, BlockAlignment};
use crate::lcs;
use extradoc_model::{Block, Paragraph, ParagraphTag, Table, Toc};

/// How a change node differs between the snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Added,
    Deleted,
    Modified,
}

/// One changed region of a segment (or of a cell's block list).
#[derive(Debug, Clone)]
pub enum BlockChange {
    Content(ContentChange),
    Table(TableChange),
    /// A section break appeared, vanished, or moved.
    SectionBreak { op: ChangeOp, pristine_start: u32, pristine_end: u32 },
    /// A table of contents changed. Only deletion is expressible.
    Toc {
        op: ChangeOp,
        pristine_start: u32,
        pristine_end: u32,
        before: Option<Toc>,
    },
}

impl BlockChange {
    /// Pristine anchor used for the descending walk.
    pub fn pristine_start(&self) -> u32 {
        match self {
            BlockChange::Content(c) => c.pristine_start,
            BlockChange::Table(t) => t.pristine_start,
            BlockChange::SectionBreak { pristine_start, .. }
            | BlockChange::Toc { pristine_start, .. } => *pristine_start,
        }
    }
}

/// A matched, added, or deleted paragraph. Added pairs have no `before`,
/// deleted pairs no `after`.
#[derive(Debug, Clone)]
pub struct ParaPair {
    pub before: Option<Paragraph>,
    pub after: Option<Paragraph>,
}

/// A group of consecutive same-op, same-tag paragraphs.
///
/// For Added groups `pristine_start == pristine_end == insertion point`.
#[derive(Debug, Clone)]
pub struct ContentChange {
    pub op: ChangeOp,
    pub tag: ParagraphTag,
    pub pristine_start: u32,
    pub pristine_end: u32,
    pub pairs: Vec<ParaPair>,
}

/// A table-level change. Modified tables carry the row/column alignment.
#[derive(Debug, Clone)]
pub struct TableChange {
    pub op: ChangeOp,
    pub pristine_start: u32,
    pub pristine_end: u32,
    pub before: Option<Table>,
    pub after: Option<Table>,
    pub structure: Option<TableStructure>,
}

/// Row and column alignment of a modified table.
///
/// Rows and columns match by stable id through an LCS; when the LCS finds
/// nothing (complete replacement) both fall back to pairing by position so
/// the diff always has an anchor. Duplicate row ids match positionally
/// within each id group, which is what the LCS does for equal keys.
#[derive(Debug, Clone, Default)]
pub struct TableStructure {
    /// Pristine column positions with no counterpart, ascending.
    pub deleted_cols: Vec<usize>,
    /// Current column positions with no counterpart, ascending.
    pub added_cols: Vec<usize>,
    /// Matched `(pristine, current)` column positions, ascending.
    pub col_pairs: Vec<(usize, usize)>,
    pub deleted_rows: Vec<usize>,
    pub added_rows: Vec<usize>,
    pub row_pairs: Vec<(usize, usize)>,
}

/// Build the change list for one segment-like block list.
///
/// The list is in alignment order (current order, deletions interleaved);
/// the walker consumes it in reverse for the backwards walk.
pub fn build_changes(
    alignment: &[BlockAlignment],
    pristine: &[Block],
    current: &[Block],
) -> Vec<BlockChange> {
    let mut changes: Vec<BlockChange> = Vec::new();
    let mut last_pristine_end: u32 = 0;

    // Open paragraph group, if any.
    let mut group: Option<ContentChange> = None;

    let flush = |group: &mut Option<ContentChange>, changes: &mut Vec<BlockChange>| {
        if let Some(g) = group.take() {
            changes.push(BlockChange::Content(g));
        }
    };

    for entry in alignment {
        let before = entry.pristine.map(|p| &pristine[p]);
        let after = entry.current.map(|c| &current[c]);

        if entry.op == AlignOp::Unchanged {
            flush(&mut group, &mut changes);
            last_pristine_end = before.expect("unchanged entry has pristine side").end_index();
            continue;
        }

        let op = match entry.op {
            AlignOp::Added => ChangeOp::Added,
            AlignOp::Deleted => ChangeOp::Deleted,
            AlignOp::Modified => ChangeOp::Modified,
            AlignOp::Unchanged => unreachable!(),
        };

        match (before, after) {
            // Paragraph alignments group; everything else is its own node.
            (b, a)
                if matches!(b, None | Some(Block::Paragraph(_)))
                    && matches!(a, None | Some(Block::Paragraph(_))) =>
            {
                let before_para = b.map(|blk| match blk {
                    Block::Paragraph(p) => p.clone(),
                    _ => unreachable!(),
                });
                let after_para = a.map(|blk| match blk {
                    Block::Paragraph(p) => p.clone(),
                    _ => unreachable!(),
                });
                let tag = after_para
                    .as_ref()
                    .map(|p| p.tag)
                    .or_else(|| before_para.as_ref().map(|p| p.tag))
                    .expect("paragraph pair has at least one side");

                let (start, end) = match &before_para {
                    Some(p) => (p.start_index, p.end_index),
                    None => (last_pristine_end, last_pristine_end),
                };

                let extend = matches!(&group, Some(g) if g.op == op && g.tag == tag);
                if extend {
                    let g = group.as_mut().expect("group checked above");
                    g.pairs.push(ParaPair {
                        before: before_para.clone(),
                        after: after_para,
                    });
                    if let Some(p) = &before_para {
                        g.pristine_end = p.end_index;
                    }
                } else {
                    flush(&mut group, &mut changes);
                    group = Some(ContentChange {
                        op,
                        tag,
                        pristine_start: start,
                        pristine_end: end,
                        pairs: vec![ParaPair {
                            before: before_para.clone(),
                            after: after_para,
                        }],
                    });
                }
                if let Some(p) = &before_para {
                    last_pristine_end = p.end_index;
                }
            }
            _ => {
                flush(&mut group, &mut changes);
                match (before, after) {
                    (b, a)
                        if matches!(b, None | Some(Block::Table(_)))
                            && matches!(a, None | Some(Block::Table(_))) =>
                    {
                        let before_table = b.map(|blk| match blk {
                            Block::Table(t) => t.clone(),
                            _ => unreachable!(),
                        });
                        let after_table = a.map(|blk| match blk {
                            Block::Table(t) => t.clone(),
                            _ => unreachable!(),
                        });
                        let (start, end) = match &before_table {
                            Some(t) => (t.start_index, t.end_index),
                            None => (last_pristine_end, last_pristine_end),
                        };
                        let structure = match (&before_table, &after_table) {
                            (Some(bt), Some(at)) => Some(table_structure(bt, at)),
                            _ => None,
                        };
                        if let Some(t) = &before_table {
                            last_pristine_end = t.end_index;
                        }
                        changes.push(BlockChange::Table(TableChange {
                            op,
                            pristine_start: start,
                            pristine_end: end,
                            before: before_table,
                            after: after_table,
                            structure,
                        }));
                    }
                    (Some(Block::SectionBreak(s)), _) => {
                        last_pristine_end = s.end_index;
                        changes.push(BlockChange::SectionBreak {
                            op,
                            pristine_start: s.start_index,
                            pristine_end: s.end_index,
                        });
                    }
                    (None, Some(Block::SectionBreak(_))) => {
                        changes.push(BlockChange::SectionBreak {
                            op,
                            pristine_start: last_pristine_end,
                            pristine_end: last_pristine_end,
                        });
                    }
                    (Some(Block::Toc(t)), _) => {
                        let node = BlockChange::Toc {
                            op,
                            pristine_start: t.start_index,
                            pristine_end: t.end_index,
                            before: Some(t.clone()),
                        };
                        last_pristine_end = t.end_index;
                        changes.push(node);
                    }
                    (None, Some(Block::Toc(_))) => {
                        changes.push(BlockChange::Toc {
                            op,
                            pristine_start: last_pristine_end,
                            pristine_end: last_pristine_end,
                            before: None,
                        });
                    }
                    _ => unreachable!("alignment pairs blocks of the same structural key"),
                }
            }
        }
    }
    flush(&mut group, &mut changes);

    changes
}

fn table_structure(before: &Table, after: &Table) -> TableStructure {
    let before_cols: Vec<&str> = before.columns.iter().map(|c| c.id.as_str()).collect();
    let after_cols: Vec<&str> = after.columns.iter().map(|c| c.id.as_str()).collect();
    let col_pairs = lcs::align_keyed(&before_cols, &after_cols);

    let before_rows: Vec<&str> = before.rows.iter().map(|r| r.id.as_str()).collect();
    let after_rows: Vec<&str> = after.rows.iter().map(|r| r.id.as_str()).collect();
    let row_pairs = lcs::align_keyed(&before_rows, &after_rows);

    let deleted_cols = unmatched(before_cols.len(), col_pairs.iter().map(|p| p.0));
    let added_cols = unmatched(after_cols.len(), col_pairs.iter().map(|p| p.1));
    let deleted_rows = unmatched(before_rows.len(), row_pairs.iter().map(|p| p.0));
    let added_rows = unmatched(after_rows.len(), row_pairs.iter().map(|p| p.1));

    TableStructure {
        deleted_cols,
        added_cols,
        col_pairs,
        deleted_rows,
        added_rows,
        row_pairs,
    }
}

fn unmatched(len: usize, matched: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut seen = vec![false; len];
    for m in matched {
        seen[m] = true;
    }
    seen.iter()
        .enumerate()
        .filter(|&(_, &s)| !s)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_blocks;
    use extradoc_model::{
        Column, Inline, ParagraphStyle, SectionBreak, Segment, SegmentKind, TableCell, TableRow,
        TextRun, TextStyle, assign_segment_indices,
    };

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

    fn annotated(blocks: Vec<Block>) -> Vec<Block> {
        let mut segment = Segment {
            kind: SegmentKind::Body,
            id: String::new(),
            blocks,
            segment_end: 0,
        };
        assign_segment_indices(&mut segment);
        segment.blocks
    }

    fn changes_for(pristine: Vec<Block>, current: Vec<Block>) -> Vec<BlockChange> {
        let pristine = annotated(pristine);
        let alignment = align_blocks(&pristine, &current);
        build_changes(&alignment, &pristine, &current)
    }

    #[test]
    fn test_no_changes_for_identical() {
        let blocks = vec![Block::SectionBreak(SectionBreak::default()), para("a")];
        let changes = changes_for(blocks.clone(), blocks);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_consecutive_added_paragraphs_group() {
        let sb = Block::SectionBreak(SectionBreak::default());
        let changes = changes_for(
            vec![sb.clone(), para("A")],
            vec![sb, para("A"), para("B"), para("C")],
        );
        assert_eq!(changes.len(), 1);
        let BlockChange::Content(c) = &changes[0] else {
            panic!("expected content change");
        };
        assert_eq!(c.op, ChangeOp::Added);
        assert_eq!(c.pairs.len(), 2);
        // Insertion point is the end of the preceding pristine paragraph.
        assert_eq!(c.pristine_start, 3);
        assert_eq!(c.pristine_end, 3);
    }

    #[test]
    fn test_unchanged_paragraph_is_hard_separator() {
        let sb = Block::SectionBreak(SectionBreak::default());
        let changes = changes_for(
            vec![sb.clone(), para("A"), para("keep"), para("B")],
            vec![sb, para("X"), para("keep"), para("Y")],
        );
        assert_eq!(changes.len(), 2);
        let BlockChange::Content(first) = &changes[0] else {
            panic!("expected content change");
        };
        let BlockChange::Content(second) = &changes[1] else {
            panic!("expected content change");
        };
        assert_eq!(first.op, ChangeOp::Modified);
        assert_eq!(second.op, ChangeOp::Modified);
        assert_eq!(first.pairs.len(), 1);
        assert_eq!(second.pairs.len(), 1);
    }

    #[test]
    fn test_different_ops_do_not_group() {
        let sb = Block::SectionBreak(SectionBreak::default());
        // "A" is modified, "B" is brand new: two nodes.
        let changes = changes_for(
            vec![sb.clone(), para("A")],
            vec![sb, para("A!"), para("B")],
        );
        assert_eq!(changes.len(), 2);
    }

    fn table(ids: &[&str], col_ids: &[&str]) -> Table {
        Table {
            id: Some("T".to_string()),
            columns: col_ids
                .iter()
                .map(|id| Column {
                    id: id.to_string(),
                    width: None,
                })
                .collect(),
            rows: ids
                .iter()
                .map(|id| TableRow {
                    id: id.to_string(),
                    cells: col_ids
                        .iter()
                        .map(|_| TableCell::new(vec![para("x")]))
                        .collect(),
                })
                .collect(),
            start_index: 0,
            end_index: 0,
        }
    }

    #[test]
    fn test_table_structure_row_match_by_id() {
        let before = table(&["r1", "r2"], &["c1"]);
        let after = table(&["r1", "r3", "r2"], &["c1"]);
        let s = table_structure(&before, &after);
        assert_eq!(s.row_pairs, vec![(0, 0), (1, 2)]);
        assert_eq!(s.added_rows, vec![1]);
        assert!(s.deleted_rows.is_empty());
    }

    #[test]
    fn test_table_structure_positional_fallback() {
        let before = table(&["r1", "r2"], &["c1"]);
        let after = table(&["r8", "r9", "r10"], &["c1"]);
        let s = table_structure(&before, &after);
        // Complete replacement: pair by index so at least one anchor exists.
        assert_eq!(s.row_pairs, vec![(0, 0), (1, 1)]);
        assert_eq!(s.added_rows, vec![2]);
    }

    #[test]
    fn test_table_structure_column_changes() {
        let before = table(&["r1"], &["c1", "c2", "c3"]);
        let after = table(&["r1"], &["c1", "c3", "c4"]);
        let s = table_structure(&before, &after);
        assert_eq!(s.col_pairs, vec![(0, 0), (2, 1)]);
        assert_eq!(s.deleted_cols, vec![1]);
        assert_eq!(s.added_cols, vec![2]);
    }
}
