/*
 * emit_table.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Request generation for table changes.
 *
 * Within one modified table the phases are fixed:
 *   1. column deletions, highest column first
 *   2. row deletions and modified-row cell edits, bottom to top
 *      (cells right to left within a row)
 *   3. column insertions, highest first, populated bottom to top
 *   4. row insertions, highest first, populated right to left
 *   5. merges, then column widths
 *
 * The working grid mirrors the table as each emitted request would leave
 * it: column removals drop cells, edits update tracked lengths, structural
 * inserts add 1-length cells. Populating an inserted column must use those
 * tracked lengths; pristine lengths are stale the moment phase 2 runs.
 */

use crate::change::TableChange;
use crate::error::Result;
use crate::requests::MutationRecord;
use crate::style_diff;
use crate::walk::{EmitCtx, Frame, TabCtx, diff_blocks, push_interior_delete};
use extradoc_model::{
    Block, CellStyle, Table, TableCell, cell_content_length, cell_content_start,
};
use rustc_hash::FxHashMap;

/// Where a working row/column came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Pristine(usize),
    Added(usize),
}

/// Tracked cell-content lengths, kept in lock-step with emission.
struct WorkingGrid {
    table_start: u32,
    cells: Vec<Vec<u32>>,
}

impl WorkingGrid {
    fn from_pristine(table: &Table, table_start: u32) -> Self {
        Self {
            table_start,
            cells: table
                .rows
                .iter()
                .map(|row| row.cells.iter().map(cell_content_length).collect())
                .collect(),
        }
    }

    fn empty(table_start: u32, rows: usize, cols: usize) -> Self {
        Self {
            table_start,
            cells: vec![vec![1; cols]; rows],
        }
    }

    /// Units occupied by row `r`: its marker plus each cell's marker and
    /// content.
    fn row_span(&self, r: usize) -> u32 {
        1 + self.cells[r].iter().map(|len| 1 + len).sum::<u32>()
    }

    /// Execution-time index of a cell's content start.
    fn cell_start(&self, r: usize, c: usize) -> u32 {
        let mut index = self.table_start + 1;
        for rr in 0..r {
            index += self.row_span(rr);
        }
        index += 1; // row marker
        for cc in 0..c {
            index += 1 + self.cells[r][cc];
        }
        index + 1 // cell marker
    }

    fn delete_row(&mut self, r: usize) {
        self.cells.remove(r);
    }

    fn delete_col(&mut self, c: usize) {
        for row in &mut self.cells {
            row.remove(c);
        }
    }

    fn insert_row(&mut self, at: usize, cols: usize) {
        self.cells.insert(at, vec![1; cols]);
    }

    fn insert_col(&mut self, at: usize) {
        for row in &mut self.cells {
            row.insert(at, 1);
        }
    }

    fn set(&mut self, r: usize, c: usize, len: u32) {
        self.cells[r][c] = len;
    }
}

fn position(origins: &[Origin], target: Origin) -> usize {
    origins
        .iter()
        .position(|o| *o == target)
        .expect("origin present in working layout")
}

fn current_pos(origin: Origin, matched: &FxHashMap<usize, usize>) -> usize {
    match origin {
        Origin::Pristine(p) => matched[&p],
        Origin::Added(j) => j,
    }
}

/// A cell merge or unmerge at current-layout coordinates.
type SpanOp = (usize, usize, u32, u32);

/// Table(Modified): structural and content edits in phase order.
pub(crate) fn modified(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &mut Frame,
    tc: &TableChange,
) -> Result<()> {
    let before = tc.before.as_ref().expect("modified table has a pristine side");
    let after = tc.after.as_ref().expect("modified table has a current side");
    let s = tc.structure.as_ref().expect("modified table has an alignment");

    let table_start = frame.map(before.start_index);
    let table_path = format!("{}/table@{}", frame.path, table_start);
    tracing::debug!(path = %table_path, "emitting table modification");

    let mut grid = WorkingGrid::from_pristine(before, table_start);
    let mut rows: Vec<Origin> = (0..before.rows.len()).map(Origin::Pristine).collect();
    let mut cols: Vec<Origin> = (0..before.columns.len()).map(Origin::Pristine).collect();
    let row_match: FxHashMap<usize, usize> = s.row_pairs.iter().copied().collect();
    let col_match: FxHashMap<usize, usize> = s.col_pairs.iter().copied().collect();

    let mut unmerges: Vec<SpanOp> = Vec::new();
    let mut merges: Vec<SpanOp> = Vec::new();

    // Phase 1: column deletions, highest pristine position first.
    for &p in s.deleted_cols.iter().rev() {
        let w = position(&cols, Origin::Pristine(p));
        for row in &before.rows {
            warn_footnotes_in_blocks(ctx, &row.cells[p].blocks, &table_path);
        }
        ctx.push(
            frame.batch,
            MutationRecord::DeleteTableColumn {
                table_start: frame.location(table_start),
                col_index: w as u32,
            },
        )?;
        grid.delete_col(w);
        cols.remove(w);
    }

    // Phase 2: row deletions and cell edits, bottom to top.
    for p in (0..before.rows.len()).rev() {
        let w = position(&rows, Origin::Pristine(p));
        if s.deleted_rows.contains(&p) {
            for cell in &before.rows[p].cells {
                warn_footnotes_in_blocks(ctx, &cell.blocks, &table_path);
            }
            ctx.push(
                frame.batch,
                MutationRecord::DeleteTableRow {
                    table_start: frame.location(table_start),
                    row_index: w as u32,
                },
            )?;
            grid.delete_row(w);
            rows.remove(w);
            continue;
        }

        let crow = row_match[&p];
        for wc in (0..cols.len()).rev() {
            let Origin::Pristine(pc) = cols[wc] else {
                continue; // no added columns exist yet in phase 2
            };
            let ccol = col_match[&pc];
            let bcell = &before.rows[p].cells[pc];
            let acell = &after.rows[crow].cells[ccol];

            let cs = grid.cell_start(w, wc);
            let annotated = cell_content_start(before.start_index, before, p, pc);
            let mut cell_frame = Frame {
                tab_id: frame.tab_id.clone(),
                segment_id: frame.segment_id.clone(),
                batch: frame.batch,
                shift: i64::from(cs) - i64::from(annotated),
                end: cs + grid.cells[w][wc],
                content_start: cs,
                consumed: false,
                path: format!("{}/cell[{},{}]", table_path, p, pc),
            };
            diff_blocks(ctx, tab, &bcell.blocks, &acell.blocks, &mut cell_frame)?;
            grid.set(w, wc, cell_content_length(acell));

            if let Some((style, fields)) = style_diff::diff_cell_style(&bcell.style, &acell.style)
            {
                ctx.push(
                    frame.batch,
                    MutationRecord::UpdateTableCellStyle {
                        table_start: frame.location(table_start),
                        row_index: w as u32,
                        col_index: wc as u32,
                        style,
                        fields,
                    },
                )?;
            }

            if (bcell.row_span, bcell.col_span) != (acell.row_span, acell.col_span) {
                if bcell.row_span > 1 || bcell.col_span > 1 {
                    unmerges.push((crow, ccol, bcell.row_span, bcell.col_span));
                }
                if acell.row_span > 1 || acell.col_span > 1 {
                    merges.push((crow, ccol, acell.row_span, acell.col_span));
                }
            }
        }
    }

    // Phase 3: column insertions, highest current position first. New cells
    // are populated with the tracked row lengths, not pristine ones.
    for &j in s.added_cols.iter().rev() {
        let at = cols
            .iter()
            .filter(|o| current_pos(**o, &col_match) < j)
            .count();
        let (col_index, right) = if at > 0 { (at - 1, true) } else { (0, false) };
        ctx.push(
            frame.batch,
            MutationRecord::InsertTableColumn {
                table_start: frame.location(table_start),
                row_index: 0,
                col_index: col_index as u32,
                right,
            },
        )?;
        grid.insert_col(at);
        cols.insert(at, Origin::Added(j));

        for w in (0..rows.len()).rev() {
            let Origin::Pristine(p) = rows[w] else {
                unreachable!("added rows appear in phase 4");
            };
            let crow = row_match[&p];
            let acell = &after.rows[crow].cells[j];
            populate_cell(ctx, tab, frame, &mut grid, w, at, acell, &table_path)?;
            emit_new_cell_style(ctx, frame, table_start, w, at, acell)?;
            if acell.row_span > 1 || acell.col_span > 1 {
                merges.push((crow, j, acell.row_span, acell.col_span));
            }
        }
    }

    // Phase 4: row insertions, highest current position first.
    for &i in s.added_rows.iter().rev() {
        let at = rows
            .iter()
            .filter(|o| current_pos(**o, &row_match) < i)
            .count();
        let (row_index, below) = if at > 0 { (at - 1, true) } else { (0, false) };
        ctx.push(
            frame.batch,
            MutationRecord::InsertTableRow {
                table_start: frame.location(table_start),
                row_index: row_index as u32,
                below,
            },
        )?;
        grid.insert_row(at, cols.len());
        rows.insert(at, Origin::Added(i));

        for wc in (0..cols.len()).rev() {
            let j = current_pos(cols[wc], &col_match);
            let acell = &after.rows[i].cells[j];
            populate_cell(ctx, tab, frame, &mut grid, at, wc, acell, &table_path)?;
            emit_new_cell_style(ctx, frame, table_start, at, wc, acell)?;
            if acell.row_span > 1 || acell.col_span > 1 {
                merges.push((i, j, acell.row_span, acell.col_span));
            }
        }
    }

    // Merge phase: the working layout now equals the current layout, so
    // current coordinates are valid.
    unmerges.sort_unstable();
    merges.sort_unstable();
    for (r, c, rs, cs) in unmerges {
        ctx.push(
            frame.batch,
            MutationRecord::UnmergeCells {
                table_start: frame.location(table_start),
                row_index: r as u32,
                col_index: c as u32,
                row_span: rs,
                col_span: cs,
            },
        )?;
    }
    for (r, c, rs, cs) in merges {
        ctx.push(
            frame.batch,
            MutationRecord::MergeCells {
                table_start: frame.location(table_start),
                row_index: r as u32,
                col_index: c as u32,
                row_span: rs,
                col_span: cs,
            },
        )?;
    }

    // Phase 5: column widths.
    let mut width_updates: Vec<(u32, f64)> = Vec::new();
    for &(pp, cp) in &s.col_pairs {
        if before.columns[pp].width != after.columns[cp].width {
            if let Some(width) = after.columns[cp].width {
                width_updates.push((cp as u32, width));
            }
        }
    }
    for &j in &s.added_cols {
        if let Some(width) = after.columns[j].width {
            width_updates.push((j as u32, width));
        }
    }
    emit_width_updates(ctx, frame, table_start, width_updates)?;

    Ok(())
}

/// Table(Added): one structural insert yielding an empty grid (every cell
/// holds its sentinel newline), then population, styles, merges, widths.
pub(crate) fn added(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &mut Frame,
    tc: &TableChange,
) -> Result<()> {
    let after = tc.after.as_ref().expect("added table has a current side");
    let base = frame.map(tc.pristine_start);
    let table_path = format!("{}/table@{}", frame.path, base);

    ctx.push(
        frame.batch,
        MutationRecord::InsertTable {
            location: frame.location(base),
            rows: after.rows.len() as u32,
            cols: after.columns.len() as u32,
        },
    )?;

    let mut grid = WorkingGrid::empty(base, after.rows.len(), after.columns.len());
    let mut merges: Vec<SpanOp> = Vec::new();

    for r in (0..after.rows.len()).rev() {
        for c in (0..after.columns.len()).rev() {
            let cell = &after.rows[r].cells[c];
            populate_cell(ctx, tab, frame, &mut grid, r, c, cell, &table_path)?;
            emit_new_cell_style(ctx, frame, base, r, c, cell)?;
            if cell.row_span > 1 || cell.col_span > 1 {
                merges.push((r, c, cell.row_span, cell.col_span));
            }
        }
    }

    merges.sort_unstable();
    for (r, c, rs, cs) in merges {
        ctx.push(
            frame.batch,
            MutationRecord::MergeCells {
                table_start: frame.location(base),
                row_index: r as u32,
                col_index: c as u32,
                row_span: rs,
                col_span: cs,
            },
        )?;
    }

    let width_updates: Vec<(u32, f64)> = after
        .columns
        .iter()
        .enumerate()
        .filter_map(|(c, col)| col.width.map(|w| (c as u32, w)))
        .collect();
    emit_width_updates(ctx, frame, base, width_updates)?;

    Ok(())
}

/// Table(Deleted): one range delete over the whole span.
pub(crate) fn deleted(ctx: &mut EmitCtx<'_>, frame: &mut Frame, tc: &TableChange) -> Result<()> {
    let before = tc.before.as_ref().expect("deleted table has a pristine side");
    for row in &before.rows {
        for cell in &row.cells {
            warn_footnotes_in_blocks(ctx, &cell.blocks, &frame.path);
        }
    }
    let start = frame.map(tc.pristine_start);
    let end = frame.map(tc.pristine_end);
    push_interior_delete(ctx, frame, start, end)
}

/// Fill a freshly created (1-length) cell by diffing it against the empty
/// state. The cell is a mini-segment: the insert that reaches its end
/// strips its trailing newline against the cell sentinel.
#[allow(clippy::too_many_arguments)]
fn populate_cell(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &Frame,
    grid: &mut WorkingGrid,
    r: usize,
    c: usize,
    cell: &TableCell,
    table_path: &str,
) -> Result<()> {
    let cs = grid.cell_start(r, c);
    let initial = vec![empty_paragraph_annotated()];
    let mut cell_frame = Frame {
        tab_id: frame.tab_id.clone(),
        segment_id: frame.segment_id.clone(),
        batch: frame.batch,
        shift: i64::from(cs),
        end: cs + 1,
        content_start: cs,
        consumed: false,
        path: format!("{}/newcell[{},{}]", table_path, r, c),
    };
    diff_blocks(ctx, tab, &initial, &cell.blocks, &mut cell_frame)?;
    grid.set(r, c, cell_content_length(cell));
    Ok(())
}

fn empty_paragraph_annotated() -> Block {
    let mut block = crate::tree::empty_paragraph();
    if let Block::Paragraph(p) = &mut block {
        p.start_index = 0;
        p.end_index = 1;
    }
    block
}

fn emit_new_cell_style(
    ctx: &mut EmitCtx<'_>,
    frame: &Frame,
    table_start: u32,
    r: usize,
    c: usize,
    cell: &TableCell,
) -> Result<()> {
    if let Some((style, fields)) = style_diff::diff_cell_style(&CellStyle::default(), &cell.style)
    {
        ctx.push(
            frame.batch,
            MutationRecord::UpdateTableCellStyle {
                table_start: frame.location(table_start),
                row_index: r as u32,
                col_index: c as u32,
                style,
                fields,
            },
        )?;
    }
    Ok(())
}

/// One width request per distinct width, columns ascending.
fn emit_width_updates(
    ctx: &mut EmitCtx<'_>,
    frame: &Frame,
    table_start: u32,
    mut updates: Vec<(u32, f64)>,
) -> Result<()> {
    updates.sort_by_key(|(c, _)| *c);
    let mut groups: Vec<(f64, Vec<u32>)> = Vec::new();
    for (col, width) in updates {
        match groups.iter_mut().find(|(w, _)| w.to_bits() == width.to_bits()) {
            Some((_, cols)) => cols.push(col),
            None => groups.push((width, vec![col])),
        }
    }
    for (width, col_indices) in groups {
        ctx.push(
            frame.batch,
            MutationRecord::UpdateColumnWidth {
                table_start: frame.location(table_start),
                col_indices,
                width,
            },
        )?;
    }
    Ok(())
}

pub(crate) fn warn_footnotes_in_blocks(ctx: &mut EmitCtx<'_>, blocks: &[Block], path: &str) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => crate::emit_content::warn_dropped_footnotes(ctx, p, path),
            Block::Table(t) => {
                for row in &t.rows {
                    for cell in &row.cells {
                        warn_footnotes_in_blocks(ctx, &cell.blocks, path);
                    }
                }
            }
            _ => {}
        }
    }
}
