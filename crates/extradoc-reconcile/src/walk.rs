/*
 * walk.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Backwards walk over a segment's change list.
 *
 * Core invariant: when a change at pristine position P is emitted,
 * everything below P is still in its pristine state at execution time.
 * That holds because changes are dispatched in descending pristine_start
 * order. An insert at P shifts only positions >= P; a delete over [P, Q)
 * shifts only positions >= Q.
 *
 * All per-call state (request buffers, warnings, consumed flags, batch
 * counters) lives here, threaded through the recursion. Nothing is global;
 * distinct reconcile calls are independent.
 */

use crate::align::align_blocks;
use crate::change::{self, BlockChange, ChangeOp};
use crate::config::Config;
use crate::error::{Error, Result, Warning, WarningKind};
use crate::requests::{Batch, Id, Location, MutationRecord, Range};
use crate::{emit_content, emit_table};
use extradoc_model::{Block, Segment};
use rustc_hash::{FxHashMap, FxHashSet};

/// Call-local emission state.
pub(crate) struct EmitCtx<'a> {
    pub config: &'a Config,
    pub batches: Vec<Vec<MutationRecord>>,
    pub warnings: Vec<Warning>,
    /// Footnote ids created while walking the current tab, used to flag
    /// added footnote segments that nothing references.
    pub footnotes_created: FxHashSet<String>,
}

impl<'a> EmitCtx<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            batches: Vec::new(),
            warnings: Vec::new(),
            footnotes_created: FxHashSet::default(),
        }
    }

    /// Append a record to a batch and return its index within that batch
    /// (the placeholder coordinate).
    pub fn push(&mut self, batch: usize, record: MutationRecord) -> Result<usize> {
        if batch >= self.config.max_batches {
            return Err(Error::BatchLimitExceeded {
                limit: self.config.max_batches,
            });
        }
        while self.batches.len() <= batch {
            self.batches.push(Vec::new());
        }
        let index = self.batches[batch].len();
        self.batches[batch].push(record);
        Ok(index)
    }

    pub fn warn(&mut self, kind: WarningKind, path: &str, message: impl Into<String>) {
        self.warnings.push(Warning::new(kind, path, message));
    }

    /// Close out the call: drop trailing empty batches.
    pub fn finish(mut self) -> (Vec<Batch>, Vec<Warning>) {
        while self.batches.last().is_some_and(Vec::is_empty) {
            self.batches.pop();
        }
        let batches = self
            .batches
            .into_iter()
            .map(|requests| Batch { requests })
            .collect();
        (batches, self.warnings)
    }
}

/// Per-tab lookup state for footnote creation.
pub(crate) struct TabCtx<'a> {
    pub tab_id: Id,
    pub tab_path: String,
    pub pristine_footnote_ids: FxHashSet<String>,
    pub current_footnotes: FxHashMap<String, &'a Segment>,
}

/// One emission frame: a segment, or a cell acting as a mini-segment.
///
/// `shift` maps pristine-annotated coordinates to execution-time ones (cells
/// move when columns to their left are deleted; populated cells start from a
/// synthetic zero-based annotation). `end` and `content_start` are in
/// execution-time coordinates.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub tab_id: Id,
    pub segment_id: Id,
    pub batch: usize,
    pub shift: i64,
    pub end: u32,
    pub content_start: u32,
    pub consumed: bool,
    pub path: String,
}

impl Frame {
    pub fn map(&self, annotated: u32) -> u32 {
        (i64::from(annotated) + self.shift) as u32
    }

    pub fn location(&self, index: u32) -> Location {
        Location {
            index,
            segment_id: self.segment_id.clone(),
            tab_id: self.tab_id.clone(),
        }
    }

    pub fn range(&self, start: u32, end: u32) -> Range {
        Range {
            start,
            end,
            segment_id: self.segment_id.clone(),
            tab_id: self.tab_id.clone(),
        }
    }
}

/// Diff two block lists sharing one index space and emit the resulting
/// records into the frame's batch, highest pristine position first.
pub(crate) fn diff_blocks(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    pristine: &[Block],
    current: &[Block],
    frame: &mut Frame,
) -> Result<()> {
    let alignment = align_blocks(pristine, current);
    let changes = change::build_changes(&alignment, pristine, current);
    if changes.is_empty() {
        return Ok(());
    }
    tracing::debug!(
        path = %frame.path,
        changes = changes.len(),
        batch = frame.batch,
        "emitting segment changes"
    );

    // Deletions that run contiguously to the segment end coalesce into one
    // range; handling them block-by-block would either touch the sentinel
    // or strand empty paragraphs.
    let chain_at = trailing_deleted_chain(&changes, frame);
    if let Some(first) = chain_at {
        emit_trailing_chain(ctx, &changes[first..], pristine, frame)?;
    }
    let head = chain_at.unwrap_or(changes.len());

    for node in changes[..head].iter().rev() {
        match node {
            BlockChange::Content(c) => match c.op {
                ChangeOp::Added => emit_content::added(ctx, tab, frame, c)?,
                ChangeOp::Deleted => emit_content::deleted(ctx, frame, c)?,
                ChangeOp::Modified => emit_content::modified(ctx, tab, frame, c)?,
            },
            BlockChange::Table(t) => match t.op {
                ChangeOp::Added => emit_table::added(ctx, tab, frame, t)?,
                ChangeOp::Deleted => emit_table::deleted(ctx, frame, t)?,
                ChangeOp::Modified => emit_table::modified(ctx, tab, frame, t)?,
            },
            BlockChange::SectionBreak { op, pristine_start, .. } => {
                if ctx.config.strict_section_breaks {
                    return Err(Error::unsupported(
                        &frame.path,
                        format!("structural change ({:?}) touches a section break", op),
                    ));
                }
                // Non-strict mode skips silently by contract.
                tracing::debug!(
                    path = %frame.path,
                    at = pristine_start,
                    "skipping section break change"
                );
            }
            BlockChange::Toc {
                op,
                pristine_start,
                pristine_end,
                ..
            } => {
                if *op == ChangeOp::Deleted {
                    let start = frame.map(*pristine_start);
                    let end = frame.map(*pristine_end);
                    push_interior_delete(ctx, frame, start, end)?;
                } else {
                    ctx.warn(
                        WarningKind::TocSkipped,
                        &frame.path,
                        "table of contents is read-only; change skipped",
                    );
                }
            }
        }
    }
    Ok(())
}

/// Index of the first change of the maximal suffix of deletions contiguous
/// up to the frame end, if any.
fn trailing_deleted_chain(changes: &[BlockChange], frame: &Frame) -> Option<usize> {
    let mut first = None;
    let mut bound = frame.end;
    for (i, node) in changes.iter().enumerate().rev() {
        let deleted = match node {
            BlockChange::Content(c) => c.op == ChangeOp::Deleted,
            BlockChange::Table(t) => t.op == ChangeOp::Deleted,
            BlockChange::Toc { op, .. } => *op == ChangeOp::Deleted,
            BlockChange::SectionBreak { .. } => false,
        };
        if !deleted {
            break;
        }
        let (start, end) = match node {
            BlockChange::Content(c) => (c.pristine_start, c.pristine_end),
            BlockChange::Table(t) => (t.pristine_start, t.pristine_end),
            BlockChange::Toc {
                pristine_start,
                pristine_end,
                ..
            } => (*pristine_start, *pristine_end),
            BlockChange::SectionBreak { .. } => unreachable!(),
        };
        if frame.map(end) != bound {
            break;
        }
        bound = frame.map(start);
        first = Some(i);
    }
    first
}

/// Emit one coalesced delete for a trailing chain of deleted blocks.
///
/// The sentinel survives; when a paragraph precedes the chain its
/// terminator is consumed instead, so the sentinel terminates that
/// paragraph. When a table (or the segment start) precedes the chain the
/// leftover empty paragraph is either required there or replaced by a
/// later insert, which the lowered `frame.end` turns into an at-end
/// insert.
fn emit_trailing_chain(
    ctx: &mut EmitCtx<'_>,
    chain: &[BlockChange],
    pristine: &[Block],
    frame: &mut Frame,
) -> Result<()> {
    let first = chain.first().expect("chain is non-empty");
    let start_annotated = first.pristine_start();
    let start = frame.map(start_annotated);

    for node in chain {
        warn_chain_footnotes(ctx, node, frame);
    }

    let donor_paragraph = pristine
        .iter()
        .find(|b| b.end_index() == start_annotated)
        .is_some_and(|b| matches!(b, Block::Paragraph(_)));
    let delete_start = if donor_paragraph && start > frame.content_start {
        start - 1
    } else {
        start
    };

    if delete_start < frame.end - 1 {
        ctx.push(
            frame.batch,
            MutationRecord::DeleteRange {
                range: frame.range(delete_start, frame.end - 1),
            },
        )?;
    }
    frame.end = start;
    Ok(())
}

fn warn_chain_footnotes(ctx: &mut EmitCtx<'_>, node: &BlockChange, frame: &Frame) {
    match node {
        BlockChange::Content(c) => {
            for pair in &c.pairs {
                if let Some(before) = &pair.before {
                    crate::emit_content::warn_dropped_footnotes(ctx, before, &frame.path);
                }
            }
        }
        BlockChange::Table(t) => {
            if let Some(before) = &t.before {
                for row in &before.rows {
                    for cell in &row.cells {
                        crate::emit_table::warn_footnotes_in_blocks(ctx, &cell.blocks, &frame.path);
                    }
                }
            }
        }
        _ => {}
    }
}

/// Emit a delete strictly inside the frame. Reaching the sentinel here
/// means the trailing-chain detection missed a case, which is a bug.
pub(crate) fn push_interior_delete(
    ctx: &mut EmitCtx<'_>,
    frame: &Frame,
    start: u32,
    end: u32,
) -> Result<()> {
    if end >= frame.end {
        return Err(Error::invariant(
            &frame.path,
            format!(
                "interior delete [{}, {}) reaches the segment end {}",
                start, end, frame.end
            ),
        ));
    }
    if start >= end {
        return Ok(());
    }
    ctx.push(
        frame.batch,
        MutationRecord::DeleteRange {
            range: frame.range(start, end),
        },
    )?;
    Ok(())
}

/// Emit the delete half of a group replacement. The range may reach the
/// frame end; its end then clamps to the sentinel, which the replacement
/// insert re-uses as its final terminator (the caller strips accordingly).
/// A range that collapses after clamping emits nothing.
pub(crate) fn push_replacement_delete(
    ctx: &mut EmitCtx<'_>,
    frame: &mut Frame,
    start: u32,
    end: u32,
) -> Result<()> {
    let mut end = end;
    let clamped = end >= frame.end;
    if clamped {
        end = frame.end - 1;
    }
    if start < end {
        ctx.push(
            frame.batch,
            MutationRecord::DeleteRange {
                range: frame.range(start, end),
            },
        )?;
    }
    if clamped {
        // The region above `start` is gone; later inserts at the old end
        // cannot occur, and an insert exactly at `start` must not get the
        // at-end treatment (the replacement re-fills this region first).
        frame.end = start + 1;
    }
    Ok(())
}
