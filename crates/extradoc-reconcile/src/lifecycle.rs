/*
 * lifecycle.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Segment and tab lifecycle: creation, deletion, and the deferred-id batch
 * partitioning that goes with them.
 *
 * A creator request (header, footer, footnote, tab) lands in batch N; the
 * requests that populate the created segment land in batch N + 1 and carry
 * a placeholder pointing at the creator's reply slot. Iteration order is
 * fixed (tabs in strip order, then per tab: body, headers, footers, and
 * footnotes sorted by id) so placeholder coordinates are reproducible
 * across runs.
 */

use crate::error::{Result, WarningKind};
use crate::requests::{HeaderFooterKind, Id, MutationRecord, Placeholder};
use crate::tree;
use crate::walk::{EmitCtx, Frame, TabCtx, diff_blocks};
use extradoc_model::{
    Block, Document, Segment, SegmentKind, SectionBreak, Tab, assign_segment_indices,
};
use rustc_hash::{FxHashMap, FxHashSet};

/// Diff two documents, filling the context's batches.
pub(crate) fn diff_document(
    ctx: &mut EmitCtx<'_>,
    pristine: &Document,
    current: &Document,
) -> Result<()> {
    let pristine_tabs: FxHashMap<&str, &Tab> =
        pristine.tabs.iter().map(|t| (t.id.as_str(), t)).collect();
    let current_ids: FxHashSet<&str> = current.tabs.iter().map(|t| t.id.as_str()).collect();

    for (pos, ctab) in current.tabs.iter().enumerate() {
        match pristine_tabs.get(ctab.id.as_str()) {
            Some(ptab) => diff_tab(ctx, ptab, ctab)?,
            None => added_tab(ctx, ctab, pos)?,
        }
    }

    for ptab in &pristine.tabs {
        if !current_ids.contains(ptab.id.as_str()) {
            ctx.push(
                0,
                MutationRecord::DeleteTab {
                    tab_id: Id::literal(&ptab.id),
                },
            )?;
        }
    }

    Ok(())
}

fn tab_ctx<'a>(tab_id: Id, pristine: Option<&Tab>, current: &'a Tab) -> TabCtx<'a> {
    TabCtx {
        tab_id,
        tab_path: current.id.clone(),
        pristine_footnote_ids: pristine
            .map(|t| t.footnotes.iter().map(|s| s.id.clone()).collect())
            .unwrap_or_default(),
        current_footnotes: current
            .footnotes
            .iter()
            .map(|s| (s.id.clone(), s))
            .collect(),
    }
}

/// Diff a tab that exists on both sides.
fn diff_tab(ctx: &mut EmitCtx<'_>, pristine: &Tab, current: &Tab) -> Result<()> {
    let tab_id = Id::literal(&current.id);
    tracing::debug!(tab = %current.id, "diffing tab");

    if pristine.title != current.title {
        ctx.push(
            0,
            MutationRecord::UpdateTabProperties {
                tab_id: tab_id.clone(),
                title: current.title.clone(),
                fields: "title".to_string(),
            },
        )?;
    }

    let tab = tab_ctx(tab_id.clone(), Some(pristine), current);
    ctx.footnotes_created.clear();

    // Body.
    let mut frame = segment_frame(&tab, Id::body(), &pristine.body, 0, format!("{}/body", current.id));
    diff_blocks(ctx, &tab, &pristine.body.blocks, &current.body.blocks, &mut frame)?;

    // Headers and footers, matched by id (both sides sorted already).
    diff_header_footer_group(
        ctx,
        &tab,
        &pristine.headers,
        &current.headers,
        SegmentKind::Header,
    )?;
    diff_header_footer_group(
        ctx,
        &tab,
        &pristine.footers,
        &current.footers,
        SegmentKind::Footer,
    )?;

    // Footnotes existing on both sides are ordinary segment diffs. Added
    // footnotes are reached through the references that create them;
    // pristine-only footnotes die with their references.
    for cseg in &current.footnotes {
        if let Some(pseg) = pristine.footnotes.iter().find(|s| s.id == cseg.id) {
            let mut frame = segment_frame(
                &tab,
                Id::literal(&cseg.id),
                pseg,
                0,
                format!("{}/footnote[{}]", current.id, cseg.id),
            );
            diff_blocks(ctx, &tab, &pseg.blocks, &cseg.blocks, &mut frame)?;
        }
    }

    warn_unreferenced_footnotes(ctx, pristine, current);
    Ok(())
}

fn warn_unreferenced_footnotes(ctx: &mut EmitCtx<'_>, pristine: &Tab, current: &Tab) {
    for cseg in &current.footnotes {
        let existed = pristine.footnotes.iter().any(|s| s.id == cseg.id);
        if !existed && !ctx.footnotes_created.contains(&cseg.id) {
            ctx.warn(
                WarningKind::FootnoteUnreferenced,
                &format!("{}/footnote[{}]", current.id, cseg.id),
                "added footnote has no reference; content unreachable",
            );
        }
    }
}

fn diff_header_footer_group(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    pristine: &[Segment],
    current: &[Segment],
    kind: SegmentKind,
) -> Result<()> {
    let noun = match kind {
        SegmentKind::Header => "header",
        SegmentKind::Footer => "footer",
        _ => unreachable!("group diff is for headers and footers"),
    };

    for cseg in current {
        let path = format!("{}/{}[{}]", tab.tab_path, noun, cseg.id);
        match pristine.iter().find(|s| s.id == cseg.id) {
            Some(pseg) => {
                let mut frame = segment_frame(tab, Id::literal(&cseg.id), pseg, 0, path);
                diff_blocks(ctx, tab, &pseg.blocks, &cseg.blocks, &mut frame)?;
            }
            None => {
                create_header_footer(ctx, tab, cseg, kind, 0, path)?;
            }
        }
    }

    for pseg in pristine {
        if !current.iter().any(|s| s.id == pseg.id) {
            let record = match kind {
                SegmentKind::Header => MutationRecord::DeleteHeader {
                    header_id: Id::literal(&pseg.id),
                    tab_id: tab.tab_id.clone(),
                },
                _ => MutationRecord::DeleteFooter {
                    footer_id: Id::literal(&pseg.id),
                    tab_id: tab.tab_id.clone(),
                },
            };
            ctx.push(0, record)?;
        }
    }

    Ok(())
}

/// Emit the creator for a header/footer in `batch` and populate it one
/// batch later through a placeholder.
fn create_header_footer(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    segment: &Segment,
    kind: SegmentKind,
    batch: usize,
    path: String,
) -> Result<()> {
    let (record, response_path) = match kind {
        SegmentKind::Header => (
            MutationRecord::CreateHeader {
                kind: HeaderFooterKind::Default,
                tab_id: tab.tab_id.clone(),
                section_break_location: None,
            },
            "header.headerId",
        ),
        _ => (
            MutationRecord::CreateFooter {
                kind: HeaderFooterKind::Default,
                tab_id: tab.tab_id.clone(),
                section_break_location: None,
            },
            "footer.footerId",
        ),
    };
    let request_index = ctx.push(batch, record)?;
    let segment_id = Id::Placeholder(Placeholder {
        batch_index: batch,
        request_index,
        response_path: response_path.to_string(),
    });
    populate_new_segment(
        ctx,
        tab,
        &segment.blocks,
        segment_id,
        tab.tab_id.clone(),
        batch + 1,
        path,
    )
}

/// A brand-new tab: creator in batch 0, contents one batch deeper under a
/// placeholder tab id.
fn added_tab(ctx: &mut EmitCtx<'_>, current: &Tab, position: usize) -> Result<()> {
    tracing::debug!(tab = %current.id, "creating tab");
    let request_index = ctx.push(
        0,
        MutationRecord::AddTab {
            index: position as u32,
            title: current.title.clone(),
        },
    )?;
    let tab_id = Id::Placeholder(Placeholder {
        batch_index: 0,
        request_index,
        response_path: "tab.tabProperties.tabId".to_string(),
    });

    let tab = tab_ctx(tab_id.clone(), None, current);
    ctx.footnotes_created.clear();

    // A fresh tab's body holds a section break and one empty paragraph.
    let mut initial_body = Segment {
        kind: SegmentKind::Body,
        id: String::new(),
        blocks: vec![
            Block::SectionBreak(SectionBreak::default()),
            tree::empty_paragraph(),
        ],
        segment_end: 0,
    };
    assign_segment_indices(&mut initial_body);
    let mut frame = segment_frame(
        &tab,
        Id::body(),
        &initial_body,
        1,
        format!("{}/body", current.id),
    );
    diff_blocks(ctx, &tab, &initial_body.blocks, &current.body.blocks, &mut frame)?;

    for hseg in &current.headers {
        let path = format!("{}/header[{}]", current.id, hseg.id);
        create_header_footer(ctx, &tab, hseg, SegmentKind::Header, 1, path)?;
    }
    for fseg in &current.footers {
        let path = format!("{}/footer[{}]", current.id, fseg.id);
        create_header_footer(ctx, &tab, fseg, SegmentKind::Footer, 1, path)?;
    }

    for cseg in &current.footnotes {
        if !ctx.footnotes_created.contains(&cseg.id) {
            ctx.warn(
                WarningKind::FootnoteUnreferenced,
                &format!("{}/footnote[{}]", current.id, cseg.id),
                "added footnote has no reference; content unreachable",
            );
        }
    }
    Ok(())
}

/// Populate a just-created segment: diff the server's initial state (a
/// single empty paragraph) against the desired content, one batch past the
/// creator.
pub(crate) fn populate_new_segment(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    blocks: &[Block],
    segment_id: Id,
    tab_id: Id,
    batch: usize,
    path: String,
) -> Result<()> {
    let mut initial = Segment {
        kind: SegmentKind::Footnote,
        id: String::new(),
        blocks: vec![tree::empty_paragraph()],
        segment_end: 0,
    };
    assign_segment_indices(&mut initial);

    let mut frame = Frame {
        tab_id,
        segment_id,
        batch,
        shift: 0,
        end: initial.segment_end,
        content_start: 0,
        consumed: false,
        path,
    };
    diff_blocks(ctx, tab, &initial.blocks, blocks, &mut frame)
}

/// Frame over an existing pristine segment.
fn segment_frame(
    tab: &TabCtx<'_>,
    segment_id: Id,
    pristine: &Segment,
    batch: usize,
    path: String,
) -> Frame {
    Frame {
        tab_id: tab.tab_id.clone(),
        segment_id,
        batch,
        shift: 0,
        end: pristine.segment_end,
        content_start: pristine.content_start(),
        consumed: false,
        path,
    }
}
