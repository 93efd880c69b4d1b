/*
 * emit_content.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Request generation for ContentBlock changes.
 *
 * Insertions are built as a payload: the text-only string (terminators and
 * bullet tabs included), insertable specials at their final offsets, and
 * style/bullet ranges over the final arrangement. Execution order within
 * one insertion is: text, specials highest-offset-first, run styles
 * right-to-left, paragraph styles right-to-left, bullets last (bullet
 * creation consumes the leading tabs that encode nesting).
 */

use crate::config::HorizontalRulePolicy;
use crate::error::{Error, Result, WarningKind};
use crate::lcs;
use crate::lifecycle;
use crate::requests::{Id, MutationRecord, Placeholder};
use crate::style_diff::{self, ALL_FIELDS};
use crate::walk::{EmitCtx, Frame, TabCtx, push_interior_delete, push_replacement_delete};
use crate::change::ContentChange;
use extradoc_model::{
    Bullet, Inline, Paragraph, ParagraphStyle, SpecialKind, TextStyle, utf16_len,
};

/// When to strip the trailing newline off an insertion payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StripMode {
    /// Keep the terminator: the inserted content replaces a fully deleted
    /// span or lands strictly inside the segment.
    None,
    /// Strip once if the insertion sits at the unconsumed frame end; the
    /// sentinel newline becomes the final terminator.
    AtFrameEnd,
    /// Always strip: the target paragraph keeps its existing terminator
    /// (interior replacement, clamped group replacement).
    Always,
}

/// A prepared insertion.
#[derive(Debug, Default)]
pub(crate) struct InsertionPayload {
    /// Text to insert, specials excluded, one `\n` per paragraph.
    pub text: String,
    /// Insertable specials at ascending final offsets.
    pub specials: Vec<(u32, SpecialKind)>,
    /// Merged run style ranges at final offsets.
    pub runs: Vec<(u32, u32, TextStyle)>,
    /// Paragraph spans at final offsets, terminators included.
    pub paras: Vec<ParaSpan>,
}

#[derive(Debug)]
pub(crate) struct ParaSpan {
    pub start: u32,
    pub end: u32,
    pub style: ParagraphStyle,
    pub bullet: Option<Bullet>,
}

/// Build the payload for a run of paragraphs.
///
/// Non-insertable specials are dropped here (with a warning) so that every
/// recorded offset matches what will actually exist in the document.
/// `bullet_tabs` controls the leading-tab nesting encoding, which is only
/// valid for paragraphs that do not exist yet.
pub(crate) fn build_payload<'a>(
    ctx: &mut EmitCtx<'_>,
    paras: impl Iterator<Item = &'a Paragraph>,
    bullet_tabs: bool,
    path: &str,
) -> Result<InsertionPayload> {
    let mut payload = InsertionPayload::default();
    let mut offset = 0u32;

    for para in paras {
        let start = offset;
        if bullet_tabs {
            if let Some(bullet) = &para.bullet {
                for _ in 0..bullet.level {
                    payload.text.push('\t');
                    offset += 1;
                }
            }
        }
        for inline in &para.content {
            match inline {
                Inline::Run(run) => {
                    let len = utf16_len(&run.text);
                    if len == 0 {
                        continue;
                    }
                    payload.runs.push((offset, offset + len, run.style.clone()));
                    payload.text.push_str(&run.text);
                    offset += len;
                }
                Inline::Special(kind) => {
                    if special_insertable(ctx, kind, path)? {
                        payload.specials.push((offset, kind.clone()));
                        offset += 1;
                    }
                }
            }
        }
        payload.text.push('\n');
        offset += 1;
        payload.paras.push(ParaSpan {
            start,
            end: offset,
            style: para.style.clone(),
            bullet: para.bullet.clone(),
        });
    }

    // Coalesce adjacent runs with identical styles.
    payload.runs.dedup_by(|next, prev| {
        if prev.1 == next.0 && prev.2 == next.2 {
            prev.1 = next.1;
            true
        } else {
            false
        }
    });

    Ok(payload)
}

/// Whether an inline special can be produced by a primitive request. The
/// unsupported kinds are dropped with a warning (or fail, for horizontal
/// rules under the error policy).
fn special_insertable(ctx: &mut EmitCtx<'_>, kind: &SpecialKind, path: &str) -> Result<bool> {
    match kind {
        SpecialKind::PageBreak | SpecialKind::FootnoteRef { .. } => Ok(true),
        SpecialKind::HorizontalRule => match ctx.config.horizontal_rule_policy {
            HorizontalRulePolicy::Error => Err(Error::unsupported(
                path,
                "horizontal rules cannot be inserted",
            )),
            HorizontalRulePolicy::Skip => {
                ctx.warn(
                    WarningKind::HorizontalRuleSkipped,
                    path,
                    "horizontal rule dropped from inserted content",
                );
                Ok(false)
            }
        },
        SpecialKind::ColumnBreak
        | SpecialKind::Equation
        | SpecialKind::Image { .. }
        | SpecialKind::Person { .. }
        | SpecialKind::Date { .. } => {
            ctx.warn(
                WarningKind::SpecialDropped,
                path,
                format!("{} has no insert primitive; dropped", special_name(kind)),
            );
            Ok(false)
        }
    }
}

fn special_name(kind: &SpecialKind) -> &'static str {
    match kind {
        SpecialKind::PageBreak => "page break",
        SpecialKind::ColumnBreak => "column break",
        SpecialKind::HorizontalRule => "horizontal rule",
        SpecialKind::Equation => "equation",
        SpecialKind::Image { .. } => "image",
        SpecialKind::Person { .. } => "person chip",
        SpecialKind::Date { .. } => "date chip",
        SpecialKind::FootnoteRef { .. } => "footnote reference",
    }
}

/// Emit one prepared insertion at `base`.
pub(crate) fn emit_insertion(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &mut Frame,
    base: u32,
    mut payload: InsertionPayload,
    strip: StripMode,
) -> Result<()> {
    let mut appended_at_end = false;
    match strip {
        StripMode::None => {}
        StripMode::AtFrameEnd => {
            if base == frame.end && !frame.consumed {
                let popped = payload.text.pop();
                debug_assert_eq!(popped, Some('\n'), "insertion payload must end with a terminator");
                frame.consumed = true;
                appended_at_end = true;
            }
        }
        StripMode::Always => {
            let popped = payload.text.pop();
            debug_assert_eq!(popped, Some('\n'), "insertion payload must end with a terminator");
        }
    }

    // An empty insert still matters at the frame end: it appends an empty
    // paragraph there. Anywhere else it is a no-op.
    if !payload.text.is_empty() || appended_at_end {
        ctx.push(
            frame.batch,
            MutationRecord::InsertText {
                location: frame.location(base),
                text: payload.text.clone(),
            },
        )?;
    }

    // Specials, highest offset first: indices inside the insertion stay
    // stable because everything below an emitted special is still text-only.
    for (i, (offset, kind)) in payload.specials.iter().enumerate().rev() {
        let index = base + offset - i as u32;
        emit_special(ctx, tab, frame, index, kind)?;
    }

    for (start, end, style) in payload.runs.iter().rev() {
        ctx.push(
            frame.batch,
            MutationRecord::UpdateTextStyle {
                range: frame.range(base + start, base + end),
                style: style.clone(),
                fields: ALL_FIELDS.to_string(),
            },
        )?;
    }

    for span in payload.paras.iter().rev() {
        ctx.push(
            frame.batch,
            MutationRecord::UpdateParagraphStyle {
                range: frame.range(base + span.start, base + span.end),
                style: span.style.clone(),
                fields: ALL_FIELDS.to_string(),
            },
        )?;
    }

    // Bullets: consecutive list items with the same preset form one create
    // request, right to left.
    let mut bullet_groups: Vec<(u32, u32, String)> = Vec::new();
    for span in &payload.paras {
        let Some(bullet) = &span.bullet else {
            continue;
        };
        let extends = matches!(
            bullet_groups.last(),
            Some((_, end, preset)) if *end == span.start && *preset == bullet.preset
        );
        if extends {
            bullet_groups.last_mut().expect("group checked above").1 = span.end;
        } else {
            bullet_groups.push((span.start, span.end, bullet.preset.clone()));
        }
    }
    for (start, end, preset) in bullet_groups.iter().rev() {
        ctx.push(
            frame.batch,
            MutationRecord::CreateBullets {
                range: frame.range(base + start, base + end),
                preset: preset.clone(),
            },
        )?;
    }

    Ok(())
}

/// Emit one insertable special at an absolute index.
fn emit_special(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &Frame,
    index: u32,
    kind: &SpecialKind,
) -> Result<()> {
    match kind {
        SpecialKind::PageBreak => {
            ctx.push(
                frame.batch,
                MutationRecord::InsertPageBreak {
                    location: frame.location(index),
                },
            )?;
            Ok(())
        }
        SpecialKind::FootnoteRef { id } => create_footnote(ctx, tab, frame, index, id),
        other => Err(Error::invariant(
            &frame.path,
            format!("{} survived payload filtering", special_name(other)),
        )),
    }
}

/// Emit the footnote creator and schedule the population of its segment in
/// the next batch, addressed through a placeholder id.
fn create_footnote(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &Frame,
    index: u32,
    id: &str,
) -> Result<()> {
    let request_index = ctx.push(
        frame.batch,
        MutationRecord::CreateFootnote {
            location: frame.location(index),
        },
    )?;
    if tab.pristine_footnote_ids.contains(id) {
        ctx.warn(
            WarningKind::FootnoteDropped,
            &frame.path,
            format!("footnote {:?} is re-created; its server-assigned id changes", id),
        );
    }
    ctx.footnotes_created.insert(id.to_string());

    let Some(segment) = tab.current_footnotes.get(id).copied() else {
        return Err(Error::malformed(
            &frame.path,
            format!("reference to unknown footnote {:?}", id),
        ));
    };

    let segment_id = Id::Placeholder(Placeholder {
        batch_index: frame.batch,
        request_index,
        response_path: "footnote.footnoteId".to_string(),
    });
    lifecycle::populate_new_segment(
        ctx,
        tab,
        &segment.blocks,
        segment_id,
        frame.tab_id.clone(),
        frame.batch + 1,
        format!("{}/footnote[{}]", tab.tab_path, id),
    )
}

/// ContentBlock(Added): insert at the recorded insertion point.
pub(crate) fn added(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &mut Frame,
    c: &ContentChange,
) -> Result<()> {
    let base = frame.map(c.pristine_start);
    let payload = build_payload(
        ctx,
        c.pairs
            .iter()
            .map(|p| p.after.as_ref().expect("added pair has a current side")),
        true,
        &frame.path,
    )?;
    emit_insertion(ctx, tab, frame, base, payload, StripMode::AtFrameEnd)
}

/// ContentBlock(Deleted): one clamped range delete.
pub(crate) fn deleted(ctx: &mut EmitCtx<'_>, frame: &mut Frame, c: &ContentChange) -> Result<()> {
    for pair in &c.pairs {
        let before = pair.before.as_ref().expect("deleted pair has a pristine side");
        warn_dropped_footnotes(ctx, before, &frame.path);
    }
    let start = frame.map(c.pristine_start);
    let end = frame.map(c.pristine_end);
    push_interior_delete(ctx, frame, start, end)
}

/// ContentBlock(Modified): fine-grained per-pair edits by default, wholesale
/// delete-then-insert when list identity need not be preserved.
pub(crate) fn modified(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &mut Frame,
    c: &ContentChange,
) -> Result<()> {
    if !ctx.config.preserve_list_identity {
        return replace_group(ctx, tab, frame, c);
    }
    for pair in c.pairs.iter().rev() {
        let before = pair.before.as_ref().expect("modified pair has a pristine side");
        let after = pair.after.as_ref().expect("modified pair has a current side");
        modify_pair(ctx, tab, frame, before, after)?;
    }
    Ok(())
}

/// Replace the whole group: delete its span, re-insert the current content
/// at the same pristine position. The delete comes first in request order,
/// which is also execution order.
fn replace_group(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &mut Frame,
    c: &ContentChange,
) -> Result<()> {
    let start = frame.map(c.pristine_start);
    let end = frame.map(c.pristine_end);
    let clamped = end >= frame.end;

    for pair in &c.pairs {
        if let Some(before) = &pair.before {
            warn_dropped_footnotes(ctx, before, &frame.path);
        }
    }
    push_replacement_delete(ctx, frame, start, end)?;

    let payload = build_payload(
        ctx,
        c.pairs
            .iter()
            .map(|p| p.after.as_ref().expect("modified pair has a current side")),
        true,
        &frame.path,
    )?;
    let strip = if clamped { StripMode::Always } else { StripMode::None };
    emit_insertion(ctx, tab, frame, start, payload, strip)
}

/// Inline specials of a paragraph in text-only coordinates.
fn special_positions(para: &Paragraph) -> Vec<(u32, SpecialKind)> {
    let mut at = 0u32;
    let mut out = Vec::new();
    for inline in &para.content {
        match inline {
            Inline::Run(run) => at += utf16_len(&run.text),
            Inline::Special(kind) => out.push((at, kind.clone())),
        }
    }
    out
}

pub(crate) fn warn_dropped_footnotes(ctx: &mut EmitCtx<'_>, para: &Paragraph, path: &str) {
    for kind in para.specials() {
        if let SpecialKind::FootnoteRef { id } = kind {
            ctx.warn(
                WarningKind::FootnoteDropped,
                path,
                format!("deleting the reference to footnote {:?} discards its content", id),
            );
        }
    }
}

/// A matched paragraph pair, edited in place.
fn modify_pair(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &mut Frame,
    before: &Paragraph,
    after: &Paragraph,
) -> Result<()> {
    let b_start = frame.map(before.start_index);
    let b_text = before.text();
    let a_text = after.text();
    let b_specials = special_positions(before);
    let a_specials = special_positions(after);

    if b_text == a_text {
        let matched = lcs::lcs_pairs(&b_specials, &a_specials);
        let added_ok = a_specials
            .iter()
            .enumerate()
            .filter(|(i, _)| !matched.iter().any(|(_, a)| a == i))
            .all(|(_, (_, kind))| {
                matches!(kind, SpecialKind::PageBreak | SpecialKind::FootnoteRef { .. })
            });
        if added_ok {
            return edit_pair_in_place(
                ctx, tab, frame, before, after, b_start, &b_specials, &a_specials, &matched,
            );
        }
    }

    replace_pair_interior(ctx, tab, frame, before, after, b_start)
}

/// Text identical: per-special edits plus style updates, all positions
/// descending so nothing shifts under an unemitted record.
#[allow(clippy::too_many_arguments)]
fn edit_pair_in_place(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &mut Frame,
    before: &Paragraph,
    after: &Paragraph,
    b_start: u32,
    b_specials: &[(u32, SpecialKind)],
    a_specials: &[(u32, SpecialKind)],
    matched: &[(usize, usize)],
) -> Result<()> {
    #[derive(Debug)]
    enum Edit<'k> {
        Delete { text_pos: u32, layout: u32 },
        Insert { text_pos: u32, layout: u32, kind: &'k SpecialKind },
    }

    let mut edits: Vec<Edit<'_>> = Vec::new();
    for (i, (text_pos, _)) in b_specials.iter().enumerate() {
        if !matched.iter().any(|(b, _)| *b == i) {
            // Pristine layout offset: text position plus the specials
            // before this one.
            edits.push(Edit::Delete {
                text_pos: *text_pos,
                layout: text_pos + i as u32,
            });
        }
    }
    for (i, (text_pos, kind)) in a_specials.iter().enumerate() {
        if !matched.iter().any(|(_, a)| *a == i) {
            // Everything below the insertion point is still pristine when
            // this edit executes, so count pristine specials below it, plus
            // surviving specials sharing the position that the current side
            // orders before this one.
            let pristine_before = b_specials.iter().filter(|(p, _)| p < text_pos).count();
            let ties_before = matched
                .iter()
                .filter(|(_, a)| *a < i && a_specials[*a].0 == *text_pos)
                .count();
            edits.push(Edit::Insert {
                text_pos: *text_pos,
                layout: text_pos + (pristine_before + ties_before) as u32,
                kind,
            });
        }
    }
    // Descending text position; at a tie the delete goes first so the
    // insert lands where the old special was.
    edits.sort_by(|a, b| {
        let (pa, da) = match a {
            Edit::Delete { text_pos, .. } => (*text_pos, 0),
            Edit::Insert { text_pos, .. } => (*text_pos, 1),
        };
        let (pb, db) = match b {
            Edit::Delete { text_pos, .. } => (*text_pos, 0),
            Edit::Insert { text_pos, .. } => (*text_pos, 1),
        };
        pb.cmp(&pa).then(da.cmp(&db))
    });

    for edit in edits {
        match edit {
            Edit::Delete { layout, .. } => {
                ctx.push(
                    frame.batch,
                    MutationRecord::DeleteRange {
                        range: frame.range(b_start + layout, b_start + layout + 1),
                    },
                )?;
            }
            Edit::Insert { layout, kind, .. } => {
                emit_special(ctx, tab, frame, b_start + layout, kind)?;
            }
        }
    }

    styles_after_edits(ctx, frame, before, after, b_start, a_specials)
}

/// Style updates over the settled (current-side) layout, plus paragraph
/// level diffs.
fn styles_after_edits(
    ctx: &mut EmitCtx<'_>,
    frame: &Frame,
    before: &Paragraph,
    after: &Paragraph,
    b_start: u32,
    a_specials: &[(u32, SpecialKind)],
) -> Result<()> {
    // Styles over the settled (current-side) layout. A text character at
    // position i lands at layout index i plus the specials at or below i.
    let layout_of = |text_pos: u32| -> u32 {
        text_pos + a_specials.iter().filter(|(p, _)| *p <= text_pos).count() as u32
    };
    for diff in style_diff::diff_run_styles(before, after, &frame.path)?.iter().rev() {
        let start = layout_of(diff.start);
        let end = layout_of(diff.end - 1) + 1;
        ctx.push(
            frame.batch,
            MutationRecord::UpdateTextStyle {
                range: frame.range(b_start + start, b_start + end),
                style: diff.style.clone(),
                fields: diff.fields.clone(),
            },
        )?;
    }

    let interior = utf16_len(&after.text()) + a_specials.len() as u32;
    if let Some((style, fields)) = style_diff::diff_paragraph_style(&before.style, &after.style) {
        ctx.push(
            frame.batch,
            MutationRecord::UpdateParagraphStyle {
                range: frame.range(b_start, b_start + interior + 1),
                style,
                fields,
            },
        )?;
    }
    emit_bullet_diff(ctx, frame, before, after, b_start, interior)
}

/// Text changed: replace the interior, keep the terminator.
fn replace_pair_interior(
    ctx: &mut EmitCtx<'_>,
    tab: &TabCtx<'_>,
    frame: &mut Frame,
    before: &Paragraph,
    after: &Paragraph,
    b_start: u32,
) -> Result<()> {
    let b_end = frame.map(before.end_index);
    warn_dropped_footnotes(ctx, before, &frame.path);
    if b_start < b_end - 1 {
        ctx.push(
            frame.batch,
            MutationRecord::DeleteRange {
                range: frame.range(b_start, b_end - 1),
            },
        )?;
    }

    let mut payload = build_payload(ctx, std::iter::once(after), false, &frame.path)?;
    let interior = payload
        .paras
        .last()
        .map_or(0, |span| span.end.saturating_sub(1));
    // Bullets belong to the surviving terminator; they are diffed below,
    // not blanket-replaced.
    payload.paras.clear();
    emit_insertion(ctx, tab, frame, b_start, payload, StripMode::Always)?;

    // Replaced interiors normalize the paragraph style outright: the new
    // content should carry exactly the current-side attributes, inherited
    // state included.
    ctx.push(
        frame.batch,
        MutationRecord::UpdateParagraphStyle {
            range: frame.range(b_start, b_start + interior + 1),
            style: after.style.clone(),
            fields: ALL_FIELDS.to_string(),
        },
    )?;

    emit_bullet_diff(ctx, frame, before, after, b_start, interior)
}

/// Bullet diff shared by both fine-grained paths. `interior` is the
/// current-side interior length in layout units.
fn emit_bullet_diff(
    ctx: &mut EmitCtx<'_>,
    frame: &Frame,
    before: &Paragraph,
    after: &Paragraph,
    b_start: u32,
    interior: u32,
) -> Result<()> {
    let para_range = frame.range(b_start, b_start + interior + 1);

    match (&before.bullet, &after.bullet) {
        (Some(b), Some(a)) if b == a => {}
        (Some(b), Some(a)) => {
            if b.level != a.level {
                ctx.warn(
                    WarningKind::BulletNestingUnsupported,
                    &frame.path,
                    "nesting level changes on existing list items are not supported",
                );
            }
            if b.preset != a.preset {
                ctx.push(
                    frame.batch,
                    MutationRecord::CreateBullets {
                        range: para_range,
                        preset: a.preset.clone(),
                    },
                )?;
            }
        }
        (Some(_), None) => {
            ctx.push(
                frame.batch,
                MutationRecord::DeleteBullets { range: para_range },
            )?;
        }
        (None, Some(a)) => {
            if a.level > 0 {
                ctx.warn(
                    WarningKind::BulletNestingUnsupported,
                    &frame.path,
                    "bullet added to an existing paragraph starts at nesting level 0",
                );
            }
            ctx.push(
                frame.batch,
                MutationRecord::CreateBullets {
                    range: para_range,
                    preset: a.preset.clone(),
                },
            )?;
        }
        (None, None) => {}
    }

    Ok(())
}
