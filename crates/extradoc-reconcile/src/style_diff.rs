/*
 * style_diff.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Minimal property/field-mask diffs for text, paragraph, and cell styles.
 *
 * A property appears in the mask when the two sides disagree; the payload
 * carries the new value, and a masked property with no payload value is a
 * clear. Font family and weight travel together under weightedFontFamily.
 */

use crate::error::{Error, Result};
use extradoc_model::{CellStyle, Inline, Paragraph, ParagraphStyle, TextStyle, utf16_len};

/// Field mask meaning "replace every property", used when normalizing
/// freshly inserted content that would otherwise inherit neighbor styling.
pub const ALL_FIELDS: &str = "*";

macro_rules! diff_field {
    ($before:expr, $after:expr, $out:expr, $fields:expr, $field:ident, $name:literal) => {
        if $before.$field != $after.$field {
            $out.$field = $after.$field.clone();
            $fields.push($name);
        }
    };
}

/// Diff two text styles. `None` when they are identical.
pub fn diff_text_style(before: &TextStyle, after: &TextStyle) -> Option<(TextStyle, String)> {
    let mut out = TextStyle::default();
    let mut fields: Vec<&str> = Vec::new();

    diff_field!(before, after, out, fields, bold, "bold");
    diff_field!(before, after, out, fields, italic, "italic");
    diff_field!(before, after, out, fields, underline, "underline");
    diff_field!(before, after, out, fields, strikethrough, "strikethrough");
    diff_field!(before, after, out, fields, small_caps, "smallCaps");
    diff_field!(before, after, out, fields, baseline_offset, "baselineOffset");
    diff_field!(before, after, out, fields, font_size, "fontSize");
    diff_field!(before, after, out, fields, foreground_color, "foregroundColor");
    diff_field!(before, after, out, fields, background_color, "backgroundColor");
    diff_field!(before, after, out, fields, link, "link");

    // Family and weight share one wire property.
    if before.font_family != after.font_family || before.weight != after.weight {
        out.font_family = after.font_family.clone();
        out.weight = after.weight;
        fields.push("weightedFontFamily");
    }

    if fields.is_empty() {
        None
    } else {
        Some((out, fields.join(",")))
    }
}

/// Diff two paragraph styles. `None` when they are identical.
pub fn diff_paragraph_style(
    before: &ParagraphStyle,
    after: &ParagraphStyle,
) -> Option<(ParagraphStyle, String)> {
    let mut out = ParagraphStyle::default();
    let mut fields: Vec<&str> = Vec::new();

    diff_field!(before, after, out, fields, named_style_type, "namedStyleType");
    diff_field!(before, after, out, fields, alignment, "alignment");
    diff_field!(before, after, out, fields, line_spacing, "lineSpacing");
    diff_field!(before, after, out, fields, indent_start, "indentStart");
    diff_field!(before, after, out, fields, indent_first_line, "indentFirstLine");
    diff_field!(before, after, out, fields, space_above, "spaceAbove");
    diff_field!(before, after, out, fields, space_below, "spaceBelow");

    if fields.is_empty() {
        None
    } else {
        Some((out, fields.join(",")))
    }
}

/// Diff two cell styles. `None` when they are identical.
pub fn diff_cell_style(before: &CellStyle, after: &CellStyle) -> Option<(CellStyle, String)> {
    let mut out = CellStyle::default();
    let mut fields: Vec<&str> = Vec::new();

    diff_field!(before, after, out, fields, background_color, "backgroundColor");
    diff_field!(before, after, out, fields, content_alignment, "contentAlignment");

    if fields.is_empty() {
        None
    } else {
        Some((out, fields.join(",")))
    }
}

/// A run-style update over a text-coordinate range of a paragraph.
///
/// Text coordinates count run characters only (inline specials excluded);
/// the caller maps them back into layout coordinates for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyleDiff {
    pub start: u32,
    pub end: u32,
    pub style: TextStyle,
    pub fields: String,
}

/// Walk a matched paragraph pair run by run and produce the minimal set of
/// style updates. Contiguous slices with identical diffs merge.
///
/// Both sides must carry the same run text; anything else means the
/// upstream alignment matched the wrong pair, which is a bug, not an input
/// condition.
pub fn diff_run_styles(before: &Paragraph, after: &Paragraph, path: &str) -> Result<Vec<RunStyleDiff>> {
    let before_slices = text_slices(before);
    let after_slices = text_slices(after);

    let before_len = before_slices.last().map_or(0, |s| s.1);
    let after_len = after_slices.last().map_or(0, |s| s.1);
    if before_len != after_len {
        return Err(Error::invariant(
            path,
            format!(
                "run style diff on mismatched text ({} vs {} units)",
                before_len, after_len
            ),
        ));
    }

    let mut diffs: Vec<RunStyleDiff> = Vec::new();
    let mut bi = 0;
    let mut ai = 0;
    let mut at = 0u32;

    while bi < before_slices.len() && ai < after_slices.len() {
        let (bs, be, bstyle) = &before_slices[bi];
        let (as_, ae, astyle) = &after_slices[ai];
        debug_assert!(at >= *bs && at >= *as_);

        let end = (*be).min(*ae);
        if let Some((style, fields)) = diff_text_style(bstyle, astyle) {
            let merges = matches!(
                diffs.last(),
                Some(prev) if prev.end == at && prev.style == style && prev.fields == fields
            );
            if merges {
                diffs.last_mut().expect("diff checked above").end = end;
            } else {
                diffs.push(RunStyleDiff {
                    start: at,
                    end,
                    style,
                    fields,
                });
            }
        }
        at = end;
        if *be == end {
            bi += 1;
        }
        if *ae == end {
            ai += 1;
        }
    }

    Ok(diffs)
}

/// Run slices of a paragraph in text-only coordinates: `(start, end, style)`
/// with specials contributing no width.
fn text_slices(para: &Paragraph) -> Vec<(u32, u32, TextStyle)> {
    let mut slices = Vec::new();
    let mut at = 0u32;
    for inline in &para.content {
        if let Inline::Run(run) = inline {
            let len = utf16_len(&run.text);
            if len > 0 {
                slices.push((at, at + len, run.style.clone()));
                at += len;
            }
        }
    }
    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use extradoc_model::{ParagraphTag, TextRun};

    fn para_runs(runs: &[(&str, TextStyle)]) -> Paragraph {
        Paragraph {
            tag: ParagraphTag::Normal,
            content: runs
                .iter()
                .map(|(text, style)| {
                    Inline::Run(TextRun {
                        text: text.to_string(),
                        style: style.clone(),
                    })
                })
                .collect(),
            style: ParagraphStyle::default(),
            bullet: None,
            start_index: 0,
            end_index: 0,
        }
    }

    fn bold() -> TextStyle {
        TextStyle {
            bold: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_style_diff_minimal_mask() {
        let before = TextStyle {
            bold: Some(true),
            italic: Some(true),
            ..Default::default()
        };
        let after = TextStyle {
            bold: Some(true),
            font_size: Some(14.0),
            ..Default::default()
        };
        let (style, fields) = diff_text_style(&before, &after).unwrap();
        assert_eq!(fields, "italic,fontSize");
        assert_eq!(style.italic, None); // cleared
        assert_eq!(style.font_size, Some(14.0));
        assert_eq!(style.bold, None); // untouched, not in mask
    }

    #[test]
    fn test_identical_styles_diff_to_none() {
        assert!(diff_text_style(&bold(), &bold()).is_none());
        assert!(diff_paragraph_style(&ParagraphStyle::default(), &ParagraphStyle::default()).is_none());
    }

    #[test]
    fn test_font_family_and_weight_share_mask_entry() {
        let before = TextStyle::default();
        let after = TextStyle {
            font_family: Some("Arial".to_string()),
            weight: Some(700),
            ..Default::default()
        };
        let (style, fields) = diff_text_style(&before, &after).unwrap();
        assert_eq!(fields, "weightedFontFamily");
        assert_eq!(style.font_family.as_deref(), Some("Arial"));
        assert_eq!(style.weight, Some(700));
    }

    #[test]
    fn test_run_diff_merges_identical_adjacent() {
        // Before: one plain run. After: the same text split into two runs,
        // both bold. One merged update should come out.
        let before = para_runs(&[("hello world", TextStyle::default())]);
        let after = para_runs(&[("hello ", bold()), ("world", bold())]);
        let diffs = diff_run_styles(&before, &after, "test").unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!((diffs[0].start, diffs[0].end), (0, 11));
        assert_eq!(diffs[0].fields, "bold");
    }

    #[test]
    fn test_run_diff_splits_on_different_changes() {
        let before = para_runs(&[("aaabbb", TextStyle::default())]);
        let after = para_runs(&[("aaa", bold()), ("bbb", TextStyle::default())]);
        let diffs = diff_run_styles(&before, &after, "test").unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!((diffs[0].start, diffs[0].end), (0, 3));
    }

    #[test]
    fn test_run_diff_rejects_mismatched_text() {
        let before = para_runs(&[("short", TextStyle::default())]);
        let after = para_runs(&[("longer text", TextStyle::default())]);
        let err = diff_run_styles(&before, &after, "test").unwrap_err();
        assert!(matches!(err, Error::IndexInvariant { .. }));
    }
}
