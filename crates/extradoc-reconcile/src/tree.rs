/*
 * tree.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Block tree builder: flat-XML snapshot to typed Document.
 *
 * Both snapshots go through here. Pristine trees are annotated with
 * segment-coordinate indices afterwards via [`annotate`]; current trees are
 * not (current-side indices are never used).
 */

use crate::error::{Error, Result};
use extradoc_model::{
    BaselineOffset, Block, Bullet, CellStyle, Column, ContentAlignment, Document, Inline,
    Paragraph, ParagraphStyle, ParagraphTag, SectionBreak, Segment, SegmentKind, SpecialKind,
    StyleTable, Tab, Table, TableCell, TableRow, TextRun, TextStyle, Toc, assign_segment_indices,
};
use extradoc_xml::{XmlElement, XmlNode};
use rustc_hash::FxHashSet;

/// Parse a snapshot into a typed document.
///
/// Legacy single-tab snapshots (segments directly under `<doc>`) are
/// wrapped in a synthetic tab with id `t.0`. Structural identifier
/// uniqueness is enforced here; violations are `MalformedInput`.
pub fn parse_document(xml: &str, styles: &StyleTable) -> Result<Document> {
    let root = extradoc_xml::parse(xml)?;
    if root.name != "doc" {
        return Err(Error::malformed(
            "doc",
            format!("root element must be <doc>, found <{}>", root.name),
        ));
    }

    let children = root.child_elements();
    let has_tabs = children.iter().any(|e| e.name == "tab");

    let mut tabs = Vec::new();
    let mut tab_ids = FxHashSet::default();

    if has_tabs {
        for child in &children {
            if child.name != "tab" {
                return Err(Error::malformed(
                    "doc",
                    format!("unexpected <{}> next to <tab> elements", child.name),
                ));
            }
            let tab = parse_tab(child, styles)?;
            if !tab_ids.insert(tab.id.clone()) {
                return Err(Error::malformed("doc", format!("duplicate tab id {:?}", tab.id)));
            }
            tabs.push(tab);
        }
    } else {
        // Legacy single-tab document: wrap in a synthetic tab.
        let tab = parse_tab_segments(&root, "t.0", None, styles)?;
        tabs.push(tab);
    }

    if tabs.is_empty() {
        return Err(Error::malformed("doc", "document has no tabs"));
    }

    Ok(Document { tabs })
}

/// Assign pristine indices to every segment of the document.
pub fn annotate(document: &mut Document) {
    for tab in &mut document.tabs {
        assign_segment_indices(&mut tab.body);
        for segment in tab
            .headers
            .iter_mut()
            .chain(tab.footers.iter_mut())
            .chain(tab.footnotes.iter_mut())
        {
            assign_segment_indices(segment);
        }
    }
}

fn parse_tab(el: &XmlElement, styles: &StyleTable) -> Result<Tab> {
    let id = el
        .attr("id")
        .ok_or_else(|| Error::malformed("doc", "tab missing id attribute"))?;
    let title = el.attr("title").map(str::to_string);
    parse_tab_segments(el, id, title, styles)
}

fn parse_tab_segments(
    el: &XmlElement,
    tab_id: &str,
    title: Option<String>,
    styles: &StyleTable,
) -> Result<Tab> {
    let mut body = None;
    let mut headers = Vec::new();
    let mut footers = Vec::new();
    let mut footnotes = Vec::new();
    let mut seen_ids = FxHashSet::default();

    for child in el.child_elements() {
        match child.name.as_str() {
            "body" => {
                if body.is_some() {
                    return Err(Error::malformed(tab_id, "more than one <body>"));
                }
                body = Some(parse_segment(child, SegmentKind::Body, String::new(), tab_id, styles)?);
            }
            "header" | "footer" | "footnote" => {
                let kind = match child.name.as_str() {
                    "header" => SegmentKind::Header,
                    "footer" => SegmentKind::Footer,
                    _ => SegmentKind::Footnote,
                };
                let id = child.attr("id").ok_or_else(|| {
                    Error::malformed(tab_id, format!("<{}> missing id attribute", child.name))
                })?;
                if !seen_ids.insert((child.name.clone(), id.to_string())) {
                    return Err(Error::malformed(
                        tab_id,
                        format!("duplicate {} id {:?}", child.name, id),
                    ));
                }
                let segment = parse_segment(child, kind, id.to_string(), tab_id, styles)?;
                match kind {
                    SegmentKind::Header => headers.push(segment),
                    SegmentKind::Footer => footers.push(segment),
                    _ => footnotes.push(segment),
                }
            }
            other => {
                return Err(Error::malformed(
                    tab_id,
                    format!("unexpected <{}> inside tab", other),
                ));
            }
        }
    }

    let body = body.ok_or_else(|| Error::malformed(tab_id, "tab has no <body>"))?;

    // Deterministic segment order for the walk and for placeholder indices.
    headers.sort_by(|a, b| a.id.cmp(&b.id));
    footers.sort_by(|a, b| a.id.cmp(&b.id));
    footnotes.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Tab {
        id: tab_id.to_string(),
        title,
        body,
        headers,
        footers,
        footnotes,
    })
}

fn parse_segment(
    el: &XmlElement,
    kind: SegmentKind,
    id: String,
    tab_id: &str,
    styles: &StyleTable,
) -> Result<Segment> {
    let path = segment_path(tab_id, kind, &id);
    let mut blocks = Vec::new();

    for node in &el.children {
        match node {
            XmlNode::Text(t) => {
                if !t.trim().is_empty() {
                    return Err(Error::malformed(&path, "bare text between blocks"));
                }
            }
            XmlNode::Element(child) => {
                blocks.push(parse_block(child, &path, styles)?);
            }
        }
    }

    if kind == SegmentKind::Body && !matches!(blocks.first(), Some(Block::SectionBreak(_))) {
        // The implicit section break at body index 0 may be elided in the
        // snapshot; materialize it so both sides agree on coordinates.
        blocks.insert(0, Block::SectionBreak(SectionBreak::default()));
    }

    match blocks.last() {
        Some(Block::Paragraph(_)) => {}
        Some(_) => {
            return Err(Error::malformed(&path, "segment must end with a paragraph"));
        }
        None => return Err(Error::malformed(&path, "segment has no blocks")),
    }

    Ok(Segment {
        kind,
        id,
        blocks,
        segment_end: 0,
    })
}

fn segment_path(tab_id: &str, kind: SegmentKind, id: &str) -> String {
    match kind {
        SegmentKind::Body => format!("{}/body", tab_id),
        SegmentKind::Header => format!("{}/header[{}]", tab_id, id),
        SegmentKind::Footer => format!("{}/footer[{}]", tab_id, id),
        SegmentKind::Footnote => format!("{}/footnote[{}]", tab_id, id),
    }
}

fn parse_block(el: &XmlElement, path: &str, styles: &StyleTable) -> Result<Block> {
    match el.name.as_str() {
        "sb" => Ok(Block::SectionBreak(SectionBreak::default())),
        "toc" => Ok(Block::Toc(Toc {
            raw: el.text(),
            start_index: 0,
            end_index: 0,
        })),
        "table" => Ok(Block::Table(parse_table(el, path, styles)?)),
        "p" | "title" | "subtitle" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            Ok(Block::Paragraph(parse_paragraph(el, path, styles)?))
        }
        other => Err(Error::malformed(
            path,
            format!("unknown block element <{}>", other),
        )),
    }
}

fn paragraph_tag(name: &str) -> ParagraphTag {
    match name {
        "title" => ParagraphTag::Title,
        "subtitle" => ParagraphTag::Subtitle,
        "li" => ParagraphTag::ListItem,
        "h1" => ParagraphTag::Heading(1),
        "h2" => ParagraphTag::Heading(2),
        "h3" => ParagraphTag::Heading(3),
        "h4" => ParagraphTag::Heading(4),
        "h5" => ParagraphTag::Heading(5),
        "h6" => ParagraphTag::Heading(6),
        _ => ParagraphTag::Normal,
    }
}

fn parse_paragraph(el: &XmlElement, path: &str, styles: &StyleTable) -> Result<Paragraph> {
    let tag = paragraph_tag(&el.name);

    let class = lookup_class(el, path, styles)?;
    let base_text = class.map(|c| c.text.clone()).unwrap_or_default();
    let mut style = class.map(|c| c.paragraph.clone()).unwrap_or_default();
    style.named_style_type = Some(tag.named_style());

    let bullet = if tag == ParagraphTag::ListItem {
        el.attr("preset").map(|preset| {
            Ok::<_, Error>(Bullet {
                preset: preset.to_string(),
                level: match el.attr("level") {
                    Some(v) => v.parse::<u8>().map_err(|_| {
                        Error::malformed(path, format!("bad list level {:?}", v))
                    })?,
                    None => 0,
                },
            })
        })
        .transpose()?
    } else {
        None
    };

    let mut content = Vec::new();
    for node in &el.children {
        match node {
            XmlNode::Text(t) => content.push(Inline::Run(TextRun {
                text: t.clone(),
                style: base_text.clone(),
            })),
            XmlNode::Element(child) => match child.name.as_str() {
                "r" => content.push(Inline::Run(parse_run(child, &base_text, path, styles)?)),
                other => content.push(Inline::Special(parse_special(child, other, path)?)),
            },
        }
    }

    Ok(Paragraph {
        tag,
        content,
        style,
        bullet,
        start_index: 0,
        end_index: 0,
    })
}

fn parse_run(
    el: &XmlElement,
    base: &TextStyle,
    path: &str,
    styles: &StyleTable,
) -> Result<TextRun> {
    let mut style = base.clone();
    if let Some(class) = lookup_class(el, path, styles)? {
        style = style.merged_with(&class.text);
    }

    let flag = |name: &str| el.attr(name).map(|v| v == "1");
    let overlay = TextStyle {
        bold: flag("b"),
        italic: flag("i"),
        underline: flag("u"),
        strikethrough: flag("st"),
        small_caps: flag("sc"),
        baseline_offset: match el.attr("off") {
            Some("SUPER") => Some(BaselineOffset::Superscript),
            Some("SUB") => Some(BaselineOffset::Subscript),
            Some(other) => {
                return Err(Error::malformed(path, format!("bad baseline offset {:?}", other)));
            }
            None => None,
        },
        font_family: el.attr("font").map(str::to_string),
        weight: parse_attr_num::<u16>(el, "weight", path)?,
        font_size: parse_attr_num::<f64>(el, "size", path)?,
        foreground_color: el.attr("fg").map(str::to_string),
        background_color: el.attr("bgc").map(str::to_string),
        link: el.attr("href").map(str::to_string),
    };
    style = style.merged_with(&overlay);

    Ok(TextRun {
        text: el.text(),
        style,
    })
}

fn parse_special(el: &XmlElement, name: &str, path: &str) -> Result<SpecialKind> {
    let required = |attr: &str| {
        el.attr(attr).map(str::to_string).ok_or_else(|| {
            Error::malformed(path, format!("<{}> missing {} attribute", name, attr))
        })
    };
    match name {
        "pagebreak" => Ok(SpecialKind::PageBreak),
        "colbreak" => Ok(SpecialKind::ColumnBreak),
        "hr" => Ok(SpecialKind::HorizontalRule),
        "eq" => Ok(SpecialKind::Equation),
        "img" => Ok(SpecialKind::Image { src: required("src")? }),
        "person" => Ok(SpecialKind::Person {
            email: required("email")?,
            name: el.attr("name").map(str::to_string),
        }),
        "date" => Ok(SpecialKind::Date { ts: required("ts")? }),
        "fnref" => Ok(SpecialKind::FootnoteRef { id: required("id")? }),
        other => Err(Error::malformed(
            path,
            format!("unknown inline element <{}>", other),
        )),
    }
}

fn parse_table(el: &XmlElement, path: &str, styles: &StyleTable) -> Result<Table> {
    let id = el.attr("id").map(str::to_string);
    let table_path = match &id {
        Some(id) => format!("{}/table[{}]", path, id),
        None => format!("{}/table", path),
    };

    let mut columns = Vec::new();
    let mut col_ids = FxHashSet::default();
    let mut rows = Vec::new();

    for child in el.child_elements() {
        match child.name.as_str() {
            "col" => {
                let col_id = child
                    .attr("id")
                    .ok_or_else(|| Error::malformed(&table_path, "<col> missing id"))?;
                if !col_ids.insert(col_id.to_string()) {
                    return Err(Error::malformed(
                        &table_path,
                        format!("duplicate column id {:?}", col_id),
                    ));
                }
                columns.push(Column {
                    id: col_id.to_string(),
                    width: parse_attr_num::<f64>(child, "width", &table_path)?,
                });
            }
            "tr" => {
                let row_id = child
                    .attr("id")
                    .ok_or_else(|| Error::malformed(&table_path, "<tr> missing id"))?;
                let mut cells = Vec::new();
                for cell_el in child.child_elements() {
                    if cell_el.name != "td" {
                        return Err(Error::malformed(
                            &table_path,
                            format!("unexpected <{}> inside <tr>", cell_el.name),
                        ));
                    }
                    cells.push(parse_cell(cell_el, &table_path, styles)?);
                }
                rows.push(TableRow {
                    id: row_id.to_string(),
                    cells,
                });
            }
            other => {
                return Err(Error::malformed(
                    &table_path,
                    format!("unexpected <{}> inside <table>", other),
                ));
            }
        }
    }

    if columns.is_empty() || rows.is_empty() {
        return Err(Error::malformed(&table_path, "table needs columns and rows"));
    }
    for row in &rows {
        if row.cells.len() != columns.len() {
            return Err(Error::malformed(
                &table_path,
                format!(
                    "row {:?} has {} cells, table has {} columns",
                    row.id,
                    row.cells.len(),
                    columns.len()
                ),
            ));
        }
    }

    Ok(Table {
        id,
        columns,
        rows,
        start_index: 0,
        end_index: 0,
    })
}

fn parse_cell(el: &XmlElement, table_path: &str, styles: &StyleTable) -> Result<TableCell> {
    let mut blocks = Vec::new();
    for node in &el.children {
        match node {
            XmlNode::Text(t) => {
                if !t.trim().is_empty() {
                    // Shorthand: bare cell text is a single plain paragraph.
                    blocks.push(Block::Paragraph(Paragraph {
                        tag: ParagraphTag::Normal,
                        content: vec![Inline::Run(TextRun {
                            text: t.clone(),
                            style: TextStyle::default(),
                        })],
                        style: ParagraphStyle {
                            named_style_type: Some(ParagraphTag::Normal.named_style()),
                            ..Default::default()
                        },
                        bullet: None,
                        start_index: 0,
                        end_index: 0,
                    }));
                }
            }
            XmlNode::Element(child) => {
                let block = parse_block(child, table_path, styles)?;
                if matches!(block, Block::SectionBreak(_) | Block::Toc(_)) {
                    return Err(Error::malformed(
                        table_path,
                        format!("<{}> not allowed inside a cell", child.name),
                    ));
                }
                blocks.push(block);
            }
        }
    }

    if blocks.is_empty() {
        blocks.push(empty_paragraph());
    }
    if !matches!(blocks.last(), Some(Block::Paragraph(_))) {
        return Err(Error::malformed(table_path, "cell must end with a paragraph"));
    }

    let style = CellStyle {
        background_color: el.attr("bg").map(str::to_string),
        content_alignment: match el.attr("align") {
            Some("TOP") => Some(ContentAlignment::Top),
            Some("MIDDLE") => Some(ContentAlignment::Middle),
            Some("BOTTOM") => Some(ContentAlignment::Bottom),
            Some(other) => {
                return Err(Error::malformed(
                    table_path,
                    format!("bad cell alignment {:?}", other),
                ));
            }
            None => None,
        },
    };

    Ok(TableCell {
        blocks,
        style,
        row_span: parse_attr_num::<u32>(el, "rowspan", table_path)?.unwrap_or(1),
        col_span: parse_attr_num::<u32>(el, "colspan", table_path)?.unwrap_or(1),
    })
}

/// The empty paragraph every empty cell (and every just-created segment)
/// contains.
pub fn empty_paragraph() -> Block {
    Block::Paragraph(Paragraph {
        tag: ParagraphTag::Normal,
        content: Vec::new(),
        style: ParagraphStyle {
            named_style_type: Some(ParagraphTag::Normal.named_style()),
            ..Default::default()
        },
        bullet: None,
        start_index: 0,
        end_index: 0,
    })
}

fn lookup_class<'a>(
    el: &XmlElement,
    path: &str,
    styles: &'a StyleTable,
) -> Result<Option<&'a extradoc_model::StyleClass>> {
    match el.attr("class") {
        None => Ok(None),
        Some(name) => styles
            .get(name)
            .map(Some)
            .ok_or_else(|| Error::malformed(path, format!("unknown style class {:?}", name))),
    }
}

fn parse_attr_num<T: std::str::FromStr>(
    el: &XmlElement,
    name: &str,
    path: &str,
) -> Result<Option<T>> {
    el.attr(name)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| Error::malformed(path, format!("bad {} value {:?}", name, v)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles() -> StyleTable {
        StyleTable::parse(r#"<styles><style name="s1" b="1"/><style name="s2" align="CENTER"/></styles>"#)
            .unwrap()
    }

    #[test]
    fn test_legacy_document_gets_synthetic_tab() {
        let doc = parse_document("<doc><body><p>x</p></body></doc>", &styles()).unwrap();
        assert_eq!(doc.tabs.len(), 1);
        assert_eq!(doc.tabs[0].id, "t.0");
    }

    #[test]
    fn test_implicit_section_break_materialized() {
        let doc = parse_document("<doc><body><p>x</p></body></doc>", &styles()).unwrap();
        assert!(matches!(
            doc.tabs[0].body.blocks[0],
            Block::SectionBreak(_)
        ));
        // An explicit <sb/> is not duplicated.
        let doc2 = parse_document("<doc><body><sb/><p>x</p></body></doc>", &styles()).unwrap();
        assert_eq!(doc2.tabs[0].body.blocks.len(), 2);
    }

    #[test]
    fn test_run_style_cascade() {
        let doc = parse_document(
            r#"<doc><body><p class="s1">plain <r i="1">both</r></p></body></doc>"#,
            &styles(),
        )
        .unwrap();
        let Block::Paragraph(p) = &doc.tabs[0].body.blocks[1] else {
            panic!("expected paragraph");
        };
        let Inline::Run(plain) = &p.content[0] else {
            panic!("expected run");
        };
        assert_eq!(plain.style.bold, Some(true));
        let Inline::Run(both) = &p.content[1] else {
            panic!("expected run");
        };
        assert_eq!(both.style.bold, Some(true));
        assert_eq!(both.style.italic, Some(true));
    }

    #[test]
    fn test_paragraph_named_style_from_tag() {
        let doc = parse_document("<doc><body><h2>T</h2><p>x</p></body></doc>", &styles()).unwrap();
        let Block::Paragraph(h) = &doc.tabs[0].body.blocks[1] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            h.style.named_style_type,
            Some(extradoc_model::NamedStyleType::Heading2)
        );
    }

    #[test]
    fn test_table_shape_validation() {
        let err = parse_document(
            r#"<doc><body><table id="T"><col id="c1"/><col id="c2"/><tr id="r1"><td>x</td></tr></table><p/></body></doc>"#,
            &styles(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_duplicate_segment_ids_rejected() {
        let err = parse_document(
            r#"<doc><tab id="t.0"><body><p/></body><header id="h.1"><p/></header><header id="h.1"><p/></header></tab></doc>"#,
            &styles(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_segments_sorted_by_id() {
        let doc = parse_document(
            r#"<doc><tab id="t.0"><body><p/></body><header id="h.2"><p/></header><header id="h.1"><p/></header></tab></doc>"#,
            &styles(),
        )
        .unwrap();
        let ids: Vec<&str> = doc.tabs[0].headers.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["h.1", "h.2"]);
    }

    #[test]
    fn test_segment_must_end_with_paragraph() {
        let err = parse_document(
            r#"<doc><body><p/><table id="T"><col id="c1"/><tr id="r1"><td>x</td></tr></table></body></doc>"#,
            &styles(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_empty_cell_gets_empty_paragraph() {
        let doc = parse_document(
            r#"<doc><body><table id="T"><col id="c1"/><tr id="r1"><td/></tr></table><p/></body></doc>"#,
            &styles(),
        )
        .unwrap();
        let Block::Table(t) = &doc.tabs[0].body.blocks[1] else {
            panic!("expected table");
        };
        assert_eq!(t.rows[0].cells[0].blocks.len(), 1);
    }

    #[test]
    fn test_annotate_assigns_body_indices() {
        let mut doc =
            parse_document("<doc><body><p>Hello world</p></body></doc>", &styles()).unwrap();
        annotate(&mut doc);
        assert_eq!(doc.tabs[0].body.blocks[1].start_index(), 1);
        assert_eq!(doc.tabs[0].body.blocks[1].end_index(), 13);
        assert_eq!(doc.tabs[0].body.segment_end, 13);
    }

    #[test]
    fn test_unknown_class_rejected() {
        let err = parse_document(r#"<doc><body><p class="nope">x</p></body></doc>"#, &styles())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_footnote_ref_parsed() {
        let doc = parse_document(
            r#"<doc><body><p>See<fnref id="fn.1"/> details.</p></body><footnote id="fn.1"><p>Extra.</p></footnote></doc>"#,
            &styles(),
        );
        // Legacy layout: footnote next to body is still part of the tab.
        let doc = doc.unwrap();
        assert_eq!(doc.tabs[0].footnotes.len(), 1);
        let Block::Paragraph(p) = &doc.tabs[0].body.blocks[1] else {
            panic!("expected paragraph");
        };
        assert!(matches!(
            p.content[1],
            Inline::Special(SpecialKind::FootnoteRef { .. })
        ));
    }
}
