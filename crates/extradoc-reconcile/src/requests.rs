/*
 * requests.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Primitive mutation records, batches, and placeholder ids.
 *
 * Records are target-agnostic: a transport maps them onto the positional
 * API. Each variant carries exactly the data its operation needs; `fields`
 * strings are comma-separated property path lists for style updates.
 */

use extradoc_model::{CellStyle, ParagraphStyle, TextStyle};
use serde::{Deserialize, Serialize};

/// A segment or tab identifier: either known now, or assigned by the server
/// in an earlier batch and resolved between executions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Literal(String),
    Placeholder(Placeholder),
}

impl Id {
    /// The body of a tab has no segment id on the wire.
    pub fn body() -> Self {
        Id::Literal(String::new())
    }

    pub fn literal(id: impl Into<String>) -> Self {
        Id::Literal(id.into())
    }
}

/// A reference to a server-assigned id produced by a request in an earlier
/// batch. `request_index` counts entries in that batch only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub batch_index: usize,
    pub request_index: usize,
    /// Dot-separated path into the reply of the creating request,
    /// e.g. `header.headerId`.
    pub response_path: String,
}

/// A point in a segment's index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub index: u32,
    pub segment_id: Id,
    pub tab_id: Id,
}

/// A half-open range in a segment's index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub start: u32,
    pub end: u32,
    pub segment_id: Id,
    pub tab_id: Id,
}

/// Header/footer slot on a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderFooterKind {
    Default,
    FirstPage,
    EvenPage,
}

/// One primitive mutation. The variant set is closed: the emitter matches
/// exhaustively so a new kind cannot silently fall through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum MutationRecord {
    InsertText {
        location: Location,
        text: String,
    },
    DeleteRange {
        range: Range,
    },
    UpdateTextStyle {
        range: Range,
        style: TextStyle,
        fields: String,
    },
    UpdateParagraphStyle {
        range: Range,
        style: ParagraphStyle,
        fields: String,
    },
    CreateBullets {
        range: Range,
        preset: String,
    },
    DeleteBullets {
        range: Range,
    },
    InsertPageBreak {
        location: Location,
    },
    InsertSectionBreak {
        location: Location,
    },
    InsertTable {
        location: Location,
        rows: u32,
        cols: u32,
    },
    InsertTableRow {
        table_start: Location,
        /// Row to insert next to.
        row_index: u32,
        below: bool,
    },
    DeleteTableRow {
        table_start: Location,
        row_index: u32,
    },
    InsertTableColumn {
        table_start: Location,
        row_index: u32,
        col_index: u32,
        right: bool,
    },
    DeleteTableColumn {
        table_start: Location,
        col_index: u32,
    },
    MergeCells {
        table_start: Location,
        row_index: u32,
        col_index: u32,
        row_span: u32,
        col_span: u32,
    },
    UnmergeCells {
        table_start: Location,
        row_index: u32,
        col_index: u32,
        row_span: u32,
        col_span: u32,
    },
    UpdateTableCellStyle {
        table_start: Location,
        row_index: u32,
        col_index: u32,
        style: CellStyle,
        fields: String,
    },
    UpdateColumnWidth {
        table_start: Location,
        col_indices: Vec<u32>,
        /// Width in points.
        width: f64,
    },
    CreateHeader {
        kind: HeaderFooterKind,
        tab_id: Id,
        section_break_location: Option<Location>,
    },
    DeleteHeader {
        header_id: Id,
        tab_id: Id,
    },
    CreateFooter {
        kind: HeaderFooterKind,
        tab_id: Id,
        section_break_location: Option<Location>,
    },
    DeleteFooter {
        footer_id: Id,
        tab_id: Id,
    },
    CreateFootnote {
        location: Location,
    },
    AddTab {
        /// Position in the tab strip.
        index: u32,
        title: Option<String>,
    },
    DeleteTab {
        tab_id: Id,
    },
    UpdateTabProperties {
        tab_id: Id,
        title: Option<String>,
        fields: String,
    },
}

impl MutationRecord {
    /// Operation name, matching the variant spelling.
    pub fn op_name(&self) -> &'static str {
        match self {
            MutationRecord::InsertText { .. } => "InsertText",
            MutationRecord::DeleteRange { .. } => "DeleteRange",
            MutationRecord::UpdateTextStyle { .. } => "UpdateTextStyle",
            MutationRecord::UpdateParagraphStyle { .. } => "UpdateParagraphStyle",
            MutationRecord::CreateBullets { .. } => "CreateBullets",
            MutationRecord::DeleteBullets { .. } => "DeleteBullets",
            MutationRecord::InsertPageBreak { .. } => "InsertPageBreak",
            MutationRecord::InsertSectionBreak { .. } => "InsertSectionBreak",
            MutationRecord::InsertTable { .. } => "InsertTable",
            MutationRecord::InsertTableRow { .. } => "InsertTableRow",
            MutationRecord::DeleteTableRow { .. } => "DeleteTableRow",
            MutationRecord::InsertTableColumn { .. } => "InsertTableColumn",
            MutationRecord::DeleteTableColumn { .. } => "DeleteTableColumn",
            MutationRecord::MergeCells { .. } => "MergeCells",
            MutationRecord::UnmergeCells { .. } => "UnmergeCells",
            MutationRecord::UpdateTableCellStyle { .. } => "UpdateTableCellStyle",
            MutationRecord::UpdateColumnWidth { .. } => "UpdateColumnWidth",
            MutationRecord::CreateHeader { .. } => "CreateHeader",
            MutationRecord::DeleteHeader { .. } => "DeleteHeader",
            MutationRecord::CreateFooter { .. } => "CreateFooter",
            MutationRecord::DeleteFooter { .. } => "DeleteFooter",
            MutationRecord::CreateFootnote { .. } => "CreateFootnote",
            MutationRecord::AddTab { .. } => "AddTab",
            MutationRecord::DeleteTab { .. } => "DeleteTab",
            MutationRecord::UpdateTabProperties { .. } => "UpdateTabProperties",
        }
    }

    /// The range of a range-addressed record.
    pub fn range(&self) -> Option<&Range> {
        match self {
            MutationRecord::DeleteRange { range }
            | MutationRecord::UpdateTextStyle { range, .. }
            | MutationRecord::UpdateParagraphStyle { range, .. }
            | MutationRecord::CreateBullets { range, .. }
            | MutationRecord::DeleteBullets { range } => Some(range),
            _ => None,
        }
    }

    /// The location of a point-addressed record.
    pub fn location(&self) -> Option<&Location> {
        match self {
            MutationRecord::InsertText { location, .. }
            | MutationRecord::InsertPageBreak { location }
            | MutationRecord::InsertSectionBreak { location }
            | MutationRecord::InsertTable { location, .. }
            | MutationRecord::CreateFootnote { location } => Some(location),
            MutationRecord::InsertTableRow { table_start, .. }
            | MutationRecord::DeleteTableRow { table_start, .. }
            | MutationRecord::InsertTableColumn { table_start, .. }
            | MutationRecord::DeleteTableColumn { table_start, .. }
            | MutationRecord::MergeCells { table_start, .. }
            | MutationRecord::UnmergeCells { table_start, .. }
            | MutationRecord::UpdateTableCellStyle { table_start, .. }
            | MutationRecord::UpdateColumnWidth { table_start, .. } => Some(table_start),
            _ => None,
        }
    }

    /// Mutable references to every id slot, for placeholder resolution.
    pub fn ids_mut(&mut self) -> Vec<&mut Id> {
        match self {
            MutationRecord::InsertText { location, .. }
            | MutationRecord::InsertPageBreak { location }
            | MutationRecord::InsertSectionBreak { location }
            | MutationRecord::InsertTable { location, .. }
            | MutationRecord::CreateFootnote { location } => {
                vec![&mut location.segment_id, &mut location.tab_id]
            }
            MutationRecord::DeleteRange { range }
            | MutationRecord::UpdateTextStyle { range, .. }
            | MutationRecord::UpdateParagraphStyle { range, .. }
            | MutationRecord::CreateBullets { range, .. }
            | MutationRecord::DeleteBullets { range } => {
                vec![&mut range.segment_id, &mut range.tab_id]
            }
            MutationRecord::InsertTableRow { table_start, .. }
            | MutationRecord::DeleteTableRow { table_start, .. }
            | MutationRecord::InsertTableColumn { table_start, .. }
            | MutationRecord::DeleteTableColumn { table_start, .. }
            | MutationRecord::MergeCells { table_start, .. }
            | MutationRecord::UnmergeCells { table_start, .. }
            | MutationRecord::UpdateTableCellStyle { table_start, .. }
            | MutationRecord::UpdateColumnWidth { table_start, .. } => {
                vec![&mut table_start.segment_id, &mut table_start.tab_id]
            }
            MutationRecord::CreateHeader {
                tab_id,
                section_break_location,
                ..
            }
            | MutationRecord::CreateFooter {
                tab_id,
                section_break_location,
                ..
            } => {
                let mut ids = vec![tab_id];
                if let Some(loc) = section_break_location {
                    ids.push(&mut loc.segment_id);
                    ids.push(&mut loc.tab_id);
                }
                ids
            }
            MutationRecord::DeleteHeader { header_id, tab_id } => vec![header_id, tab_id],
            MutationRecord::DeleteFooter { footer_id, tab_id } => vec![footer_id, tab_id],
            MutationRecord::DeleteTab { tab_id }
            | MutationRecord::UpdateTabProperties { tab_id, .. } => vec![tab_id],
            MutationRecord::AddTab { .. } => vec![],
        }
    }
}

/// One batch of records, executed top to bottom by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub requests: Vec<MutationRecord>,
}
