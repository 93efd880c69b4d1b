/*
 * lib.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Typed document model for the ExtraDoc diff engine.
 *
 * This crate provides pure data type definitions for the block tree that
 * both snapshot sides parse into, plus the UTF-16 index math that the
 * reconciliation engine relies on. It has minimal dependencies (serde,
 * hashlink, extradoc-xml for the style table parser) and no behavior beyond
 * length and position arithmetic.
 */

pub mod block;
pub mod index;
pub mod segment;
pub mod style;
pub mod table;

// Re-export commonly used types at the crate root
pub use block::{
    Block, Bullet, Inline, Paragraph, ParagraphTag, SectionBreak, SpecialKind, TextRun, Toc,
};
pub use index::{
    assign_segment_indices, block_length, cell_content_length, cell_content_start,
    paragraph_length, table_length, utf16_len,
};
pub use segment::{Document, Segment, SegmentKind, Tab};
pub use style::{
    Alignment, BaselineOffset, CellStyle, ContentAlignment, NamedStyleType, ParagraphStyle,
    StyleClass, StyleTable, TextStyle,
};
pub use table::{Column, Table, TableCell, TableRow};
