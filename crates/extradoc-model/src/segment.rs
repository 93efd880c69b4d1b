/*
 * segment.rs
 * Copyright (c) 2026 ExtraDoc contributors
 */

//! Segments, tabs, and the document root.

use crate::block::Block;
use serde::{Deserialize, Serialize};

/// The kind of an independent index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentKind {
    Body,
    Header,
    Footer,
    Footnote,
}

/// An independent index space.
///
/// The body starts at index 1 (index 0 holds the implicit section break,
/// parsed as the first block); all other kinds start at 0. `segment_end` is
/// exclusive, with the terminal newline sentinel at `segment_end - 1`.
/// Current-side segments leave `segment_end` at zero; only pristine indices
/// are ever used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub id: String,
    pub blocks: Vec<Block>,
    pub segment_end: u32,
}

impl Segment {
    /// First index at which content may be edited. Index 0 of a body is the
    /// implicit section break and is never touched.
    pub fn content_start(&self) -> u32 {
        match self.kind {
            SegmentKind::Body => 1,
            _ => 0,
        }
    }
}

/// One tab of the document. Legacy single-tab snapshots are wrapped in a
/// synthetic tab by the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub title: Option<String>,
    pub body: Segment,
    pub headers: Vec<Segment>,
    pub footers: Vec<Segment>,
    pub footnotes: Vec<Segment>,
}

impl Tab {
    /// All segments in the deterministic diff order: body first, then
    /// headers, footers, and footnotes, each sorted by id. The builder
    /// stores each group sorted, so this is a plain chain.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        std::iter::once(&self.body)
            .chain(self.headers.iter())
            .chain(self.footers.iter())
            .chain(self.footnotes.iter())
    }
}

/// The document root: tabs in strip order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub tabs: Vec<Tab>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(kind: SegmentKind, id: &str) -> Segment {
        Segment {
            kind,
            id: id.to_string(),
            blocks: Vec::new(),
            segment_end: 0,
        }
    }

    #[test]
    fn test_segment_iteration_order() {
        let tab = Tab {
            id: "t.0".to_string(),
            title: None,
            body: segment(SegmentKind::Body, ""),
            headers: vec![segment(SegmentKind::Header, "h.1")],
            footers: vec![segment(SegmentKind::Footer, "f.1")],
            footnotes: vec![segment(SegmentKind::Footnote, "fn.1")],
        };
        let kinds: Vec<SegmentKind> = tab.segments().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Body,
                SegmentKind::Header,
                SegmentKind::Footer,
                SegmentKind::Footnote
            ]
        );
    }

    #[test]
    fn test_body_content_starts_after_section_break() {
        assert_eq!(segment(SegmentKind::Body, "").content_start(), 1);
        assert_eq!(segment(SegmentKind::Footnote, "fn.1").content_start(), 0);
    }
}
