//! Shared helpers for integration tests: snapshot construction and a small
//! segment-string simulator for body-only paragraph documents.
//!
//! The simulator models a segment as a vector of UTF-16 code units with the
//! engine's segment-end convention: an insert at an index equal to the
//! current length appends its text plus the terminator the stripped payload
//! left behind; everything else is plain positional splicing. A segment
//! therefore always keeps a terminal newline, which is exactly the server
//! behavior the records are shaped for.

use extradoc_model::StyleTable;
use extradoc_reconcile::{Batch, Config, MutationRecord, Reconciliation, reconcile};

/// Stand-in unit for the implicit section break at body index 0.
pub const SECTION_BREAK: u16 = 0xFFFC;

pub fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// A legacy single-tab snapshot with the given body paragraphs.
pub fn body_doc(paras: &[String]) -> String {
    let mut out = String::from("<doc><body>");
    for para in paras {
        out.push_str("<p>");
        out.push_str(&xml_escape(para));
        out.push_str("</p>");
    }
    out.push_str("</body></doc>");
    out
}

/// The flat UTF-16 form of a body: section break, then each paragraph with
/// its terminator.
pub fn flat_units(paras: &[String]) -> Vec<u16> {
    let mut units = vec![SECTION_BREAK];
    for para in paras {
        units.extend(para.encode_utf16());
        units.push(u16::from(b'\n'));
    }
    units
}

pub fn reconcile_bodies(pristine: &[String], current: &[String]) -> Reconciliation {
    reconcile(
        &body_doc(pristine),
        &body_doc(current),
        &StyleTable::new(),
        &Config::default(),
    )
    .expect("reconcile succeeds")
}

/// Apply the emitted batches to the pristine flat form. Only content
/// records mutate; style and bullet records are position-checked no-ops.
pub fn apply_body(batches: &[Batch], pristine: &[String]) -> Vec<u16> {
    let mut units = flat_units(pristine);
    assert!(batches.len() <= 1, "body-only diffs fit in one batch");

    for batch in batches {
        for record in &batch.requests {
            match record {
                MutationRecord::InsertText { location, text } => {
                    let at = location.index as usize;
                    let incoming: Vec<u16> = text.encode_utf16().collect();
                    assert!(at <= units.len(), "insert at {} beyond length {}", at, units.len());
                    if at == units.len() {
                        units.extend(incoming);
                        units.push(u16::from(b'\n'));
                    } else {
                        units.splice(at..at, incoming);
                    }
                }
                MutationRecord::DeleteRange { range } => {
                    let (start, end) = (range.start as usize, range.end as usize);
                    assert!(
                        start <= end && end <= units.len(),
                        "delete [{}, {}) out of bounds {}",
                        start,
                        end,
                        units.len()
                    );
                    units.drain(start..end);
                }
                MutationRecord::UpdateTextStyle { range, .. }
                | MutationRecord::UpdateParagraphStyle { range, .. }
                | MutationRecord::CreateBullets { range, .. }
                | MutationRecord::DeleteBullets { range } => {
                    assert!(
                        (range.start as usize) <= units.len(),
                        "style range starts beyond segment"
                    );
                }
                other => panic!("unexpected record for a paragraph-only body: {:?}", other),
            }
        }
    }
    units
}
