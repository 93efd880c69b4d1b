//! Property tests over paragraph-level body edits.
//!
//! The interesting universal invariants: reconciling a document with itself
//! yields nothing; applying the emitted records to the pristine flat form
//! reproduces the current one; emission is deterministic; no delete ever
//! touches a segment's terminal newline; inserts and deletes come out in
//! descending positional order.

mod common;

use common::{apply_body, body_doc, flat_units, reconcile_bodies};
use extradoc_model::{StyleTable, utf16_len};
use extradoc_reconcile::{Config, MutationRecord, reconcile};
use proptest::prelude::*;

/// Short paragraph texts over an alphabet that exercises the UTF-16 math:
/// ASCII, a 2-byte scalar, and an astral character worth two code units.
fn para_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just('a'),
            Just('b'),
            Just('c'),
            Just(' '),
            Just('é'),
            Just('\u{1F600}'),
        ],
        0..6,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn paragraphs() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(para_text(), 1..5)
}

proptest! {
    #[test]
    fn reconcile_with_self_is_empty(paras in paragraphs()) {
        let result = reconcile_bodies(&paras, &paras);
        prop_assert!(result.batches.is_empty());
        prop_assert!(result.warnings.is_empty());
    }

    #[test]
    fn round_trip_reproduces_current(pristine in paragraphs(), current in paragraphs()) {
        let result = reconcile_bodies(&pristine, &current);
        let applied = apply_body(&result.batches, &pristine);
        prop_assert_eq!(
            applied,
            flat_units(&current),
            "pristine {:?} -> current {:?} via {:?}",
            pristine,
            current,
            result.batches
        );
    }

    #[test]
    fn emission_is_deterministic(pristine in paragraphs(), current in paragraphs()) {
        let first = reconcile_bodies(&pristine, &current);
        let second = reconcile_bodies(&pristine, &current);
        let a = serde_json::to_string(&first.batches).expect("serialize");
        let b = serde_json::to_string(&second.batches).expect("serialize");
        prop_assert_eq!(a, b);
    }

    #[test]
    fn no_delete_touches_the_sentinel(pristine in paragraphs(), current in paragraphs()) {
        let segment_end = flat_units(&pristine).len() as u32;
        let result = reconcile_bodies(&pristine, &current);
        for batch in &result.batches {
            for record in &batch.requests {
                if let MutationRecord::DeleteRange { range } = record {
                    prop_assert!(
                        range.end <= segment_end - 1,
                        "delete [{}, {}) reaches the sentinel at {}",
                        range.start,
                        range.end,
                        segment_end - 1
                    );
                }
            }
        }
    }

    #[test]
    fn content_records_emit_backwards(pristine in paragraphs(), current in paragraphs()) {
        let result = reconcile_bodies(&pristine, &current);
        for batch in &result.batches {
            let mut last_insert: Option<u32> = None;
            let mut last_delete_end: Option<u32> = None;
            for record in &batch.requests {
                match record {
                    MutationRecord::InsertText { location, .. } => {
                        if let Some(prev) = last_insert {
                            prop_assert!(location.index <= prev, "inserts went forward");
                        }
                        last_insert = Some(location.index);
                    }
                    MutationRecord::DeleteRange { range } => {
                        if let Some(prev) = last_delete_end {
                            prop_assert!(range.end <= prev, "deletes went forward");
                        }
                        last_delete_end = Some(range.end);
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn insert_advances_by_utf16_length(text in para_text()) {
        // Appending one paragraph grows the flat form by utf16(text) + 1.
        let pristine = vec!["base".to_string()];
        let current = vec!["base".to_string(), text.clone()];
        let result = reconcile_bodies(&pristine, &current);
        let applied = apply_body(&result.batches, &pristine);
        let grown = applied.len() - flat_units(&pristine).len();
        prop_assert_eq!(grown as u32, utf16_len(&text) + 1);
    }
}

#[test]
fn determinism_across_segment_kinds() {
    // Headers, footers, and footnotes give the batch partitioner something
    // to order; two runs must agree bit for bit.
    let pristine = r#"<doc><tab id="t.0"><body><p>x</p></body></tab></doc>"#;
    let current = r#"<doc><tab id="t.0"><body><p>x<fnref id="fn.1"/></p></body><header id="h.2"><p>H2</p></header><header id="h.1"><p>H1</p></header><footer id="f.1"><p>F</p></footer><footnote id="fn.1"><p>note</p></footnote></tab></doc>"#;
    let styles = StyleTable::new();
    let config = Config::default();
    let first = reconcile(pristine, current, &styles, &config).expect("reconcile");
    let second = reconcile(pristine, current, &styles, &config).expect("reconcile");
    assert_eq!(first.batches, second.batches);
    // Headers populate in sorted-id order, so h.1 precedes h.2 in batch 0.
    let creators: Vec<&str> = first.batches[0]
        .requests
        .iter()
        .map(|r| r.op_name())
        .collect();
    assert!(creators.contains(&"CreateHeader"));
    assert!(creators.contains(&"CreateFooter"));
    assert!(creators.contains(&"CreateFootnote"));
}

#[test]
fn empty_paragraph_appended_at_end() {
    // The stripped payload is empty, but the record still matters: it
    // appends an empty paragraph behind the sentinel.
    let pristine = vec!["A".to_string()];
    let current = vec!["A".to_string(), String::new()];
    let result = reconcile_bodies(&pristine, &current);
    let applied = apply_body(&result.batches, &pristine);
    assert_eq!(applied, flat_units(&current));
}

#[test]
fn trailing_run_deleted_after_table_free_body() {
    // Multiple trailing paragraphs coalesce into one delete.
    let pristine: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    let current = vec!["A".to_string()];
    let result = reconcile_bodies(&pristine, &current);
    assert_eq!(result.batches[0].requests.len(), 1);
    let applied = apply_body(&result.batches, &pristine);
    assert_eq!(applied, flat_units(&current));
}

#[test]
fn swap_still_round_trips() {
    let pristine: Vec<String> = ["one", "two"].iter().map(|s| s.to_string()).collect();
    let current: Vec<String> = ["two", "one"].iter().map(|s| s.to_string()).collect();
    let result = reconcile_bodies(&pristine, &current);
    let applied = apply_body(&result.batches, &pristine);
    assert_eq!(applied, flat_units(&current));
}

#[test]
fn body_xml_shape_is_stable() {
    assert_eq!(
        body_doc(&["a<b".to_string()]),
        "<doc><body><p>a&lt;b</p></body></doc>"
    );
}
