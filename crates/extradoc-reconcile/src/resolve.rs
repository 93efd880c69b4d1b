/*
 * resolve.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Placeholder resolution between batch executions.
 */

use crate::error::{Error, Result};
use crate::requests::{Batch, Id, Placeholder};
use serde_json::Value;

/// Resolve every placeholder in a batch against the replies of the batches
/// executed before it.
///
/// `prior_replies` holds one response object per executed batch, in batch
/// order, each shaped `{ "replies": [ ... ] }`. The returned batch is safe
/// to hand to the transport. A missing reply slot or a dead response path
/// is fatal for the batch.
pub fn resolve_batch(batch: &Batch, prior_replies: &[Value]) -> Result<Batch> {
    let mut resolved = batch.clone();
    let mut count = 0usize;
    for record in &mut resolved.requests {
        for id in record.ids_mut() {
            if let Id::Placeholder(placeholder) = id {
                let literal = lookup(prior_replies, placeholder)?;
                *id = Id::Literal(literal);
                count += 1;
            }
        }
    }
    tracing::debug!(placeholders = count, "resolved batch");
    Ok(resolved)
}

fn lookup(prior_replies: &[Value], placeholder: &Placeholder) -> Result<String> {
    let response = prior_replies.get(placeholder.batch_index).ok_or_else(|| {
        Error::DeferredResolutionFailed {
            message: format!(
                "no response recorded for batch {}",
                placeholder.batch_index
            ),
        }
    })?;

    let reply = response
        .get("replies")
        .and_then(|replies| replies.get(placeholder.request_index))
        .ok_or_else(|| Error::DeferredResolutionFailed {
            message: format!(
                "batch {} has no reply at index {}",
                placeholder.batch_index, placeholder.request_index
            ),
        })?;

    let mut node = reply;
    for key in placeholder.response_path.split('.') {
        node = node
            .get(key)
            .ok_or_else(|| Error::DeferredResolutionFailed {
                message: format!(
                    "reply {}/{} has no field {:?} (path {:?})",
                    placeholder.batch_index,
                    placeholder.request_index,
                    key,
                    placeholder.response_path
                ),
            })?;
    }

    node.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::DeferredResolutionFailed {
            message: format!(
                "reply path {:?} did not resolve to a string id",
                placeholder.response_path
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{Location, MutationRecord};
    use serde_json::json;

    fn placeholder_insert() -> MutationRecord {
        MutationRecord::InsertText {
            location: Location {
                index: 0,
                segment_id: Id::Placeholder(Placeholder {
                    batch_index: 0,
                    request_index: 0,
                    response_path: "header.headerId".to_string(),
                }),
                tab_id: Id::literal("t.0"),
            },
            text: "Acme".to_string(),
        }
    }

    #[test]
    fn test_resolves_header_placeholder() {
        let batch = Batch {
            requests: vec![placeholder_insert()],
        };
        let replies = vec![json!({ "replies": [ { "header": { "headerId": "kix.h1" } } ] })];
        let resolved = resolve_batch(&batch, &replies).unwrap();
        let MutationRecord::InsertText { location, .. } = &resolved.requests[0] else {
            panic!("expected insert");
        };
        assert_eq!(location.segment_id, Id::literal("kix.h1"));
        assert_eq!(location.tab_id, Id::literal("t.0"));
    }

    #[test]
    fn test_missing_reply_slot_fails() {
        let batch = Batch {
            requests: vec![placeholder_insert()],
        };
        let replies = vec![json!({ "replies": [] })];
        let err = resolve_batch(&batch, &replies).unwrap_err();
        assert!(matches!(err, Error::DeferredResolutionFailed { .. }));
    }

    #[test]
    fn test_dead_response_path_fails() {
        let batch = Batch {
            requests: vec![placeholder_insert()],
        };
        let replies = vec![json!({ "replies": [ { "footer": { "footerId": "kix.f1" } } ] })];
        let err = resolve_batch(&batch, &replies).unwrap_err();
        assert!(matches!(err, Error::DeferredResolutionFailed { .. }));
    }

    #[test]
    fn test_literal_ids_pass_through() {
        let batch = Batch {
            requests: vec![MutationRecord::DeleteTab {
                tab_id: Id::literal("t.9"),
            }],
        };
        let resolved = resolve_batch(&batch, &[]).unwrap();
        assert_eq!(resolved, batch);
    }
}
