/*
 * lib.rs
 * Copyright (c) 2026 ExtraDoc contributors
 *
 * Diff / reconciliation engine for ExtraDoc.
 *
 * Given two flat-XML snapshots of the same document (the pristine state
 * pulled from the server, and the current state after editing), produce an
 * ordered list of primitive mutation batches that transform the pristine
 * document into the current one when applied in order.
 *
 * The engine is a pure function: no globals, no suspension points, all
 * per-call state threaded through a call-local context. Distinct calls may
 * run concurrently on distinct inputs.
 */

//! # Overview
//!
//! The pipeline: both snapshots parse into a typed block tree
//! ([`extradoc_model`]); the pristine side is annotated with UTF-16
//! segment coordinates; per segment, a two-pass aligner matches blocks and
//! a change tree groups the differences; a backwards walk (highest pristine
//! index first) dispatches each change to a request generator. Segments
//! created mid-call (headers, footers, footnotes, tabs) are addressed with
//! [`Placeholder`] ids that [`resolve_batch`] rewrites between batch
//! executions.
//!
//! ```rust
//! use extradoc_model::StyleTable;
//! use extradoc_reconcile::{Config, reconcile};
//!
//! let styles = StyleTable::new();
//! let pristine = r#"<doc><body><p>Hello</p></body></doc>"#;
//! let current = r#"<doc><body><p>Hello world</p></body></doc>"#;
//! let result = reconcile(pristine, current, &styles, &Config::default()).unwrap();
//! assert_eq!(result.batches.len(), 1);
//! ```

pub mod align;
pub mod change;
pub mod config;
pub mod error;
pub mod hash;
pub mod lcs;
pub mod requests;
pub mod resolve;
pub mod style_diff;
pub mod tree;

mod emit_content;
mod emit_table;
mod lifecycle;
mod walk;

pub use config::{Config, HorizontalRulePolicy};
pub use error::{Error, Result, Warning, WarningKind};
pub use requests::{
    Batch, HeaderFooterKind, Id, Location, MutationRecord, Placeholder, Range,
};
pub use resolve::resolve_batch;

use extradoc_model::StyleTable;

/// The outcome of a successful reconcile call: batches in execution order,
/// plus warnings for changes that were skipped without failing the call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub batches: Vec<Batch>,
    pub warnings: Vec<Warning>,
}

impl Reconciliation {
    /// True when the two snapshots are equivalent.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Diff two snapshots of one document.
///
/// Returns the ordered mutation batches that, applied to the pristine
/// document, yield the current one. Identical snapshots return an empty
/// batch list. The result is deterministic for fixed inputs and
/// configuration.
///
/// # Errors
///
/// [`Error::MalformedInput`] for unparsable or structurally invalid
/// snapshots, [`Error::UnsupportedChange`] under strict policies,
/// [`Error::BatchLimitExceeded`] for runaway segment nesting, and
/// [`Error::IndexInvariant`] for internal assertion failures (a bug).
pub fn reconcile(
    pristine_xml: &str,
    current_xml: &str,
    styles: &StyleTable,
    config: &Config,
) -> Result<Reconciliation> {
    let mut pristine = tree::parse_document(pristine_xml, styles)?;
    let current = tree::parse_document(current_xml, styles)?;
    tree::annotate(&mut pristine);

    tracing::debug!(
        pristine_tabs = pristine.tabs.len(),
        current_tabs = current.tabs.len(),
        "reconciling document"
    );

    let mut ctx = walk::EmitCtx::new(config);
    lifecycle::diff_document(&mut ctx, &pristine, &current)?;
    let (batches, warnings) = ctx.finish();

    tracing::debug!(
        batches = batches.len(),
        requests = batches.iter().map(|b| b.requests.len()).sum::<usize>(),
        warnings = warnings.len(),
        "reconcile complete"
    );

    Ok(Reconciliation { batches, warnings })
}
