/*
 * error.rs
 * Copyright (c) 2026 ExtraDoc contributors
 */

//! Error and warning surface of the engine.
//!
//! The engine is a pure function: every failure is returned in the typed
//! result, and skipped-but-non-fatal changes come back as [`Warning`]s next
//! to the successful batches. "No changes" is an empty batch list, never an
//! in-band sentinel.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors for a reconcile call.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A snapshot could not be parsed or violates structural rules
    /// (missing ids, duplicate ids, bad grid shape).
    #[error("malformed input at {path}: {message}")]
    MalformedInput { path: String, message: String },

    /// An internal index or alignment assertion failed. This is a bug in
    /// the engine, never a recoverable input condition.
    #[error("index invariant violated at {path}: {message}")]
    IndexInvariant { path: String, message: String },

    /// A change touches a read-only element and the active policy says to
    /// fail rather than skip.
    #[error("unsupported change at {path}: {message}")]
    UnsupportedChange { path: String, message: String },

    /// A placeholder id could not be resolved from prior batch replies.
    #[error("deferred id resolution failed: {message}")]
    DeferredResolutionFailed { message: String },

    /// Segment nesting produced more batches than `max_batches` allows.
    #[error("batch limit exceeded: reconcile needs more than {limit} batches")]
    BatchLimitExceeded { limit: usize },
}

impl Error {
    pub(crate) fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedInput {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invariant(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::IndexInvariant {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::UnsupportedChange {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<extradoc_xml::Error> for Error {
    fn from(err: extradoc_xml::Error) -> Self {
        Error::MalformedInput {
            path: "xml".to_string(),
            message: err.to_string(),
        }
    }
}

/// Non-fatal conditions reported alongside the batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    /// Node path of the offending element, e.g. `t.0/body/p[3]`.
    pub path: String,
    pub message: String,
}

/// What a warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A horizontal rule change was skipped under the skip policy.
    HorizontalRuleSkipped,
    /// A table-of-contents change was skipped.
    TocSkipped,
    /// An inline special with no insert primitive was dropped from
    /// re-inserted content (column break, image, person, date, equation).
    SpecialDropped,
    /// A footnote reference was removed with its paragraph; the footnote
    /// body is lost server-side.
    FootnoteDropped,
    /// A footnote segment was added without any new reference to it.
    FootnoteUnreferenced,
    /// Bullet nesting was requested on an existing list item; the leading
    /// tab encoding only works for newly created lists.
    BulletNestingUnsupported,
}

impl Warning {
    pub(crate) fn new(
        kind: WarningKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}
