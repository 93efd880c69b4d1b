//! Error types for snapshot parsing.

use thiserror::Error;

/// Result type alias for extradoc-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing a snapshot.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Syntax error reported by quick-xml.
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { message: String, position: u64 },

    /// The document ended while elements were still open.
    #[error("unexpected end of input, expected closing tag </{expected}>")]
    UnexpectedEof { expected: String },

    /// A closing tag appeared with no matching open element.
    #[error("unexpected closing tag </{found}>")]
    UnmatchedEnd { found: String },

    /// Text appeared outside any element.
    #[error("text content outside the root element at byte {position}")]
    TextOutsideRoot { position: u64 },

    /// The snapshot contained no root element.
    #[error("empty snapshot: no root element found")]
    EmptyDocument,

    /// More than one top-level element.
    #[error("multiple root elements in snapshot")]
    MultipleRoots,
}
