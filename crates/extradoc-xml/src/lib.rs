//! Flat-XML parsing for ExtraDoc document snapshots.
//!
//! ExtraDoc projects a document into a flat XML dialect that an editor (human
//! or LLM) mutates as plain text. This crate turns such a snapshot into a tree
//! of [`XmlElement`]s, keeping text content verbatim: whitespace inside
//! paragraph-level elements is significant, so nothing is trimmed or
//! normalized beyond standard entity unescaping.
//!
//! The parser is strict about well-formedness (one root, matched tags) but
//! knows nothing about the dialect itself; tag semantics live in the
//! consumers.
//!
//! # Example
//!
//! ```rust
//! use extradoc_xml::parse;
//!
//! let doc = parse("<doc><body><p>Hello <r b=\"1\">world</r></p></body></doc>").unwrap();
//! assert_eq!(doc.name, "doc");
//! let body = &doc.child_elements()[0];
//! assert_eq!(body.name, "body");
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::parse;
pub use types::{XmlElement, XmlNode};
