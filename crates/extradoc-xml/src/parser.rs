//! Event-driven parser building [`XmlElement`] trees.

use crate::{Error, Result, XmlElement, XmlNode};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Parse a snapshot string into its root element.
///
/// Text is unescaped but otherwise untouched; comments, processing
/// instructions, and the XML declaration are skipped.
///
/// # Errors
///
/// Returns an error for malformed XML, an empty document, or multiple roots.
pub fn parse(content: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event_start = reader.buffer_position() as usize;

        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(element_from_start(&e, event_start, &reader)?);
            }
            Ok(Event::End(e)) => {
                // quick-xml verifies tag pairing; an End with an empty stack
                // means a stray closing tag at the top level.
                let element = stack.pop().ok_or_else(|| Error::UnmatchedEnd {
                    found: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                })?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Empty(e)) => {
                let element = element_from_start(&e, event_start, &reader)?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| Error::Syntax {
                    message: format!("invalid text content: {}", err),
                    position: event_start as u64,
                })?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Text(text.into_owned())),
                    None => {
                        // Whitespace around the root is fine; anything else is not.
                        if !text.trim().is_empty() {
                            return Err(Error::TextOutsideRoot {
                                position: event_start as u64,
                            });
                        }
                    }
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            // Comments, processing instructions, declarations, doctype.
            Ok(_) => {}
            Err(e) => {
                return Err(Error::Syntax {
                    message: e.to_string(),
                    position: reader.error_position(),
                });
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::UnexpectedEof {
            expected: open.name.clone(),
        });
    }

    root.ok_or(Error::EmptyDocument)
}

fn element_from_start(
    e: &BytesStart<'_>,
    offset: usize,
    reader: &Reader<&[u8]>,
) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Syntax {
            message: format!("attribute error: {}", err),
            position: reader.buffer_position(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::Syntax {
                message: format!("invalid attribute value: {}", err),
                position: reader.buffer_position(),
            })?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
        offset,
    })
}

fn attach(
    element: XmlElement,
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(Error::MultipleRoots);
            }
            *root = Some(element);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_element() {
        let doc = parse("<doc/>").unwrap();
        assert_eq!(doc.name, "doc");
        assert!(doc.is_empty());
    }

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse("<doc><body><p>x</p></body></doc>").unwrap();
        let body = &doc.child_elements()[0];
        assert_eq!(body.name, "body");
        assert_eq!(body.child_elements()[0].name, "p");
    }

    #[test]
    fn test_text_is_verbatim() {
        let doc = parse("<p>  Hello  <r>world</r> </p>").unwrap();
        match &doc.children[0] {
            XmlNode::Text(t) => assert_eq!(t, "  Hello  "),
            other => panic!("expected text, got {:?}", other),
        }
        match &doc.children[2] {
            XmlNode::Text(t) => assert_eq!(t, " "),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_entity_unescaping() {
        let doc = parse("<p>a &lt; b &amp; c</p>").unwrap();
        assert_eq!(doc.text(), "a < b & c");
    }

    #[test]
    fn test_attributes_in_order() {
        let doc = parse(r#"<r b="1" i="1" href="https://x.test"/>"#).unwrap();
        assert_eq!(doc.attr("b"), Some("1"));
        assert_eq!(doc.attr("href"), Some("https://x.test"));
        assert_eq!(doc.attributes[0].0, "b");
        assert!(!doc.has_attr("u"));
    }

    #[test]
    fn test_empty_document_error() {
        assert!(matches!(parse(""), Err(Error::EmptyDocument)));
        assert!(matches!(parse("  \n "), Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_multiple_roots_error() {
        assert!(matches!(parse("<a/><b/>"), Err(Error::MultipleRoots)));
    }

    #[test]
    fn test_unclosed_element_error() {
        assert!(matches!(
            parse("<doc><p>"),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_mismatched_tags_error() {
        // quick-xml reports the mismatch as a syntax error.
        assert!(parse("<a></b>").is_err());
    }

    #[test]
    fn test_text_outside_root_error() {
        assert!(matches!(
            parse("<a/>stray"),
            Err(Error::MultipleRoots | Error::TextOutsideRoot { .. })
        ));
    }

    #[test]
    fn test_surrogate_pair_text_survives() {
        let doc = parse("<p>a\u{1F600}b</p>").unwrap();
        assert_eq!(doc.text(), "a\u{1F600}b");
    }
}
