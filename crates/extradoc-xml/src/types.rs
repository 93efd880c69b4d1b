//! Element tree produced by the parser.

/// An element in a parsed snapshot.
///
/// Attributes keep document order; duplicate attribute names keep the first
/// occurrence (quick-xml rejects true duplicates before we see them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Tag name.
    pub name: String,

    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,

    /// Child nodes in document order. Text nodes are verbatim.
    pub children: Vec<XmlNode>,

    /// Byte offset of the `<` that opened this element, for diagnostics.
    pub offset: usize,
}

/// A child of an element: nested element or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// True when the attribute is present, even with an empty value.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|(k, _)| k == name)
    }

    /// Child elements only, skipping text nodes.
    pub fn child_elements(&self) -> Vec<&XmlElement> {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Element(e) => Some(e),
                XmlNode::Text(_) => None,
            })
            .collect()
    }

    /// Concatenated text of all direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlNode::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    /// True when the element has no children at all.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
