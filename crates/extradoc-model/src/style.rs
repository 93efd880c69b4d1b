/*
 * style.rs
 * Copyright (c) 2026 ExtraDoc contributors
 */

//! Style property sets and the class table resolved on pull.
//!
//! Every property is individually optional; `None` means "not set here",
//! which the differ distinguishes from an explicit value. Field-mask paths
//! use the wire spelling (camelCase) and live next to each property's
//! accessor in the differ, not here.

use extradoc_xml::XmlElement;
use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named paragraph style, mirroring the target API's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NamedStyleType {
    NormalText,
    Title,
    Subtitle,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
}

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Alignment {
    Start,
    Center,
    End,
    Justified,
}

/// Vertical offset of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaselineOffset {
    Superscript,
    Subscript,
}

/// Vertical content alignment inside a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentAlignment {
    Top,
    Middle,
    Bottom,
}

/// Character-level style attributes of a text run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_caps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_offset: Option<BaselineOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font weight (100–900) paired with the family on the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    /// Size in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// `#rrggbb` hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Link target URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl TextStyle {
    /// True when no property is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `other` on top of `self`: set properties of `other` win.
    pub fn merged_with(&self, other: &TextStyle) -> TextStyle {
        TextStyle {
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            underline: other.underline.or(self.underline),
            strikethrough: other.strikethrough.or(self.strikethrough),
            small_caps: other.small_caps.or(self.small_caps),
            baseline_offset: other.baseline_offset.or(self.baseline_offset),
            font_family: other.font_family.clone().or_else(|| self.font_family.clone()),
            weight: other.weight.or(self.weight),
            font_size: other.font_size.or(self.font_size),
            foreground_color: other
                .foreground_color
                .clone()
                .or_else(|| self.foreground_color.clone()),
            background_color: other
                .background_color
                .clone()
                .or_else(|| self.background_color.clone()),
            link: other.link.clone().or_else(|| self.link.clone()),
        }
    }
}

/// Paragraph-level style attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_style_type: Option<NamedStyleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<f64>,
    /// Indents and spacing in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_first_line: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_above: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_below: Option<f64>,
}

impl ParagraphStyle {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn merged_with(&self, other: &ParagraphStyle) -> ParagraphStyle {
        ParagraphStyle {
            named_style_type: other.named_style_type.or(self.named_style_type),
            alignment: other.alignment.or(self.alignment),
            line_spacing: other.line_spacing.or(self.line_spacing),
            indent_start: other.indent_start.or(self.indent_start),
            indent_first_line: other.indent_first_line.or(self.indent_first_line),
            space_above: other.space_above.or(self.space_above),
            space_below: other.space_below.or(self.space_below),
        }
    }
}

/// Table cell style attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_alignment: Option<ContentAlignment>,
}

impl CellStyle {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One entry of the style table: a class carrying text and/or paragraph
/// properties that snapshot elements reference by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleClass {
    pub text: TextStyle,
    pub paragraph: ParagraphStyle,
}

/// The parsed style table (`styles.xml`), class name to property sets.
///
/// Insertion order is preserved so that emitted payloads are deterministic
/// regardless of how the table was produced.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    classes: LinkedHashMap<String, StyleClass>,
}

/// Errors raised while parsing a style table.
#[derive(Debug, Clone, Error)]
pub enum StyleTableError {
    #[error("style table XML: {0}")]
    Xml(#[from] extradoc_xml::Error),

    #[error("style table root must be <styles>, found <{0}>")]
    BadRoot(String),

    #[error("style entry missing name attribute")]
    MissingName,

    #[error("duplicate style class {0:?}")]
    DuplicateClass(String),

    #[error("style class {class:?}: bad value {value:?} for {attribute}")]
    BadValue {
        class: String,
        attribute: &'static str,
        value: String,
    },
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a class by name.
    pub fn get(&self, name: &str) -> Option<&StyleClass> {
        self.classes.get(name)
    }

    pub fn insert(&mut self, name: String, class: StyleClass) {
        self.classes.insert(name, class);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Parse the `<styles>` document into a table.
    pub fn parse(content: &str) -> Result<Self, StyleTableError> {
        let root = extradoc_xml::parse(content)?;
        if root.name != "styles" {
            return Err(StyleTableError::BadRoot(root.name));
        }

        let mut table = Self::new();
        for entry in root.child_elements() {
            if entry.name != "style" {
                continue;
            }
            let name = entry
                .attr("name")
                .ok_or(StyleTableError::MissingName)?
                .to_string();
            if table.classes.contains_key(&name) {
                return Err(StyleTableError::DuplicateClass(name));
            }
            let class = parse_style_class(entry, &name)?;
            table.insert(name, class);
        }
        Ok(table)
    }
}

fn parse_style_class(el: &XmlElement, class: &str) -> Result<StyleClass, StyleTableError> {
    let flag = |name: &str| el.attr(name).map(|v| v == "1");
    let number = |name: &'static str| -> Result<Option<f64>, StyleTableError> {
        el.attr(name)
            .map(|v| {
                v.parse::<f64>().map_err(|_| StyleTableError::BadValue {
                    class: class.to_string(),
                    attribute: name,
                    value: v.to_string(),
                })
            })
            .transpose()
    };

    let text = TextStyle {
        bold: flag("b"),
        italic: flag("i"),
        underline: flag("u"),
        strikethrough: flag("st"),
        small_caps: flag("sc"),
        baseline_offset: match el.attr("off") {
            Some("SUPER") => Some(BaselineOffset::Superscript),
            Some("SUB") => Some(BaselineOffset::Subscript),
            Some(other) => {
                return Err(StyleTableError::BadValue {
                    class: class.to_string(),
                    attribute: "off",
                    value: other.to_string(),
                });
            }
            None => None,
        },
        font_family: el.attr("font").map(str::to_string),
        weight: el
            .attr("weight")
            .map(|v| {
                v.parse::<u16>().map_err(|_| StyleTableError::BadValue {
                    class: class.to_string(),
                    attribute: "weight",
                    value: v.to_string(),
                })
            })
            .transpose()?,
        font_size: number("size")?,
        foreground_color: el.attr("fg").map(str::to_string),
        background_color: el.attr("bgc").map(str::to_string),
        link: el.attr("href").map(str::to_string),
    };

    let paragraph = ParagraphStyle {
        named_style_type: None,
        alignment: match el.attr("align") {
            Some("START") => Some(Alignment::Start),
            Some("CENTER") => Some(Alignment::Center),
            Some("END") => Some(Alignment::End),
            Some("JUSTIFIED") => Some(Alignment::Justified),
            Some(other) => {
                return Err(StyleTableError::BadValue {
                    class: class.to_string(),
                    attribute: "align",
                    value: other.to_string(),
                });
            }
            None => None,
        },
        line_spacing: number("spacing")?,
        indent_start: number("indent")?,
        indent_first_line: number("indentFirst")?,
        space_above: number("spaceAbove")?,
        space_below: number("spaceBelow")?,
    };

    Ok(StyleClass { text, paragraph })
}
