//! Parameter trees for request envelopes.
//!
//! A [`ParamTree`] is an ordered list of entries, each either an attribute on
//! the enclosing element or a child element. Entries are declared through the
//! builder methods rather than inferred from key spelling; the legacy `@`
//! marker convention is only understood by [`ParamTree::from_marked_json`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::names::{InvalidNameError, XmlName};

/// Marker prefix that designates an attribute key in marked JSON input.
pub const ATTRIBUTE_MARKER: char = '@';

/// Content of a child element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// No content: `<name/>`.
    #[default]
    Empty,
    Text(String),
    Tree(ParamTree),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Param {
    Attribute { name: XmlName, value: String },
    Element { name: XmlName, value: ParamValue },
}

impl Param {
    #[must_use]
    pub fn name(&self) -> &XmlName {
        match self {
            Param::Attribute { name, .. } | Param::Element { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),
    #[error("attribute `{0}` is declared more than once on the same element")]
    DuplicateAttribute(String),
    #[error("element `{0}` is declared more than once under the same parent")]
    DuplicateElement(String),
    #[error("value for `{key}` cannot be mapped to XML: {reason}")]
    UnsupportedValue { key: String, reason: &'static str },
    #[error("marked parameters must be a JSON object")]
    NotAnObject,
}

/// Ordered attribute/element entries for one element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamTree {
    entries: Vec<Param>,
}

impl ParamTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute entry.
    pub fn attr(mut self, name: impl AsRef<str>, value: impl ToString) -> Result<Self, ParamError> {
        self.entries.push(Param::Attribute {
            name: XmlName::new(name.as_ref())?,
            value: value.to_string(),
        });
        Ok(self)
    }

    /// Appends a child element with text content.
    pub fn text(mut self, name: impl AsRef<str>, value: impl ToString) -> Result<Self, ParamError> {
        self.entries.push(Param::Element {
            name: XmlName::new(name.as_ref())?,
            value: ParamValue::Text(value.to_string()),
        });
        Ok(self)
    }

    /// Appends a childless element.
    pub fn empty(mut self, name: impl AsRef<str>) -> Result<Self, ParamError> {
        self.entries.push(Param::Element {
            name: XmlName::new(name.as_ref())?,
            value: ParamValue::Empty,
        });
        Ok(self)
    }

    /// Appends a child element populated from a nested tree.
    pub fn tree(mut self, name: impl AsRef<str>, subtree: ParamTree) -> Result<Self, ParamError> {
        self.entries.push(Param::Element {
            name: XmlName::new(name.as_ref())?,
            value: ParamValue::Tree(subtree),
        });
        Ok(self)
    }

    pub fn push(&mut self, param: Param) {
        self.entries.push(param);
    }

    #[must_use]
    pub fn entries(&self) -> &[Param] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks the whole tree for sibling collisions.
    ///
    /// Attributes and elements live in separate namespaces: `@a` next to `a`
    /// is fine, two `a` elements (or two `a` attributes) are not.
    pub fn validate(&self) -> Result<(), ParamError> {
        let mut attributes = HashSet::new();
        let mut elements = HashSet::new();
        for entry in &self.entries {
            match entry {
                Param::Attribute { name, .. } => {
                    if !attributes.insert(name.as_str()) {
                        return Err(ParamError::DuplicateAttribute(name.to_string()));
                    }
                }
                Param::Element { name, value } => {
                    if !elements.insert(name.as_str()) {
                        return Err(ParamError::DuplicateElement(name.to_string()));
                    }
                    if let ParamValue::Tree(subtree) = value {
                        subtree.validate()?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Builds a tree from a JSON object using the `@` attribute marker.
    ///
    /// Keys starting with `@` become attributes with the marker stripped and
    /// the value coerced to text. Other keys become elements: objects recurse,
    /// `null` produces an empty element, scalars become text. Arrays have no
    /// element mapping and are rejected.
    pub fn from_marked_json(value: &Value) -> Result<Self, ParamError> {
        let Value::Object(map) = value else {
            return Err(ParamError::NotAnObject);
        };

        let mut tree = ParamTree::new();
        for (key, value) in map {
            if let Some(stripped) = key.strip_prefix(ATTRIBUTE_MARKER) {
                let text = scalar_text(key, value)?.unwrap_or_default();
                tree.push(Param::Attribute {
                    name: XmlName::new(stripped)?,
                    value: text,
                });
                continue;
            }

            let name = XmlName::new(key.as_str())?;
            let value = match value {
                Value::Null => ParamValue::Empty,
                Value::Object(_) => ParamValue::Tree(Self::from_marked_json(value)?),
                other => match scalar_text(key, other)? {
                    Some(text) => ParamValue::Text(text),
                    None => ParamValue::Empty,
                },
            };
            tree.push(Param::Element { name, value });
        }
        tree.validate()?;
        Ok(tree)
    }
}

fn scalar_text(key: &str, value: &Value) -> Result<Option<String>, ParamError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(_) => Err(ParamError::UnsupportedValue {
            key: key.to_string(),
            reason: "arrays have no element mapping",
        }),
        Value::Object(_) => Err(ParamError::UnsupportedValue {
            key: key.to_string(),
            reason: "attribute values must be scalars",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_keeps_declaration_order() {
        let tree = ParamTree::new()
            .text("folder", "/a")
            .unwrap()
            .attr("recursive", false)
            .unwrap()
            .empty("detail")
            .unwrap();

        let names: Vec<&str> = tree.entries().iter().map(|p| p.name().as_str()).collect();
        assert_eq!(names, vec!["folder", "recursive", "detail"]);
        assert!(matches!(
            &tree.entries()[1],
            Param::Attribute { value, .. } if value == "false"
        ));
    }

    #[test]
    fn builder_rejects_invalid_name() {
        let err = ParamTree::new().text("bad name", "x").unwrap_err();
        assert!(matches!(err, ParamError::InvalidName(_)));
    }

    #[test]
    fn validate_rejects_duplicate_attribute() {
        let tree = ParamTree::new()
            .attr("a", "1")
            .unwrap()
            .attr("a", "2")
            .unwrap();
        assert_eq!(
            tree.validate(),
            Err(ParamError::DuplicateAttribute("a".to_string()))
        );
    }

    #[test]
    fn validate_rejects_nested_duplicate_element() {
        let inner = ParamTree::new().empty("x").unwrap().empty("x").unwrap();
        let tree = ParamTree::new().tree("outer", inner).unwrap();
        assert_eq!(
            tree.validate(),
            Err(ParamError::DuplicateElement("x".to_string()))
        );
    }

    #[test]
    fn attribute_and_element_may_share_a_name() {
        let tree = ParamTree::new()
            .attr("key", "1")
            .unwrap()
            .text("key", "2")
            .unwrap();
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn from_marked_json_maps_markers() {
        let tree = ParamTree::from_marked_json(&json!({
            "@recursive": "false",
            "@depth": 2,
            "folder": "/a/b",
            "filter": null,
            "paging": { "@size": true, "offset": 10 }
        }))
        .unwrap();

        let attrs: Vec<(&str, &str)> = tree
            .entries()
            .iter()
            .filter_map(|p| match p {
                Param::Attribute { name, value } => Some((name.as_str(), value.as_str())),
                Param::Element { .. } => None,
            })
            .collect();
        assert!(attrs.contains(&("recursive", "false")));
        assert!(attrs.contains(&("depth", "2")));

        let paging = tree
            .entries()
            .iter()
            .find(|p| p.name().as_str() == "paging")
            .unwrap();
        let Param::Element {
            value: ParamValue::Tree(sub),
            ..
        } = paging
        else {
            panic!("paging should be a subtree");
        };
        assert_eq!(sub.len(), 2);

        let filter = tree
            .entries()
            .iter()
            .find(|p| p.name().as_str() == "filter")
            .unwrap();
        assert!(matches!(
            filter,
            Param::Element {
                value: ParamValue::Empty,
                ..
            }
        ));
    }

    #[test]
    fn from_marked_json_rejects_arrays() {
        let err = ParamTree::from_marked_json(&json!({ "items": [1, 2] })).unwrap_err();
        assert!(matches!(err, ParamError::UnsupportedValue { .. }));
        assert_eq!(
            ParamTree::from_marked_json(&json!("x")),
            Err(ParamError::NotAnObject)
        );
    }

    #[test]
    fn from_marked_json_rejects_bare_marker() {
        let err = ParamTree::from_marked_json(&json!({ "@": "x" })).unwrap_err();
        assert!(matches!(err, ParamError::InvalidName(InvalidNameError::Empty)));
    }
}
