//! Owned XML tree.
//!
//! Nodes are addressed by [`NodePath`] (child indices from the top element)
//! rather than parent pointers, so mutable lookups stay within plain
//! borrowing rules.

use std::{fmt, mem};

use crate::error::XmlError;
use crate::path::{self, PathError, Selection, Target, XPath};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Node::Element(value)
    }
}

/// Address of a node relative to an evaluation root.
///
/// The empty path is the virtual document node above the root element,
/// `[0]` is the root element itself, and every further index selects a child
/// node (text nodes included) of the previous element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    #[must_use]
    pub fn document() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn root() -> Self {
        Self(vec![0])
    }

    #[must_use]
    pub fn is_document(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, keeping its original position when it already exists.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(index).1)
    }

    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    #[must_use]
    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name == name)
    }

    pub fn first_child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.child_elements_mut().find(|e| e.name == name)
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Inserts `child` before the node at `index` (appends when out of range).
    pub fn insert_child(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.children.push(Node::Text(text));
        }
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Removes every child node and returns the element children in order.
    pub fn take_child_elements(&mut self) -> Vec<Element> {
        mem::take(&mut self.children)
            .into_iter()
            .filter_map(|node| match node {
                Node::Element(element) => Some(element),
                Node::Text(_) => None,
            })
            .collect()
    }

    /// Concatenated text of all descendants.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Concatenated text of the direct text children only.
    #[must_use]
    pub fn direct_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.clear();
        self.push_text(text);
    }

    #[must_use]
    pub fn has_text_child(&self) -> bool {
        self.children.iter().any(|n| matches!(n, Node::Text(_)))
    }

    /// Drops whitespace-only text nodes from this element and its descendants.
    pub fn strip_whitespace_text(&mut self) {
        self.children.retain(|node| match node {
            Node::Text(text) => !text.chars().all(char::is_whitespace),
            Node::Element(_) => true,
        });
        for child in self.child_elements_mut() {
            child.strip_whitespace_text();
        }
    }

    // ------------------------------------------------------------------------
    // Path addressing
    // ------------------------------------------------------------------------

    /// Element at `path`, treating `self` as the root element (`[0]`).
    #[must_use]
    pub fn element_at(&self, path: &NodePath) -> Option<&Element> {
        let (first, rest) = path.indices().split_first()?;
        if *first != 0 {
            return None;
        }
        let mut current = self;
        for index in rest {
            current = current.children.get(*index)?.as_element()?;
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &NodePath) -> Option<&mut Element> {
        let (first, rest) = path.indices().split_first()?;
        if *first != 0 {
            return None;
        }
        let mut current = self;
        for index in rest {
            current = current.children.get_mut(*index)?.as_element_mut()?;
        }
        Some(current)
    }

    /// Evaluates `expr` with this element as the context node.
    pub fn select_all(&self, expr: &str) -> Result<Vec<Selection>, PathError> {
        let xpath = XPath::parse(expr)?;
        Ok(self.select_compiled(&xpath))
    }

    #[must_use]
    pub fn select_compiled(&self, xpath: &XPath) -> Vec<Selection> {
        path::evaluate(self, &NodePath::root(), xpath)
    }

    /// First element selected by `expr`; attribute and text matches are skipped.
    pub fn select_element(&self, expr: &str) -> Result<Option<&Element>, PathError> {
        let selections = self.select_all(expr)?;
        Ok(first_element(self, &selections))
    }

    /// Address of the first element matched by `expr`.
    pub fn select_path(&self, expr: &str) -> Result<Option<NodePath>, PathError> {
        let selections = self.select_all(expr)?;
        Ok(selections
            .into_iter()
            .find(|s| s.target == Target::Element && self.element_at(&s.node).is_some())
            .map(|s| s.node))
    }

    pub fn select_element_mut(&mut self, expr: &str) -> Result<Option<&mut Element>, PathError> {
        let path = self.select_path(expr)?;
        Ok(path.and_then(move |p| self.element_at_mut(&p)))
    }

    /// Text value of the first match: element text, attribute value, or
    /// direct text for `text()`.
    pub fn value_of(&self, expr: &str) -> Result<Option<String>, PathError> {
        let xpath = XPath::parse(expr)?;
        Ok(self.value_of_compiled(&xpath))
    }

    #[must_use]
    pub fn value_of_compiled(&self, xpath: &XPath) -> Option<String> {
        self.select_compiled(xpath)
            .iter()
            .find_map(|selection| path::selection_value(self, selection))
    }
}

fn first_element<'a>(top: &'a Element, selections: &[Selection]) -> Option<&'a Element> {
    selections
        .iter()
        .filter(|s| s.target == Target::Element)
        .find_map(|s| top.element_at(&s.node))
}

/// A parsed document with exactly one root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    #[must_use]
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        crate::parse::parse_document(xml)
    }

    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    #[must_use]
    pub fn into_root(self) -> Element {
        self.root
    }

    #[must_use]
    pub fn to_xml_string(&self) -> String {
        crate::write::element_to_string(&self.root)
    }

    #[must_use]
    pub fn element_at(&self, path: &NodePath) -> Option<&Element> {
        self.root.element_at(path)
    }

    pub fn element_at_mut(&mut self, path: &NodePath) -> Option<&mut Element> {
        self.root.element_at_mut(path)
    }

    /// Evaluates `expr` with the document node as the context node.
    pub fn select_all(&self, expr: &str) -> Result<Vec<Selection>, PathError> {
        let xpath = XPath::parse(expr)?;
        Ok(self.select_compiled(&xpath))
    }

    #[must_use]
    pub fn select_compiled(&self, xpath: &XPath) -> Vec<Selection> {
        path::evaluate(&self.root, &NodePath::document(), xpath)
    }

    pub fn select_element(&self, expr: &str) -> Result<Option<&Element>, PathError> {
        let selections = self.select_all(expr)?;
        Ok(first_element(&self.root, &selections))
    }

    /// Address of the first element matched by `expr`.
    pub fn select_path(&self, expr: &str) -> Result<Option<NodePath>, PathError> {
        let selections = self.select_all(expr)?;
        Ok(selections
            .into_iter()
            .find(|s| s.target == Target::Element && self.root.element_at(&s.node).is_some())
            .map(|s| s.node))
    }

    /// All elements matched by `expr`, in document order.
    pub fn select_elements(&self, expr: &str) -> Result<Vec<&Element>, PathError> {
        let selections = self.select_all(expr)?;
        Ok(selections
            .iter()
            .filter(|s| s.target == Target::Element)
            .filter_map(|s| self.root.element_at(&s.node))
            .collect())
    }

    pub fn select_element_mut(&mut self, expr: &str) -> Result<Option<&mut Element>, PathError> {
        let path = self.select_path(expr)?;
        Ok(path.and_then(move |p| self.root.element_at_mut(&p)))
    }

    pub fn value_of(&self, expr: &str) -> Result<Option<String>, PathError> {
        let xpath = XPath::parse(expr)?;
        Ok(self
            .select_compiled(&xpath)
            .iter()
            .find_map(|selection| path::selection_value(&self.root, selection)))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml_string())
    }
}
