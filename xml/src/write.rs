//! Serializing elements back to text.

use quick_xml::escape::{escape, partial_escape};

use crate::dom::{Element, Node};

pub(crate) fn element_to_string(element: &Element) -> String {
    let mut out = String::new();
    write_element(element, &mut out);
    out
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.name());
    for (name, value) in element.attributes() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
    if element.children().is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in element.children() {
        match child {
            Node::Element(e) => write_element(e, out),
            Node::Text(text) => out.push_str(&partial_escape(text)),
        }
    }
    out.push_str("</");
    out.push_str(element.name());
    out.push('>');
}

impl Element {
    /// Serializes this element and its subtree.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        element_to_string(self)
    }
}
