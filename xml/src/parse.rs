//! Parsing text into [`Document`]s with `quick-xml`.
//!
//! Comments, processing instructions, declarations and doctypes are
//! dropped; CDATA sections become ordinary text.

use std::str;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::dom::{Document, Element};
use crate::error::XmlError;

pub(crate) fn parse_document(xml: &str) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| XmlError::Syntax {
            position,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                let element = start_element(&start, position)?;
                ensure_single_root(&root, &stack, &element)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = start_element(&start, position)?;
                ensure_single_root(&root, &stack, &element)?;
                close_element(element, &mut stack, &mut root);
            }
            Event::End(end) => {
                let found = utf8(end.name().as_ref())?;
                let Some(element) = stack.pop() else {
                    return Err(XmlError::UnbalancedTag {
                        expected: String::new(),
                        found,
                    });
                };
                if element.name() != found {
                    return Err(XmlError::UnbalancedTag {
                        expected: element.name().to_string(),
                        found,
                    });
                }
                close_element(element, &mut stack, &mut root);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| XmlError::Syntax {
                    position,
                    message: e.to_string(),
                })?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(text.into_owned());
                }
            }
            Event::CData(cdata) => {
                let text = utf8(&cdata.into_inner())?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(text);
                }
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unterminated(open.name().to_string()));
    }
    root.map(Document::new).ok_or(XmlError::NoRoot)
}

fn start_element(start: &BytesStart<'_>, position: u64) -> Result<Element, XmlError> {
    let mut element = Element::new(utf8(start.name().as_ref())?);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::Syntax {
            position,
            message: e.to_string(),
        })?;
        let name = utf8(attribute.key.as_ref())?;
        let value = attribute.unescape_value().map_err(|e| XmlError::Syntax {
            position,
            message: e.to_string(),
        })?;
        element.set_attr(name, value.into_owned());
    }
    Ok(element)
}

fn ensure_single_root(
    root: &Option<Element>,
    stack: &[Element],
    element: &Element,
) -> Result<(), XmlError> {
    if stack.is_empty() && root.is_some() {
        return Err(XmlError::MultipleRoots(element.name().to_string()));
    }
    Ok(())
}

fn close_element(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.push_child(element),
        None => *root = Some(element),
    }
}

fn utf8(bytes: &[u8]) -> Result<String, XmlError> {
    str::from_utf8(bytes)
        .map(ToString::to_string)
        .map_err(|e| XmlError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attributes_text_and_entities() {
        let doc = parse_document(r#"<a x="1 &amp; 2"><b>&lt;hi&gt;</b><c/></a>"#).unwrap();
        let root = doc.root();
        assert_eq!(root.name(), "a");
        assert_eq!(root.attr("x"), Some("1 & 2"));
        assert_eq!(root.first_child("b").unwrap().text(), "<hi>");
        assert!(root.first_child("c").unwrap().children().is_empty());
    }

    #[test]
    fn cdata_becomes_text_and_comments_are_dropped() {
        let doc = parse_document("<?xml version=\"1.0\"?><a><!-- note --><![CDATA[<raw>]]></a>").unwrap();
        assert_eq!(doc.root().children().len(), 1);
        assert_eq!(doc.root().text(), "<raw>");
    }

    #[test]
    fn rejects_empty_and_multiple_roots() {
        assert_eq!(parse_document("   "), Err(XmlError::NoRoot));
        assert!(matches!(
            parse_document("<a/><b/>"),
            Err(XmlError::MultipleRoots(name)) if name == "b"
        ));
    }

    #[test]
    fn rejects_unterminated_document() {
        assert!(parse_document("<a><b></b>").is_err());
    }

    #[test]
    fn rejects_mismatched_end_tag() {
        assert!(parse_document("<a><b></a></b>").is_err());
    }
}
