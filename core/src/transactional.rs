//! Conversion of plain data documents into transactional form.
//!
//! Data-bound tables expect every record wrapped as `tuple/old`. The
//! conversion splits a source document at a path and wraps each match.

use thiserror::Error;

use xstore_types::fields::{OLD, TUPLE};
use xstore_xml::{Document, Element, PathError, Target};

const DATASET: &str = "dataset";
const DATA: &str = "data";
const GET_REQUEST_RESPONSE: &str = "GetRequestResponse";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("Error found in transformation: {0}")]
    InvalidSplitPath(#[from] PathError),
}

/// Builds `dataset/data/GetRequestResponse` holding one `tuple/old` per node
/// selected by `split_path`.
///
/// Attributes of the source's `/dataset/data/*` elements are copied onto
/// `GetRequestResponse`; the first occurrence of a name wins.
pub fn to_transactional(source: &Document, split_path: &str) -> Result<Document, TransformError> {
    let selections = source.select_all(split_path).map_err(|err| {
        tracing::warn!(%err, split_path, "Transactional conversion failed");
        TransformError::from(err)
    })?;

    let mut response = Element::new(GET_REQUEST_RESPONSE);
    for data in source.select_elements("/dataset/data/*")? {
        for (name, value) in data.attributes() {
            if response.attr(name).is_none() {
                response.set_attr(name, value);
            }
        }
    }

    let mut count = 0usize;
    for selection in &selections {
        let mut old = Element::new(OLD);
        match &selection.target {
            Target::Element if selection.node.is_document() => {
                old.push_child(source.root().clone());
            }
            Target::Element => {
                let Some(element) = source.element_at(&selection.node) else {
                    continue;
                };
                old.push_child(element.clone());
            }
            Target::Attribute(name) => {
                let Some(value) = source.element_at(&selection.node).and_then(|e| e.attr(name))
                else {
                    continue;
                };
                old.set_attr(name.as_str(), value);
            }
            Target::Text => {
                let Some(element) = source.element_at(&selection.node) else {
                    continue;
                };
                old.push_text(element.direct_text());
            }
        }
        response.push_child(Element::new(TUPLE).with_child(old));
        count += 1;
    }

    tracing::debug!(split_path, tuples = count, "Converted document to transactional form");
    Ok(Document::new(
        Element::new(DATASET).with_child(Element::new(DATA).with_child(response)),
    ))
}
