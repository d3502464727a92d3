//! SOAP request envelopes.
//!
//! An [`Envelope`] wraps exactly one namespace-qualified method element in
//! `SOAP:Envelope/SOAP:Body`. The method element is populated from a
//! [`ParamTree`]: attribute entries become attributes, element entries become
//! child elements (recursively for nested trees).

use std::fmt;

use thiserror::Error;

use xstore_types::{
    InvalidNameError, Param, ParamError, ParamTree, ParamValue, SOAP_ENVELOPE_NAMESPACE, XmlName,
};
use xstore_xml::{Document, Element, XmlError};

const ENVELOPE_ELEMENT: &str = "SOAP:Envelope";
const BODY_ELEMENT: &str = "SOAP:Body";
const SOAP_PREFIX_DECLARATION: &str = "xmlns:SOAP";
const NAMESPACE_ATTRIBUTE: &str = "xmlns";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("invalid method name: {0}")]
    MethodName(#[from] InvalidNameError),
    #[error("invalid request parameters: {0}")]
    Params(#[from] ParamError),
    #[error("parameter attribute `{0}` would replace the method namespace")]
    NamespaceOverride(String),
    #[error("request is not a SOAP envelope: {0}")]
    NotAnEnvelope(&'static str),
    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// A request envelope around a single method element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    method: Element,
}

/// Builds a request envelope for `method` in `namespace`.
///
/// `None` parameters produce a method element carrying only its namespace
/// declaration. Parameter trees are validated first, so sibling name
/// collisions are rejected before anything is built, as is a top-level
/// `xmlns` attribute that would move the method out of `namespace`.
pub fn build_envelope(
    namespace: &str,
    method: &str,
    params: Option<&ParamTree>,
) -> Result<Envelope, EnvelopeError> {
    let method = XmlName::new(method)?;
    let mut element = Element::new(method.as_str()).with_attr(NAMESPACE_ATTRIBUTE, namespace);

    if let Some(params) = params {
        params.validate()?;
        if let Some(name) = params.entries().iter().find_map(|entry| match entry {
            Param::Attribute { name, .. } if name.as_str() == NAMESPACE_ATTRIBUTE => {
                Some(name.to_string())
            }
            _ => None,
        }) {
            return Err(EnvelopeError::NamespaceOverride(name));
        }
        apply_params(&mut element, params);
    }

    tracing::debug!(
        method = %method,
        namespace,
        params = params.map_or(0, ParamTree::len),
        "Built request envelope"
    );
    Ok(Envelope { method: element })
}

fn apply_params(element: &mut Element, params: &ParamTree) {
    for entry in params.entries() {
        match entry {
            Param::Attribute { name, value } => element.set_attr(name.as_str(), value.as_str()),
            Param::Element { name, value } => {
                let mut child = Element::new(name.as_str());
                match value {
                    ParamValue::Empty => {}
                    ParamValue::Text(text) => child.set_text(text.as_str()),
                    ParamValue::Tree(subtree) => apply_params(&mut child, subtree),
                }
                element.push_child(child);
            }
        }
    }
}

impl Envelope {
    /// Wraps an existing request document, e.g. a stored request template.
    ///
    /// The document must be `*:Envelope` containing a `*:Body` whose first
    /// child element is the method.
    pub fn from_document(document: Document) -> Result<Self, EnvelopeError> {
        let mut root = document.into_root();
        if local_name(root.name()) != "Envelope" {
            return Err(EnvelopeError::NotAnEnvelope("root element is not Envelope"));
        }
        let mut body = root
            .take_child_elements()
            .into_iter()
            .find(|e| local_name(e.name()) == "Body")
            .ok_or(EnvelopeError::NotAnEnvelope("Envelope has no Body"))?;
        let method = body
            .take_child_elements()
            .into_iter()
            .next()
            .ok_or(EnvelopeError::NotAnEnvelope("Body has no method element"))?;
        Ok(Self { method })
    }

    pub fn parse(xml: &str) -> Result<Self, EnvelopeError> {
        Self::from_document(Document::parse(xml)?)
    }

    #[must_use]
    pub fn method(&self) -> &Element {
        &self.method
    }

    pub fn method_mut(&mut self) -> &mut Element {
        &mut self.method
    }

    #[must_use]
    pub fn method_name(&self) -> &str {
        self.method.name()
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.method.attr(NAMESPACE_ATTRIBUTE)
    }

    /// Serialized method element without the SOAP wrapper.
    #[must_use]
    pub fn method_xml(&self) -> String {
        self.method.to_xml_string()
    }

    #[must_use]
    pub fn to_document(&self) -> Document {
        let body = Element::new(BODY_ELEMENT).with_child(self.method.clone());
        let envelope = Element::new(ENVELOPE_ELEMENT)
            .with_attr(SOAP_PREFIX_DECLARATION, SOAP_ENVELOPE_NAMESPACE)
            .with_child(body);
        Document::new(envelope)
    }

    #[must_use]
    pub fn to_xml(&self) -> String {
        self.to_document().to_xml_string()
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}
