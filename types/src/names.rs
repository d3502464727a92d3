//! Validated XML element and attribute names.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An element or attribute name that is safe to emit verbatim.
///
/// Qualified names (`SOAP:Envelope`) are accepted; namespace resolution is
/// left to the receiving service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct XmlName(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidNameError {
    #[error("XML name must not be empty")]
    Empty,
    #[error("XML name `{name}` must not start with {first:?}")]
    BadStart { name: String, first: char },
    #[error("XML name `{name}` contains forbidden character {ch:?}")]
    ForbiddenChar { name: String, ch: char },
}

impl XmlName {
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidNameError> {
        let value = value.into();
        let Some(first) = value.chars().next() else {
            return Err(InvalidNameError::Empty);
        };
        if first.is_ascii_digit() || first == '-' || first == '.' {
            return Err(InvalidNameError::BadStart { name: value, first });
        }
        if let Some(ch) = value.chars().find(|c| is_forbidden(*c)) {
            return Err(InvalidNameError::ForbiddenChar { name: value, ch });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn is_forbidden(ch: char) -> bool {
    ch.is_whitespace() || ch.is_control() || matches!(ch, '<' | '>' | '&' | '"' | '\'' | '/' | '=')
}

impl TryFrom<String> for XmlName {
    type Error = InvalidNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for XmlName {
    type Error = InvalidNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<XmlName> for String {
    fn from(value: XmlName) -> Self {
        value.0
    }
}

impl Deref for XmlName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for XmlName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
