//! Password field codec.
//!
//! Password values are stored Base64-encoded in the bound data and shown
//! decoded in the field.

use std::string::FromUtf8Error;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

use xstore_xml::Element;

/// Accepts missing padding and non-zero trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("invalid Base64 password value: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded password is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),
}

#[must_use]
pub fn encode_field(plain: &str) -> String {
    STANDARD.encode(plain.replace("\r\n", "\n"))
}

/// Decodes a stored value. Characters outside the Base64 alphabet are
/// ignored, as is padding.
pub fn decode_field(encoded: &str) -> Result<String, PasswordError> {
    let cleaned: String = encoded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/'))
        .collect();
    let bytes = LENIENT.decode(cleaned)?;
    Ok(String::from_utf8(bytes)?)
}

/// Fired before a password field binds to its data node.
#[derive(Debug)]
pub struct DataBindEvent<'a> {
    pub data_node: Option<&'a mut Element>,
}

/// Fired after the user changed a password field.
#[derive(Debug)]
pub struct ValueChangedEvent<'a> {
    pub value: &'a str,
    pub data_node: Option<&'a mut Element>,
}

/// Replaces the bound node's encoded text with the plain value.
///
/// Without a data node nothing happens. On a decode error the node is left
/// unchanged.
pub fn on_data_bind(event: DataBindEvent<'_>) -> Result<(), PasswordError> {
    let Some(node) = event.data_node else {
        return Ok(());
    };
    let plain = decode_field(&node.text())?;
    node.set_text(plain);
    Ok(())
}

/// Writes the encoded field value into the bound node, when there is one.
pub fn on_value_changed(event: ValueChangedEvent<'_>) {
    if let Some(node) = event.data_node {
        node.set_text(encode_field(event.value));
        tracing::debug!(node = node.name(), "Stored encoded password value");
    }
}
