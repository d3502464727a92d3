use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("document has no root element")]
    NoRoot,
    #[error("document has more than one root element (`{0}` follows the root)")]
    MultipleRoots(String),
    #[error("closing tag `{found}` does not match open element `{expected}`")]
    UnbalancedTag { expected: String, found: String },
    #[error("document ended inside element `{0}`")]
    Unterminated(String),
    #[error("invalid encoding: {0}")]
    Encoding(String),
}
