//! XML document model for XML Store data.
//!
//! Provides an owned element tree, a `quick-xml` based parser and
//! serializer, and a small path-expression engine for locating nodes.

mod dom;
mod error;
mod parse;
pub mod path;
mod write;

pub use dom::{Document, Element, Node, NodePath};
pub use error::XmlError;
pub use path::{PathError, Selection, Target, XPath};
