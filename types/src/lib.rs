//! Core domain types for XML Store requests.
//!
//! This crate contains pure domain types with no IO and minimal dependencies:
//! validated XML names, parameter trees for request envelopes, and the field
//! names the XML Store service expects on the wire.

mod names;
mod params;

pub use names::{InvalidNameError, XmlName};
pub use params::{ATTRIBUTE_MARKER, Param, ParamError, ParamTree, ParamValue};

// ============================================================================
// XML Store wire names
// ============================================================================

/// Element and attribute names fixed by the XML Store service.
pub mod fields {
    pub const TUPLE: &str = "tuple";
    pub const OLD: &str = "old";
    pub const NEW: &str = "new";

    pub const KEY: &str = "key";
    pub const NAME: &str = "name";
    pub const IS_FOLDER: &str = "isFolder";
    pub const LAST_MODIFIED: &str = "lastModified";
    pub const LEVEL: &str = "level";
    pub const VERSION: &str = "version";

    pub const FOLDER: &str = "folder";
    pub const RECURSIVE: &str = "recursive";
    pub const DETAIL: &str = "detail";

    pub const GET_COLLECTION: &str = "GetCollection";
    pub const GET_COLLECTION_RESPONSE: &str = "GetCollectionResponse";
    pub const GET_XML_OBJECT: &str = "GetXMLObject";
}

/// Namespace of the XML Store service methods.
pub const XML_STORE_NAMESPACE: &str = "http://schemas.cordys.com/1.0/xmlstore";

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Version tag of documents shared across the whole organization.
pub const ORGANIZATION_LEVEL: &str = "organization";

/// Display name of the synthesized parent-folder entry.
pub const PARENT_ENTRY_NAME: &str = "..";

/// Root folder key; it has no parent.
pub const ROOT_FOLDER_KEY: &str = "/";
