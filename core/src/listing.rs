//! Folder listings returned by `GetCollection`.
//!
//! Listings are displayed folders first, each group in case-insensitive name
//! order, with an optional `..` entry for navigating to the parent folder.

use std::cmp::Ordering;

use thiserror::Error;

use xstore_types::fields::{
    DETAIL, FOLDER, GET_COLLECTION, GET_COLLECTION_RESPONSE, IS_FOLDER, KEY, NAME, RECURSIVE, TUPLE,
};
use xstore_types::{PARENT_ENTRY_NAME, ParamTree, ROOT_FOLDER_KEY};
use xstore_xml::{Document, Element, PathError};

use crate::envelope::{Envelope, EnvelopeError, build_envelope};

/// Envelope → Body → response method element.
const RESPONSE_METHOD_PATH: &str = "/*/*[1]/*";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("Response method node not found.")]
    ResponseMethodNotFound,
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Orders two listing entries by name.
///
/// An entry without a non-empty `name` sorts before any named entry; two
/// nameless entries are equal so a stable sort keeps their input order.
#[must_use]
pub fn compare_entries(a: &Element, b: &Element) -> Ordering {
    let a_name = a.attr(NAME).filter(|n| !n.is_empty());
    let b_name = b.attr(NAME).filter(|n| !n.is_empty());
    match (a_name, b_name) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

fn is_folder_entry(entry: &Element) -> bool {
    entry.attr(IS_FOLDER) == Some("true")
}

/// Folder entries first, then files; each group sorted by [`compare_entries`].
#[must_use]
pub fn sort_entries(entries: Vec<Element>) -> Vec<Element> {
    let (mut folders, mut files): (Vec<Element>, Vec<Element>) =
        entries.into_iter().partition(is_folder_entry);
    folders.sort_by(compare_entries);
    files.sort_by(compare_entries);
    folders.extend(files);
    folders
}

/// Replaces the children of `container` with its sorted element children.
///
/// Text between entries is discarded.
pub fn sort_listing(container: &mut Element) {
    let entries = container.take_child_elements();
    let count = entries.len();
    for entry in sort_entries(entries) {
        container.push_child(entry);
    }
    tracing::debug!(entries = count, "Sorted listing");
}

/// Sorts the entries of a `GetCollection` response envelope in place.
pub fn sort_collection_response(response: &mut Document) -> Result<(), ListingError> {
    let method = response
        .select_element_mut(RESPONSE_METHOD_PATH)?
        .ok_or(ListingError::ResponseMethodNotFound)?;
    sort_listing(method);
    Ok(())
}

/// Key of the folder containing `folder_key`, or `None` for the root.
///
/// Everything before the last `/` is the parent; keys whose only `/` is the
/// leading one (or that have none) live directly under the root.
#[must_use]
pub fn parent_key(folder_key: &str) -> Option<String> {
    if folder_key.is_empty() || folder_key == ROOT_FOLDER_KEY {
        return None;
    }
    match folder_key.rfind('/') {
        Some(pos) if pos > 0 => Some(folder_key[..pos].to_string()),
        _ => Some(ROOT_FOLDER_KEY.to_string()),
    }
}

/// Prepends a `..` folder entry pointing at the parent of `folder_key`.
///
/// Returns `false` when nothing was added: root or empty keys, or a response
/// without a `GetCollectionResponse` element.
pub fn add_parent_folder_entry(response: &mut Document, folder_key: &str) -> bool {
    let Some(parent) = parent_key(folder_key) else {
        return false;
    };

    let method = match response.select_element_mut(&format!("//{GET_COLLECTION_RESPONSE}")) {
        Ok(Some(method)) => method,
        Ok(None) => return false,
        Err(err) => {
            tracing::debug!(%err, "Parent entry lookup failed");
            return false;
        }
    };

    let entry = Element::new(TUPLE)
        .with_attr(KEY, parent.as_str())
        .with_attr(NAME, PARENT_ENTRY_NAME)
        .with_attr(IS_FOLDER, "true");
    method.insert_child(0, entry);
    tracing::debug!(folder_key, parent = %parent, "Added parent folder entry");
    true
}

/// Points the first `folder` element under `request` at `key`.
///
/// Listings are always requested flat and without detail.
pub fn set_collection_request_key(request: &mut Element, key: &str) -> bool {
    let folder = match request.select_element_mut(&format!(".//{FOLDER}")) {
        Ok(Some(folder)) => folder,
        Ok(None) => return false,
        Err(err) => {
            tracing::debug!(%err, "Folder lookup failed");
            return false;
        }
    };
    folder.set_text(key);
    folder.set_attr(RECURSIVE, "false");
    folder.set_attr(DETAIL, "false");
    true
}

/// Builds a `GetCollection` request for `folder_key`.
pub fn collection_request(namespace: &str, folder_key: &str) -> Result<Envelope, EnvelopeError> {
    let params = ParamTree::new().empty(FOLDER)?;
    let mut envelope = build_envelope(namespace, GET_COLLECTION, Some(&params))?;
    set_collection_request_key(envelope.method_mut(), folder_key);
    Ok(envelope)
}
