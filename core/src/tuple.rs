//! Tuple records and field resolution.
//!
//! A tuple is the host platform's data-binding record: a `tuple` element that
//! may hold an `old` (persisted) and a `new` (pending) variant of the same
//! payload. Field lookups prefer the pending variant.

use xstore_types::fields::{IS_FOLDER, KEY, LAST_MODIFIED, LEVEL, NAME, NEW, OLD, TUPLE};
use xstore_xml::{Document, Element};

/// How [`resolve_field`] interprets its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookup {
    /// Search `new/*/path`, then `old/*/path`, then `path` on tuple elements.
    #[default]
    Tuple,
    /// Evaluate `path` as written.
    Absolute,
}

/// Resolves `path` against `node`, returning the first match's text.
///
/// Missing paths are not errors. Paths the engine cannot parse are treated as
/// not found.
#[must_use]
pub fn resolve_field(node: &Element, path: &str, lookup: Lookup) -> Option<String> {
    if lookup == Lookup::Tuple && node.name() == TUPLE {
        for variant in [NEW, OLD] {
            let scoped = format!("{variant}/*/{path}");
            if let Some(value) = lookup_value(node, &scoped) {
                return Some(value);
            }
        }
    }
    lookup_value(node, path)
}

/// Like [`resolve_field`] but falls back to `default`.
#[must_use]
pub fn resolve_field_or(node: &Element, path: &str, default: &str, lookup: Lookup) -> String {
    resolve_field(node, path, lookup).unwrap_or_else(|| default.to_string())
}

/// Resolves against the document's root element.
#[must_use]
pub fn resolve_document_field(document: &Document, path: &str, lookup: Lookup) -> Option<String> {
    resolve_field(document.root(), path, lookup)
}

fn lookup_value(node: &Element, path: &str) -> Option<String> {
    match node.value_of(path) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(%err, "Unresolvable field path treated as missing");
            None
        }
    }
}

/// Read-only view over a `tuple` element.
#[derive(Debug, Clone, Copy)]
pub struct TupleRecord<'a> {
    element: &'a Element,
}

impl<'a> TupleRecord<'a> {
    /// Returns `None` unless `element` is a `tuple`.
    #[must_use]
    pub fn new(element: &'a Element) -> Option<Self> {
        (element.name() == TUPLE).then_some(Self { element })
    }

    #[must_use]
    pub fn element(&self) -> &'a Element {
        self.element
    }

    #[must_use]
    pub fn key(&self) -> Option<&'a str> {
        self.element.attr(KEY)
    }

    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        self.element.attr(NAME)
    }

    /// Only the exact string `"true"` marks a folder.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.element.attr(IS_FOLDER) == Some("true")
    }

    #[must_use]
    pub fn last_modified(&self) -> Option<&'a str> {
        self.element.attr(LAST_MODIFIED)
    }

    #[must_use]
    pub fn level(&self) -> Option<&'a str> {
        self.element.attr(LEVEL)
    }

    /// The `old` container.
    #[must_use]
    pub fn old(&self) -> Option<&'a Element> {
        self.element.first_child(OLD)
    }

    /// The `new` container.
    #[must_use]
    pub fn new_variant(&self) -> Option<&'a Element> {
        self.element.first_child(NEW)
    }

    /// Payload element, preferring the pending variant.
    #[must_use]
    pub fn current_payload(&self) -> Option<&'a Element> {
        self.new_variant()
            .and_then(|n| n.child_elements().next())
            .or_else(|| self.old().and_then(|o| o.child_elements().next()))
    }

    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<String> {
        resolve_field(self.element, path, Lookup::Tuple)
    }

    #[must_use]
    pub fn resolve_or(&self, path: &str, default: &str) -> String {
        resolve_field_or(self.element, path, default, Lookup::Tuple)
    }
}
