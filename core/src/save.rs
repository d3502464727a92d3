//! Saving documents back to the XML Store.
//!
//! The flow fills an update request template (a request whose body contains a
//! `tuple/new` container) with the document to store and submits it. Every
//! precondition is checked before the template is touched, so a failed save
//! never submits a partial request.

use thiserror::Error;

use xstore_types::fields::{KEY, LAST_MODIFIED, NAME, NEW, TUPLE, VERSION};
use xstore_types::ORGANIZATION_LEVEL;
use xstore_xml::{Document, Element};

use crate::envelope::Envelope;
use crate::prompt::{Prompt, report};
use crate::session::{RequestEvents, Session, SessionError, Transport};
use crate::tuple::TupleRecord;

const OVERWRITE_QUESTION: &str = "Do you want to overwrite the existing file?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    PreparingRequest,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("Model contains no data.")]
    NoModelData,
    #[error("Unable to extract the name from the key.")]
    NoNameInKey { key: String },
    #[error("Get request not set in the update model.")]
    MissingTemplate,
    #[error("Tuple new node not found from the update model.")]
    MissingNewContainer,
    #[error("Last modified attribute not found from the old tuple.")]
    MissingLastModified,
    #[error("Version attribute not found from the old tuple.")]
    MissingVersion,
    #[error("overwrite of shared document `{key}` declined")]
    Declined { key: String },
    #[error("Saving failed: {0}")]
    Transport(#[from] SessionError),
}

/// Document name: the text after the last `/`, when that `/` is not the
/// first character.
#[must_use]
pub fn name_from_key(key: &str) -> Option<&str> {
    match key.rfind('/') {
        Some(pos) if pos > 0 => Some(&key[pos + 1..]).filter(|name| !name.is_empty()),
        _ => None,
    }
}

/// Save/update flow around one update request template.
#[derive(Debug, Clone)]
pub struct SaveFlow {
    template: Option<Envelope>,
    state: SaveState,
    shared_version: String,
    save_version: String,
}

impl SaveFlow {
    #[must_use]
    pub fn new(template: Option<Envelope>) -> Self {
        Self {
            template,
            state: SaveState::PreparingRequest,
            shared_version: ORGANIZATION_LEVEL.to_string(),
            save_version: ORGANIZATION_LEVEL.to_string(),
        }
    }

    /// Overrides the version tag that requires confirmation and the version
    /// written on saved documents.
    #[must_use]
    pub fn with_versions(
        mut self,
        shared_version: impl Into<String>,
        save_version: impl Into<String>,
    ) -> Self {
        self.shared_version = shared_version.into();
        self.save_version = save_version.into();
        self
    }

    #[must_use]
    pub fn state(&self) -> SaveState {
        self.state
    }

    #[must_use]
    pub fn template(&self) -> Option<&Envelope> {
        self.template.as_ref()
    }

    /// Stores `payload` under `key`.
    ///
    /// `existing` is the listing or document data currently shown for the
    /// folder; an existing tuple for `key` supplies the `lastModified` token
    /// carried into the update. Failures are reported through `prompt`
    /// (except a declined confirmation) and leave the flow in
    /// [`SaveState::PreparingRequest`].
    pub fn save<T: Transport>(
        &mut self,
        session: &mut Session<T>,
        prompt: &mut dyn Prompt,
        existing: Option<&Document>,
        key: &str,
        payload: &Element,
    ) -> Result<Document, SaveError> {
        self.state = SaveState::PreparingRequest;

        let Some(existing) = existing else {
            return Err(report(prompt, SaveError::NoModelData));
        };
        let Some(name) = name_from_key(key) else {
            return Err(report(
                prompt,
                SaveError::NoNameInKey {
                    key: key.to_string(),
                },
            ));
        };
        let Some(template) = self.template.as_mut() else {
            return Err(report(prompt, SaveError::MissingTemplate));
        };

        let new_path = template
            .method()
            .select_path(&format!("//{TUPLE}/{NEW}"))
            .ok()
            .flatten();
        let Some(new_path) = new_path else {
            return Err(report(prompt, SaveError::MissingNewContainer));
        };
        let Some(tuple_path) = new_path.parent() else {
            return Err(report(prompt, SaveError::MissingNewContainer));
        };

        let last_modified = match find_tuple(existing, key) {
            Some(old) => {
                let Some(last_modified) = old.last_modified().filter(|v| !v.is_empty()) else {
                    return Err(report(prompt, SaveError::MissingLastModified));
                };
                let Some(level) = old.level().filter(|v| !v.is_empty()) else {
                    return Err(report(prompt, SaveError::MissingVersion));
                };
                if level == self.shared_version && !prompt.confirm(OVERWRITE_QUESTION) {
                    tracing::info!(key, "Overwrite of shared document declined");
                    return Err(SaveError::Declined {
                        key: key.to_string(),
                    });
                }
                Some(last_modified.to_string())
            }
            None => None,
        };

        let method = template.method_mut();
        let Some(tuple) = method.element_at_mut(&tuple_path) else {
            return Err(report(prompt, SaveError::MissingNewContainer));
        };
        tuple.set_attr(KEY, key);
        tuple.set_attr(NAME, name);
        tuple.set_attr(VERSION, self.save_version.as_str());
        match &last_modified {
            Some(token) => tuple.set_attr(LAST_MODIFIED, token.as_str()),
            None => {
                tuple.remove_attr(LAST_MODIFIED);
            }
        }

        let Some(new_container) = method.element_at_mut(&new_path) else {
            return Err(report(prompt, SaveError::MissingNewContainer));
        };
        new_container.clear_children();
        new_container.push_child(payload.clone());

        let response = session
            .execute(template, RequestEvents::new())
            .map_err(|e| report(prompt, SaveError::from(e)))?;

        self.state = SaveState::Submitted;
        tracing::info!(
            key,
            carried_last_modified = last_modified.is_some(),
            "Submitted XML Store update"
        );
        Ok(response)
    }
}

fn find_tuple<'a>(existing: &'a Document, key: &str) -> Option<TupleRecord<'a>> {
    let tuples = existing.select_elements(&format!("//{TUPLE}")).ok()?;
    tuples
        .into_iter()
        .filter_map(TupleRecord::new)
        .find(|record| record.key() == Some(key))
}
