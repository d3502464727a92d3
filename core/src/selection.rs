//! Selection handling for tables bound to `GetCollection` listings.

use thiserror::Error;

use xstore_types::{ParamError, ParamTree};
use xstore_types::fields::{GET_XML_OBJECT, IS_FOLDER, KEY, NAME, OLD, TUPLE};
use xstore_xml::{Element, PathError};

use crate::prompt::{Prompt, report};
use crate::session::{RequestEvents, Session, SessionError, Transport};

/// Why the host fired a selection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectKind {
    /// The table selected its first row while initializing.
    Initial,
    /// The user picked a row.
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEvent {
    pub kind: SelectKind,
}

/// What the user selected in an XML Store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlStoreSelection {
    pub key: String,
    pub is_folder: bool,
    pub name: Option<String>,
    /// Stored document content, when it was fetched.
    pub data: Option<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Key not found from the tuple.")]
    MissingKey,
    #[error("Selected object does not contain valid data.")]
    NoData { key: String },
    #[error(transparent)]
    Params(#[from] ParamError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Turns the current row of a listing table into a selection.
///
/// Returns `Ok(None)` for initialization events and when no row is current.
pub fn read_selection(
    event: &SelectionEvent,
    current: Option<&Element>,
    prompt: &mut dyn Prompt,
) -> Result<Option<XmlStoreSelection>, SelectionError> {
    if event.kind == SelectKind::Initial {
        return Ok(None);
    }
    let Some(current) = current else {
        return Ok(None);
    };

    let Some(key) = current.attr(KEY) else {
        return Err(report(prompt, SelectionError::MissingKey));
    };

    Ok(Some(XmlStoreSelection {
        key: key.to_string(),
        is_folder: current.attr(IS_FOLDER) == Some("true"),
        name: current.attr(NAME).map(ToString::to_string),
        data: None,
    }))
}

/// Reads the stored document behind `selection` and keeps the element at
/// `data_path` below `tuple/old`.
pub fn fetch_selection_data<T: Transport>(
    session: &mut Session<T>,
    namespace: &str,
    selection: &mut XmlStoreSelection,
    data_path: &str,
    prompt: &mut dyn Prompt,
) -> Result<(), SelectionError> {
    let params = ParamTree::new().text(KEY, &selection.key)?;
    let response = session
        .request(namespace, GET_XML_OBJECT, Some(&params), RequestEvents::new())
        .map_err(|e| report(prompt, SelectionError::from(e)))?;

    let data = response
        .select_element(&format!("//{TUPLE}/{OLD}/{data_path}"))
        .map_err(|e| report(prompt, SelectionError::from(e)))?
        .cloned();

    match data {
        Some(data) => {
            tracing::debug!(key = %selection.key, "Fetched selection data");
            selection.data = Some(data);
            Ok(())
        }
        None => Err(report(
            prompt,
            SelectionError::NoData {
                key: selection.key.clone(),
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::testing::RecordingPrompt;
    use crate::session::testing::ScriptedTransport;
    use xstore_xml::Document;

    const USER: SelectionEvent = SelectionEvent {
        kind: SelectKind::User,
    };

    #[test]
    fn initial_event_is_ignored() {
        let mut prompt = RecordingPrompt::default();
        let row = Element::new("tuple").with_attr("key", "/a");
        let event = SelectionEvent {
            kind: SelectKind::Initial,
        };
        assert_eq!(read_selection(&event, Some(&row), &mut prompt), Ok(None));
        assert_eq!(read_selection(&USER, None, &mut prompt), Ok(None));
        assert!(prompt.notifications.is_empty());
    }

    #[test]
    fn reads_key_folder_and_name() {
        let mut prompt = RecordingPrompt::default();
        let row = Element::new("tuple")
            .with_attr("key", "/a/docs")
            .with_attr("isFolder", "true")
            .with_attr("name", "docs");
        let selection = read_selection(&USER, Some(&row), &mut prompt)
            .unwrap()
            .unwrap();
        assert_eq!(selection.key, "/a/docs");
        assert!(selection.is_folder);
        assert_eq!(selection.name.as_deref(), Some("docs"));
        assert!(selection.data.is_none());
    }

    #[test]
    fn missing_key_is_reported() {
        let mut prompt = RecordingPrompt::default();
        let row = Element::new("tuple").with_attr("name", "x");
        assert_eq!(
            read_selection(&USER, Some(&row), &mut prompt),
            Err(SelectionError::MissingKey)
        );
        assert_eq!(prompt.notifications, vec!["Key not found from the tuple."]);
    }

    #[test]
    fn fetch_reads_old_payload() {
        let mut session = Session::open(ScriptedTransport::replying(&[
            "<SOAP:Envelope><SOAP:Body><GetXMLObjectResponse>\
             <tuple key=\"/a/b\"><old><form><field>v</field></form></old></tuple>\
             </GetXMLObjectResponse></SOAP:Body></SOAP:Envelope>",
        ]));
        let mut prompt = RecordingPrompt::default();
        let mut selection = XmlStoreSelection {
            key: "/a/b".into(),
            is_folder: false,
            name: Some("b".into()),
            data: None,
        };

        fetch_selection_data(&mut session, "urn:x", &mut selection, "form", &mut prompt).unwrap();
        assert_eq!(selection.data.as_ref().unwrap().name(), "form");

        let sent: &Document = &session.transport().requests[0];
        assert_eq!(sent.value_of("//GetXMLObject/key").unwrap().as_deref(), Some("/a/b"));
        session.close();
    }

    #[test]
    fn fetch_without_payload_is_reported() {
        let mut session = Session::open(ScriptedTransport::replying(&["<empty/>"]));
        let mut prompt = RecordingPrompt::default();
        let mut selection = XmlStoreSelection {
            key: "/a/b".into(),
            is_folder: false,
            name: None,
            data: None,
        };
        let err = fetch_selection_data(&mut session, "urn:x", &mut selection, "form", &mut prompt)
            .unwrap_err();
        assert!(matches!(err, SelectionError::NoData { .. }));
        assert_eq!(
            prompt.notifications,
            vec!["Selected object does not contain valid data."]
        );
        session.close();
    }
}
