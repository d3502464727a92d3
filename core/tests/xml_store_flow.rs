//! Browse, open and save against an in-memory XML Store.

use std::collections::BTreeMap;

use xstore_core::listing::set_collection_request_key;
use xstore_core::selection::{fetch_selection_data, read_selection};
use xstore_core::{
    Envelope, Prompt, RequestEvents, SaveFlow, SaveState, SelectKind, SelectionEvent, Session,
    Transport, TransportError, add_parent_folder_entry, collection_request,
    sort_collection_response,
};
use xstore_xml::{Document, Element};

const NAMESPACE: &str = "http://schemas.cordys.com/1.0/xmlstore";

/// Document key -> `(payload, level)`; a missing payload marks a folder.
#[derive(Default)]
struct MemoryStore {
    documents: BTreeMap<String, (Option<Element>, String)>,
    updates: usize,
}

impl MemoryStore {
    fn with_document(mut self, key: &str, level: &str, payload: Option<Element>) -> Self {
        self.documents
            .insert(key.to_string(), (payload, level.to_string()));
        self
    }

    fn wrap(method: Element) -> Document {
        Document::new(
            Element::new("SOAP:Envelope").with_child(Element::new("SOAP:Body").with_child(method)),
        )
    }

    fn listing(&self, folder: &str) -> Document {
        let prefix = if folder == "/" {
            "/".to_string()
        } else {
            format!("{folder}/")
        };
        let mut response = Element::new("GetCollectionResponse");
        for (key, (payload, level)) in &self.documents {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            if rest.contains('/') || rest.is_empty() {
                continue;
            }
            response.push_child(
                Element::new("tuple")
                    .with_attr("key", key.as_str())
                    .with_attr("name", rest)
                    .with_attr("isFolder", if payload.is_none() { "true" } else { "false" })
                    .with_attr("lastModified", "1700000000")
                    .with_attr("level", level.as_str()),
            );
        }
        Self::wrap(response)
    }

    fn object(&self, key: &str) -> Document {
        let mut response = Element::new("GetXMLObjectResponse");
        if let Some((Some(payload), _)) = self.documents.get(key) {
            response.push_child(
                Element::new("tuple")
                    .with_attr("key", key)
                    .with_child(Element::new("old").with_child(payload.clone())),
            );
        }
        Self::wrap(response)
    }
}

impl Transport for MemoryStore {
    fn execute(&mut self, request: &Document) -> Result<Document, TransportError> {
        let envelope = Envelope::from_document(request.clone())
            .map_err(|err| TransportError::Failed(err.to_string()))?;
        let method = envelope.method();
        match method.name() {
            "GetCollection" => {
                let folder = method.value_of("folder").ok().flatten().unwrap_or_default();
                Ok(self.listing(&folder))
            }
            "GetXMLObject" => {
                let key = method.value_of("key").ok().flatten().unwrap_or_default();
                Ok(self.object(&key))
            }
            "UpdateXMLObject" => {
                let tuple = method
                    .first_child("tuple")
                    .ok_or_else(|| TransportError::Failed("no tuple".into()))?;
                let key = tuple.attr("key").unwrap_or_default().to_string();
                let payload = tuple
                    .first_child("new")
                    .and_then(|new| new.child_elements().next())
                    .cloned();
                let level = tuple.attr("version").unwrap_or_default().to_string();
                self.documents.insert(key, (payload, level));
                self.updates += 1;
                Ok(Self::wrap(Element::new("UpdateXMLObjectResponse")))
            }
            other => Err(TransportError::Failed(format!("unknown method {other}"))),
        }
    }
}

#[derive(Default)]
struct ScriptedPrompt {
    answer: bool,
    messages: Vec<String>,
    questions: usize,
}

impl Prompt for ScriptedPrompt {
    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn confirm(&mut self, _message: &str) -> bool {
        self.questions += 1;
        self.answer
    }
}

fn store() -> MemoryStore {
    MemoryStore::default()
        .with_document("/forms/archive", "user", None)
        .with_document(
            "/forms/Order.xml",
            "organization",
            Some(Element::new("form").with_child(Element::new("title").with_text("Order"))),
        )
        .with_document(
            "/forms/bill.xml",
            "user",
            Some(Element::new("form").with_child(Element::new("title").with_text("Bill"))),
        )
}

fn update_template() -> Envelope {
    Envelope::parse(&format!(
        "<SOAP:Envelope><SOAP:Body><UpdateXMLObject xmlns=\"{NAMESPACE}\">\
         <tuple><new/></tuple></UpdateXMLObject></SOAP:Body></SOAP:Envelope>"
    ))
    .unwrap()
}

fn names(listing: &Document) -> Vec<String> {
    listing
        .select_elements("//GetCollectionResponse/tuple")
        .unwrap()
        .into_iter()
        .map(|t| t.attr("name").unwrap_or_default().to_string())
        .collect()
}

#[test]
fn browse_sorted_with_parent_entry() {
    let mut session = Session::open(store());
    let request = collection_request(NAMESPACE, "/forms").unwrap();
    let mut listing = session.execute(&request, RequestEvents::new()).unwrap();

    sort_collection_response(&mut listing).unwrap();
    assert!(add_parent_folder_entry(&mut listing, "/forms"));

    assert_eq!(names(&listing), vec!["..", "archive", "bill.xml", "Order.xml"]);
    let parent = listing.select_element("//tuple[@name='..']").unwrap().unwrap();
    assert_eq!(parent.attr("key"), Some("/"));
    session.close();
}

#[test]
fn navigate_by_reusing_request() {
    let mut session = Session::open(store());
    let mut request = collection_request(NAMESPACE, "/forms").unwrap();
    assert!(set_collection_request_key(request.method_mut(), "/"));
    let listing = session.execute(&request, RequestEvents::new()).unwrap();
    assert!(names(&listing).is_empty());
    session.close();
}

#[test]
fn open_and_save_new_document() {
    let mut session = Session::open(store());
    let mut prompt = ScriptedPrompt::default();

    let listing = session
        .execute(&collection_request(NAMESPACE, "/forms").unwrap(), RequestEvents::new())
        .unwrap();
    let row = listing
        .select_element("//tuple[@name='bill.xml']")
        .unwrap()
        .unwrap();
    let event = SelectionEvent {
        kind: SelectKind::User,
    };
    let mut selection = read_selection(&event, Some(row), &mut prompt)
        .unwrap()
        .unwrap();
    assert!(!selection.is_folder);

    fetch_selection_data(&mut session, NAMESPACE, &mut selection, "form", &mut prompt).unwrap();
    let mut form = selection.data.clone().unwrap();
    assert_eq!(form.value_of("title").unwrap().as_deref(), Some("Bill"));

    form.push_child(Element::new("total").with_text("12"));
    let mut flow = SaveFlow::new(Some(update_template()));
    flow.save(
        &mut session,
        &mut prompt,
        Some(&listing),
        "/forms/copy.xml",
        &form,
    )
    .unwrap();
    assert_eq!(flow.state(), SaveState::Submitted);
    assert_eq!(prompt.questions, 0);
    assert!(prompt.messages.is_empty());

    let store = session.transport();
    assert_eq!(store.updates, 1);
    let (saved, level) = &store.documents["/forms/copy.xml"];
    assert_eq!(level, "organization");
    assert_eq!(
        saved.as_ref().unwrap().value_of("total").unwrap().as_deref(),
        Some("12")
    );
    session.close();
}

#[test]
fn overwriting_shared_document_asks_first() {
    let mut session = Session::open(store());
    let listing = session
        .execute(&collection_request(NAMESPACE, "/forms").unwrap(), RequestEvents::new())
        .unwrap();
    let payload = Element::new("form");
    let mut flow = SaveFlow::new(Some(update_template()));

    let mut declining = ScriptedPrompt::default();
    assert!(
        flow.save(&mut session, &mut declining, Some(&listing), "/forms/Order.xml", &payload)
            .is_err()
    );
    assert_eq!(declining.questions, 1);
    assert!(declining.messages.is_empty());
    assert_eq!(session.transport().updates, 0);

    let mut accepting = ScriptedPrompt {
        answer: true,
        ..ScriptedPrompt::default()
    };
    flow.save(&mut session, &mut accepting, Some(&listing), "/forms/Order.xml", &payload)
        .unwrap();
    assert_eq!(session.transport().updates, 1);
    session.close();
}
