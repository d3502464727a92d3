//! Explicitly owned communication handle.
//!
//! A [`Session`] owns the [`Transport`] used to exchange request and response
//! documents with the backend. It is opened by the caller and released with
//! [`Session::close`]; dropping an open session releases the transport too,
//! but logs a warning because the owner forgot to close it.

use std::fmt;

use thiserror::Error;

use xstore_types::ParamTree;
use xstore_xml::{Document, XmlError};

use crate::envelope::{Envelope, EnvelopeError, build_envelope};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Failed(String),
    #[error("response is not well-formed XML: {0}")]
    MalformedResponse(#[from] XmlError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("request is not well-formed XML: {0}")]
    Request(#[from] XmlError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Synchronous request/response exchange with the backend.
///
/// Connection management, retries and transport-level errors belong to the
/// implementation.
pub trait Transport {
    fn execute(&mut self, request: &Document) -> Result<Document, TransportError>;

    /// Frees connection resources. Called exactly once by the owning session.
    fn release(&mut self) {}
}

type DocumentHook<'a> = Box<dyn FnMut(&Document) + 'a>;
type ErrorHook<'a> = Box<dyn FnMut(&TransportError) + 'a>;

/// Callbacks for a single request; they are dropped when the call returns.
#[derive(Default)]
pub struct RequestEvents<'a> {
    before_request: Option<DocumentHook<'a>>,
    response: Option<DocumentHook<'a>>,
    error: Option<ErrorHook<'a>>,
}

impl<'a> RequestEvents<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_request(mut self, hook: impl FnMut(&Document) + 'a) -> Self {
        self.before_request = Some(Box::new(hook));
        self
    }

    pub fn on_response(mut self, hook: impl FnMut(&Document) + 'a) -> Self {
        self.response = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl FnMut(&TransportError) + 'a) -> Self {
        self.error = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for RequestEvents<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestEvents")
            .field("before_request", &self.before_request.is_some())
            .field("response", &self.response.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    released: bool,
}

impl<T: Transport> Session<T> {
    pub fn open(transport: T) -> Self {
        tracing::debug!("Session opened");
        Self {
            transport,
            released: false,
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Sends `request` and returns the response document.
    pub fn execute(
        &mut self,
        request: &Envelope,
        events: RequestEvents<'_>,
    ) -> Result<Document, SessionError> {
        self.execute_document(&request.to_document(), events)
    }

    pub fn execute_document(
        &mut self,
        request: &Document,
        mut events: RequestEvents<'_>,
    ) -> Result<Document, SessionError> {
        if let Some(hook) = events.before_request.as_mut() {
            hook(request);
        }

        match self.transport.execute(request) {
            Ok(response) => {
                tracing::debug!(
                    response = response.root().name(),
                    "Received response document"
                );
                if let Some(hook) = events.response.as_mut() {
                    hook(&response);
                }
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(%err, "Request failed");
                if let Some(hook) = events.error.as_mut() {
                    hook(&err);
                }
                Err(err.into())
            }
        }
    }

    /// Sends an already serialized request, re-parsing it first.
    pub fn execute_xml(
        &mut self,
        request: &str,
        events: RequestEvents<'_>,
    ) -> Result<Document, SessionError> {
        let document = Document::parse(request)?;
        self.execute_document(&document, events)
    }

    /// Builds the envelope for `method` and sends it.
    pub fn request(
        &mut self,
        namespace: &str,
        method: &str,
        params: Option<&ParamTree>,
        events: RequestEvents<'_>,
    ) -> Result<Document, SessionError> {
        let envelope = build_envelope(namespace, method, params)?;
        self.execute(&envelope, events)
    }

    /// Releases the transport.
    pub fn close(mut self) {
        self.transport.release();
        self.released = true;
        tracing::debug!("Session closed");
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("Session dropped without close; releasing transport");
            self.transport.release();
        }
    }
}


#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::testing::ScriptedTransport;
    use super::*;

    #[test]
    fn request_builds_and_sends_envelope() {
        let mut session = Session::open(ScriptedTransport::replying(&["<ok/>"]));
        let params = ParamTree::new().text("key", "/a").unwrap();
        let response = session
            .request("urn:x", "GetXMLObject", Some(&params), RequestEvents::new())
            .unwrap();
        assert_eq!(response.root().name(), "ok");

        let sent = &session.transport().requests[0];
        assert_eq!(sent.value_of("//GetXMLObject/key").unwrap().as_deref(), Some("/a"));
        session.close();
    }

    #[test]
    fn events_fire_in_order() {
        let log = RefCell::new(Vec::new());
        let mut session = Session::open(ScriptedTransport::replying(&["<ok/>"]));
        let envelope = build_envelope("urn:x", "Ping", None).unwrap();
        session
            .execute(
                &envelope,
                RequestEvents::new()
                    .on_before_request(|req| log.borrow_mut().push(format!("req:{}", req.root().name())))
                    .on_response(|res| log.borrow_mut().push(format!("res:{}", res.root().name())))
                    .on_error(|_| log.borrow_mut().push("err".to_string())),
            )
            .unwrap();
        assert_eq!(*log.borrow(), vec!["req:SOAP:Envelope", "res:ok"]);
        session.close();
    }

    #[test]
    fn transport_failure_fires_error_event() {
        let failures = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&failures);
        let mut session = Session::open(ScriptedTransport::default());
        let err = session
            .execute_xml(
                "<SOAP:Envelope><SOAP:Body><Ping/></SOAP:Body></SOAP:Envelope>",
                RequestEvents::new().on_error(move |_| *seen.borrow_mut() += 1),
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::Transport(TransportError::Failed(_))));
        assert_eq!(*failures.borrow(), 1);
        session.close();
    }

    #[test]
    fn execute_xml_rejects_malformed_request() {
        let mut session = Session::open(ScriptedTransport::default());
        let err = session.execute_xml("<a>", RequestEvents::new()).unwrap_err();
        assert!(matches!(err, SessionError::Request(_)));
        assert!(session.transport().requests.is_empty());
        session.close();
    }

    #[test]
    fn close_releases_once() {
        let transport = ScriptedTransport::default();
        let released = Rc::clone(&transport.released);
        let session = Session::open(transport);
        session.close();
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn drop_releases_unclosed_session() {
        let transport = ScriptedTransport::default();
        let released = Rc::clone(&transport.released);
        {
            let _session = Session::open(transport);
        }
        assert_eq!(released.get(), 1);
    }
}
