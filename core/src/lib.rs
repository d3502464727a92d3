//! XML Store client logic.
//!
//! Builds SOAP request envelopes from parameter trees, resolves fields on
//! data-binding tuples, orders `GetCollection` listings, and drives the
//! select and save flows over an explicitly owned [`Session`].
//!
//! User-facing messages go through the [`Prompt`] trait so hosts decide how
//! alerts and confirmations are shown.

pub mod application;
pub mod envelope;
pub mod listing;
pub mod password;
mod prompt;
pub mod save;
pub mod selection;
pub mod session;
pub mod transactional;
pub mod tuple;

pub use application::{ApplicationDefinition, Placement, change_window_features};
pub use envelope::{Envelope, EnvelopeError, build_envelope};
pub use listing::{
    ListingError, add_parent_folder_entry, collection_request, compare_entries, sort_collection_response,
    sort_entries,
};
pub use password::{PasswordError, decode_field, encode_field};
pub use prompt::{LogPrompt, Prompt};
pub use save::{SaveError, SaveFlow, SaveState};
pub use selection::{SelectKind, SelectionError, SelectionEvent, XmlStoreSelection};
pub use session::{RequestEvents, Session, SessionError, Transport, TransportError};
pub use transactional::{TransformError, to_transactional};
pub use tuple::{Lookup, TupleRecord, resolve_field, resolve_field_or};
