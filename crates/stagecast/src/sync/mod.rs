//! Presenter to audience state replication.

pub mod channel;
pub mod message;
pub mod snapshot;

pub use channel::{MessageSink, SendOutcome, SyncChannel};
pub use message::{AUDIENCE_EVENTS, AudienceMessage, PRESENTER_EVENTS, PresenterMessage};
pub use snapshot::{DedupKey, SyncSnapshot};
