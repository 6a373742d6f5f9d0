//! End-to-end encrypted trade chat
//!
//! Both parties announce their PGP public key, then exchange messages
//! signed by the sender and encrypted to both keys. The coordinator only
//! relays armored ciphertext; it assigns the index every client sorts and
//! deduplicates by.
//!
//! Armored text crosses the transport with newlines replaced by a single
//! backslash (see [`escape`] and [`unescape`]).

mod message;
mod protocol;
pub mod transport;

pub use message::{
    escape, unescape, ChatBatch, ChatMessage, OutboundFrame, ServerMessage,
    ENCRYPTED_IMAGE_LABEL, PLAINTEXT_INDEX_OFFSET, SERVE_HISTORY,
};
pub use protocol::{
    AuditBundle, AuditCredentials, ChatState, EncryptedChat, SendOutcome, PEER_KEY_PENDING,
};
pub use transport::{ChatTransport, MemoryRelay, PullTransport, PushTransport, TransportError};

use crate::attachment::AttachmentError;
use crate::crypto::PgpError;
use crate::identity::IdentityError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is unusable: {0}")]
    Errored(String),
    #[error("peer has not announced a public key yet")]
    NoPeerKey,
    #[error("pgp error: {0}")]
    Pgp(#[from] PgpError),
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("attachment error: {0}")]
    Attachment(#[from] AttachmentError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
