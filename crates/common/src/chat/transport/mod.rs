//! How chat frames reach the coordinator
//!
//! Two interchangeable strategies sit behind [`ChatTransport`]:
//!
//! - [`PushTransport`]: a persistent duplex channel. Frames arrive on their
//!   own and the relay flags each with the peer's liveness.
//! - [`PullTransport`]: stateless HTTP. Every call names the highest index
//!   already seen and the coordinator answers with everything after it.

use async_trait::async_trait;

use crate::api::ApiError;

use super::message::ChatBatch;

mod pull;
mod push;

pub use pull::{ChatGetRequest, ChatPostRequest, PullTransport};
pub use push::{MemoryRelay, PushTransport};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("channel closed")]
    Closed,
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Announce our armored public key at the start of a session
    async fn announce(&self, public_key: &str, nick: &str)
        -> Result<Option<ChatBatch>, TransportError>;

    /// Send one wire message (already escaped when encrypted)
    async fn send(
        &self,
        message: &str,
        nick: &str,
        offset: f64,
    ) -> Result<Option<ChatBatch>, TransportError>;

    /// Ask for every message after `offset`
    async fn request_history(
        &self,
        nick: &str,
        offset: f64,
    ) -> Result<Option<ChatBatch>, TransportError>;

    /// Wait for the next delivery. Push transports yield the next frame;
    /// pull transports poll once.
    async fn recv(&self, offset: f64) -> Result<ChatBatch, TransportError>;
}
