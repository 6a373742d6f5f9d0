//! Shared test utilities for robot, chat and attachment integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use common::chat::{
    escape, ChatBatch, ChatTransport, EncryptedChat, ServerMessage, TransportError,
};
use common::crypto::{RobotKey, RootSecret, SignedPublicKey};
use common::identity::RobotIdentity;

/// How long a conversation may sit idle before we consider it settled
pub const SETTLE_TIMEOUT: Duration = Duration::from_millis(500);

/// A robot derived from a fresh garage key, without PGP keys
pub fn robot(account: u32) -> RobotIdentity {
    let root = RootSecret::generate().unwrap();
    RobotIdentity::derive(&root, account).unwrap()
}

/// A robot with PGP keys, derived from a fresh garage key
pub fn robot_with_keys(account: u32) -> RobotIdentity {
    let mut robot = robot(account);
    robot.ensure_pgp_keys().unwrap();
    robot
}

/// Encrypt `text` from `sender` to `recipient` the way a peer client would
/// put it on the wire
pub fn encrypted_frame(
    sender: &RobotKey,
    recipient: &SignedPublicKey,
    text: &str,
    index: f64,
    nick: &str,
) -> ServerMessage {
    let armored = sender.encrypt_and_sign(text, recipient).unwrap();
    ServerMessage {
        message: escape(&armored),
        nick: nick.to_string(),
        index,
        time: "2024-01-01T00:00:00+00:00".to_string(),
        peer_connected: Some(true),
    }
}

/// Batch announcing `peer`'s public key, as a pull response would
pub fn key_batch(peer: &RobotKey) -> ChatBatch {
    ChatBatch {
        peer_connected: true,
        peer_pubkey: Some(escape(peer.armored_public_key())),
        messages: Vec::new(),
    }
}

/// Poll until nothing arrives for [`SETTLE_TIMEOUT`]
pub async fn settle<T: ChatTransport>(chat: &EncryptedChat<T>) {
    while let Ok(true) = tokio::time::timeout(SETTLE_TIMEOUT, chat.poll()).await {}
}

/// Calls seen by a [`RecordingTransport`]
#[derive(Debug, Default)]
pub struct TransportLog {
    pub announced: Vec<String>,
    pub sent: Vec<String>,
    pub history_requests: Vec<f64>,
}

/// Transport that records every call and never delivers anything.
///
/// Clones share one log, keep one around to inspect what a conversation
/// sent.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    log: Arc<Mutex<TransportLog>>,
    offline: bool,
}

impl RecordingTransport {
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.log.lock().sent.clone()
    }

    pub fn announced(&self) -> Vec<String> {
        self.log.lock().announced.clone()
    }

    pub fn history_requests(&self) -> Vec<f64> {
        self.log.lock().history_requests.clone()
    }

    fn check(&self) -> Result<(), TransportError> {
        if self.offline {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn announce(
        &self,
        public_key: &str,
        _nick: &str,
    ) -> Result<Option<ChatBatch>, TransportError> {
        self.check()?;
        self.log.lock().announced.push(public_key.to_string());
        Ok(None)
    }

    async fn send(
        &self,
        message: &str,
        _nick: &str,
        _offset: f64,
    ) -> Result<Option<ChatBatch>, TransportError> {
        self.check()?;
        self.log.lock().sent.push(message.to_string());
        Ok(None)
    }

    async fn request_history(
        &self,
        _nick: &str,
        offset: f64,
    ) -> Result<Option<ChatBatch>, TransportError> {
        self.check()?;
        self.log.lock().history_requests.push(offset);
        Ok(None)
    }

    async fn recv(&self, _offset: f64) -> Result<ChatBatch, TransportError> {
        Err(TransportError::Closed)
    }
}
