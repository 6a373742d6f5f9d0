//! Per-order encrypted conversation
//!
//! ```text
//! Bootstrapping --peer key--> KeyExchanged --history requested--> Active
//!        \______________ own key fails to unlock ______________> Errored
//! ```
//!
//! Messages are kept sorted by index. The processed-index set is claimed
//! under the lock *before* a message is decrypted, so the same index
//! delivered twice (history replay racing a live push) is decrypted and
//! appended once.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::attachment::FileMetadata;
use crate::crypto::{
    parse_public_key, PgpKeyPair, RobotKey, SignedPublicKey, Token, MESSAGE_HEADER,
    PUBLIC_KEY_HEADER,
};
use crate::identity::{IdentityError, RobotIdentity};

use super::message::{
    escape, unescape, ChatBatch, ChatMessage, ServerMessage, PLAINTEXT_INDEX_OFFSET,
};
use super::transport::{ChatTransport, TransportError};
use super::ChatError;

/// Shown in audit exports before the peer has announced a key
pub const PEER_KEY_PENDING: &str = "Not received yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChatState {
    Bootstrapping,
    KeyExchanged,
    Active,
    Errored,
}

/// What happened to a message handed to [`EncryptedChat::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The text contained our own token and was not sent
    Refused,
    /// Nothing to send
    Ignored,
    /// The transport failed, see [`EncryptedChat::connected`]
    Offline,
}

/// Credentials a user can hand to a third party to check a transcript
#[derive(Serialize)]
pub struct AuditBundle {
    pub credentials: AuditCredentials,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct AuditCredentials {
    pub own_public_key: String,
    pub peer_public_key: String,
    pub encrypted_private_key: String,
    pub passphrase: String,
}

#[derive(Clone)]
struct PeerKey {
    armored: String,
    key: SignedPublicKey,
}

struct Session {
    key: RobotKey,
    keys: PgpKeyPair,
    token: Token,
    nick: String,
}

struct ChatInner {
    state: ChatState,
    peer: Option<PeerKey>,
    messages: Vec<ChatMessage>,
    // f64 bit patterns of every index already claimed for decryption
    processed: HashSet<u64>,
    connected: bool,
    peer_connected: bool,
    awaiting_echo: bool,
    last_sent: Option<String>,
    last_index: f64,
}

pub struct EncryptedChat<T> {
    inner: Arc<Mutex<ChatInner>>,
    session: Arc<Session>,
    transport: Arc<T>,
}

impl<T> Clone for EncryptedChat<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            session: self.session.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<T: ChatTransport> EncryptedChat<T> {
    /// A conversation for `robot`, shown to the peer as `nick`.
    ///
    /// The robot must already have PGP keys.
    pub fn new(robot: &RobotIdentity, nick: impl Into<String>, transport: T) -> Result<Self, ChatError> {
        let keys = robot
            .pgp_keys()
            .cloned()
            .ok_or(ChatError::Identity(IdentityError::MissingPgpKeys))?;
        let key = keys.unlock(robot.token())?;

        Ok(Self {
            inner: Arc::new(Mutex::new(ChatInner {
                state: ChatState::Bootstrapping,
                peer: None,
                messages: Vec::new(),
                processed: HashSet::new(),
                connected: false,
                peer_connected: false,
                awaiting_echo: false,
                last_sent: None,
                last_index: 0.0,
            })),
            session: Arc::new(Session {
                key,
                keys,
                token: robot.token().clone(),
                nick: nick.into(),
            }),
            transport: Arc::new(transport),
        })
    }

    /// Check our own key and announce it to the peer.
    ///
    /// # Errors
    ///
    /// [`ChatError::Errored`] if our private key cannot be used; the
    /// conversation stays in [`ChatState::Errored`] for good. Transport
    /// failures only clear [`EncryptedChat::connected`].
    pub async fn connect(&self) -> Result<(), ChatError> {
        if let Err(e) = self.session.key.self_check() {
            tracing::warn!("chat key self check failed: {}", e);
            self.inner.lock().state = ChatState::Errored;
            return Err(ChatError::Errored(e.to_string()));
        }
        self.announce().await
    }

    /// Resend our key after the transport reconnected
    pub async fn on_reconnect(&self) -> Result<(), ChatError> {
        if self.state() == ChatState::Errored {
            return Err(ChatError::Errored("conversation is in the errored state".into()));
        }
        tracing::debug!("chat transport reconnected, announcing key again");
        self.announce().await
    }

    async fn announce(&self) -> Result<(), ChatError> {
        match self
            .transport
            .announce(self.session.key.armored_public_key(), &self.session.nick)
            .await
        {
            Ok(reply) => {
                self.inner.lock().connected = true;
                if let Some(batch) = reply {
                    self.receive(batch).await;
                }
            }
            Err(e) => self.disconnected(e),
        }
        Ok(())
    }

    /// Wait for one delivery from the transport and process it.
    ///
    /// Returns false if the transport failed.
    pub async fn poll(&self) -> bool {
        let offset = self.last_index();
        match self.transport.recv(offset).await {
            Ok(batch) => {
                self.receive(batch).await;
                true
            }
            Err(e) => {
                self.disconnected(e);
                false
            }
        }
    }

    /// Process a delivery, following up with a history request whenever it
    /// completed the key exchange
    pub async fn receive(&self, batch: ChatBatch) {
        let mut next = Some(batch);
        while let Some(batch) = next.take() {
            if !self.ingest(batch) {
                continue;
            }
            let offset = self.last_index();
            match self
                .transport
                .request_history(&self.session.nick, offset)
                .await
            {
                Ok(reply) => {
                    {
                        let mut inner = self.inner.lock();
                        if inner.state == ChatState::KeyExchanged {
                            inner.state = ChatState::Active;
                        }
                    }
                    next = reply;
                }
                Err(e) => self.disconnected(e),
            }
        }
    }

    /// Encrypt and send `text`, or send it as is when it starts with `#`.
    ///
    /// Text containing our own token is never sent.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ChatError> {
        if text.contains(self.session.token.as_str()) {
            tracing::warn!("refusing to send a chat message containing the robot token");
            return Ok(SendOutcome::Refused);
        }
        if text.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let (offset, peer) = {
            let inner = self.inner.lock();
            if inner.state == ChatState::Errored {
                return Err(ChatError::Errored("conversation is in the errored state".into()));
            }
            (inner.last_index, inner.peer.clone())
        };

        let encrypted = !text.starts_with('#');
        let wire = if encrypted {
            let peer = peer.ok_or(ChatError::NoPeerKey)?;
            let armored = self.session.key.encrypt_and_sign(text, &peer.key)?;
            let mut inner = self.inner.lock();
            inner.awaiting_echo = true;
            inner.last_sent = Some(text.to_string());
            escape(&armored)
        } else {
            text.to_string()
        };

        match self.transport.send(&wire, &self.session.nick, offset).await {
            Ok(reply) => {
                if let Some(batch) = reply {
                    self.receive(batch).await;
                }
                Ok(SendOutcome::Sent)
            }
            Err(e) => {
                if encrypted {
                    let mut inner = self.inner.lock();
                    inner.awaiting_echo = false;
                    inner.last_sent = None;
                }
                self.disconnected(e);
                Ok(SendOutcome::Offline)
            }
        }
    }

    /// Send the decryption capability of an uploaded attachment
    pub async fn send_attachment(&self, metadata: &FileMetadata) -> Result<SendOutcome, ChatError> {
        let envelope = metadata.to_envelope()?;
        self.send(&envelope).await
    }

    pub fn state(&self) -> ChatState {
        self.inner.lock().state
    }

    /// Messages in index order
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.lock().messages.clone()
    }

    pub fn connected(&self) -> bool {
        self.inner.lock().connected
    }

    pub fn peer_connected(&self) -> bool {
        self.inner.lock().peer_connected
    }

    /// True between sending a message and seeing it come back
    pub fn awaiting_echo(&self) -> bool {
        self.inner.lock().awaiting_echo
    }

    /// Highest encrypted message index processed so far
    pub fn last_index(&self) -> f64 {
        self.inner.lock().last_index
    }

    pub fn peer_public_key(&self) -> Option<String> {
        self.inner.lock().peer.as_ref().map(|peer| peer.armored.clone())
    }

    pub fn audit_export(&self) -> AuditBundle {
        let inner = self.inner.lock();
        AuditBundle {
            credentials: AuditCredentials {
                own_public_key: self.session.keys.public_key.clone(),
                peer_public_key: inner
                    .peer
                    .as_ref()
                    .map(|peer| peer.armored.clone())
                    .unwrap_or_else(|| PEER_KEY_PENDING.to_string()),
                encrypted_private_key: self.session.keys.encrypted_private_key.clone(),
                passphrase: self.session.token.as_str().to_string(),
            },
            messages: inner.messages.clone(),
        }
    }

    pub fn audit_export_json(&self) -> Result<String, ChatError> {
        Ok(serde_json::to_string_pretty(&self.audit_export())?)
    }

    fn disconnected(&self, error: TransportError) {
        tracing::warn!("chat transport error: {}", error);
        self.inner.lock().connected = false;
    }

    // returns true if the batch completed the key exchange
    fn ingest(&self, batch: ChatBatch) -> bool {
        {
            let mut inner = self.inner.lock();
            inner.connected = true;
            inner.peer_connected = batch.peer_connected;
        }

        let mut exchanged = false;
        if let Some(peer_pubkey) = batch.peer_pubkey.filter(|key| !key.is_empty()) {
            exchanged |= self.accept_key(&unescape(&peer_pubkey));
        }
        for message in batch.messages {
            if let Some(peer_connected) = message.peer_connected {
                self.inner.lock().peer_connected = peer_connected;
            }
            if message.message.starts_with(PUBLIC_KEY_HEADER) {
                exchanged |= self.accept_key(&unescape(&message.message));
            } else if message.message.starts_with(MESSAGE_HEADER) {
                self.ingest_encrypted(message);
            } else if message.message.starts_with('#') {
                self.ingest_plaintext(message);
            } else {
                tracing::debug!("ignoring chat frame from {}", message.nick);
            }
        }
        exchanged
    }

    fn accept_key(&self, armored: &str) -> bool {
        if armored.trim() == self.session.key.armored_public_key().trim() {
            return false;
        }
        if let Some(peer) = &self.inner.lock().peer {
            if peer.armored.trim() == armored.trim() {
                tracing::debug!("peer announced a key we already have");
                return false;
            }
        }

        let key = match parse_public_key(armored) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("ignoring unparsable peer key: {}", e);
                return false;
            }
        };

        let mut inner = self.inner.lock();
        if inner.peer.is_some() {
            tracing::warn!("peer replaced its public key");
        }
        inner.peer = Some(PeerKey {
            armored: armored.to_string(),
            key,
        });
        if inner.state == ChatState::Bootstrapping {
            inner.state = ChatState::KeyExchanged;
        }
        tracing::info!("chat key exchange complete");
        true
    }

    fn ingest_encrypted(&self, message: ServerMessage) {
        let own = message.nick == self.session.nick;
        let signer = {
            let mut inner = self.inner.lock();
            if !inner.processed.insert(message.index.to_bits()) {
                return;
            }
            if own {
                Some(self.session.key.public_key().clone())
            } else {
                inner.peer.as_ref().map(|peer| peer.key.clone())
            }
        };

        let armored = unescape(&message.message);
        let verify_with = signer
            .as_ref()
            .unwrap_or_else(|| self.session.key.public_key());
        let opened = match self.session.key.decrypt_and_verify(&armored, verify_with) {
            Ok(opened) => opened,
            Err(e) => {
                tracing::warn!("could not decrypt chat message {}: {}", message.index, e);
                return;
            }
        };
        let valid_signature = signer.is_some() && opened.valid_signature;
        let attachment = FileMetadata::from_envelope(&opened.text);

        let mut inner = self.inner.lock();
        if inner.awaiting_echo && inner.last_sent.as_deref() == Some(opened.text.as_str()) {
            inner.awaiting_echo = false;
            inner.last_sent = None;
        }
        if message.index > inner.last_index {
            inner.last_index = message.index;
        }
        insert_sorted(
            &mut inner.messages,
            ChatMessage {
                index: message.index,
                sender_nick: message.nick,
                plaintext: opened.text,
                ciphertext: armored,
                valid_signature,
                time: message.time,
                attachment,
            },
        );
    }

    fn ingest_plaintext(&self, message: ServerMessage) {
        let mut inner = self.inner.lock();
        if inner.messages.iter().any(|m| m.plaintext == message.message) {
            return;
        }
        let index = inner.messages.len() as f64 + PLAINTEXT_INDEX_OFFSET;
        let time = if message.time.is_empty() {
            chrono::Utc::now().to_rfc3339()
        } else {
            message.time
        };
        insert_sorted(
            &mut inner.messages,
            ChatMessage {
                index,
                sender_nick: message.nick,
                plaintext: message.message.clone(),
                ciphertext: message.message,
                valid_signature: false,
                time,
                attachment: None,
            },
        );
    }
}

fn insert_sorted(messages: &mut Vec<ChatMessage>, message: ChatMessage) {
    if messages.iter().any(|m| m.index == message.index) {
        return;
    }
    messages.push(message);
    messages.sort_by(|a, b| a.index.total_cmp(&b.index));
}
