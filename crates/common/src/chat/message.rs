use serde::{Deserialize, Serialize};

use crate::attachment::FileMetadata;

/// Sent by a push client to ask the relay to replay the conversation
pub const SERVE_HISTORY: &str = "-----SERVE HISTORY-----";
/// Text shown in place of an attachment envelope
pub const ENCRYPTED_IMAGE_LABEL: &str = "[Encrypted Image]";
/// Offset added to plaintext message indices so they never collide with
/// the integer indices the coordinator assigns
pub const PLAINTEXT_INDEX_OFFSET: f64 = 0.001;

/// Make armored text fit a single-line transport field
pub fn escape(armored: &str) -> String {
    armored.replace('\n', "\\")
}

/// Undo [`escape`]
pub fn unescape(wire: &str) -> String {
    wire.replace('\\', "\n")
}

/// One message in a conversation, as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub index: f64,
    pub sender_nick: String,
    pub plaintext: String,
    /// Armored ciphertext, or the raw text for plaintext messages
    pub ciphertext: String,
    pub valid_signature: bool,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<FileMetadata>,
}

impl ChatMessage {
    /// True for messages that went over the `#` channel
    pub fn is_plaintext(&self) -> bool {
        self.index.fract() != 0.0
    }

    pub fn display_text(&self) -> &str {
        if self.attachment.is_some() {
            ENCRYPTED_IMAGE_LABEL
        } else {
            &self.plaintext
        }
    }
}

/// A message as delivered by the coordinator.
///
/// Push frames name the sender `user_nick` and carry a liveness flag, pull
/// responses call it `nick`; both land here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub message: String,
    #[serde(alias = "user_nick")]
    pub nick: String,
    #[serde(default)]
    pub index: f64,
    #[serde(default)]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_connected: Option<bool>,
}

/// A frame sent over the push channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub nick: String,
}

impl OutboundFrame {
    pub fn message(message: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            kind: "message".into(),
            message: message.into(),
            nick: nick.into(),
        }
    }
}

/// Whatever a transport delivered in one go
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatBatch {
    #[serde(default)]
    pub peer_connected: bool,
    /// Escaped armored key of the peer, pull transport only
    #[serde(default)]
    pub peer_pubkey: Option<String>,
    #[serde(default)]
    pub messages: Vec<ServerMessage>,
}

impl ChatBatch {
    pub fn single(message: ServerMessage) -> Self {
        Self {
            peer_connected: message.peer_connected.unwrap_or(false),
            peer_pubkey: None,
            messages: vec![message],
        }
    }
}
