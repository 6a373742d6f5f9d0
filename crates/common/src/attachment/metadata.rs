//! The decryption capability for one attachment
//!
//! [`FileMetadata`] never leaves the client in the clear. It travels either
//! as a JSON envelope inside an encrypted chat message, or as the tag set of
//! a NIP-17 kind 15 file message.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::{Event, FileKey, FileNonce, NostrKeys, FILE_MESSAGE_KIND};

use super::AttachmentError;

/// The only algorithm we produce and accept
pub const ENCRYPTION_ALGORITHM: &str = "xchacha20-poly1305";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub url: String,
    pub mime_type: String,
    #[serde(serialize_with = "to_b64", deserialize_with = "key_from_b64")]
    pub key: FileKey,
    #[serde(serialize_with = "to_b64", deserialize_with = "nonce_from_b64")]
    pub nonce: FileNonce,
    /// SHA-256 of the ciphertext, also its address in the blob store
    pub sha256: String,
    /// SHA-256 of the plaintext
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_sha256: Option<String>,
    /// Ciphertext size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

// the envelope is tagged so ordinary chat text that happens to be JSON is
// never mistaken for an attachment
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename = "encrypted_image")]
struct Envelope {
    #[serde(flatten)]
    metadata: FileMetadata,
}

/// Where a file message is sent, for NIP-17 tags
#[derive(Debug, Clone)]
pub struct FileMessageContext<'a> {
    /// `<coordinator alias>/<order id>`
    pub order_ref: &'a str,
    pub peer_pubkey: &'a str,
    pub relay_url: &'a str,
}

impl FileMetadata {
    /// JSON envelope embedded as the plaintext of an encrypted chat message
    pub fn to_envelope(&self) -> Result<String, AttachmentError> {
        serde_json::to_string(&Envelope {
            metadata: self.clone(),
        })
        .map_err(|e| AttachmentError::InvalidMetadata(e.to_string()))
    }

    /// Parse a chat plaintext, `None` if it is not an attachment envelope
    pub fn from_envelope(text: &str) -> Option<Self> {
        if !text.trim_start().starts_with('{') {
            return None;
        }
        serde_json::from_str::<Envelope>(text)
            .ok()
            .map(|envelope| envelope.metadata)
    }

    /// Tags of a NIP-17 kind 15 file message; the url is the content
    pub fn to_file_message_tags(
        &self,
        context: &FileMessageContext<'_>,
        own_pubkey: &str,
    ) -> Vec<Vec<String>> {
        let mut tags = vec![
            vec!["order_id".into(), context.order_ref.into()],
            vec!["p".into(), context.peer_pubkey.into(), context.relay_url.into()],
            vec!["p".into(), own_pubkey.into(), context.relay_url.into()],
            vec!["file-type".into(), self.mime_type.clone()],
            vec!["encryption-algorithm".into(), ENCRYPTION_ALGORITHM.into()],
            vec!["decryption-key".into(), STANDARD.encode(self.key.bytes())],
            vec!["decryption-nonce".into(), STANDARD.encode(self.nonce.bytes())],
            vec!["x".into(), self.sha256.clone()],
        ];
        if let Some(original) = &self.original_sha256 {
            tags.push(vec!["ox".into(), original.clone()]);
        }
        if let Some(size) = self.size {
            tags.push(vec!["size".into(), size.to_string()]);
        }
        tags
    }

    /// Build and sign the kind 15 file message
    pub fn to_file_message(
        &self,
        keys: &NostrKeys,
        context: &FileMessageContext<'_>,
        created_at: i64,
    ) -> Result<Event, AttachmentError> {
        let tags = self.to_file_message_tags(context, &keys.public_key_hex());
        Ok(keys.sign_event(FILE_MESSAGE_KIND, created_at, tags, self.url.clone())?)
    }

    /// Read the metadata back out of a kind 15 file message
    pub fn from_file_message(event: &Event) -> Result<Self, AttachmentError> {
        if event.kind != FILE_MESSAGE_KIND {
            return Err(AttachmentError::InvalidMetadata(format!(
                "expected kind {}, got {}",
                FILE_MESSAGE_KIND, event.kind
            )));
        }
        let required = |name: &str| {
            event
                .tag(name)
                .ok_or_else(|| AttachmentError::InvalidMetadata(format!("missing {} tag", name)))
        };

        let algorithm = event.tag("encryption-algorithm").unwrap_or(ENCRYPTION_ALGORITHM);
        if algorithm != ENCRYPTION_ALGORITHM {
            return Err(AttachmentError::InvalidMetadata(format!(
                "unsupported encryption algorithm {}",
                algorithm
            )));
        }

        let key = FileKey::from_slice(&decode_b64(required("decryption-key")?)?)?;
        let nonce = FileNonce::from_slice(&decode_b64(required("decryption-nonce")?)?)?;
        let size = event
            .tag("size")
            .map(|size| {
                size.parse::<u64>()
                    .map_err(|e| AttachmentError::InvalidMetadata(format!("invalid size: {}", e)))
            })
            .transpose()?;

        Ok(Self {
            url: event.content.clone(),
            mime_type: required("file-type")?.to_string(),
            key,
            nonce,
            sha256: required("x")?.to_string(),
            original_sha256: event.tag("ox").map(str::to_string),
            size,
        })
    }
}

fn decode_b64(value: &str) -> Result<Vec<u8>, AttachmentError> {
    STANDARD
        .decode(value)
        .map_err(|e| AttachmentError::InvalidMetadata(format!("invalid base64: {}", e)))
}

fn to_b64<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsBytes,
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(value.as_bytes()))
}

fn key_from_b64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FileKey, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    let bytes = STANDARD.decode(encoded).map_err(serde::de::Error::custom)?;
    FileKey::from_slice(&bytes).map_err(serde::de::Error::custom)
}

fn nonce_from_b64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FileNonce, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    let bytes = STANDARD.decode(encoded).map_err(serde::de::Error::custom)?;
    FileNonce::from_slice(&bytes).map_err(serde::de::Error::custom)
}

trait AsBytes {
    fn as_bytes(&self) -> &[u8];
}

impl AsBytes for FileKey {
    fn as_bytes(&self) -> &[u8] {
        self.bytes()
    }
}

impl AsBytes for FileNonce {
    fn as_bytes(&self) -> &[u8] {
        self.bytes()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::Token;

    fn metadata() -> FileMetadata {
        FileMetadata {
            url: "https://coordinator.example/blossom/abcd".into(),
            mime_type: "image/png".into(),
            key: FileKey::from([1u8; 32]),
            nonce: FileNonce::from([2u8; 24]),
            sha256: "abcd".into(),
            original_sha256: Some("ef01".into()),
            size: Some(1234),
        }
    }

    #[test]
    fn test_envelope() {
        let envelope = metadata().to_envelope().unwrap();
        assert!(envelope.contains("\"type\":\"encrypted_image\""));
        assert!(envelope.contains(&STANDARD.encode([1u8; 32])));
        assert_eq!(FileMetadata::from_envelope(&envelope), Some(metadata()));

        assert_eq!(FileMetadata::from_envelope("hello there"), None);
        assert_eq!(FileMetadata::from_envelope("{\"url\":\"x\"}"), None);
    }

    #[test]
    fn test_file_message_tags() {
        let keys = NostrKeys::derive(&Token::try_from("SomeRobotTokenSomeRobotToken12345678").unwrap()).unwrap();
        let context = FileMessageContext {
            order_ref: "satstralia/42",
            peer_pubkey: "peer",
            relay_url: "wss://relay.example",
        };
        let event = metadata().to_file_message(&keys, &context, 1_700_000_000).unwrap();
        assert_eq!(event.kind, 15);
        assert_eq!(event.tag("order_id"), Some("satstralia/42"));
        assert_eq!(event.tag("encryption-algorithm"), Some(ENCRYPTION_ALGORITHM));
        assert_eq!(event.tag("size"), Some("1234"));
        assert!(event.verify().is_ok());

        assert_eq!(FileMetadata::from_file_message(&event).unwrap(), metadata());
    }

    #[test]
    fn test_file_message_rejects_bad_events() {
        let keys = NostrKeys::derive(&Token::try_from("SomeRobotTokenSomeRobotToken12345678").unwrap()).unwrap();
        let event = keys.sign_event(1, 0, vec![], "hi").unwrap();
        assert!(FileMetadata::from_file_message(&event).is_err());

        let event = keys
            .sign_event(15, 0, vec![vec!["file-type".into(), "image/png".into()]], "url")
            .unwrap();
        assert!(matches!(
            FileMetadata::from_file_message(&event),
            Err(AttachmentError::InvalidMetadata(_))
        ));
    }
}
