//! Nostr keys and events
//!
//! Each robot has a secp256k1 key derived from its token (not from the
//! garage key), used to sign the short-lived authorization events the
//! attachment store expects. Events follow NIP-01: the id is the SHA-256 of
//! the canonical `[0, pubkey, created_at, kind, tags, content]` array and
//! the signature is BIP340 Schnorr over that id.

use std::fmt;

use k256::schnorr::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use super::token::Token;

/// Kind of the blob store authorization event
pub const BLOB_AUTH_KIND: u32 = 24242;
/// Kind of a NIP-17 file message
pub const FILE_MESSAGE_KIND: u32 = 15;

#[derive(Debug, thiserror::Error)]
pub enum NostrError {
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("nostr error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A robot's Nostr signing key
#[derive(Clone)]
pub struct NostrKeys {
    // as derived, before BIP340 flips it for an even-y public key
    secret: [u8; 32],
    signing_key: SigningKey,
}

impl fmt::Debug for NostrKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NostrKeys")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl NostrKeys {
    /// secret = SHA-256(SHA-512(token))
    pub fn derive(token: &Token) -> Result<Self, NostrError> {
        let inner = Sha512::digest(token.as_str().as_bytes());
        let secret = Sha256::digest(inner);
        Self::from_secret_bytes(&secret)
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, NostrError> {
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| NostrError::InvalidSecretKey)?;
        let signing_key =
            SigningKey::from_bytes(&secret).map_err(|_| NostrError::InvalidSecretKey)?;
        Ok(Self {
            secret,
            signing_key,
        })
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret
    }

    /// x-only public key, hex encoded
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Build and sign an event authored by this key
    pub fn sign_event(
        &self,
        kind: u32,
        created_at: i64,
        tags: Vec<Vec<String>>,
        content: impl Into<String>,
    ) -> Result<Event, NostrError> {
        let mut event = Event {
            id: String::new(),
            pubkey: self.public_key_hex(),
            created_at,
            kind,
            tags,
            content: content.into(),
            sig: String::new(),
        };
        let id = event.compute_id()?;

        let mut aux = [0u8; 32];
        getrandom::getrandom(&mut aux)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        let signature = self
            .signing_key
            .sign_raw(&id, &aux)
            .map_err(|e| anyhow::anyhow!("failed to sign event: {}", e))?;

        event.id = hex::encode(id);
        event.sig = hex::encode(signature.to_bytes());
        Ok(event)
    }
}

/// A signed Nostr event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl Event {
    fn compute_id(&self) -> Result<[u8; 32], NostrError> {
        let canonical = serde_json::to_string(&(
            0,
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        ))
        .map_err(|e| NostrError::InvalidEvent(e.to_string()))?;
        Ok(Sha256::digest(canonical.as_bytes()).into())
    }

    /// First value of the tag named `name`
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.first().map(String::as_str) == Some(name))
            .and_then(|tag| tag.get(1))
            .map(String::as_str)
    }

    /// Check the id and the signature
    pub fn verify(&self) -> Result<(), NostrError> {
        let id = self.compute_id()?;
        if hex::encode(id) != self.id {
            return Err(NostrError::InvalidEvent("id does not match content".into()));
        }
        let pubkey = hex::decode(&self.pubkey)
            .map_err(|_| NostrError::InvalidEvent("pubkey is not hex".into()))?;
        let verifying_key = VerifyingKey::from_bytes(&pubkey)
            .map_err(|_| NostrError::InvalidEvent("invalid pubkey".into()))?;
        let sig = hex::decode(&self.sig)
            .map_err(|_| NostrError::InvalidEvent("signature is not hex".into()))?;
        let signature = Signature::try_from(sig.as_slice())
            .map_err(|_| NostrError::InvalidEvent("invalid signature encoding".into()))?;
        verifying_key
            .verify_raw(&id, &signature)
            .map_err(|_| NostrError::InvalidEvent("bad signature".into()))
    }
}
