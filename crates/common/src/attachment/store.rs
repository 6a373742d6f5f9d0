//! Content addressed blob storage for encrypted attachments
//!
//! Blobs are addressed by the hex SHA-256 of their bytes. Uploads carry a
//! signed kind 24242 authorization event naming that hash; downloads are
//! plain GETs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

use crate::api::{ApiClient, ApiError};
use crate::crypto::{sha256_hex, Event, BLOB_AUTH_KIND};

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("upload rejected: {0}")]
    Unauthorized(String),
    #[error("blob store error: {0}")]
    Default(#[from] anyhow::Error),
}

impl From<reqwest::Error> for BlobStoreError {
    fn from(e: reqwest::Error) -> Self {
        BlobStoreError::Api(ApiError::Reqwest(e))
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `ciphertext` under `sha256`, returning the url it can be
    /// fetched from. `authorization` is the full `Authorization` header.
    async fn put(
        &self,
        ciphertext: Vec<u8>,
        sha256: &str,
        authorization: &str,
    ) -> Result<String, BlobStoreError>;

    async fn get(&self, url: &str) -> Result<Vec<u8>, BlobStoreError>;
}

/// The coordinator's blossom endpoint
#[derive(Debug, Clone)]
pub struct BlossomStore {
    client: ApiClient,
}

impl BlossomStore {
    pub fn new(coordinator: &Url) -> Result<Self, BlobStoreError> {
        Ok(Self {
            client: ApiClient::new(coordinator)?,
        })
    }

    fn blob_url(&self, path: &str) -> Result<Url, BlobStoreError> {
        Ok(self
            .client
            .base_url()
            .join(&format!("blossom/{}", path))
            .map_err(ApiError::from)?)
    }
}

#[async_trait]
impl BlobStore for BlossomStore {
    async fn put(
        &self,
        ciphertext: Vec<u8>,
        sha256: &str,
        authorization: &str,
    ) -> Result<String, BlobStoreError> {
        let response = self
            .client
            .http_client()
            .put(self.blob_url("upload")?)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(ciphertext)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    BlobStoreError::Unauthorized(body)
                }
                _ => ApiError::HttpStatus(status, body).into(),
            });
        }
        Ok(self.blob_url(sha256)?.to_string())
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, BlobStoreError> {
        let response = self.client.http_client().get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BlobStoreError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status, response.text().await?).into());
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// In-memory blob store that checks upload authorizations the way a
/// blossom server does
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

pub const MEMORY_STORE_PREFIX: &str = "memory://blossom/";

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }

    /// Overwrite a stored blob without any checks, for simulating a
    /// misbehaving store
    pub fn replace(&self, sha256: &str, bytes: Vec<u8>) {
        self.blobs.lock().insert(sha256.to_string(), bytes);
    }

    fn check_authorization(
        authorization: &str,
        sha256: &str,
        now: i64,
    ) -> Result<(), BlobStoreError> {
        let encoded = authorization
            .strip_prefix("Nostr ")
            .ok_or_else(|| BlobStoreError::Unauthorized("expected a Nostr authorization".into()))?;
        let json = STANDARD
            .decode(encoded)
            .map_err(|e| BlobStoreError::Unauthorized(format!("invalid base64: {}", e)))?;
        let event: Event = serde_json::from_slice(&json)
            .map_err(|e| BlobStoreError::Unauthorized(format!("invalid event: {}", e)))?;

        event
            .verify()
            .map_err(|e| BlobStoreError::Unauthorized(e.to_string()))?;
        if event.kind != BLOB_AUTH_KIND || event.tag("t") != Some("upload") {
            return Err(BlobStoreError::Unauthorized("not an upload authorization".into()));
        }
        if event.tag("x") != Some(sha256) {
            return Err(BlobStoreError::Unauthorized("authorization is for another blob".into()));
        }
        let expiration = event
            .tag("expiration")
            .and_then(|e| e.parse::<i64>().ok())
            .ok_or_else(|| BlobStoreError::Unauthorized("missing expiration".into()))?;
        if expiration <= now {
            return Err(BlobStoreError::Unauthorized("authorization expired".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        ciphertext: Vec<u8>,
        sha256: &str,
        authorization: &str,
    ) -> Result<String, BlobStoreError> {
        Self::check_authorization(authorization, sha256, chrono::Utc::now().timestamp())?;
        let actual = sha256_hex(&ciphertext);
        if actual != sha256 {
            return Err(BlobStoreError::Unauthorized(format!(
                "body hashes to {}, authorization names {}",
                actual, sha256
            )));
        }
        self.blobs.lock().insert(actual.clone(), ciphertext);
        Ok(format!("{}{}", MEMORY_STORE_PREFIX, actual))
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, BlobStoreError> {
        let sha256 = url.rsplit('/').next().unwrap_or(url);
        self.blobs
            .lock()
            .get(sha256)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_blob_url_keeps_base_path() {
        let store = BlossomStore::new(&Url::parse("http://robo.onion/mainnet/exp").unwrap()).unwrap();
        assert_eq!(
            store.blob_url("upload").unwrap().as_str(),
            "http://robo.onion/mainnet/exp/blossom/upload"
        );

        let store = BlossomStore::new(&Url::parse("http://localhost:8000").unwrap()).unwrap();
        assert_eq!(
            store.blob_url("upload").unwrap().as_str(),
            "http://localhost:8000/blossom/upload"
        );
    }
}
