use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::crypto::{sha256_hex, FileCipher, NostrKeys, XChaChaFileCipher, BLOB_AUTH_KIND};

use super::metadata::FileMetadata;
use super::policy::AttachmentPolicy;
use super::store::BlobStore;
use super::AttachmentError;

/// Lifetime of an upload authorization, in seconds
pub const UPLOAD_AUTH_TTL: i64 = 300;

/// Where an upload landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub url: String,
    pub sha256: String,
}

/// `Authorization` header for uploading the blob `sha256`, valid for
/// [`UPLOAD_AUTH_TTL`] seconds from `now`
pub fn upload_authorization(
    keys: &NostrKeys,
    sha256: &str,
    now: i64,
) -> Result<String, AttachmentError> {
    let event = keys.sign_event(
        BLOB_AUTH_KIND,
        now,
        vec![
            vec!["t".into(), "upload".into()],
            vec!["x".into(), sha256.into()],
            vec!["expiration".into(), (now + UPLOAD_AUTH_TTL).to_string()],
        ],
        "Upload encrypted image",
    )?;
    let json = serde_json::to_string(&event)
        .map_err(|e| AttachmentError::InvalidMetadata(e.to_string()))?;
    Ok(format!("Nostr {}", STANDARD.encode(json)))
}

/// Hash `ciphertext`, authorize the upload of exactly that hash and put it
/// in the store
pub async fn upload_to_store<S: BlobStore + ?Sized>(
    store: &S,
    ciphertext: Vec<u8>,
    keys: &NostrKeys,
) -> Result<UploadResult, AttachmentError> {
    let sha256 = sha256_hex(&ciphertext);
    let authorization = upload_authorization(keys, &sha256, chrono::Utc::now().timestamp())?;
    let url = store.put(ciphertext, &sha256, &authorization).await?;
    tracing::debug!("uploaded attachment {}", sha256);
    Ok(UploadResult { url, sha256 })
}

/// Fetch a blob and check it hashes to `expected_sha256`.
///
/// # Errors
///
/// [`AttachmentError::IntegrityFailure`] on a hash mismatch; the bytes are
/// discarded.
pub async fn download_and_verify<S: BlobStore + ?Sized>(
    store: &S,
    url: &str,
    expected_sha256: &str,
) -> Result<Vec<u8>, AttachmentError> {
    let ciphertext = store.get(url).await?;
    let actual = sha256_hex(&ciphertext);
    if !actual.eq_ignore_ascii_case(expected_sha256) {
        tracing::warn!(
            "attachment integrity failure: expected {}, got {}",
            expected_sha256,
            actual
        );
        return Err(AttachmentError::IntegrityFailure {
            expected: expected_sha256.to_string(),
            actual,
        });
    }
    Ok(ciphertext)
}

/// Encrypt, upload, download, verify and decrypt attachments against one
/// blob store
#[derive(Debug, Clone)]
pub struct AttachmentPipeline<S, C = XChaChaFileCipher> {
    store: S,
    cipher: C,
    policy: AttachmentPolicy,
}

impl<S: BlobStore> AttachmentPipeline<S> {
    pub fn new(store: S, policy: AttachmentPolicy) -> Self {
        Self {
            store,
            cipher: XChaChaFileCipher,
            policy,
        }
    }
}

impl<S: BlobStore, C: FileCipher> AttachmentPipeline<S, C> {
    pub fn with_cipher(store: S, cipher: C, policy: AttachmentPolicy) -> Self {
        Self {
            store,
            cipher,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &AttachmentPolicy {
        &self.policy
    }

    /// Check policy, encrypt and upload `plaintext`, returning the metadata
    /// to embed in an encrypted chat message
    pub async fn send(
        &self,
        plaintext: &[u8],
        mime_type: &str,
        keys: &NostrKeys,
    ) -> Result<FileMetadata, AttachmentError> {
        self.policy.check(plaintext.len() as u64, mime_type)?;

        let original_sha256 = sha256_hex(plaintext);
        let encrypted = self.cipher.encrypt(plaintext, None)?;
        let size = encrypted.ciphertext.len() as u64;
        let upload = upload_to_store(&self.store, encrypted.ciphertext, keys).await?;

        Ok(FileMetadata {
            url: upload.url,
            mime_type: mime_type.to_string(),
            key: encrypted.key,
            nonce: encrypted.nonce,
            sha256: upload.sha256,
            original_sha256: Some(original_sha256),
            size: Some(size),
        })
    }

    /// Download, verify and decrypt the attachment described by `metadata`.
    ///
    /// The ciphertext hash is checked before the cipher is touched; the
    /// plaintext hash, when present, is checked after.
    pub async fn receive(&self, metadata: &FileMetadata) -> Result<Vec<u8>, AttachmentError> {
        let ciphertext = download_and_verify(&self.store, &metadata.url, &metadata.sha256).await?;
        let plaintext = self
            .cipher
            .decrypt(&ciphertext, &metadata.key, &metadata.nonce)?;

        if let Some(expected) = &metadata.original_sha256 {
            let actual = sha256_hex(&plaintext);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(AttachmentError::IntegrityFailure {
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(plaintext)
    }
}
