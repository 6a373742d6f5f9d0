//! Encrypted image attachments
//!
//! ```text
//! send:    policy -> encrypt -> sha256 -> signed upload -> FileMetadata
//! receive: FileMetadata -> download -> sha256 check -> decrypt
//! ```
//!
//! The key and nonce in [`FileMetadata`] only ever travel inside an end to
//! end encrypted chat message. The store sees ciphertext and a hash.

mod metadata;
mod pipeline;
mod policy;
mod store;

pub use metadata::{FileMessageContext, FileMetadata, ENCRYPTION_ALGORITHM};
pub use pipeline::{
    download_and_verify, upload_authorization, upload_to_store, AttachmentPipeline, UploadResult,
    UPLOAD_AUTH_TTL,
};
pub use policy::{AttachmentPolicy, PolicyError, DEFAULT_MAX_ATTACHMENT_SIZE};
pub use store::{BlobStore, BlobStoreError, BlossomStore, MemoryBlobStore, MEMORY_STORE_PREFIX};

use crate::crypto::{FileCipherError, NostrError};

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("integrity failure: expected sha256 {expected}, got {actual}")]
    IntegrityFailure { expected: String, actual: String },
    #[error("authentication failure: attachment could not be decrypted")]
    AuthenticationFailure,
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
    #[error("blob store error: {0}")]
    Store(#[from] BlobStoreError),
    #[error("invalid attachment metadata: {0}")]
    InvalidMetadata(String),
    #[error("nostr error: {0}")]
    Nostr(#[from] NostrError),
    #[error("cipher error: {0}")]
    Cipher(FileCipherError),
}

impl From<FileCipherError> for AttachmentError {
    fn from(e: FileCipherError) -> Self {
        match e {
            FileCipherError::AuthenticationFailure => AttachmentError::AuthenticationFailure,
            other => AttachmentError::Cipher(other),
        }
    }
}
