//! Attachment encryption using XChaCha20-Poly1305
//!
//! Each attachment gets its own random 256-bit [`FileKey`] and 192-bit
//! nonce. The ciphertext is `encrypted(plaintext) || tag (16 bytes)`; key
//! and nonce travel separately, inside the encrypted chat message that
//! references the attachment. The blob store only ever sees ciphertext.

use std::fmt;
use std::ops::Deref;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Size of an XChaCha20-Poly1305 nonce in bytes
pub const FILE_NONCE_SIZE: usize = 24;
/// Size of an XChaCha20-Poly1305 key in bytes
pub const FILE_KEY_SIZE: usize = 32;
/// Size of the Poly1305 tag appended to every ciphertext
pub const TAG_SIZE: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum FileCipherError {
    #[error("authentication failure: ciphertext was modified or the key is wrong")]
    AuthenticationFailure,
    #[error("invalid {what} size, expected {expected}, got {got}")]
    InvalidSize {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("file cipher error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Symmetric key for one attachment
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileKey([u8; FILE_KEY_SIZE]);

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileKey(..)")
    }
}

impl Deref for FileKey {
    type Target = [u8; FILE_KEY_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; FILE_KEY_SIZE]> for FileKey {
    fn from(bytes: [u8; FILE_KEY_SIZE]) -> Self {
        FileKey(bytes)
    }
}

impl FileKey {
    pub fn generate() -> Result<Self, FileCipherError> {
        let mut buff = [0; FILE_KEY_SIZE];
        getrandom::getrandom(&mut buff)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self(buff))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, FileCipherError> {
        Ok(Self(to_array(data, "key")?))
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// Nonce used for one attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNonce([u8; FILE_NONCE_SIZE]);

impl From<[u8; FILE_NONCE_SIZE]> for FileNonce {
    fn from(bytes: [u8; FILE_NONCE_SIZE]) -> Self {
        FileNonce(bytes)
    }
}

impl FileNonce {
    pub fn generate() -> Result<Self, FileCipherError> {
        let mut buff = [0; FILE_NONCE_SIZE];
        getrandom::getrandom(&mut buff)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        Ok(Self(buff))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, FileCipherError> {
        Ok(Self(to_array(data, "nonce")?))
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

fn to_array<const N: usize>(data: &[u8], what: &'static str) -> Result<[u8; N], FileCipherError> {
    if data.len() != N {
        return Err(FileCipherError::InvalidSize {
            what,
            expected: N,
            got: data.len(),
        });
    }
    let mut buff = [0; N];
    buff.copy_from_slice(data);
    Ok(buff)
}

/// Output of [`encrypt_file`]
#[derive(Debug, Clone)]
pub struct EncryptedFile {
    pub ciphertext: Vec<u8>,
    pub nonce: FileNonce,
    pub key: FileKey,
}

/// Encrypt `plaintext` under `key`, or a freshly generated key if none is
/// given. A random nonce is drawn for every call.
pub fn encrypt_file(plaintext: &[u8], key: Option<FileKey>) -> Result<EncryptedFile, FileCipherError> {
    let key = match key {
        Some(key) => key,
        None => FileKey::generate()?,
    };
    let nonce = FileNonce::generate()?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.bytes()));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(nonce.bytes()), plaintext)
        .map_err(|_| anyhow::anyhow!("encrypt error"))?;

    Ok(EncryptedFile {
        ciphertext,
        nonce,
        key,
    })
}

/// Open a ciphertext produced by [`encrypt_file`].
///
/// # Errors
///
/// Returns [`FileCipherError::AuthenticationFailure`] if the tag does not
/// verify. No plaintext is returned in that case.
pub fn decrypt_file(
    ciphertext: &[u8],
    key: &FileKey,
    nonce: &FileNonce,
) -> Result<Vec<u8>, FileCipherError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(FileCipherError::AuthenticationFailure);
    }
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.bytes()));
    cipher
        .decrypt(XNonce::from_slice(nonce.bytes()), ciphertext)
        .map_err(|_| FileCipherError::AuthenticationFailure)
}

/// Hex SHA-256, the content address used by the blob store
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// The symmetric cipher used by the attachment pipeline
pub trait FileCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], key: Option<FileKey>) -> Result<EncryptedFile, FileCipherError>;
    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &FileKey,
        nonce: &FileNonce,
    ) -> Result<Vec<u8>, FileCipherError>;
}

/// [`FileCipher`] backed by [`encrypt_file`] and [`decrypt_file`]
#[derive(Debug, Clone, Copy, Default)]
pub struct XChaChaFileCipher;

impl FileCipher for XChaChaFileCipher {
    fn encrypt(&self, plaintext: &[u8], key: Option<FileKey>) -> Result<EncryptedFile, FileCipherError> {
        encrypt_file(plaintext, key)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &FileKey,
        nonce: &FileNonce,
    ) -> Result<Vec<u8>, FileCipherError> {
        decrypt_file(ciphertext, key, nonce)
    }
}
