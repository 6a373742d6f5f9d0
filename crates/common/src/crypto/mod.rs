//! Cryptographic primitives for robot identities
//!
//! - **Garage key**: one bech32 encoded root secret, the only thing a user backs up
//! - **Tokens**: per-account bearer credentials derived from the garage key
//! - **PGP**: per-robot OpenPGP keys for the end-to-end encrypted trade chat
//! - **Nostr**: per-robot secp256k1 keys signing blob store authorizations
//! - **Files**: XChaCha20-Poly1305 encryption of attachments
//!
//! # Derivation chain
//!
//! ```text
//! RootSecret --BIP32 m/44'/88'/i'/0--> DerivedCredential --base62--> Token
//!                                                                     |
//!                          PGP passphrase, auth hash, hash id  <------+
//!                          Nostr key = SHA-256(SHA-512(token)) <------+
//! ```

mod base91;
mod file;
mod garage_key;
mod nostr;
mod openpgp;
mod token;

pub use file::{
    decrypt_file, encrypt_file, sha256_hex, EncryptedFile, FileCipher, FileCipherError, FileKey,
    FileNonce, XChaChaFileCipher, FILE_KEY_SIZE, FILE_NONCE_SIZE,
};
pub use garage_key::{
    account_index, derivation_path, DerivedCredential, KeyError, RootSecret, GARAGE_KEY_PREFIX,
};
pub use nostr::{Event, NostrError, NostrKeys, BLOB_AUTH_KIND, FILE_MESSAGE_KIND};
pub use openpgp::{
    parse_public_key, verify_cleartext, DecryptedMessage, PgpError, PgpKeyPair, RobotKey,
    MESSAGE_HEADER, PUBLIC_KEY_HEADER,
};
pub use token::{derive_token, Token, TokenEntropy, TokenError, TOKEN_LENGTH};

pub use ::pgp::SignedPublicKey;
