//! Garage keys: the single root secret behind every robot identity
//!
//! A garage key is 32 random bytes. It is shown to the user as a bech32
//! string with the `robo` human readable prefix, which gives us a checksum
//! against typos for free. Every robot the user ever drives is derived
//! from this one secret:
//!
//! ```text
//! seed    = SHA-512(root)
//! account = BIP32(seed) / m/44'/88'/<index>'/0
//! token   = base62(account)            (see `token.rs`)
//! ```
//!
//! Nothing but the root secret needs to be backed up; accounts, tokens and
//! keys are recomputed on demand.

use std::fmt;
use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use bip32::{DerivationPath, XPrv};
use sha2::{Digest, Sha512};

/// Human readable prefix of an encoded garage key
pub const GARAGE_KEY_PREFIX: &str = "robo";
/// Size of the root secret in bytes
pub const ROOT_SECRET_SIZE: usize = 32;
/// Size of a derived account secret in bytes
pub const DERIVED_SECRET_SIZE: usize = 32;
/// Coin type used in the derivation path
pub const DERIVATION_COIN_TYPE: u32 = 88;
/// Shortest encoded garage key we accept
pub const MIN_ENCODED_LEN: usize = 55;
/// Longest encoded garage key we accept
pub const MAX_ENCODED_LEN: usize = 65;

// hardened indices start here, anything above cannot be hardened again
const HARDENED_OFFSET: u32 = 1 << 31;

/// Errors that can occur while decoding or deriving from a garage key
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("malformed garage key: {0}")]
    MalformedKey(String),
    #[error("derivation error: {0}")]
    Derivation(String),
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// The BIP32 path for an account, `m/44'/88'/<index>'/0`
pub fn derivation_path(account: u32) -> String {
    format!("m/44'/{}'/{}'/0", DERIVATION_COIN_TYPE, account)
}

/// Validate an externally supplied account index.
///
/// Indices come in as signed integers from config files and command lines,
/// so negative values and values past the hardened range are rejected here
/// rather than wrapped.
pub fn account_index(index: i64) -> Result<u32, KeyError> {
    if index < 0 {
        return Err(KeyError::Derivation(format!(
            "account index must be non-negative, got {}",
            index
        )));
    }
    u32::try_from(index)
        .ok()
        .filter(|i| *i < HARDENED_OFFSET)
        .ok_or_else(|| KeyError::Derivation(format!("account index out of range: {}", index)))
}

/// The user held root secret
#[derive(Clone, PartialEq, Eq)]
pub struct RootSecret([u8; ROOT_SECRET_SIZE]);

impl fmt::Debug for RootSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootSecret(..)")
    }
}

impl From<[u8; ROOT_SECRET_SIZE]> for RootSecret {
    fn from(bytes: [u8; ROOT_SECRET_SIZE]) -> Self {
        RootSecret(bytes)
    }
}

impl TryFrom<&[u8]> for RootSecret {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != ROOT_SECRET_SIZE {
            return Err(KeyError::MalformedKey(format!(
                "invalid key length, expected {} bytes, got {}",
                ROOT_SECRET_SIZE,
                bytes.len()
            )));
        }
        let mut buff = [0; ROOT_SECRET_SIZE];
        buff.copy_from_slice(bytes);
        Ok(buff.into())
    }
}

impl FromStr for RootSecret {
    type Err = KeyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl RootSecret {
    /// Generate a new random root secret using a cryptographically secure RNG
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; ROOT_SECRET_SIZE];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self(bytes))
    }

    pub fn to_bytes(&self) -> [u8; ROOT_SECRET_SIZE] {
        self.0
    }

    /// Encode as a bech32 string, `robo1...`
    pub fn encode(&self) -> Result<String, KeyError> {
        bech32::encode(GARAGE_KEY_PREFIX, self.0.to_base32(), Variant::Bech32)
            .map_err(|e| anyhow::anyhow!("bech32 encoding failed: {}", e).into())
    }

    /// Decode a bech32 garage key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::MalformedKey`] if the prefix, length or checksum
    /// is wrong, or if the payload is not exactly 32 bytes. Nothing is ever
    /// truncated or padded.
    pub fn decode(encoded: &str) -> Result<Self, KeyError> {
        if encoded.is_empty() {
            return Err(KeyError::MalformedKey("garage key is empty".into()));
        }
        let expected = format!("{}1", GARAGE_KEY_PREFIX);
        if !encoded.to_lowercase().starts_with(&expected) {
            return Err(KeyError::MalformedKey(format!(
                "must start with \"{}\"",
                expected
            )));
        }
        if encoded.len() < MIN_ENCODED_LEN || encoded.len() > MAX_ENCODED_LEN {
            return Err(KeyError::MalformedKey(format!(
                "invalid length {}, expected {}..={}",
                encoded.len(),
                MIN_ENCODED_LEN,
                MAX_ENCODED_LEN
            )));
        }

        let (hrp, data, variant) = bech32::decode(encoded)
            .map_err(|e| KeyError::MalformedKey(format!("bech32 decoding failed: {}", e)))?;
        if hrp != GARAGE_KEY_PREFIX {
            return Err(KeyError::MalformedKey(format!(
                "invalid prefix: expected \"{}\", got \"{}\"",
                GARAGE_KEY_PREFIX, hrp
            )));
        }
        if variant != Variant::Bech32 {
            return Err(KeyError::MalformedKey("unexpected bech32m checksum".into()));
        }
        let bytes = Vec::<u8>::from_base32(&data)
            .map_err(|e| KeyError::MalformedKey(format!("base32 conversion failed: {}", e)))?;

        Self::try_from(bytes.as_slice())
    }

    /// Derive the secret for one account.
    ///
    /// The seed is the SHA-512 of the root secret; the account secret is the
    /// private key at [`derivation_path`].
    pub fn derive_account_secret(&self, account: u32) -> Result<DerivedCredential, KeyError> {
        if account >= HARDENED_OFFSET {
            return Err(KeyError::Derivation(format!(
                "account index out of range: {}",
                account
            )));
        }

        let seed = Sha512::digest(self.0);
        let path = DerivationPath::from_str(&derivation_path(account))
            .map_err(|e| KeyError::Derivation(format!("invalid derivation path: {}", e)))?;
        let xprv = XPrv::derive_from_path(seed, &path)
            .map_err(|e| KeyError::Derivation(format!("failed to derive private key: {}", e)))?;

        Ok(DerivedCredential(xprv.to_bytes()))
    }
}

/// Per-account secret derived from a [`RootSecret`]
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedCredential([u8; DERIVED_SECRET_SIZE]);

impl fmt::Debug for DerivedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedCredential(..)")
    }
}

impl From<[u8; DERIVED_SECRET_SIZE]> for DerivedCredential {
    fn from(bytes: [u8; DERIVED_SECRET_SIZE]) -> Self {
        DerivedCredential(bytes)
    }
}

impl DerivedCredential {
    pub fn bytes(&self) -> &[u8; DERIVED_SECRET_SIZE] {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let root = RootSecret::generate().unwrap();
        let encoded = root.encode().unwrap();
        assert!(encoded.starts_with("robo1"));
        assert!(encoded.len() >= MIN_ENCODED_LEN && encoded.len() <= MAX_ENCODED_LEN);

        let decoded = RootSecret::decode(&encoded).unwrap();
        assert_eq!(root, decoded);
    }

    #[test]
    fn test_decode_rejects_single_char_mutation() {
        let root = RootSecret::from([7u8; ROOT_SECRET_SIZE]);
        let encoded = root.encode().unwrap();

        // flip one data character somewhere after the separator
        let mut chars: Vec<char> = encoded.chars().collect();
        let pos = 10;
        chars[pos] = if chars[pos] == 'q' { 'p' } else { 'q' };
        let mutated: String = chars.into_iter().collect();

        assert!(matches!(
            RootSecret::decode(&mutated),
            Err(KeyError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_prefix_and_length() {
        assert!(matches!(
            RootSecret::decode(""),
            Err(KeyError::MalformedKey(_))
        ));
        assert!(matches!(
            RootSecret::decode("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
            Err(KeyError::MalformedKey(_))
        ));
        assert!(matches!(
            RootSecret::decode("robo1qqqq"),
            Err(KeyError::MalformedKey(_))
        ));

        // a correctly checksummed key with the wrong payload size
        let short = bech32::encode("robo", [1u8; 31].to_base32(), Variant::Bech32).unwrap();
        assert!(RootSecret::decode(&short).is_err());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let root = RootSecret::from([42u8; ROOT_SECRET_SIZE]);
        let a = root.derive_account_secret(0).unwrap();
        let b = root.derive_account_secret(0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, root.derive_account_secret(1).unwrap());
    }

    #[test]
    fn test_account_index_validation() {
        assert_eq!(account_index(0).unwrap(), 0);
        assert_eq!(account_index(12).unwrap(), 12);
        assert!(matches!(account_index(-1), Err(KeyError::Derivation(_))));
        assert!(matches!(
            account_index(1 << 31),
            Err(KeyError::Derivation(_))
        ));

        let root = RootSecret::from([1u8; ROOT_SECRET_SIZE]);
        assert!(matches!(
            root.derive_account_secret(u32::MAX),
            Err(KeyError::Derivation(_))
        ));
    }

    #[test]
    fn test_derivation_path_format() {
        assert_eq!(derivation_path(0), "m/44'/88'/0'/0");
        assert_eq!(derivation_path(7), "m/44'/88'/7'/0");
    }
}
