//! Robot tokens
//!
//! A token is the 36 character bearer credential of one robot. Generated
//! tokens come from a [`DerivedCredential`]; imported tokens are arbitrary
//! strings and should pass [`Token::entropy`] before they are trusted.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

use super::base91;
use super::garage_key::DerivedCredential;

/// Length of a generated token
pub const TOKEN_LENGTH: usize = 36;
/// Symbol used to left-pad short tokens
pub const TOKEN_FILLER: char = 'A';

const BASE62_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Errors that can occur when handling tokens
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,
}

/// Entropy report for a token
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenEntropy {
    pub has_enough_entropy: bool,
    pub bits_entropy: f64,
    pub shannon_entropy: f64,
}

/// A robot's bearer credential, also the passphrase of its PGP key
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Token {
    type Error = TokenError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(Token(value))
    }
}

impl TryFrom<&str> for Token {
    type Error = TokenError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Token::try_from(value.to_string())
    }
}

impl From<&DerivedCredential> for Token {
    fn from(credential: &DerivedCredential) -> Self {
        derive_token(credential)
    }
}

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hash sent to the coordinator in place of the token:
    /// basE91 of SHA-256(token)
    pub fn sha256_base91(&self) -> String {
        base91::encode(&Sha256::digest(self.0.as_bytes()))
    }

    /// Nickname and avatar seed: hex SHA-256 of the hex SHA-256 of the token.
    ///
    /// The second round hashes the hex string, not the raw digest, so the
    /// value matches what every other client computes for the same robot.
    pub fn hash_id(&self) -> String {
        let first = hex::encode(Sha256::digest(self.0.as_bytes()));
        hex::encode(Sha256::digest(first.as_bytes()))
    }

    /// Measure how guessable this token is.
    ///
    /// `bits_entropy` is `log2(unique_symbols ^ length)`, which rates the
    /// alphabet in use rather than the string itself; `shannon_entropy` is
    /// computed from the symbol frequencies. Both must clear their bar.
    pub fn entropy(&self) -> TokenEntropy {
        let mut counts: HashMap<char, usize> = HashMap::new();
        let mut len = 0usize;
        for c in self.0.chars() {
            *counts.entry(c).or_default() += 1;
            len += 1;
        }

        let shannon_entropy = counts
            .values()
            .map(|count| {
                let p = *count as f64 / len as f64;
                -p * p.log2()
            })
            .sum::<f64>();

        let unique = counts.len() as f64;
        let bits_entropy = len as f64 * unique.log2();

        TokenEntropy {
            has_enough_entropy: bits_entropy > 128.0 && shannon_entropy > 4.0,
            bits_entropy,
            shannon_entropy,
        }
    }
}

/// Re-encode a derived credential as a 36 symbol base62 token.
///
/// The credential is read as a big-endian integer; at most 36 base62 digits
/// are kept (least significant first) and the result is left-padded with
/// [`TOKEN_FILLER`].
pub fn derive_token(credential: &DerivedCredential) -> Token {
    let mut num = credential.bytes().to_vec();
    let mut digits = Vec::with_capacity(TOKEN_LENGTH);

    while digits.len() < TOKEN_LENGTH && num.iter().any(|b| *b != 0) {
        let remainder = div_rem_in_place(&mut num, 62);
        digits.push(BASE62_ALPHABET[remainder as usize] as char);
    }
    while digits.len() < TOKEN_LENGTH {
        digits.push(TOKEN_FILLER);
    }

    Token(digits.into_iter().rev().collect())
}

// long division of a big-endian number, returns the remainder
fn div_rem_in_place(num: &mut [u8], divisor: u32) -> u32 {
    let mut remainder: u32 = 0;
    for byte in num.iter_mut() {
        let acc = (remainder << 8) | *byte as u32;
        *byte = (acc / divisor) as u8;
        remainder = acc % divisor;
    }
    remainder
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_token_length_and_alphabet() {
        let credential = DerivedCredential::from([0xffu8; 32]);
        let token = derive_token(&credential);
        assert_eq!(token.as_str().len(), TOKEN_LENGTH);
        assert!(token
            .as_str()
            .bytes()
            .all(|c| BASE62_ALPHABET.contains(&c)));
    }

    #[test]
    fn test_small_values_are_left_padded() {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let token = derive_token(&DerivedCredential::from(bytes));
        assert_eq!(token.as_str(), format!("{}B", "A".repeat(35)));

        bytes[31] = 62;
        let token = derive_token(&DerivedCredential::from(bytes));
        assert_eq!(token.as_str(), format!("{}BA", "A".repeat(34)));

        let zero = derive_token(&DerivedCredential::from([0u8; 32]));
        assert_eq!(zero.as_str(), "A".repeat(36));
    }

    #[test]
    fn test_long_division() {
        // 0x0100 = 256 = 4 * 62 + 8
        let mut num = vec![0x01, 0x00];
        assert_eq!(div_rem_in_place(&mut num, 62), 8);
        assert_eq!(num, vec![0x00, 4]);
    }

    #[test]
    fn test_hashes_are_distinct() {
        let token = Token::try_from("AAAAbbbbCCCCddddEEEEffffGGGGhhhh1234").unwrap();
        let auth = token.sha256_base91();
        let hash_id = token.hash_id();
        assert_eq!(hash_id.len(), 64);
        assert_ne!(auth, hash_id);
        assert_ne!(
            hash_id,
            hex::encode(Sha256::digest(token.as_str().as_bytes()))
        );
    }

    #[test]
    fn test_entropy_of_generated_token() {
        let token = derive_token(&DerivedCredential::from([0x5au8; 32]));
        let report = token.entropy();
        assert!(report.bits_entropy > 0.0);
        assert!(report.shannon_entropy > 0.0);
    }

    #[test]
    fn test_entropy_rejects_repetitive_tokens() {
        let token = Token::try_from("a".repeat(64)).unwrap();
        let report = token.entropy();
        assert!(!report.has_enough_entropy);
        assert_eq!(report.bits_entropy, 0.0);
        assert_eq!(report.shannon_entropy, 0.0);

        let token = Token::try_from("abababababababababababababababababab").unwrap();
        let report = token.entropy();
        assert!((report.bits_entropy - 36.0).abs() < 1e-9);
        assert!((report.shannon_entropy - 1.0).abs() < 1e-9);
        assert!(!report.has_enough_entropy);
    }

    #[test]
    fn test_entropy_accepts_strong_tokens() {
        let token = Token::try_from("AbCdEfGhIjKlMnOpQrStUvWxYz0123456789").unwrap();
        let report = token.entropy();
        assert!(report.bits_entropy > 128.0);
        assert!(report.shannon_entropy > 4.0);
        assert!(report.has_enough_entropy);
    }

    #[test]
    fn test_empty_token_is_rejected() {
        assert!(matches!(Token::try_from(""), Err(TokenError::Empty)));
    }
}
