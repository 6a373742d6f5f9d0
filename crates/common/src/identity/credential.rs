use serde::{Deserialize, Serialize};

use crate::chat::escape;
use crate::crypto::{
    derive_token, KeyError, NostrError, NostrKeys, PgpError, PgpKeyPair, RobotKey, RootSecret,
    Token, TokenEntropy,
};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("pgp error: {0}")]
    Pgp(#[from] PgpError),
    #[error("nostr error: {0}")]
    Nostr(#[from] NostrError),
    #[error("robot has no pgp keys yet")]
    MissingPgpKeys,
}

/// Everything a robot presents to the coordinator and its counterparty
#[derive(Debug, Clone)]
pub struct RobotIdentity {
    // None for robots built from an imported token
    account: Option<u32>,
    token: Token,
    token_hash: String,
    hash_id: String,
    nostr: NostrKeys,
    pgp: Option<PgpKeyPair>,
}

/// Public, non-secret view of an identity, safe to print or log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotSummary {
    pub account: Option<u32>,
    pub token_hash: String,
    pub hash_id: String,
    pub nostr_public_key: String,
    pub has_pgp_keys: bool,
}

impl RobotIdentity {
    /// Derive the robot for `account` from a garage key
    pub fn derive(root: &RootSecret, account: u32) -> Result<Self, IdentityError> {
        let credential = root.derive_account_secret(account)?;
        let mut identity = Self::from_token(derive_token(&credential))?;
        identity.account = Some(account);
        Ok(identity)
    }

    /// Build a robot around an externally supplied token.
    ///
    /// Callers should warn the user when [`RobotIdentity::entropy`] reports
    /// the token as weak.
    pub fn from_token(token: Token) -> Result<Self, IdentityError> {
        let nostr = NostrKeys::derive(&token)?;
        Ok(Self {
            account: None,
            token_hash: token.sha256_base91(),
            hash_id: token.hash_id(),
            token,
            nostr,
            pgp: None,
        })
    }

    /// Attach previously generated keys
    pub fn with_pgp_keys(mut self, keys: PgpKeyPair) -> Self {
        self.pgp = Some(keys);
        self
    }

    /// Generate the robot's PGP keys if it has none yet.
    ///
    /// Returns true if new keys were generated.
    pub fn ensure_pgp_keys(&mut self) -> Result<bool, IdentityError> {
        if self.pgp.is_some() {
            return Ok(false);
        }
        tracing::debug!("generating pgp keys for robot {}", self.hash_id);
        self.pgp = Some(PgpKeyPair::generate(&self.token)?);
        Ok(true)
    }

    pub fn account(&self) -> Option<u32> {
        self.account
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn token_hash(&self) -> &str {
        &self.token_hash
    }

    pub fn hash_id(&self) -> &str {
        &self.hash_id
    }

    pub fn nostr(&self) -> &NostrKeys {
        &self.nostr
    }

    pub fn pgp_keys(&self) -> Option<&PgpKeyPair> {
        self.pgp.as_ref()
    }

    pub fn entropy(&self) -> TokenEntropy {
        self.token.entropy()
    }

    /// Parse the PGP keys for signing and decryption
    pub fn robot_key(&self) -> Result<RobotKey, IdentityError> {
        let keys = self.pgp.as_ref().ok_or(IdentityError::MissingPgpKeys)?;
        Ok(keys.unlock(&self.token)?)
    }

    /// `Authorization` header value for an already registered robot
    pub fn auth_header(&self) -> String {
        format!("Token {}", self.token_hash)
    }

    /// `Authorization` header value for the first contact with a
    /// coordinator, which also registers the robot's keys
    pub fn registration_auth_header(&self) -> Result<String, IdentityError> {
        let keys = self.pgp.as_ref().ok_or(IdentityError::MissingPgpKeys)?;
        Ok(format!(
            "Token {} | Public {} | Private {} | Nostr {}",
            self.token_hash,
            escape(&keys.public_key),
            escape(&keys.encrypted_private_key),
            self.nostr.public_key_hex()
        ))
    }

    pub fn summary(&self) -> RobotSummary {
        RobotSummary {
            account: self.account,
            token_hash: self.token_hash.clone(),
            hash_id: self.hash_id.clone(),
            nostr_public_key: self.nostr.public_key_hex(),
            has_pgp_keys: self.pgp.is_some(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_derive_matches_manual_chain() {
        let root = RootSecret::from([3u8; 32]);
        let robot = RobotIdentity::derive(&root, 2).unwrap();
        let token = derive_token(&root.derive_account_secret(2).unwrap());

        assert_eq!(robot.account(), Some(2));
        assert_eq!(robot.token(), &token);
        assert_eq!(robot.token_hash(), token.sha256_base91());
        assert_eq!(robot.hash_id(), token.hash_id());
        assert_ne!(robot.token_hash(), robot.hash_id());
    }

    #[test]
    fn test_auth_headers() {
        let token = Token::try_from("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefgh12").unwrap();
        let mut robot = RobotIdentity::from_token(token).unwrap();
        assert_eq!(robot.account(), None);
        assert_eq!(robot.auth_header(), format!("Token {}", robot.token_hash()));
        assert!(matches!(
            robot.registration_auth_header(),
            Err(IdentityError::MissingPgpKeys)
        ));

        assert!(robot.ensure_pgp_keys().unwrap());
        assert!(!robot.ensure_pgp_keys().unwrap());

        let header = robot.registration_auth_header().unwrap();
        assert!(!header.contains('\n'));
        assert!(header.starts_with(&format!("Token {} | Public -----BEGIN PGP PUBLIC KEY BLOCK-----", robot.token_hash())));
        assert!(header.ends_with(&format!("| Nostr {}", robot.nostr().public_key_hex())));
    }

    #[test]
    fn test_summary_contains_no_secrets() {
        let token = Token::try_from("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefgh12").unwrap();
        let robot = RobotIdentity::from_token(token.clone()).unwrap();
        let json = serde_json::to_string(&robot.summary()).unwrap();
        assert!(!json.contains(token.as_str()));
    }
}
