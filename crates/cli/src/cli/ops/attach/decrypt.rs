use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Args;

use common::crypto::{decrypt_file, FileKey, FileNonce};

use super::{read_file, write_file, AttachOpError};

/// Decrypt a file produced by `attach encrypt`
#[derive(Args, Debug, Clone)]
pub struct Decrypt {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    /// Base64 key
    #[arg(long)]
    pub key: String,

    /// Base64 nonce
    #[arg(long)]
    pub nonce: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Decrypt {
    type Error = AttachOpError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let key = STANDARD
            .decode(self.key.trim())
            .map_err(|_| AttachOpError::Base64("key"))?;
        let nonce = STANDARD
            .decode(self.nonce.trim())
            .map_err(|_| AttachOpError::Base64("nonce"))?;
        let key = FileKey::from_slice(&key)?;
        let nonce = FileNonce::from_slice(&nonce)?;

        let ciphertext = read_file(&self.input)?;
        let plaintext = decrypt_file(&ciphertext, &key, &nonce)?;
        write_file(&self.output, &plaintext)?;

        Ok(format!(
            "Decrypted {} bytes to {}",
            plaintext.len(),
            self.output.display()
        ))
    }
}
