use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Args;

use common::crypto::{encrypt_file, sha256_hex};

use super::{read_file, write_file, AttachOpError};

/// Encrypt a file locally, without uploading it
#[derive(Args, Debug, Clone)]
pub struct Encrypt {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Encrypt {
    type Error = AttachOpError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let plaintext = read_file(&self.input)?;
        let sealed = encrypt_file(&plaintext, None)?;
        write_file(&self.output, &sealed.ciphertext)?;

        Ok(format!(
            "Key: {}\nNonce: {}\nSHA-256: {}",
            STANDARD.encode(sealed.key.bytes()),
            STANDARD.encode(sealed.nonce.bytes()),
            sha256_hex(&sealed.ciphertext)
        ))
    }
}
