use std::path::Path;

use clap::{Args, Subcommand};

pub mod decrypt;
pub mod encrypt;
pub mod fetch;
pub mod upload;

use common::attachment::AttachmentError;
use common::crypto::FileCipherError;
use common::identity::GarageError;

use crate::cli::op::{Op, OpContext};
use crate::state::StateError;

crate::command_enum! {
    (Encrypt, encrypt::Encrypt),
    (Decrypt, decrypt::Decrypt),
    (Upload, upload::Upload),
    (Fetch, fetch::Fetch),
}

pub type AttachCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Attach {
    #[command(subcommand)]
    pub command: AttachCommand,
}

#[async_trait::async_trait]
impl Op for Attach {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttachOpError {
    #[error("attachment error: {0}")]
    Attachment(#[from] AttachmentError),
    #[error("cipher error: {0}")]
    Cipher(#[from] FileCipherError),
    #[error("invalid base64 in {0}")]
    Base64(&'static str),
    #[error("invalid attachment metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("garage error: {0}")]
    Garage(#[from] GarageError),
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, AttachOpError> {
    std::fs::read(path).map_err(|source| AttachOpError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn write_file(path: &Path, data: &[u8]) -> Result<(), AttachOpError> {
    std::fs::write(path, data).map_err(|source| AttachOpError::Io {
        path: path.display().to_string(),
        source,
    })
}
