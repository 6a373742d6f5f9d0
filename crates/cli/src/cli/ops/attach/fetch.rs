use std::path::PathBuf;

use clap::Args;

use common::attachment::{AttachmentError, AttachmentPipeline, BlossomStore, FileMetadata};

use super::{read_file, write_file, AttachOpError};

/// Download, verify and decrypt an attachment
#[derive(Args, Debug, Clone)]
pub struct Fetch {
    /// File holding the attachment envelope received in chat
    #[arg(long)]
    pub envelope: PathBuf,

    #[arg(long)]
    pub output: PathBuf,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Fetch {
    type Error = AttachOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let raw = read_file(&self.envelope)?;
        let text = String::from_utf8_lossy(&raw);
        let metadata = match FileMetadata::from_envelope(&text) {
            Some(metadata) => metadata,
            // bare metadata without the envelope tag
            None => serde_json::from_str::<FileMetadata>(&text)?,
        };

        let store = BlossomStore::new(ctx.remote()).map_err(AttachmentError::from)?;
        let policy = match ctx.state() {
            Ok(state) => state.config.attachment_policy(),
            Err(_) => Default::default(),
        };
        let pipeline = AttachmentPipeline::new(store, policy);
        let plaintext = pipeline.receive(&metadata).await?;
        write_file(&self.output, &plaintext)?;

        Ok(format!(
            "Saved {} ({}, {} bytes)",
            self.output.display(),
            metadata.mime_type,
            plaintext.len()
        ))
    }
}
