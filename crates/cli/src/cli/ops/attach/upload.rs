use std::path::PathBuf;

use clap::Args;

use common::attachment::{AttachmentError, AttachmentPipeline, BlossomStore};

use super::{read_file, AttachOpError};

/// Encrypt an image and upload it to the coordinator's blob store.
///
/// Prints the envelope to paste into an encrypted chat message.
#[derive(Args, Debug, Clone)]
pub struct Upload {
    #[arg(long)]
    pub input: PathBuf,

    /// Override the guessed mime type
    #[arg(long)]
    pub mime_type: Option<String>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = AttachOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let garage = state.load_garage()?;
        let robot = garage.robot_without_keys(garage.account()?)?;

        let plaintext = read_file(&self.input)?;
        let mime_type = match &self.mime_type {
            Some(mime_type) => mime_type.clone(),
            None => mime_guess::from_path(&self.input)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };

        let store = BlossomStore::new(ctx.remote()).map_err(AttachmentError::from)?;
        let pipeline = AttachmentPipeline::new(store, state.config.attachment_policy());
        let metadata = pipeline.send(&plaintext, &mime_type, robot.nostr()).await?;
        tracing::info!("uploaded attachment {}", metadata.sha256);

        Ok(metadata.to_envelope()?)
    }
}
