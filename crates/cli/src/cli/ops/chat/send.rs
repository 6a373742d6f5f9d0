use std::path::PathBuf;

use clap::Args;

use common::attachment::{AttachmentPipeline, BlossomStore};
use common::chat::SendOutcome;

use super::{join, ChatOpError, ChatTarget};

/// Send an encrypted message or image to the counterparty.
///
/// Messages starting with `#` go out unencrypted.
#[derive(Args, Debug, Clone)]
pub struct SendMessage {
    #[command(flatten)]
    pub target: ChatTarget,

    #[arg(long, required_unless_present = "image", conflicts_with = "image")]
    pub message: Option<String>,

    /// Image to encrypt, upload and share
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for SendMessage {
    type Error = ChatOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, chat) = join(ctx, &self.target).await?;

        let outcome = match (&self.message, &self.image) {
            (_, Some(path)) => {
                let plaintext = std::fs::read(path)
                    .map_err(|e| ChatOpError::Io(path.display().to_string(), e))?;
                let mime_type = mime_guess::from_path(path).first_or_octet_stream();
                let store = BlossomStore::new(ctx.remote())
                    .map_err(common::attachment::AttachmentError::from)?;
                let pipeline = AttachmentPipeline::new(store, state.config.attachment_policy());
                let robot = {
                    let garage = state.load_garage()?;
                    garage.robot_without_keys(garage.account()?)?
                };
                let metadata = pipeline
                    .send(&plaintext, mime_type.essence_str(), robot.nostr())
                    .await?;
                chat.send_attachment(&metadata).await?
            }
            (Some(message), None) => chat.send(message).await?,
            (None, None) => SendOutcome::Ignored,
        };

        match outcome {
            SendOutcome::Sent => Ok("Sent".to_string()),
            SendOutcome::Ignored => Ok("Nothing to send".to_string()),
            SendOutcome::Refused => {
                Ok("Refused: the message contains your robot token".to_string())
            }
            SendOutcome::Offline => Err(ChatOpError::Offline),
        }
    }
}
