use clap::Args;

use super::{join, ChatOpError, ChatTarget};

/// Print the conversation of an order
#[derive(Args, Debug, Clone)]
pub struct Read {
    #[command(flatten)]
    pub target: ChatTarget,

    /// Print the audit bundle (our keys and every message) as JSON
    #[arg(long)]
    pub audit: bool,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Read {
    type Error = ChatOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, chat) = join(ctx, &self.target).await?;
        // one more round trip picks up anything sent after the key exchange
        chat.poll().await;

        if self.audit {
            return Ok(chat.audit_export_json()?);
        }

        let messages = chat.messages();
        if messages.is_empty() {
            return Ok(format!("No messages yet ({:?})", chat.state()));
        }
        Ok(messages
            .iter()
            .map(|message| {
                let mark = if message.is_plaintext() {
                    " [unencrypted]"
                } else if !message.valid_signature {
                    " [bad signature]"
                } else {
                    ""
                };
                format!(
                    "{} {}: {}{}",
                    message.time,
                    message.sender_nick,
                    message.display_text(),
                    mark
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
