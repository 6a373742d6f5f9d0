use clap::Args;

use common::crypto::{Token, TokenEntropy, TokenError};

#[derive(Args, Debug, Clone)]
pub struct Entropy {
    /// Token to check
    pub token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EntropyError {
    #[error("invalid token: {0}")]
    Token(#[from] TokenError),
}

/// Shared with `robot`
pub fn entropy_report(entropy: &TokenEntropy) -> String {
    format!(
        "Bits of entropy: {:.2}\nShannon entropy: {:.2}\nEnough entropy: {}",
        entropy.bits_entropy,
        entropy.shannon_entropy,
        if entropy.has_enough_entropy {
            "yes"
        } else {
            "no, do not use this token"
        }
    )
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Entropy {
    type Error = EntropyError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let token = Token::try_from(self.token.trim())?;
        let entropy = token.entropy();
        if !entropy.has_enough_entropy {
            tracing::warn!("token does not have enough entropy");
        }
        Ok(entropy_report(&entropy))
    }
}
