use clap::Args;

use common::crypto::Token;
use common::identity::{GarageError, IdentityError, RobotIdentity};

use crate::state::StateError;

use super::entropy::entropy_report;
use super::garage::{describe, open, GarageOpError};

/// Show a robot, generating its PGP keys on first use
#[derive(Args, Debug, Clone)]
pub struct Robot {
    /// Account to show (defaults to the garage's current account)
    #[arg(long, conflicts_with = "token")]
    pub account: Option<u32>,

    /// Inspect a robot from a bare token instead of the garage
    #[arg(long)]
    pub token: Option<String>,

    /// Also print the token itself
    #[arg(long)]
    pub reveal_token: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    #[error(transparent)]
    Op(#[from] GarageOpError),
    #[error("garage error: {0}")]
    Garage(#[from] GarageError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("invalid token: {0}")]
    Token(#[from] common::crypto::TokenError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Robot {
    type Error = RobotError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let robot = match &self.token {
            Some(token) => {
                let robot = RobotIdentity::from_token(Token::try_from(token.trim())?)?;
                if !robot.entropy().has_enough_entropy {
                    tracing::warn!("token does not have enough entropy");
                }
                robot
            }
            None => {
                let (state, garage) = open(ctx)?;
                let account = match self.account {
                    Some(account) => account,
                    None => garage.account()?,
                };
                let robot = garage.robot_for(account)?;
                // keys are generated once and must survive the process
                state.save_garage(&garage)?;
                robot
            }
        };

        let mut output = describe(&robot);
        if self.reveal_token {
            output.push_str(&format!("\nToken: {}", robot.token()));
        }
        output.push('\n');
        output.push_str(&entropy_report(&robot.entropy()));
        Ok(output)
    }
}
