use clap::{Args, Subcommand};

pub mod import;
pub mod show;
pub mod switch;

use common::identity::{Garage as RobotGarage, GarageError, RobotIdentity};

use crate::cli::op::{Op, OpContext};
use crate::state::{AppState, StateError};

crate::command_enum! {
    (Show, show::Show),
    (Next, switch::Next),
    (Prev, switch::Prev),
    (Set, switch::Set),
    (Import, import::Import),
}

pub type GarageCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Garage {
    #[command(subcommand)]
    pub command: GarageCommand,
}

#[async_trait::async_trait]
impl Op for Garage {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GarageOpError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("garage error: {0}")]
    Garage(#[from] GarageError),
}

pub(crate) fn open(ctx: &OpContext) -> Result<(AppState, RobotGarage), GarageOpError> {
    let state = ctx.state()?;
    let garage = state.load_garage()?;
    Ok((state, garage))
}

/// Persist the garage and describe the robot now in use
pub(crate) fn commit(state: &AppState, garage: &RobotGarage) -> Result<String, GarageOpError> {
    let robot = garage.robot_without_keys(garage.account()?)?;
    state.save_garage(garage)?;
    Ok(describe(&robot))
}

pub(crate) fn describe(robot: &RobotIdentity) -> String {
    let summary = robot.summary();
    format!(
        "Account: {}\nHash id: {}\nToken hash: {}\nNostr pubkey: {}\nPGP keys: {}",
        summary
            .account
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".into()),
        summary.hash_id,
        summary.token_hash,
        summary.nostr_public_key,
        if summary.has_pgp_keys {
            "generated"
        } else {
            "not yet generated"
        }
    )
}
