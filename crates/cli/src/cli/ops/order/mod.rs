use clap::{Args, Subcommand};

pub mod explain;
pub mod renew;
pub mod show;

use common::api::ApiError;
use common::identity::{GarageError, RobotIdentity};
use common::order::{CancellationClass, OrderDetails, OrderError};

use crate::cli::op::{Op, OpContext};
use crate::state::StateError;

crate::command_enum! {
    (Explain, explain::Explain),
    (Show, show::Show),
    (Renew, renew::Renew),
}

pub type OrderCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Order {
    #[command(subcommand)]
    pub command: OrderCommand,
}

#[async_trait::async_trait]
impl Op for Order {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderOpError {
    #[error("order error: {0}")]
    Order(#[from] OrderError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("garage error: {0}")]
    Garage(#[from] GarageError),
}

pub(crate) fn cancellation_label(class: Option<CancellationClass>) -> &'static str {
    match class {
        Some(CancellationClass::Free) => "free",
        Some(CancellationClass::UnilateralWithRisk) => "unilateral, bond at risk",
        Some(CancellationClass::Collaborative) => "collaborative",
        None => "not possible",
    }
}

/// The garage's current robot, which owns the orders we look at
pub(crate) fn current_robot(ctx: &OpContext) -> Result<RobotIdentity, OrderOpError> {
    let state = ctx.state()?;
    let garage = state.load_garage()?;
    Ok(garage.robot_without_keys(garage.account()?)?)
}

pub(crate) fn describe(order: &OrderDetails) -> String {
    let cancel = order.collaborative_cancel();
    let mut lines = vec![
        format!("Order {}", order.id),
        format!(
            "Status {}: {}",
            order.status.code(),
            order.status.description()
        ),
        format!(
            "Role: {} {}",
            if order.is_maker { "maker" } else { "taker" },
            if order.is_buyer { "buyer" } else { "seller" }
        ),
        format!("Bond: {:?}", order.bond_state()),
        format!("Cancel: {}", cancellation_label(order.cancellation())),
        format!("Chat: {}", if order.chat_permitted() { "open" } else { "closed" }),
    ];
    if cancel.is_peer_requested() {
        lines.push("The counterparty asked for a collaborative cancel".to_string());
    }
    lines.join("\n")
}
