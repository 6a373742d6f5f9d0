use clap::{Args, Subcommand};

pub mod read;
pub mod send;

use common::attachment::AttachmentError;
use common::api::ApiError;
use common::chat::{ChatError, EncryptedChat, PullTransport};
use common::identity::GarageError;
use common::order::{GetOrderRequest, OrderDetails, OrderStatus};

use crate::cli::op::{Op, OpContext};
use crate::state::{AppState, StateError};

crate::command_enum! {
    (Read, read::Read),
    (Send, send::SendMessage),
}

pub type ChatCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Chat {
    #[command(subcommand)]
    pub command: ChatCommand,
}

#[async_trait::async_trait]
impl Op for Chat {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

/// Which conversation to join
#[derive(Args, Debug, Clone)]
pub struct ChatTarget {
    #[arg(long)]
    pub order_id: u64,

    /// Name shown to the counterparty (defaults to the robot's hash id)
    #[arg(long)]
    pub nick: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatOpError {
    #[error("chat error: {0}")]
    Chat(#[from] ChatError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("garage error: {0}")]
    Garage(#[from] GarageError),
    #[error("attachment error: {0}")]
    Attachment(#[from] AttachmentError),
    #[error("failed to read {0}: {1}")]
    Io(String, std::io::Error),
    #[error("coordinator is unreachable")]
    Offline,
    #[error("chat is closed while the order is {}", .0.description())]
    ChatClosed(OrderStatus),
}

/// Chat is only open once the fiat exchange has started
pub(crate) fn ensure_chat_open(order: &OrderDetails) -> Result<(), ChatOpError> {
    if order.chat_permitted() {
        Ok(())
    } else {
        Err(ChatOpError::ChatClosed(order.status))
    }
}

/// Join the order chat as the garage's current robot over HTTP polling
pub(crate) async fn join(
    ctx: &OpContext,
    target: &ChatTarget,
) -> Result<(AppState, EncryptedChat<PullTransport>), ChatOpError> {
    let state = ctx.state()?;
    let garage = state.load_garage()?;
    let robot = garage.robot_for(garage.account()?)?;
    state.save_garage(&garage)?;

    let nick = target
        .nick
        .clone()
        .unwrap_or_else(|| robot.hash_id().chars().take(12).collect());
    let client = ctx.robot_client(&robot)?;
    let order = client
        .call(GetOrderRequest {
            order_id: target.order_id,
        })
        .await?;
    ensure_chat_open(&order)?;

    let transport = PullTransport::new(client, target.order_id);
    let chat = EncryptedChat::new(&robot, nick, transport)?;
    chat.connect().await?;
    if !chat.connected() {
        return Err(ChatOpError::Offline);
    }
    Ok((state, chat))
}
