use clap::Args;

use common::order::GetOrderRequest;

use super::{current_robot, describe, OrderOpError};

/// Fetch an order as the current robot sees it
#[derive(Args, Debug, Clone)]
pub struct Show {
    #[arg(long)]
    pub order_id: u64,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Show {
    type Error = OrderOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let robot = current_robot(ctx)?;
        let client = ctx.robot_client(&robot)?;
        let order = client
            .call(GetOrderRequest {
                order_id: self.order_id,
            })
            .await?;
        Ok(describe(&order))
    }
}
