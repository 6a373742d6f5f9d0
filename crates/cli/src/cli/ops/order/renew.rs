use clap::Args;

use common::order::GetOrderRequest;

use super::{current_robot, describe, OrderOpError};

/// Publish a fresh order with the terms of a finished one
#[derive(Args, Debug, Clone)]
pub struct Renew {
    #[arg(long)]
    pub order_id: u64,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Renew {
    type Error = OrderOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let robot = current_robot(ctx)?;
        let client = ctx.robot_client(&robot)?;
        let previous = client
            .call(GetOrderRequest {
                order_id: self.order_id,
            })
            .await?;

        let request = previous.renewal()?;
        tracing::info!("renewing order {}", previous.id);
        let renewed = client.call(request).await?;
        Ok(format!("Renewed order {} as:\n{}", previous.id, describe(&renewed)))
    }
}
