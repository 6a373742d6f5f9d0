use clap::Args;

use common::order::{bond_state, cancellation, OrderStatus, RoleFlags};

use super::{cancellation_label, OrderOpError};

/// Explain what an order status means for one participant
#[derive(Args, Debug, Clone)]
pub struct Explain {
    /// Status code, 0 to 18
    #[arg(long)]
    pub status: u8,

    /// We created the order (default is taker)
    #[arg(long)]
    pub maker: bool,

    /// We are buying bitcoin (default is seller)
    #[arg(long)]
    pub buyer: bool,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Explain {
    type Error = OrderOpError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let status = OrderStatus::try_from(self.status)?;
        let role = RoleFlags::new(self.maker, self.buyer);

        Ok(format!(
            "Status {}: {}\nBond: {:?}\nCancel: {}\nChat: {}\nRenewable: {}\nRefresh every: {}s",
            status.code(),
            status.description(),
            bond_state(status, role),
            cancellation_label(cancellation(status, role)),
            if status.chat_permitted() { "open" } else { "closed" },
            if status.renewable() && role.is_maker { "yes" } else { "no" },
            status.refresh_delay().as_secs_f64(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use crate::cli::op::{Op, OpContext};

    use common::order::OrderError;

    use super::*;

    fn ctx() -> OpContext {
        OpContext::new(Url::parse("http://localhost:8000").unwrap(), None).unwrap()
    }

    #[tokio::test]
    async fn test_describes_taker_in_fiat_sent() {
        let output = Explain {
            status: 10,
            maker: false,
            buyer: true,
        }
        .execute(&ctx())
        .await
        .unwrap();
        assert!(output.contains("Bond: Locked"));
        assert!(output.contains("Cancel: not possible"));
        assert!(output.contains("Chat: open"));
    }

    #[tokio::test]
    async fn test_unknown_status() {
        let result = Explain {
            status: 42,
            maker: true,
            buyer: false,
        }
        .execute(&ctx())
        .await;
        assert!(matches!(
            result,
            Err(OrderOpError::Order(OrderError::UnknownStatus(42)))
        ));
    }
}
