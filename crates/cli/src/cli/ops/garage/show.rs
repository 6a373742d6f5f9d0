use clap::Args;

use super::{describe, open, GarageOpError};

#[derive(Args, Debug, Clone)]
pub struct Show {
    /// Also print the garage key
    #[arg(long)]
    pub reveal_key: bool,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Show {
    type Error = GarageOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, garage) = open(ctx)?;
        let robot = garage.robot_without_keys(garage.account()?)?;
        let mut output = describe(&robot);
        if self.reveal_key {
            output.push_str(&format!("\nGarage key: {}", garage.encoded_key()?));
        }
        Ok(output)
    }
}
