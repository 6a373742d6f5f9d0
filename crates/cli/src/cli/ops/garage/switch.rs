use clap::Args;

use super::{commit, open, GarageOpError};

/// Switch to the next account
#[derive(Args, Debug, Clone)]
pub struct Next;

/// Switch to the previous account, stopping at 0
#[derive(Args, Debug, Clone)]
pub struct Prev;

/// Switch to a specific account
#[derive(Args, Debug, Clone)]
pub struct Set {
    #[arg(long, allow_negative_numbers = true)]
    pub index: i64,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Next {
    type Error = GarageOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, garage) = open(ctx)?;
        garage.increment_account()?;
        commit(&state, &garage)
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Prev {
    type Error = GarageOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, garage) = open(ctx)?;
        garage.decrement_account()?;
        commit(&state, &garage)
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Set {
    type Error = GarageOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, garage) = open(ctx)?;
        garage.set_account_index(self.index)?;
        commit(&state, &garage)
    }
}
