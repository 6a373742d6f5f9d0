use clap::Args;

use common::identity::{Garage, GarageError};

use super::{commit, open, GarageOpError};

/// Replace the stored garage key with a backed up one
#[derive(Args, Debug, Clone)]
pub struct Import {
    #[arg(long)]
    pub key: String,

    /// Overwrite the current garage, losing its robots unless backed up
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Op(#[from] GarageOpError),
    #[error("garage error: {0}")]
    Garage(#[from] GarageError),
    #[error("refusing to replace the current garage without --force")]
    WouldOverwrite,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Import {
    type Error = ImportError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, current) = open(ctx)?;
        let imported = Garage::from_encoded(self.key.trim())?;

        if current.encoded_key()? == imported.encoded_key()? {
            return Ok("Garage key already in use".to_string());
        }
        if !self.force {
            return Err(ImportError::WouldOverwrite);
        }

        current.dispose();
        tracing::info!("replacing garage at {}", state.garage_path.display());
        Ok(commit(&state, &imported)?)
    }
}
