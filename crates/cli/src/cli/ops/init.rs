use clap::Args;

use common::identity::{Garage, GarageError};

use crate::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Coordinator URL to store in the config
    #[arg(long, default_value = crate::state::DEFAULT_COORDINATOR_URL)]
    pub coordinator_url: String,

    /// Default log level
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Restore an existing garage key instead of generating one
    #[arg(long)]
    pub garage_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
    #[error("invalid garage key: {0}")]
    Garage(#[from] GarageError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            coordinator_url: self.coordinator_url.clone(),
            log_level: self.log_level.clone(),
            ..AppConfig::default()
        };

        let garage = match &self.garage_key {
            Some(key) => Garage::from_encoded(key)?,
            None => Garage::create()?,
        };
        let state = AppState::init(ctx.config_path.clone(), Some(config), &garage)?;

        let mut output = format!(
            "Initialized robokit directory at: {}\n\
             - Config: {}\n\
             - Garage: {}\n\
             - Coordinator: {}",
            state.state_dir.display(),
            state.config_path.display(),
            state.garage_path.display(),
            state.config.coordinator_url,
        );
        if self.garage_key.is_none() {
            output.push_str(&format!(
                "\n\nGarage key (back it up, it is the only way to recover your robots):\n{}",
                garage.encoded_key()?
            ));
        }
        Ok(output)
    }
}
