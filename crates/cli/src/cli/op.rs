use std::error::Error;
use std::path::PathBuf;

use url::Url;

use common::api::{ApiClient, ApiError};
use common::identity::RobotIdentity;

use crate::state::{AppState, DEFAULT_COORDINATOR_URL};

/// Resolve the coordinator URL.
///
/// Priority: explicit `--remote` flag > config file `coordinator_url` >
/// the local default.
pub fn resolve_remote(
    explicit: Option<Url>,
    config_path: Option<PathBuf>,
) -> Result<Url, url::ParseError> {
    if let Some(url) = explicit {
        return Ok(url);
    }
    if let Ok(state) = AppState::load(config_path) {
        if let Ok(url) = Url::parse(&state.config.coordinator_url) {
            return Ok(url);
        }
    }
    Url::parse(DEFAULT_COORDINATOR_URL)
}

#[derive(Clone)]
pub struct OpContext {
    /// Unauthenticated client for the coordinator
    pub client: ApiClient,
    /// Optional custom state directory (defaults to ~/.robokit)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(remote: Url, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(&remote)?,
            config_path,
        })
    }

    pub fn remote(&self) -> &Url {
        self.client.base_url()
    }

    pub fn state(&self) -> Result<AppState, crate::state::StateError> {
        AppState::load(self.config_path.clone())
    }

    /// A client that speaks for `robot`
    pub fn robot_client(&self, robot: &RobotIdentity) -> Result<ApiClient, ApiError> {
        ApiClient::with_auth(self.remote(), &robot.auth_header())
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_remote_explicit_wins() {
        let explicit = Url::parse("http://coordinator.onion:9999").unwrap();
        let result = resolve_remote(Some(explicit.clone()), None).unwrap();
        assert_eq!(result, explicit);
    }

    #[test]
    fn test_resolve_remote_falls_back_to_default() {
        let result = resolve_remote(None, Some(PathBuf::from("/nonexistent"))).unwrap();
        assert_eq!(result.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_resolve_remote_reads_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        let config = crate::state::AppConfig {
            coordinator_url: "http://robosats.onion".into(),
            ..Default::default()
        };
        AppState::init(
            Some(path.clone()),
            Some(config),
            &common::identity::Garage::create().unwrap(),
        )
        .unwrap();

        let result = resolve_remote(None, Some(path)).unwrap();
        assert_eq!(result.host_str(), Some("robosats.onion"));
    }
}
