use std::{fs, path::PathBuf, str::FromStr};

use common::attachment::{AttachmentPolicy, DEFAULT_MAX_ATTACHMENT_SIZE};
use common::identity::{Garage, GarageError};
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "robokit";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const GARAGE_FILE_NAME: &str = "garage.toml";
pub const DEFAULT_COORDINATOR_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Coordinator the client talks to
    #[serde(default = "default_coordinator_url")]
    pub coordinator_url: String,
    /// Default log level, `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Largest attachment we agree to encrypt, in bytes
    #[serde(default = "default_max_attachment_size")]
    pub max_attachment_size: u64,
}

fn default_coordinator_url() -> String {
    DEFAULT_COORDINATOR_URL.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_max_attachment_size() -> u64 {
    DEFAULT_MAX_ATTACHMENT_SIZE
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            coordinator_url: default_coordinator_url(),
            log_level: default_log_level(),
            max_attachment_size: default_max_attachment_size(),
        }
    }
}

impl AppConfig {
    pub fn coordinator_url(&self) -> Result<Url, StateError> {
        Url::parse(&self.coordinator_url).map_err(|e| StateError::InvalidConfig(e.to_string()))
    }

    pub fn log_level(&self) -> Result<tracing::Level, StateError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|e| StateError::InvalidConfig(format!("log_level: {}", e)))
    }

    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy {
            max_size: self.max_attachment_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.robokit)
    pub state_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Path to the persisted garage
    pub garage_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.robokit)
    pub fn state_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory around `garage`
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
        garage: &Garage,
    ) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;

        if state_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let config = config.unwrap_or_default();
        // refuse to write a config we could not load again
        config.coordinator_url()?;
        config.log_level()?;

        fs::create_dir_all(&state_dir)?;

        let config_path = state_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        let garage_path = state_dir.join(GARAGE_FILE_NAME);
        garage.save(&garage_path)?;

        Ok(Self {
            state_dir,
            config_path,
            garage_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;

        if !state_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = state_dir.join(CONFIG_FILE_NAME);
        let garage_path = state_dir.join(GARAGE_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        if !garage_path.exists() {
            return Err(StateError::MissingFile(GARAGE_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            state_dir,
            config_path,
            garage_path,
            config,
        })
    }

    /// Load the garage from the garage file
    pub fn load_garage(&self) -> Result<Garage, StateError> {
        Ok(Garage::load_from_persistence(&self.garage_path)?)
    }

    pub fn save_garage(&self, garage: &Garage) -> Result<(), StateError> {
        Ok(garage.save(&self.garage_path)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("robokit directory not initialized. Run 'robokit init' first")]
    NotInitialized,

    #[error("robokit directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("garage error: {0}")]
    Garage(#[from] GarageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        let garage = Garage::create().unwrap();

        let state = AppState::init(Some(path.clone()), None, &garage).unwrap();
        assert!(state.config_path.exists());
        assert!(state.garage_path.exists());

        let loaded = AppState::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.config.coordinator_url, DEFAULT_COORDINATOR_URL);
        assert_eq!(
            loaded.load_garage().unwrap().encoded_key().unwrap(),
            garage.encoded_key().unwrap()
        );

        assert!(matches!(
            AppState::init(Some(path), None, &garage),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppState::load(Some(dir.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_config_defaults_fill_gaps() {
        let config: AppConfig = toml::from_str("log_level = \"debug\"").unwrap();
        assert_eq!(config.log_level().unwrap(), tracing::Level::DEBUG);
        assert_eq!(config.max_attachment_size, DEFAULT_MAX_ATTACHMENT_SIZE);
        assert!(config.coordinator_url().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected_at_init() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            log_level: "chatty".into(),
            ..AppConfig::default()
        };
        let result = AppState::init(
            Some(dir.path().join("state")),
            Some(config),
            &Garage::create().unwrap(),
        );
        assert!(matches!(result, Err(StateError::InvalidConfig(_))));
    }
}
