//! TOML configuration file loading
//!
//! Keys use kebab-case and mirror the long command-line flags. Unknown keys
//! are an error so typos do not silently fall back to defaults.

use crate::core::validation::ValidationError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub listen: Option<String>,
    pub pid_file: Option<PathBuf>,
    pub client_timeout: Option<u64>,
    pub max_item_size: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
    pub color: Option<bool>,
}

impl ConfigFile {
    /// `<config_dir>/Stashq/stashq.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Stashq").join("stashq.toml"))
    }

    pub fn parse(contents: &str) -> Result<Self, ValidationError> {
        toml::from_str(contents)
            .map_err(|e| ValidationError::new(format!("Invalid configuration: {}", e)))
    }

    pub async fn load(path: &Path) -> Result<Self, ValidationError> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ValidationError::new(format!(
                "Error reading configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&contents).map_err(|e| {
            ValidationError::new(format!("{} ({})", e.message, path.display()))
        })
    }

    /// Load the configuration to use
    ///
    /// An explicitly named file must exist. Without one, the default path is
    /// used when present and an empty configuration otherwise.
    pub async fn discover(explicit: Option<&Path>) -> Result<Self, ValidationError> {
        match explicit {
            Some(path) if !path.exists() => Err(ValidationError::new(format!(
                "The specified configuration file does not exist: {}",
                path.display()
            ))),
            Some(path) => Self::load(path).await,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path).await,
                _ => Ok(Self::default()),
            },
        }
    }
}
