//! kmb project configuration
//!
//! Loads `kmb.toml`, validates it and turns it into the immutable
//! [`kmb_build::BuildConfig`] the builder runs with.
//!
//! # Locating the project
//!
//! 1. An explicit config file path (`--config`)
//! 2. The `KMB_PROJECT_DIR` environment variable
//! 3. The nearest `kmb.toml` walking up from the start directory
//!
//! # Example
//!
//! ```no_run
//! use kmb_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loaded = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! let build_config = loaded.into_build_config().unwrap();
//! ```

pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No kmb.toml found in {0} or any parent directory")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{ConfigLoader, LoadedConfig, CONFIG_FILE_NAME, PROJECT_DIR_ENV};
pub use project::ProjectConfig;
