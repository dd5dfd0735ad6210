//! Configuration Loader
//!
//! Finds the project file and produces the builder configuration.

use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult};
use kmb_build::BuildConfig;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project file name
pub const CONFIG_FILE_NAME: &str = "kmb.toml";

/// Environment variable naming the project directory
pub const PROJECT_DIR_ENV: &str = "KMB_PROJECT_DIR";

/// Configuration loader
///
/// Resolution order, first match wins:
/// 1. `KMB_PROJECT_DIR` (the project file must exist there)
/// 2. The nearest `kmb.toml` walking up from the start directory
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Ignore `KMB_PROJECT_DIR`
    ignore_env: bool,
}

/// A parsed project file and the directory it was found in
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Project configuration
    pub project: ProjectConfig,

    /// Absolute project root (directory containing kmb.toml)
    pub project_root: PathBuf,

    /// Path of the file that was loaded
    pub config_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not consult `KMB_PROJECT_DIR`
    pub fn ignore_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration starting from the given directory
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<LoadedConfig> {
        if !self.ignore_env {
            if let Some(dir) = env::var_os(PROJECT_DIR_ENV).filter(|v| !v.is_empty()) {
                let dir = PathBuf::from(dir);
                debug!("Using {}={}", PROJECT_DIR_ENV, dir.display());
                let config_path = dir.join(CONFIG_FILE_NAME);
                if !config_path.is_file() {
                    return Err(ConfigError::NotFound(dir));
                }
                return self.load_from_file(&config_path);
            }
        }

        let config_path = Self::find_config_file(start_dir)?;
        self.load_from_file(&config_path)
    }

    /// Load configuration from a specific project file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<LoadedConfig> {
        let config_path =
            dunce::canonicalize(config_path).map_err(|e| ConfigError::io(config_path, e))?;
        let project = ProjectConfig::load_from_file(&config_path)?;

        let project_root = config_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ConfigError::NotFound(config_path.clone()))?;

        debug!("Loaded {}", config_path.display());
        Ok(LoadedConfig {
            project,
            project_root,
            config_path,
        })
    }

    /// Walk up the directory tree looking for `kmb.toml`
    pub fn find_config_file(start_dir: &Path) -> ConfigResult<PathBuf> {
        let start = dunce::canonicalize(start_dir).map_err(|e| ConfigError::io(start_dir, e))?;

        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        Err(ConfigError::NotFound(start))
    }
}

impl LoadedConfig {
    /// Get the project name
    pub fn project_name(&self) -> &str {
        &self.project.project.name
    }

    /// Convert into the builder configuration rooted at the project root
    pub fn into_build_config(self) -> ConfigResult<BuildConfig> {
        self.project.to_build_config(&self.project_root)
    }
}
