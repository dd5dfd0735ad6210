pub mod build;
pub mod clean;
pub mod run;

use anyhow::{Context, Result};
use kmb_build::{Builder, CompileMode, Platform};
use kmb_config::ConfigLoader;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// What the positional argument asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Clean,
    Run,
    Build(CompileMode),
}

impl FromStr for Action {
    type Err = kmb_build::BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clean" => Ok(Self::Clean),
            "run" => Ok(Self::Run),
            _ => s.parse().map(Self::Build),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Run => write!(f, "run"),
            Self::Build(mode) => write!(f, "{}", mode),
        }
    }
}

/// clap value parser for [`Action`]
pub fn parse_action(s: &str) -> Result<Action, String> {
    s.parse::<Action>().map_err(|e| e.to_string())
}

/// Load the project configuration and create the builder
///
/// `--config` wins over `--project-dir`, which wins over `KMB_PROJECT_DIR`
/// and the search from the working directory.
pub fn load_builder(
    project_dir: Option<&Path>,
    config: Option<&Path>,
    platform: Platform,
) -> Result<Builder> {
    let loader = ConfigLoader::new();
    let loaded = match (config, project_dir) {
        (Some(path), _) => loader.load_from_file(path),
        (None, Some(dir)) => loader.ignore_env().load_from_directory(dir),
        (None, None) => {
            let cwd = std::env::current_dir().context("Failed to read working directory")?;
            loader.load_from_directory(&cwd)
        }
    }
    .context("Failed to load project configuration")?;

    let config = loaded
        .into_build_config()
        .context("Invalid project configuration")?;
    Ok(Builder::new(config, platform))
}
