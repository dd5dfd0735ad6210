//! Host platform and compile mode
//!
//! Both values are chosen once per process (the platform from the host OS,
//! the mode from the command line) and passed explicitly to every component.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Operating system a build is produced for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Mac,
}

impl Platform {
    /// Resolve the platform of the running host
    pub fn current() -> BuildResult<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS identifier (as in `std::env::consts::OS`) to a platform
    pub fn from_os(os: &str) -> BuildResult<Self> {
        match os {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::Mac),
            other => Err(BuildError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Get platform name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Mac => "mac",
        }
    }

    /// Suffix appended to the target name for the produced executable
    pub fn executable_suffix(&self) -> &'static str {
        match self {
            Self::Windows => "_win32.exe",
            Self::Linux => "_linux",
            Self::Mac => "_macos",
        }
    }

    /// Directory name holding prebuilt external libraries for this platform
    pub fn library_dir_name(&self) -> &'static str {
        match self {
            Self::Windows => "win32",
            Self::Linux => "linux",
            Self::Mac => "macos",
        }
    }

    /// All supported platforms
    pub fn all() -> [Platform; 3] {
        [Self::Windows, Self::Linux, Self::Mac]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Platform {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win32" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "mac" | "macos" => Ok(Self::Mac),
            other => Err(BuildError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Build profile controlling optimization and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileMode {
    /// No optimization, all diagnostics
    Debug,
    /// Optimized, internal diagnostics kept
    Internal,
    /// Optimized shipping build
    Release,
}

impl CompileMode {
    /// Get mode name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Internal => "internal",
            Self::Release => "release",
        }
    }

    /// Value of the internal-build macro
    pub fn internal(&self) -> bool {
        matches!(self, Self::Debug | Self::Internal)
    }

    /// Value of the slow-build macro
    pub fn slow(&self) -> bool {
        matches!(self, Self::Debug)
    }

    /// Whether optimizations are enabled
    pub fn optimized(&self) -> bool {
        !matches!(self, Self::Debug)
    }

    /// Which prebuilt library variant (debug or release) this mode links against
    pub fn artifact_flavor(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Internal | Self::Release => "release",
        }
    }

    /// All modes
    pub fn all() -> [CompileMode; 3] {
        [Self::Debug, Self::Internal, Self::Release]
    }
}

impl std::fmt::Display for CompileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CompileMode {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "internal" => Ok(Self::Internal),
            "release" => Ok(Self::Release),
            _ => Err(BuildError::UnknownCompileMode(s.to_string())),
        }
    }
}
