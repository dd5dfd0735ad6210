/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unknown compile mode '{0}': expected one of debug, internal, release")]
    UnknownCompileMode(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Unsupported target type {kind} for target '{target}': only executable targets can be built")]
    UnsupportedTargetType { target: String, kind: String },

    #[error("Invalid target configuration: {0}")]
    InvalidTarget(String),

    #[error("Invalid define '{0}': macro name cannot be empty")]
    InvalidDefine(String),

    #[error("Failed to hash {path}: {error}")]
    HashError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to walk source tree {path}: {error}")]
    WalkError { path: PathBuf, error: String },

    #[error("Staging failed copying {from} to {to}: {error}")]
    StageError {
        from: PathBuf,
        to: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to write deploy archive {path}: {error}")]
    ArchiveError { path: PathBuf, error: String },

    #[error("Failed to start toolchain '{program}': {error}")]
    ToolchainSpawn {
        program: String,
        error: std::io::Error,
    },

    #[error("Toolchain for target '{target}' did not finish within {timeout_secs}s")]
    ToolchainTimeout { target: String, timeout_secs: u64 },

    #[error("Compilation failed for target '{target}' (exit code {exit_code})")]
    CompilationFailed { target: String, exit_code: i32 },

    #[error("Executable not found: {0} (build the project first)")]
    ExecutableNotFound(PathBuf),

    #[error("Process '{program}' exited with code {exit_code}")]
    ProcessFailed { program: String, exit_code: i32 },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a hashing error for an unreadable file
    pub fn hash(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::HashError {
            path: path.into(),
            error,
        }
    }

    /// Create a staging error for a failed copy
    pub fn stage(from: impl Into<PathBuf>, to: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::StageError {
            from: from.into(),
            to: to.into(),
            error,
        }
    }

    /// Create an archive error
    pub fn archive(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::ArchiveError {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create a compilation failure for a target
    pub fn compilation_failed(target: impl Into<String>, exit_code: i32) -> Self {
        Self::CompilationFailed {
            target: target.into(),
            exit_code,
        }
    }

    /// Whether this error was raised while validating configuration, before
    /// any filesystem mutation happened
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownCompileMode(_)
                | Self::UnsupportedPlatform(_)
                | Self::UnsupportedTargetType { .. }
                | Self::InvalidTarget(_)
                | Self::InvalidDefine(_)
        )
    }
}
