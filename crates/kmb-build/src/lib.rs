//! kmb build system core
//!
//! Provides build orchestration for native C++ projects including:
//! - Platform and compile mode model
//! - Compiler/linker flag resolution per target
//! - Source change detection through content-hash snapshots
//! - Build and deploy directory staging
//! - Deploy bundle packaging into zip archives
//! - Structured toolchain invocation with bounded waits

pub mod builder;
pub mod cache;
pub mod deploy;
pub mod error;
pub mod flags;
pub mod platform;
pub mod stage;
pub mod targets;
pub mod toolchain;

// Re-export main types
pub use builder::{
    BuildConfig, BuildOptions, BuildOutcome, BuildReport, BuildStats, Builder, CleanReport,
};
pub use cache::{
    hash_file, ChangeDetector, ChangeReason, ChangeVerdict, HashSnapshot, SnapshotEntry,
    PREVIOUS_SNAPSHOT_FILE, SNAPSHOT_FILE,
};
pub use deploy::{DeployPackager, DeployReport};
pub use error::{BuildError, BuildResult};
pub use flags::{resolve_flags, ResolvedFlags};
pub use platform::{CompileMode, Platform};
pub use stage::{make_and_clear_dir, remake_and_copy};
pub use targets::{
    BuildTarget, CopyDir, Define, ExternalLibrary, FlavorNames, PlatformTargetOptions, TargetType,
};
pub use toolchain::{
    InvocationResult, ProcessInvoker, ToolchainCommand, ToolchainInvoker, ToolchainSettings,
};
