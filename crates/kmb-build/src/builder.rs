//! Build orchestration: clean, build, run and deploy workflows
use crate::cache::{ChangeDetector, ChangeVerdict};
use crate::deploy::{DeployPackager, DeployReport};
use crate::error::{BuildError, BuildResult};
use crate::flags::{resolve_flags, ResolvedFlags};
use crate::platform::{CompileMode, Platform};
use crate::stage::{make_and_clear_dir, remake_and_copy};
use crate::targets::{BuildTarget, CopyDir, ExternalLibrary};
use crate::toolchain::{
    remove_stale_pdbs, unique_pdb_name, ProcessInvoker, ToolchainCommand, ToolchainInvoker,
    ToolchainSettings,
};

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Immutable project configuration, built once at startup
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project name; names the deploy bundle
    pub project_name: String,
    /// Project root; copy-dir sources are relative to it
    pub root_dir: PathBuf,
    /// Source tree watched by the change detector
    pub src_dir: PathBuf,
    /// Build output directory; copy-dir destinations are relative to it
    pub build_dir: PathBuf,
    pub deploy_dir: PathBuf,
    /// Targets, built in this order
    pub targets: Vec<BuildTarget>,
    pub copy_dirs: Vec<CopyDir>,
    /// Top-level build entries kept in the deploy bundle
    pub deploy_files: Vec<String>,
    /// Archive file stem (without `.zip`)
    pub archive_name: String,
    pub toolchain: ToolchainSettings,
}

impl BuildConfig {
    /// Configuration with the conventional layout under `root_dir`
    pub fn new(project_name: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        let project_name = project_name.into();
        let root_dir = root_dir.into();
        Self {
            archive_name: project_name.clone(),
            src_dir: root_dir.join("src"),
            build_dir: root_dir.join("build"),
            deploy_dir: root_dir.join("deploy"),
            targets: Vec::new(),
            copy_dirs: Vec::new(),
            deploy_files: Vec::new(),
            toolchain: ToolchainSettings::default(),
            project_name,
            root_dir,
        }
    }

    pub fn with_targets(mut self, targets: Vec<BuildTarget>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_copy_dirs(mut self, copy_dirs: Vec<CopyDir>) -> Self {
        self.copy_dirs = copy_dirs;
        self
    }

    pub fn with_deploy_files(mut self, files: Vec<String>) -> Self {
        self.deploy_files = files;
        self
    }

    pub fn with_archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = name.into();
        self
    }

    pub fn with_src_dir(mut self, dir: PathBuf) -> Self {
        self.src_dir = dir;
        self
    }

    pub fn with_build_dir(mut self, dir: PathBuf) -> Self {
        self.build_dir = dir;
        self
    }

    pub fn with_deploy_dir(mut self, dir: PathBuf) -> Self {
        self.deploy_dir = dir;
        self
    }

    pub fn with_toolchain(mut self, toolchain: ToolchainSettings) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Directory for compiler logs inside the build directory
    pub fn logs_dir(&self) -> PathBuf {
        self.build_dir.join("logs")
    }

    /// Target launched by `run`: the one named after the project, else the first
    pub fn primary_target(&self) -> Option<&BuildTarget> {
        self.targets
            .iter()
            .find(|t| t.name == self.project_name)
            .or_else(|| self.targets.first())
    }

    /// External libraries referenced by any target, without duplicates
    pub fn libraries(&self) -> Vec<&ExternalLibrary> {
        let mut seen = BTreeMap::new();
        for library in self.targets.iter().flat_map(|t| t.libraries.iter()) {
            seen.entry(library.name.as_str()).or_insert(library);
        }
        seen.into_values().collect()
    }
}

/// Switches for a single build run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Skip the build when the source tree is unchanged
    pub if_changed: bool,
    /// Package a deploy bundle after a successful build
    pub deploy: bool,
    /// Open the platform debugger after building
    pub debugger: bool,
}

/// Build statistics
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Number of targets compiled
    pub targets_built: usize,
    /// Total build time
    pub total_time: Duration,
    /// Time spent staging directories
    pub staging_time: Duration,
    /// Time spent in the toolchain
    pub compilation_time: Duration,
}

/// Result of a build that ran
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub mode: CompileMode,
    pub platform: Platform,
    /// Executables produced, in target order
    pub artifacts: Vec<PathBuf>,
    pub stats: BuildStats,
    pub deploy: Option<DeployReport>,
}

/// What `Builder::build` did
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// `--ifchanged` found no source changes
    Skipped,
    Built(BuildReport),
}

/// Result of `Builder::clean`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Entries that could not be removed
    pub leftover: usize,
}

/// Main builder for orchestrating builds
pub struct Builder {
    config: BuildConfig,
    platform: Platform,
    invoker: Box<dyn ToolchainInvoker>,
}

impl Builder {
    /// Create a builder running the real toolchain
    pub fn new(config: BuildConfig, platform: Platform) -> Self {
        let invoker = ProcessInvoker::new(config.toolchain.timeout);
        Self {
            config,
            platform,
            invoker: Box::new(invoker),
        }
    }

    /// Replace the toolchain invoker
    pub fn with_invoker(mut self, invoker: Box<dyn ToolchainInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Wipe the build and deploy directories, best effort
    pub fn clean(&self) -> BuildResult<CleanReport> {
        info!("Cleaning {}", self.config.build_dir.display());
        let mut leftover = make_and_clear_dir(&self.config.build_dir)?;
        info!("Cleaning {}", self.config.deploy_dir.display());
        leftover += make_and_clear_dir(&self.config.deploy_dir)?;

        if leftover > 0 {
            warn!("{} entries could not be cleaned", leftover);
        }
        Ok(CleanReport { leftover })
    }

    /// Resolve the flags of every target
    ///
    /// Runs before anything touches the filesystem so configuration errors
    /// leave the build tree as it was.
    pub fn resolve(&self, mode: CompileMode) -> BuildResult<Vec<(&BuildTarget, ResolvedFlags)>> {
        if self.config.targets.is_empty() {
            return Err(BuildError::InvalidTarget(format!(
                "Project '{}' declares no targets",
                self.config.project_name
            )));
        }

        self.config
            .targets
            .iter()
            .map(|target| Ok((target, resolve_flags(target, self.platform, mode)?)))
            .collect()
    }

    /// Run a full build in `mode`
    pub fn build(&self, mode: CompileMode, options: BuildOptions) -> BuildResult<BuildOutcome> {
        let build_start = Instant::now();
        let resolved = self.resolve(mode)?;

        info!(
            "Building {} ({}, {})",
            self.config.project_name, mode, self.platform
        );

        for dir in [&self.config.build_dir, &self.config.deploy_dir] {
            fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
        }

        let detector = ChangeDetector::for_build_dir(&self.config.src_dir, &self.config.build_dir);
        if options.if_changed {
            if detector.did_files_change()? == ChangeVerdict::Unchanged {
                info!("No changes, nothing to compile");
                return Ok(BuildOutcome::Skipped);
            }
        } else {
            detector.record()?;
        }

        let result = self.compile_and_package(mode, options, &resolved, build_start);
        if result.is_err() {
            detector.invalidate();
        }
        result
    }

    /// Everything `build` does once the source snapshot is written
    fn compile_and_package(
        &self,
        mode: CompileMode,
        options: BuildOptions,
        resolved: &[(&BuildTarget, ResolvedFlags)],
        build_start: Instant,
    ) -> BuildResult<BuildOutcome> {
        let stage_start = Instant::now();
        self.stage()?;
        let staging_time = stage_start.elapsed();

        if self.platform == Platform::Windows {
            let removed = remove_stale_pdbs(&self.config.build_dir);
            debug!("Removed {} stale PDB files", removed);
        }

        let compile_start = Instant::now();
        let mut artifacts = Vec::new();
        for (target, flags) in resolved {
            artifacts.push(self.compile_target(target, flags)?);
        }
        let compilation_time = compile_start.elapsed();

        self.copy_shared_libraries(mode)?;

        if options.debugger {
            self.launch_debugger(&artifacts);
        }

        let deploy = if options.deploy {
            Some(self.deploy()?)
        } else {
            None
        };

        let stats = BuildStats {
            targets_built: artifacts.len(),
            total_time: build_start.elapsed(),
            staging_time,
            compilation_time,
        };

        info!("Build completed in {:.2}s", stats.total_time.as_secs_f64());

        Ok(BuildOutcome::Built(BuildReport {
            mode,
            platform: self.platform,
            artifacts,
            stats,
            deploy,
        }))
    }

    /// Stage the build tree into a deploy bundle and archive it
    pub fn deploy(&self) -> BuildResult<DeployReport> {
        DeployPackager::new(self.config.deploy_files.iter().cloned()).deploy(
            &self.config.build_dir,
            &self.config.deploy_dir,
            &self.config.project_name,
            &self.config.archive_name,
        )
    }

    /// Launch the primary target's executable from the build directory
    pub fn run(&self) -> BuildResult<()> {
        let target = self.config.primary_target().ok_or_else(|| {
            BuildError::InvalidTarget(format!(
                "Project '{}' declares no targets",
                self.config.project_name
            ))
        })?;

        let executable = self.executable_path(target);
        if !executable.is_file() {
            return Err(BuildError::ExecutableNotFound(executable));
        }

        info!("Running {}", executable.display());
        let status = Command::new(&executable)
            .current_dir(&self.config.build_dir)
            .status()
            .map_err(|e| BuildError::io(&executable, e))?;

        if !status.success() {
            return Err(BuildError::ProcessFailed {
                program: executable.display().to_string(),
                exit_code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }

    /// Path of a target's executable in the build directory
    pub fn executable_path(&self, target: &BuildTarget) -> PathBuf {
        self.config
            .build_dir
            .join(target.output_filename(self.platform))
    }

    fn stage(&self) -> BuildResult<()> {
        for copy in &self.config.copy_dirs {
            let src = copy.source_in(&self.config.root_dir);
            let dst = copy.destination_in(&self.config.build_dir);
            info!("Staging {} -> {}", src.display(), dst.display());
            remake_and_copy(&src, &dst)?;
        }

        let logs = self.config.logs_dir();
        fs::create_dir_all(&logs).map_err(|e| BuildError::io(&logs, e))
    }

    fn compile_target(&self, target: &BuildTarget, flags: &ResolvedFlags) -> BuildResult<PathBuf> {
        let pdb_name = unique_pdb_name(&self.config.build_dir, &target.name);
        let command = ToolchainCommand::compile(
            target,
            self.platform,
            flags,
            &self.config.toolchain,
            &self.config.build_dir,
            &pdb_name,
        );

        info!("Compiling {}", target.name);
        debug!("{}", command.command_line());

        let result = self.invoker.invoke(&command)?;
        if !result.success() {
            return Err(BuildError::compilation_failed(&target.name, result.exit_code));
        }

        debug!(
            "Compiled {} in {:.2}s",
            target.name,
            result.elapsed.as_secs_f64()
        );
        Ok(self.executable_path(target))
    }

    /// Copy prebuilt DLLs of the mode's flavor next to the executables
    fn copy_shared_libraries(&self, mode: CompileMode) -> BuildResult<()> {
        if self.platform != Platform::Windows {
            return Ok(());
        }

        for library in self.config.libraries() {
            let Some(names) = &library.dll_names else {
                continue;
            };
            let dll = names.for_mode(mode);
            let src = library.lib_dir(self.platform, mode).join(dll);
            let dst = self.config.build_dir.join(dll);
            debug!("Copying {} -> {}", src.display(), dst.display());
            fs::copy(&src, &dst).map_err(|e| BuildError::stage(&src, &dst, e))?;
        }
        Ok(())
    }

    fn launch_debugger(&self, artifacts: &[PathBuf]) {
        if self.platform != Platform::Windows {
            warn!("--debugger is only supported on Windows, ignoring");
            return;
        }

        let Some(executable) = artifacts.first() else {
            return;
        };

        if let Err(e) = Command::new("devenv")
            .arg(executable)
            .current_dir(&self.config.build_dir)
            .spawn()
        {
            warn!("Failed to launch debugger: {}", e);
        }
    }
}
