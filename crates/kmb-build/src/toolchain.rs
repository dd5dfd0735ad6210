//! External toolchain invocation
//!
//! The orchestrator never composes shell strings. Each compiler call is a
//! [`ToolchainCommand`] (program, argv, working directory) executed by a
//! [`ToolchainInvoker`]. [`ProcessInvoker`] runs real subprocesses with a
//! bounded wait; tests substitute their own invoker.

use crate::error::{BuildError, BuildResult};
use crate::flags::ResolvedFlags;
use crate::platform::Platform;
use crate::targets::BuildTarget;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

fn default_timeout() -> Duration {
    Duration::from_secs(600)
}

/// Compiler programs and limits for each platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSettings {
    pub windows_compiler: String,
    pub linux_compiler: String,
    pub mac_compiler: String,
    /// `vcvarsall.bat` loaded before `cl` runs
    pub vcvarsall: Option<PathBuf>,
    /// Longest a single compiler run may take
    pub timeout: Duration,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            windows_compiler: "cl".to_string(),
            linux_compiler: "g++".to_string(),
            mac_compiler: "clang".to_string(),
            vcvarsall: None,
            timeout: default_timeout(),
        }
    }
}

impl ToolchainSettings {
    /// Compiler program for a platform
    pub fn compiler_for(&self, platform: Platform) -> &str {
        match platform {
            Platform::Windows => &self.windows_compiler,
            Platform::Linux => &self.linux_compiler,
            Platform::Mac => &self.mac_compiler,
        }
    }
}

/// A single structured process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainCommand {
    /// What the command is for, used in errors (usually the target name)
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Environment script run (with `x64`) in the same shell before `program`
    pub env_script: Option<PathBuf>,
}

impl ToolchainCommand {
    pub fn new(
        label: impl Into<String>,
        program: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env_script: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env_script(mut self, script: Option<PathBuf>) -> Self {
        self.env_script = script;
        self
    }

    /// Compiler invocation producing the executable of `target`
    ///
    /// `pdb_name` is only used on Windows.
    pub fn compile(
        target: &BuildTarget,
        platform: Platform,
        flags: &ResolvedFlags,
        settings: &ToolchainSettings,
        build_dir: &Path,
        pdb_name: &str,
    ) -> Self {
        let source = target.source.display().to_string();
        let output = target.output_filename(platform);
        let command = Self::new(&target.name, settings.compiler_for(platform), build_dir);

        match platform {
            Platform::Windows => command
                .args(flags.compiler.iter().cloned())
                .arg(format!("/Fe{}", output))
                .arg(format!("/Fm{}", target.map_filename()))
                .arg(source)
                .arg("/link")
                .args(flags.linker.iter().cloned())
                .arg(format!("/PDB:{}", pdb_name))
                .with_env_script(settings.vcvarsall.clone()),
            Platform::Linux | Platform::Mac => command
                .args(flags.compiler.iter().cloned())
                .arg(source)
                .arg("-o")
                .arg(output)
                .args(flags.linker.iter().cloned()),
        }
    }

    /// Human-readable command line for logs
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(self.args.iter().map(|a| {
            if a.contains(' ') {
                format!("\"{}\"", a)
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }

    /// Build the `std::process::Command` for this invocation
    pub fn to_process(&self) -> Command {
        let mut process = match &self.env_script {
            // cmd runs the environment script and the compiler in one session
            // so the variables it sets are visible to the compiler
            Some(script) => {
                let mut process = Command::new("cmd");
                process
                    .arg("/C")
                    .arg("call")
                    .arg(script)
                    .arg("x64")
                    .arg("&&")
                    .arg(&self.program);
                process
            }
            None => Command::new(&self.program),
        };
        process.args(&self.args).current_dir(&self.working_dir);
        process
    }
}

/// Outcome of a finished invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationResult {
    pub exit_code: i32,
    pub elapsed: Duration,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes toolchain commands
pub trait ToolchainInvoker {
    /// Run `command` to completion and report its exit status
    fn invoke(&self, command: &ToolchainCommand) -> BuildResult<InvocationResult>;
}

/// Runs commands as child processes, killing them after a timeout
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    timeout: Duration,
    poll_interval: Duration,
}

impl ProcessInvoker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new(default_timeout())
    }
}

impl ToolchainInvoker for ProcessInvoker {
    fn invoke(&self, command: &ToolchainCommand) -> BuildResult<InvocationResult> {
        debug!(
            "Running in {}: {}",
            command.working_dir.display(),
            command.command_line()
        );

        let start = Instant::now();
        let mut child = command
            .to_process()
            .spawn()
            .map_err(|e| BuildError::ToolchainSpawn {
                program: command.program.clone(),
                error: e,
            })?;

        loop {
            let status = child
                .try_wait()
                .map_err(|e| BuildError::io(&command.working_dir, e))?;

            if let Some(status) = status {
                return Ok(InvocationResult {
                    // no exit code means the process was killed by a signal
                    exit_code: status.code().unwrap_or(-1),
                    elapsed: start.elapsed(),
                });
            }

            if start.elapsed() >= self.timeout {
                if let Err(e) = child.kill() {
                    warn!("Failed to kill '{}': {}", command.program, e);
                }
                let _ = child.wait();
                return Err(BuildError::ToolchainTimeout {
                    target: command.label.clone(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }

            thread::sleep(self.poll_interval);
        }
    }
}

/// Debug-symbol file name that does not collide with one already in
/// `build_dir`
///
/// The suffix is the current time in milliseconds, bumped until free.
pub fn unique_pdb_name(build_dir: &Path, target_name: &str) -> String {
    let mut id = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    loop {
        let name = format!("{}_{}.pdb", target_name, id);
        if !build_dir.join(&name).exists() {
            return name;
        }
        id += 1;
    }
}

/// Remove `*.pdb` files left by earlier builds
///
/// Failures are logged and skipped; returns how many files were removed.
pub fn remove_stale_pdbs(build_dir: &Path) -> usize {
    let entries = match fs::read_dir(build_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Couldn't list {}: {}", build_dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_pdb = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdb"))
            .unwrap_or(false);
        if !is_pdb {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Couldn't remove {}: {}", path.display(), e),
        }
    }
    removed
}
