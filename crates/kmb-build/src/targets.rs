/// Build target model: defines, per-platform options, external libraries
use crate::error::{BuildError, BuildResult};
use crate::platform::{CompileMode, Platform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A preprocessor macro with an optional value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    /// Macro without a value (`-DNAME`)
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Macro with a value (`-DNAME=VALUE`)
    pub fn with_value(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: Some(value.to_string()),
        }
    }

    /// Parse `NAME` or `NAME=VALUE`
    pub fn parse(text: &str) -> BuildResult<Self> {
        let (name, value) = match text.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim().to_string())),
            None => (text.trim(), None),
        };

        if name.is_empty() {
            return Err(BuildError::InvalidDefine(text.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            value,
        })
    }

    /// Render as a compiler flag for the given platform
    pub fn render(&self, platform: Platform) -> String {
        let prefix = match platform {
            Platform::Windows => "/D",
            Platform::Linux | Platform::Mac => "-D",
        };
        match &self.value {
            Some(value) => format!("{}{}={}", prefix, self.name, value),
            None => format!("{}{}", prefix, self.name),
        }
    }
}

impl std::fmt::Display for Define {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Defines and raw flags that only apply on one platform
///
/// Token order is kept verbatim: later flags may override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformTargetOptions {
    #[serde(default)]
    pub defines: Vec<Define>,
    #[serde(default)]
    pub compiler_flags: Vec<String>,
    #[serde(default)]
    pub linker_flags: Vec<String>,
}

impl PlatformTargetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defines(mut self, defines: Vec<Define>) -> Self {
        self.defines = defines;
        self
    }

    pub fn with_compiler_flags(mut self, flags: Vec<String>) -> Self {
        self.compiler_flags = flags;
        self
    }

    pub fn with_linker_flags(mut self, flags: Vec<String>) -> Self {
        self.linker_flags = flags;
        self
    }
}

/// Kind of artifact a target produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Executable program
    Executable,
    /// Shared library (declared, not buildable yet)
    LibDynamic,
    /// Static library (declared, not buildable yet)
    LibStatic,
}

impl TargetType {
    /// Whether the resolver knows how to build this kind of target
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Executable)
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executable => write!(f, "executable"),
            Self::LibDynamic => write!(f, "dynamic library"),
            Self::LibStatic => write!(f, "static library"),
        }
    }
}

/// Debug and release variants of a library file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorNames {
    pub debug: String,
    pub release: String,
}

impl FlavorNames {
    pub fn new(debug: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            debug: debug.into(),
            release: release.into(),
        }
    }

    /// Name to use for the given compile mode
    pub fn for_mode(&self, mode: CompileMode) -> &str {
        match mode {
            CompileMode::Debug => &self.debug,
            CompileMode::Internal | CompileMode::Release => &self.release,
        }
    }
}

/// Third-party library shipped in prebuilt form next to the project
///
/// Layout under `root`: `include/` for headers and
/// `<platform>/<debug|release>/` for compiled libraries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLibrary {
    pub name: String,
    pub root: PathBuf,
    /// Link names; `None` for header-only libraries
    pub compiled_names: Option<FlavorNames>,
    /// Shared libraries copied next to the executable after building
    pub dll_names: Option<FlavorNames>,
}

impl ExternalLibrary {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            compiled_names: None,
            dll_names: None,
        }
    }

    pub fn with_compiled_names(mut self, names: FlavorNames) -> Self {
        self.compiled_names = Some(names);
        self
    }

    pub fn with_dll_names(mut self, names: FlavorNames) -> Self {
        self.dll_names = Some(names);
        self
    }

    /// Header directory
    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    /// Directory holding the compiled variant for a platform and mode
    pub fn lib_dir(&self, platform: Platform, mode: CompileMode) -> PathBuf {
        self.root
            .join(platform.library_dir_name())
            .join(mode.artifact_flavor())
    }
}

/// A named unit of compilation producing one artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildTarget {
    /// Target name, also the stem of the output file
    pub name: String,
    /// Translation unit handed to the compiler
    pub source: PathBuf,
    pub target_type: TargetType,
    /// Defines applied on every platform
    pub defines: Vec<Define>,
    /// Extra options per platform; a missing entry contributes nothing
    pub platform_options: BTreeMap<Platform, PlatformTargetOptions>,
    pub include_dirs: Vec<PathBuf>,
    pub libraries: Vec<ExternalLibrary>,
}

impl BuildTarget {
    /// Create a new build target
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, target_type: TargetType) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target_type,
            defines: Vec::new(),
            platform_options: BTreeMap::new(),
            include_dirs: Vec::new(),
            libraries: Vec::new(),
        }
    }

    /// Create an executable target
    pub fn executable(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self::new(name, source, TargetType::Executable)
    }

    pub fn with_defines(mut self, defines: Vec<Define>) -> Self {
        self.defines = defines;
        self
    }

    /// Register options for one platform, replacing any previous entry
    pub fn with_platform_options(mut self, platform: Platform, options: PlatformTargetOptions) -> Self {
        self.platform_options.insert(platform, options);
        self
    }

    pub fn with_include_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.include_dirs = dirs;
        self
    }

    pub fn with_libraries(mut self, libraries: Vec<ExternalLibrary>) -> Self {
        self.libraries = libraries;
        self
    }

    /// Options registered for a platform, if any
    pub fn options_for(&self, platform: Platform) -> Option<&PlatformTargetOptions> {
        self.platform_options.get(&platform)
    }

    /// Executable file name on the given platform
    pub fn output_filename(&self, platform: Platform) -> String {
        format!("{}{}", self.name, platform.executable_suffix())
    }

    /// Linker map file name (Windows only)
    pub fn map_filename(&self) -> String {
        format!("{}_win32.map", self.name)
    }

    /// Validate the target configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Target name cannot be empty".to_string());
        }

        if self.name.contains(['/', '\\']) {
            return Err(format!(
                "Target name '{}' cannot contain path separators",
                self.name
            ));
        }

        if self.source.as_os_str().is_empty() {
            return Err(format!("Target '{}' has no source file", self.name));
        }

        Ok(())
    }
}

/// Source directory mirrored into a destination directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyDir {
    pub src: PathBuf,
    pub dst: PathBuf,
}

impl CopyDir {
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Source path resolved against a root directory
    pub fn source_in(&self, root: &Path) -> PathBuf {
        root.join(&self.src)
    }

    /// Destination path resolved against a root directory
    pub fn destination_in(&self, root: &Path) -> PathBuf {
        root.join(&self.dst)
    }
}
