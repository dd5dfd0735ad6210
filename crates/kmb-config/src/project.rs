//! Project Configuration (kmb.toml)
//!
//! Handles the project file stored at the project root and its conversion
//! into the builder's [`BuildConfig`].

use crate::{ConfigError, ConfigResult};
use kmb_build::{
    BuildConfig, BuildTarget, CopyDir, Define, ExternalLibrary, FlavorNames, Platform,
    PlatformTargetOptions, TargetType, ToolchainSettings,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project configuration from kmb.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project metadata
    pub project: ProjectSection,

    /// Directory layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Compiler programs and limits
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Directories mirrored into the build directory before compiling
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub copy_dirs: Vec<CopyDirConfig>,

    /// Prebuilt third-party libraries under `paths.libs_external`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libs: Vec<LibraryConfig>,

    /// Build targets; one executable from `src/main.cpp` when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetConfig>,
}

/// `[project]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Project name; names the default target and the deploy bundle
    pub name: String,

    /// Defines applied to every target (`NAME` or `NAME=VALUE`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,

    /// Top-level build entries kept in the deploy bundle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deploy_files: Vec<String>,

    /// Archive stem, defaults to the project name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_name: Option<String>,
}

/// `[paths]` table, every entry relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libs_external: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libs_internal: Option<PathBuf>,
    /// Visual Studio environment script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcvarsall: Option<PathBuf>,
}

/// `[toolchain]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_compiler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux_compiler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_compiler: Option<String>,
    /// Longest a single compiler run may take, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// `[[copy_dirs]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CopyDirConfig {
    /// Relative to the project root
    pub src: PathBuf,
    /// Relative to the build directory
    pub dst: PathBuf,
}

/// `[[libs]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    pub name: String,
    /// Relative to `paths.libs_external`
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiled_names: Option<FlavorNames>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dll_names: Option<FlavorNames>,
}

/// `[[targets]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub name: String,
    /// Relative to the project root
    pub source: PathBuf,
    #[serde(rename = "type", default = "default_target_type")]
    pub target_type: TargetType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,
    /// Options keyed by platform name (`windows`, `linux`, `mac`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platforms: BTreeMap<String, PlatformConfig>,
}

/// `[targets.platforms.<name>]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compiler_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linker_flags: Vec<String>,
}

fn default_target_type() -> TargetType {
    TargetType::Executable
}

impl ProjectConfig {
    /// Minimal configuration for a project name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            project: ProjectSection {
                name: name.into(),
                defines: Vec::new(),
                deploy_files: Vec::new(),
                archive_name: None,
            },
            paths: PathsConfig::default(),
            toolchain: ToolchainConfig::default(),
            copy_dirs: Vec::new(),
            libs: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::TomlParseError { error, .. } => ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: PathBuf::from("kmb.toml"),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        validate_name("project.name", &self.project.name)?;

        if let Some(archive) = &self.project.archive_name {
            validate_name("project.archive_name", archive)?;
        }

        for entry in &self.project.deploy_files {
            validate_name("project.deploy_files", entry)?;
        }

        parse_defines("project.defines", &self.project.defines)?;

        if self.toolchain.timeout_secs == Some(0) {
            return Err(ConfigError::invalid(
                "toolchain.timeout_secs",
                "timeout must be at least one second",
            ));
        }

        for copy in &self.copy_dirs {
            if copy.src.as_os_str().is_empty() || copy.dst.as_os_str().is_empty() {
                return Err(ConfigError::invalid(
                    "copy_dirs",
                    "src and dst cannot be empty",
                ));
            }
        }

        let mut lib_names = BTreeSet::new();
        for lib in &self.libs {
            validate_name("libs.name", &lib.name)?;
            if !lib_names.insert(lib.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "library '{}' is declared twice",
                    lib.name
                )));
            }
        }

        let mut target_names = BTreeSet::new();
        for target in &self.targets {
            validate_name("targets.name", &target.name)?;
            if !target_names.insert(target.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "target '{}' is declared twice",
                    target.name
                )));
            }

            let field = format!("targets.{}", target.name);
            parse_defines(&format!("{}.defines", field), &target.defines)?;
            for (platform, options) in &target.platforms {
                parse_platform(&format!("{}.platforms", field), platform)?;
                parse_defines(
                    &format!("{}.platforms.{}.defines", field, platform),
                    &options.defines,
                )?;
            }
        }

        Ok(())
    }

    /// Build the immutable builder configuration rooted at `root`
    ///
    /// `root` should be absolute; every relative path in the file is
    /// resolved against it.
    pub fn to_build_config(&self, root: &Path) -> ConfigResult<BuildConfig> {
        let paths = &self.paths;
        let resolve = |path: &Option<PathBuf>, default: &str| match path {
            Some(path) => root.join(path),
            None => root.join(default),
        };

        let src_dir = resolve(&paths.src, "src");
        let libs_external = resolve(&paths.libs_external, "libs/external");
        let libs_internal = resolve(&paths.libs_internal, "libs/internal");

        let libraries: Vec<ExternalLibrary> = self
            .libs
            .iter()
            .map(|lib| ExternalLibrary {
                name: lib.name.clone(),
                root: libs_external.join(&lib.path),
                compiled_names: lib.compiled_names.clone(),
                dll_names: lib.dll_names.clone(),
            })
            .collect();

        let project_defines = parse_defines("project.defines", &self.project.defines)?;
        let include_dirs = vec![src_dir.clone(), libs_internal];

        let declared = if self.targets.is_empty() {
            vec![TargetConfig {
                name: self.project.name.clone(),
                source: src_dir.join("main.cpp"),
                target_type: TargetType::Executable,
                defines: Vec::new(),
                platforms: BTreeMap::new(),
            }]
        } else {
            self.targets.clone()
        };

        let mut targets = Vec::with_capacity(declared.len());
        for target in &declared {
            let field = format!("targets.{}", target.name);
            let mut defines = project_defines.clone();
            defines.extend(parse_defines(&format!("{}.defines", field), &target.defines)?);

            let mut build_target = BuildTarget::new(
                target.name.clone(),
                root.join(&target.source),
                target.target_type,
            )
            .with_defines(defines)
            .with_include_dirs(include_dirs.clone())
            .with_libraries(libraries.clone());

            for (name, options) in &target.platforms {
                let platform = parse_platform(&format!("{}.platforms", field), name)?;
                let options = PlatformTargetOptions::new()
                    .with_defines(parse_defines(
                        &format!("{}.platforms.{}.defines", field, name),
                        &options.defines,
                    )?)
                    .with_compiler_flags(options.compiler_flags.clone())
                    .with_linker_flags(options.linker_flags.clone());
                build_target = build_target.with_platform_options(platform, options);
            }

            targets.push(build_target);
        }

        let defaults = ToolchainSettings::default();
        let toolchain = ToolchainSettings {
            windows_compiler: self
                .toolchain
                .windows_compiler
                .clone()
                .unwrap_or(defaults.windows_compiler),
            linux_compiler: self
                .toolchain
                .linux_compiler
                .clone()
                .unwrap_or(defaults.linux_compiler),
            mac_compiler: self
                .toolchain
                .mac_compiler
                .clone()
                .unwrap_or(defaults.mac_compiler),
            vcvarsall: paths.vcvarsall.as_ref().map(|p| root.join(p)),
            timeout: self
                .toolchain
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        };

        let copy_dirs = self
            .copy_dirs
            .iter()
            .map(|c| CopyDir::new(c.src.clone(), c.dst.clone()))
            .collect();

        let mut config = BuildConfig::new(self.project.name.clone(), root)
            .with_src_dir(src_dir)
            .with_build_dir(resolve(&paths.build, "build"))
            .with_deploy_dir(resolve(&paths.deploy, "deploy"))
            .with_targets(targets)
            .with_copy_dirs(copy_dirs)
            .with_deploy_files(self.project.deploy_files.clone())
            .with_toolchain(toolchain);

        if let Some(archive) = &self.project.archive_name {
            config = config.with_archive_name(archive.clone());
        }

        Ok(config)
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(format!("cannot serialize config: {}", e)))
    }
}

/// Names become file or directory names, so they must be a single component
fn validate_name(field: &str, name: &str) -> ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::invalid(field, "name cannot be empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(ConfigError::invalid(
            field,
            format!("'{}' cannot contain path separators", name),
        ));
    }
    Ok(())
}

fn parse_defines(field: &str, defines: &[String]) -> ConfigResult<Vec<Define>> {
    defines
        .iter()
        .map(|text| Define::parse(text).map_err(|e| ConfigError::invalid(field, e)))
        .collect()
}

fn parse_platform(field: &str, name: &str) -> ConfigResult<Platform> {
    name.parse::<Platform>()
        .map_err(|_| ConfigError::invalid(field, format!("unknown platform '{}'", name)))
}
