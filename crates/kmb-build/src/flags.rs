//! Compiler and linker flag resolution
//!
//! `resolve_flags` turns a [`BuildTarget`] into the token lists handed to the
//! external toolchain. It is a pure function of its three inputs.
//!
//! Compiler tokens are assembled in this order:
//! 1. common defines for the platform and mode
//! 2. target defines
//! 3. baseline toolchain flags for the platform and mode
//! 4. include directories
//! 5. the target's platform options (defines, then compiler flags)
//!
//! Linker tokens: baseline linker flags, library directories, system
//! libraries, external library names, then the platform options' linker flags.

use crate::error::{BuildError, BuildResult};
use crate::platform::{CompileMode, Platform};
use crate::targets::{BuildTarget, Define};
use std::path::Path;

/// Macro naming the platform a translation unit is compiled for
const PLATFORM_MACROS: [(Platform, &str, Option<&str>); 3] = [
    (Platform::Windows, "GAME_WIN32", Some("1")),
    (Platform::Linux, "GAME_LINUX", Some("1")),
    (Platform::Mac, "GAME_MACOS", None),
];

const INTERNAL_MACRO: &str = "GAME_INTERNAL";
const SLOW_MACRO: &str = "GAME_SLOW";

/// Ordered token lists for the two toolchain stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFlags {
    pub compiler: Vec<String>,
    pub linker: Vec<String>,
}

impl ResolvedFlags {
    /// Whether a compiler token is present
    pub fn has_compiler_flag(&self, flag: &str) -> bool {
        self.compiler.iter().any(|f| f == flag)
    }

    /// Whether a linker token is present
    pub fn has_linker_flag(&self, flag: &str) -> bool {
        self.linker.iter().any(|f| f == flag)
    }
}

/// Resolve the compiler and linker flags of a target
pub fn resolve_flags(
    target: &BuildTarget,
    platform: Platform,
    mode: CompileMode,
) -> BuildResult<ResolvedFlags> {
    if !target.target_type.is_supported() {
        return Err(BuildError::UnsupportedTargetType {
            target: target.name.clone(),
            kind: target.target_type.to_string(),
        });
    }

    target.validate().map_err(BuildError::InvalidTarget)?;

    let options = target.options_for(platform);
    let mut compiler = Vec::new();

    compiler.extend(common_defines(platform, mode).iter().map(|d| d.render(platform)));
    compiler.extend(target.defines.iter().map(|d| d.render(platform)));
    compiler.extend(baseline_compiler_flags(platform, mode));

    for dir in &target.include_dirs {
        compiler.push(include_flag(platform, dir));
    }
    for library in &target.libraries {
        compiler.push(include_flag(platform, &library.include_dir()));
    }

    if let Some(options) = options {
        compiler.extend(options.defines.iter().map(|d| d.render(platform)));
        compiler.extend(options.compiler_flags.iter().cloned());
    }

    let mut linker = baseline_linker_flags(platform);

    let linked: Vec<_> = target
        .libraries
        .iter()
        .filter_map(|lib| lib.compiled_names.as_ref().map(|names| (lib, names)))
        .collect();

    for (library, _) in &linked {
        linker.push(library_dir_flag(platform, &library.lib_dir(platform, mode)));
    }
    linker.extend(system_libraries(platform));
    for (_, names) in &linked {
        linker.push(names.for_mode(mode).to_string());
    }

    if let Some(options) = options {
        linker.extend(options.linker_flags.iter().cloned());
    }

    Ok(ResolvedFlags { compiler, linker })
}

/// Defines every translation unit receives for a platform and mode
pub fn common_defines(platform: Platform, mode: CompileMode) -> Vec<Define> {
    let mut defines = Vec::new();

    for (p, name, value) in PLATFORM_MACROS {
        if p == platform {
            defines.push(match value {
                Some(value) => Define::with_value(name, value),
                None => Define::flag(name),
            });
        }
    }

    if platform == Platform::Windows {
        defines.push(Define::flag("_CRT_SECURE_NO_WARNINGS"));
    }

    defines.push(Define::with_value(INTERNAL_MACRO, u8::from(mode.internal())));
    defines.push(Define::with_value(SLOW_MACRO, u8::from(mode.slow())));
    defines
}

/// Language, code generation, optimization and warning flags
pub fn baseline_compiler_flags(platform: Platform, mode: CompileMode) -> Vec<String> {
    let flags: Vec<&str> = match platform {
        Platform::Windows => {
            let mut flags = vec!["/nologo", "/Gm-", "/GR-", "/EHa-", "/EHsc", "/std:c++latest"];
            if mode.optimized() {
                flags.extend(["/MT", "/Ox", "/Z7"]);
            } else {
                flags.extend(["/MTd", "/Od", "/Oi", "/Z7"]);
            }
            flags.extend(["/WX", "/W4", "/wd4100", "/wd4201", "/wd4458", "/wd4505"]);
            if !mode.optimized() {
                // unreferenced locals and early returns are common while debugging
                flags.extend(["/wd4189", "/wd4702"]);
            }
            flags
        }
        Platform::Linux => {
            let mut flags = vec!["-std=c++17", "-ggdb3", "-fno-rtti", "-fno-exceptions"];
            flags.push(if mode.optimized() { "-O3" } else { "-O0" });
            flags.extend([
                "-Werror",
                "-Wall",
                "-Wno-char-subscripts",
                "-Wno-unused-function",
            ]);
            flags
        }
        Platform::Mac => {
            let mut flags = vec!["-std=c++11", "-lstdc++", "-fno-rtti", "-fno-exceptions"];
            flags.push(if mode.optimized() { "-O3" } else { "-g" });
            flags.extend([
                "-Werror",
                "-Wall",
                "-Wno-missing-braces",
                "-Wno-char-subscripts",
                "-Wno-unused-function",
            ]);
            flags
        }
    };

    flags.into_iter().map(String::from).collect()
}

/// Linker flags applied to every executable
pub fn baseline_linker_flags(platform: Platform) -> Vec<String> {
    let flags: &[&str] = match platform {
        Platform::Windows => &["/incremental:no", "/opt:ref"],
        Platform::Linux => &["-fvisibility=hidden"],
        Platform::Mac => &[],
    };
    flags.iter().map(|f| f.to_string()).collect()
}

/// Operating system libraries every executable links against
pub fn system_libraries(platform: Platform) -> Vec<String> {
    let libs: &[&str] = match platform {
        Platform::Windows => &[
            "user32.lib",
            "gdi32.lib",
            "opengl32.lib",
            "ole32.lib",
            "winmm.lib",
            "shell32.lib",
        ],
        Platform::Linux => &["-lm", "-lpthread"],
        Platform::Mac => &[
            "-framework",
            "Cocoa",
            "-framework",
            "OpenGL",
            "-framework",
            "AudioToolbox",
            "-framework",
            "CoreMIDI",
        ],
    };
    libs.iter().map(|l| l.to_string()).collect()
}

fn include_flag(platform: Platform, dir: &Path) -> String {
    match platform {
        Platform::Windows => format!("/I{}", dir.display()),
        Platform::Linux | Platform::Mac => format!("-I{}", dir.display()),
    }
}

fn library_dir_flag(platform: Platform, dir: &Path) -> String {
    match platform {
        Platform::Windows => format!("/LIBPATH:{}", dir.display()),
        Platform::Linux | Platform::Mac => format!("-L{}", dir.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::{ExternalLibrary, FlavorNames, PlatformTargetOptions, TargetType};
    use std::path::PathBuf;

    fn app() -> BuildTarget {
        BuildTarget::executable("app", "src/main.cpp")
    }

    #[test]
    fn test_common_defines_linux_release() {
        let rendered: Vec<_> = common_defines(Platform::Linux, CompileMode::Release)
            .iter()
            .map(|d| d.render(Platform::Linux))
            .collect();
        assert_eq!(
            rendered,
            vec!["-DGAME_LINUX=1", "-DGAME_INTERNAL=0", "-DGAME_SLOW=0"]
        );
    }

    #[test]
    fn test_common_defines_windows_debug() {
        let rendered: Vec<_> = common_defines(Platform::Windows, CompileMode::Debug)
            .iter()
            .map(|d| d.render(Platform::Windows))
            .collect();
        assert_eq!(
            rendered,
            vec![
                "/DGAME_WIN32=1",
                "/D_CRT_SECURE_NO_WARNINGS",
                "/DGAME_INTERNAL=1",
                "/DGAME_SLOW=1"
            ]
        );
    }

    #[test]
    fn test_mac_identity_macro_has_no_value() {
        let defines = common_defines(Platform::Mac, CompileMode::Internal);
        assert_eq!(defines[0], Define::flag("GAME_MACOS"));
    }

    #[test]
    fn test_unsupported_target_type() {
        let target = BuildTarget::new("lib", "src/lib.cpp", TargetType::LibStatic);
        let err = resolve_flags(&target, Platform::Linux, CompileMode::Debug).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedTargetType { ref target, .. } if target == "lib"));
        assert!(err.to_string().contains("static library"));
    }

    #[test]
    fn test_target_defines_follow_common_defines() {
        let target = app().with_defines(vec![Define::flag("USE_AUDIO")]);
        let flags = resolve_flags(&target, Platform::Linux, CompileMode::Debug).unwrap();
        assert_eq!(flags.compiler[3], "-DUSE_AUDIO");
        assert_eq!(flags.compiler[4], "-std=c++17");
    }

    #[test]
    fn test_platform_options_come_last() {
        let options = PlatformTargetOptions::new()
            .with_defines(vec![Define::with_value("LEVEL", 2)])
            .with_compiler_flags(vec!["-O1".to_string()])
            .with_linker_flags(vec!["-lz".to_string()]);
        let target = app().with_platform_options(Platform::Linux, options);

        let flags = resolve_flags(&target, Platform::Linux, CompileMode::Release).unwrap();
        let n = flags.compiler.len();
        assert_eq!(flags.compiler[n - 2], "-DLEVEL=2");
        assert_eq!(flags.compiler[n - 1], "-O1");
        assert_eq!(flags.linker.last().map(String::as_str), Some("-lz"));
    }

    #[test]
    fn test_other_platform_options_ignored() {
        let options = PlatformTargetOptions::new().with_linker_flags(vec!["-lssl".to_string()]);
        let target = app().with_platform_options(Platform::Mac, options);
        let flags = resolve_flags(&target, Platform::Linux, CompileMode::Release).unwrap();
        assert!(!flags.has_linker_flag("-lssl"));
    }

    #[test]
    fn test_external_library_flags() {
        let lib = ExternalLibrary::new("freetype", PathBuf::from("libs/ft"))
            .with_compiled_names(FlavorNames::new("ftd.lib", "ft.lib"));
        let target = app().with_libraries(vec![lib]);

        let flags = resolve_flags(&target, Platform::Windows, CompileMode::Debug).unwrap();
        let include = format!("/I{}", PathBuf::from("libs/ft").join("include").display());
        let libpath = format!(
            "/LIBPATH:{}",
            PathBuf::from("libs/ft").join("win32").join("debug").display()
        );
        assert!(flags.has_compiler_flag(&include));
        assert_eq!(flags.linker[2], libpath);
        assert_eq!(flags.linker.last().map(String::as_str), Some("ftd.lib"));
    }

    #[test]
    fn test_header_only_library_not_linked() {
        let lib = ExternalLibrary::new("stb", PathBuf::from("libs/stb"));
        let target = app().with_libraries(vec![lib]);
        let flags = resolve_flags(&target, Platform::Linux, CompileMode::Debug).unwrap();
        assert!(flags.compiler.iter().any(|f| f.starts_with("-I")));
        assert!(!flags.linker.iter().any(|f| f.starts_with("-L")));
    }

    #[test]
    fn test_debug_windows_silences_debugging_warnings() {
        let debug = baseline_compiler_flags(Platform::Windows, CompileMode::Debug);
        let release = baseline_compiler_flags(Platform::Windows, CompileMode::Release);
        assert!(debug.contains(&"/wd4702".to_string()));
        assert!(!release.contains(&"/wd4702".to_string()));
        assert!(debug.contains(&"/Od".to_string()));
        assert!(release.contains(&"/Ox".to_string()));
    }
}
