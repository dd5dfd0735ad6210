//! Configuration loading and conversion tests

use kmb_build::{Define, Platform, TargetType};
use kmb_config::{ConfigError, ConfigLoader, ProjectConfig, CONFIG_FILE_NAME, PROJECT_DIR_ENV};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join(CONFIG_FILE_NAME);
    fs::write(&config_path, content).unwrap();
    config_path
}

// macOS temp dirs live behind a symlink
fn canonical(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap()
}

const FULL_CONFIG: &str = r#"
[project]
name = "game"
defines = ["USE_AUDIO", "MAX_PLAYERS=4"]
deploy_files = ["game_linux", "data"]

[paths]
libs_external = "third_party"

[toolchain]
linux_compiler = "clang++"
timeout_secs = 120

[[copy_dirs]]
src = "data"
dst = "data"

[[libs]]
name = "freetype"
path = "freetype-2.8.1"
compiled_names = { debug = "-lfreetyped", release = "-lfreetype" }

[[targets]]
name = "game"
source = "src/main.cpp"
defines = ["GAME_TARGET"]

[targets.platforms.linux]
defines = ["USE_X11"]
linker_flags = ["-lX11"]

[[targets]]
name = "editor"
source = "src/editor.cpp"
"#;

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_load_project_config_basic() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[project]\nname = \"game\"\n");

    let loaded = ConfigLoader::new()
        .ignore_env()
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert_eq!(loaded.project_name(), "game");
    assert_eq!(loaded.project_root, canonical(temp_dir.path()));
    assert_eq!(
        loaded.config_path,
        canonical(temp_dir.path()).join(CONFIG_FILE_NAME)
    );
}

#[test]
#[serial]
fn test_load_from_subdirectory_finds_parent() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[project]\nname = \"parent\"\n");

    let sub = temp_dir.path().join("src").join("render");
    fs::create_dir_all(&sub).unwrap();

    let loaded = ConfigLoader::new()
        .ignore_env()
        .load_from_directory(&sub)
        .unwrap();
    assert_eq!(loaded.project_name(), "parent");
}

#[test]
fn test_nearest_config_wins() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[project]\nname = \"outer\"\n");
    let inner = temp_dir.path().join("inner");
    fs::create_dir_all(&inner).unwrap();
    create_config_file(&inner, "[project]\nname = \"inner\"\n");

    let found = ConfigLoader::find_config_file(&inner).unwrap();
    assert_eq!(found, canonical(&inner).join(CONFIG_FILE_NAME));
}

#[test]
fn test_invalid_toml_syntax() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[project\nname = ");

    let err = ConfigLoader::new().load_from_file(&path).unwrap_err();
    match err {
        ConfigError::TomlParseError { file, .. } => {
            assert_eq!(file, canonical(&path));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_project_table() {
    let err = ProjectConfig::from_toml("[paths]\nsrc = \"code\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::TomlParseError { .. }));
}

#[rstest]
#[case("[project]\nname = \"\"\n", "project.name")]
#[case("[project]\nname = \"a/b\"\n", "project.name")]
#[case("[project]\nname = \"game\"\narchive_name = \" \"\n", "project.archive_name")]
#[case("[project]\nname = \"game\"\ndeploy_files = [\"data/x\"]\n", "project.deploy_files")]
fn test_invalid_names_rejected(#[case] content: &str, #[case] expected_field: &str) {
    let err = ProjectConfig::from_toml(content).unwrap_err();
    match err {
        ConfigError::InvalidValue { field, .. } => assert_eq!(field, expected_field),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_target_type_rejected() {
    let content = r#"
[project]
name = "game"

[[targets]]
name = "game"
source = "src/main.cpp"
type = "plugin"
"#;
    assert!(ProjectConfig::from_toml(content).is_err());
}

#[test]
fn test_library_target_type_parses() {
    let content = r#"
[project]
name = "game"

[[targets]]
name = "engine"
source = "src/engine.cpp"
type = "lib_dynamic"
"#;
    let config = ProjectConfig::from_toml(content).unwrap();
    assert_eq!(config.targets[0].target_type, TargetType::LibDynamic);
}

// ============================================================================
// Environment Override Tests
// ============================================================================

#[test]
#[serial]
fn test_env_project_dir_overrides_search() {
    let project = TempDir::new().unwrap();
    create_config_file(project.path(), "[project]\nname = \"from-env\"\n");
    let cwd = TempDir::new().unwrap();
    create_config_file(cwd.path(), "[project]\nname = \"from-cwd\"\n");

    env::set_var(PROJECT_DIR_ENV, project.path());
    let loaded = ConfigLoader::new().load_from_directory(cwd.path());
    env::remove_var(PROJECT_DIR_ENV);

    assert_eq!(loaded.unwrap().project_name(), "from-env");
}

#[test]
#[serial]
fn test_empty_env_value_is_ignored() {
    let cwd = TempDir::new().unwrap();
    create_config_file(cwd.path(), "[project]\nname = \"from-cwd\"\n");

    env::set_var(PROJECT_DIR_ENV, "");
    let loaded = ConfigLoader::new().load_from_directory(cwd.path());
    env::remove_var(PROJECT_DIR_ENV);

    assert_eq!(loaded.unwrap().project_name(), "from-cwd");
}

// ============================================================================
// Build Config Conversion Tests
// ============================================================================

#[test]
fn test_paths_resolve_against_root() {
    let config = ProjectConfig::from_toml(FULL_CONFIG).unwrap();
    let build = config.to_build_config(Path::new("/proj")).unwrap();

    assert_eq!(build.project_name, "game");
    assert_eq!(build.root_dir, PathBuf::from("/proj"));
    assert_eq!(build.src_dir, PathBuf::from("/proj/src"));
    assert_eq!(build.build_dir, PathBuf::from("/proj/build"));
    assert_eq!(build.deploy_dir, PathBuf::from("/proj/deploy"));
    assert_eq!(build.archive_name, "game");
    assert_eq!(build.deploy_files, vec!["game_linux", "data"]);
    assert_eq!(build.copy_dirs.len(), 1);
}

#[test]
fn test_targets_keep_declaration_order() {
    let config = ProjectConfig::from_toml(FULL_CONFIG).unwrap();
    let build = config.to_build_config(Path::new("/proj")).unwrap();

    let names: Vec<_> = build.targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["game", "editor"]);
    assert_eq!(build.targets[1].source, PathBuf::from("/proj/src/editor.cpp"));
}

#[test]
fn test_project_defines_precede_target_defines() {
    let config = ProjectConfig::from_toml(FULL_CONFIG).unwrap();
    let build = config.to_build_config(Path::new("/proj")).unwrap();

    assert_eq!(
        build.targets[0].defines,
        vec![
            Define::flag("USE_AUDIO"),
            Define::with_value("MAX_PLAYERS", 4),
            Define::flag("GAME_TARGET"),
        ]
    );
    assert_eq!(build.targets[1].defines.len(), 2);
}

#[test]
fn test_platform_options_are_mapped() {
    let config = ProjectConfig::from_toml(FULL_CONFIG).unwrap();
    let build = config.to_build_config(Path::new("/proj")).unwrap();

    let linux = build.targets[0].options_for(Platform::Linux).unwrap();
    assert_eq!(linux.defines, vec![Define::flag("USE_X11")]);
    assert_eq!(linux.linker_flags, vec!["-lX11"]);
    assert!(build.targets[0].options_for(Platform::Windows).is_none());
    assert!(build.targets[1].platform_options.is_empty());
}

#[test]
fn test_libraries_rooted_in_external_dir() {
    let config = ProjectConfig::from_toml(FULL_CONFIG).unwrap();
    let build = config.to_build_config(Path::new("/proj")).unwrap();

    let libraries = build.libraries();
    assert_eq!(libraries.len(), 1);
    assert_eq!(
        libraries[0].root,
        PathBuf::from("/proj/third_party/freetype-2.8.1")
    );
    assert!(build.targets.iter().all(|t| t.libraries.len() == 1));
}

#[test]
fn test_toolchain_settings() {
    let config = ProjectConfig::from_toml(FULL_CONFIG).unwrap();
    let build = config.to_build_config(Path::new("/proj")).unwrap();

    assert_eq!(build.toolchain.linux_compiler, "clang++");
    assert_eq!(build.toolchain.mac_compiler, "clang");
    assert_eq!(build.toolchain.windows_compiler, "cl");
    assert_eq!(build.toolchain.timeout, Duration::from_secs(120));
    assert!(build.toolchain.vcvarsall.is_none());
}

#[test]
#[serial]
fn test_loaded_config_into_build_config() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        "[project]\nname = \"game\"\narchive_name = \"game-v1\"\n[paths]\nbuild = \"out\"\n",
    );

    let build = ConfigLoader::new()
        .ignore_env()
        .load_from_directory(temp_dir.path())
        .unwrap()
        .into_build_config()
        .unwrap();

    let root = canonical(temp_dir.path());
    assert_eq!(build.build_dir, root.join("out"));
    assert_eq!(build.archive_name, "game-v1");
    assert_eq!(build.targets[0].source, root.join("src").join("main.cpp"));
}
