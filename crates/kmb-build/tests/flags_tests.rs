//! Flag resolution tests

use kmb_build::{
    resolve_flags, BuildError, BuildTarget, CompileMode, Define, Platform, PlatformTargetOptions,
    TargetType,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn internal_slow_pair(platform: Platform, mode: CompileMode) -> (String, String) {
    let target = BuildTarget::executable("app", "src/main.cpp");
    let flags = resolve_flags(&target, platform, mode).unwrap();
    let find = |name: &str| {
        flags
            .compiler
            .iter()
            .find(|f| f.contains(name))
            .cloned()
            .unwrap()
    };
    (find("GAME_INTERNAL="), find("GAME_SLOW="))
}

#[rstest]
#[case(CompileMode::Debug, "1", "1")]
#[case(CompileMode::Internal, "1", "0")]
#[case(CompileMode::Release, "0", "0")]
fn test_internal_slow_truth_table(
    #[case] mode: CompileMode,
    #[case] internal: &str,
    #[case] slow: &str,
) {
    for platform in Platform::all() {
        let (internal_flag, slow_flag) = internal_slow_pair(platform, mode);
        assert!(internal_flag.ends_with(&format!("GAME_INTERNAL={}", internal)));
        assert!(slow_flag.ends_with(&format!("GAME_SLOW={}", slow)));
    }
}

#[test]
fn test_modes_resolve_distinct_pairs() {
    let pairs: Vec<_> = CompileMode::all()
        .iter()
        .map(|mode| internal_slow_pair(Platform::Linux, *mode))
        .collect();
    assert_ne!(pairs[0], pairs[1]);
    assert_ne!(pairs[1], pairs[2]);
    assert_ne!(pairs[0], pairs[2]);
}

#[test]
fn test_linux_release_scenario() {
    let target = BuildTarget::executable("app", "src/main.cpp")
        .with_platform_options(Platform::Linux, PlatformTargetOptions::new());

    let flags = resolve_flags(&target, Platform::Linux, CompileMode::Release).unwrap();

    assert!(flags.has_compiler_flag("-DGAME_LINUX=1"));
    assert!(flags.has_compiler_flag("-DGAME_INTERNAL=0"));
    assert!(flags.has_compiler_flag("-DGAME_SLOW=0"));
    assert!(!flags.has_compiler_flag("-O0"));
    assert!(flags.has_compiler_flag("-O3"));
}

#[test]
fn test_windows_release_has_no_debug_optimization_switch() {
    let target = BuildTarget::executable("app", "src/main.cpp");
    let flags = resolve_flags(&target, Platform::Windows, CompileMode::Release).unwrap();
    assert!(!flags.has_compiler_flag("/Od"));
    assert!(!flags.has_compiler_flag("/MTd"));
    assert!(flags.has_compiler_flag("/DGAME_WIN32=1"));
}

#[test]
fn test_linux_debug_full_flag_list() {
    let target = BuildTarget::executable("app", "src/main.cpp");
    let flags = resolve_flags(&target, Platform::Linux, CompileMode::Debug).unwrap();

    insta::assert_snapshot!(
        flags.compiler.join(" "),
        @"-DGAME_LINUX=1 -DGAME_INTERNAL=1 -DGAME_SLOW=1 -std=c++17 -ggdb3 -fno-rtti -fno-exceptions -O0 -Werror -Wall -Wno-char-subscripts -Wno-unused-function"
    );
    assert_eq!(flags.linker, vec!["-fvisibility=hidden", "-lm", "-lpthread"]);
}

#[test]
fn test_missing_platform_entry_contributes_nothing() {
    let bare = BuildTarget::executable("app", "src/main.cpp");
    let with_mac = bare.clone().with_platform_options(
        Platform::Mac,
        PlatformTargetOptions::new().with_compiler_flags(vec!["-fobjc-arc".to_string()]),
    );

    assert_eq!(
        resolve_flags(&bare, Platform::Linux, CompileMode::Internal).unwrap(),
        resolve_flags(&with_mac, Platform::Linux, CompileMode::Internal).unwrap()
    );
}

#[test]
fn test_platform_option_order_is_preserved() {
    let options = PlatformTargetOptions::new()
        .with_compiler_flags(vec!["-O2".to_string(), "-O1".to_string()])
        .with_linker_flags(vec!["-lz".to_string(), "-lssl".to_string(), "-lcrypto".to_string()]);
    let target = BuildTarget::executable("app", "src/main.cpp")
        .with_platform_options(Platform::Linux, options);

    let flags = resolve_flags(&target, Platform::Linux, CompileMode::Release).unwrap();
    let tail: Vec<_> = flags.compiler.iter().rev().take(2).rev().cloned().collect();
    assert_eq!(tail, vec!["-O2", "-O1"]);
    let tail: Vec<_> = flags.linker.iter().rev().take(3).rev().cloned().collect();
    assert_eq!(tail, vec!["-lz", "-lssl", "-lcrypto"]);
}

#[rstest]
#[case(TargetType::LibDynamic)]
#[case(TargetType::LibStatic)]
fn test_library_targets_are_rejected(#[case] target_type: TargetType) {
    let target = BuildTarget::new("engine", "src/engine.cpp", target_type);
    for platform in Platform::all() {
        let err = resolve_flags(&target, platform, CompileMode::Release).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedTargetType { .. }));
        assert!(err.to_string().contains("engine"));
    }
}

fn platform_strategy() -> impl Strategy<Value = Platform> {
    prop_oneof![
        Just(Platform::Windows),
        Just(Platform::Linux),
        Just(Platform::Mac)
    ]
}

fn mode_strategy() -> impl Strategy<Value = CompileMode> {
    prop_oneof![
        Just(CompileMode::Debug),
        Just(CompileMode::Internal),
        Just(CompileMode::Release)
    ]
}

fn define_strategy() -> impl Strategy<Value = Define> {
    ("[A-Z][A-Z0-9_]{0,8}", proptest::option::of("[0-9]{1,3}")).prop_map(|(name, value)| Define {
        name,
        value,
    })
}

proptest! {
    #[test]
    fn prop_resolution_is_pure(
        platform in platform_strategy(),
        mode in mode_strategy(),
        defines in proptest::collection::vec(define_strategy(), 0..4),
        option_defines in proptest::collection::vec(define_strategy(), 0..3),
        compiler_flags in proptest::collection::vec("-[a-z]{1,6}", 0..4),
        linker_flags in proptest::collection::vec("-l[a-z]{1,6}", 0..4),
    ) {
        let options = PlatformTargetOptions::new()
            .with_defines(option_defines)
            .with_compiler_flags(compiler_flags.clone())
            .with_linker_flags(linker_flags.clone());
        let target = BuildTarget::executable("app", "src/main.cpp")
            .with_defines(defines)
            .with_platform_options(platform, options);

        let first = resolve_flags(&target, platform, mode).unwrap();
        let second = resolve_flags(&target, platform, mode).unwrap();
        prop_assert_eq!(&first, &second);

        prop_assert!(first.compiler.ends_with(&compiler_flags));
        prop_assert!(first.linker.ends_with(&linker_flags));
    }
}
