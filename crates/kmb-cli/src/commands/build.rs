//! Build command - compile every target in a compile mode

use anyhow::{Context, Result};
use colored::Colorize;
use kmb_build::{BuildOptions, BuildOutcome, BuildReport, Builder, CompileMode};

/// Run the build command
pub fn run(builder: &Builder, mode: CompileMode, options: BuildOptions, json: bool) -> Result<()> {
    let outcome = builder
        .build(mode, options)
        .with_context(|| format!("{} build failed", mode))?;

    if json {
        println!("{}", json_summary(mode, &outcome));
        return Ok(());
    }

    match &outcome {
        BuildOutcome::Skipped => {
            println!("{} no source changes, build skipped", "Up to date:".green().bold());
        }
        BuildOutcome::Built(report) => print_report(report),
    }

    Ok(())
}

fn print_report(report: &BuildReport) {
    println!("\n{}", "=".repeat(60));
    println!(
        "{} in {:.2}s",
        "Build succeeded".green().bold(),
        report.stats.total_time.as_secs_f64()
    );
    println!("{}", "=".repeat(60));
    println!("  Mode: {} ({})", report.mode, report.platform);
    println!("  Targets: {}", report.stats.targets_built);
    for artifact in &report.artifacts {
        println!("  Artifact: {}", artifact.display());
    }
    if let Some(deploy) = &report.deploy {
        println!(
            "  Deploy: {} ({} entries)",
            deploy.archive_path.display(),
            deploy.members.len()
        );
    }
    println!("{}", "=".repeat(60));
}

/// Machine-readable summary of a build outcome
pub fn json_summary(mode: CompileMode, outcome: &BuildOutcome) -> serde_json::Value {
    match outcome {
        BuildOutcome::Skipped => serde_json::json!({
            "success": true,
            "skipped": true,
            "mode": mode.name(),
        }),
        BuildOutcome::Built(report) => serde_json::json!({
            "success": true,
            "skipped": false,
            "mode": report.mode.name(),
            "platform": report.platform.name(),
            "targets_built": report.stats.targets_built,
            "total_time": report.stats.total_time.as_secs_f64(),
            "staging_time": report.stats.staging_time.as_secs_f64(),
            "compilation_time": report.stats.compilation_time.as_secs_f64(),
            "artifacts": report
                .artifacts
                .iter()
                .map(|a| a.display().to_string())
                .collect::<Vec<_>>(),
            "archive": report
                .deploy
                .as_ref()
                .map(|d| d.archive_path.display().to_string()),
        }),
    }
}
