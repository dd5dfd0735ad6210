//! Clean command - empty the build and deploy directories

use anyhow::{Context, Result};
use colored::Colorize;
use kmb_build::Builder;

/// Run the clean command
pub fn run(builder: &Builder, json: bool) -> Result<()> {
    let report = builder.clean().context("Failed to clean")?;
    let config = builder.config();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "success": report.leftover == 0,
                "build_dir": config.build_dir.display().to_string(),
                "deploy_dir": config.deploy_dir.display().to_string(),
                "leftover": report.leftover,
            })
        );
    } else if report.leftover == 0 {
        println!(
            "{} {} and {}",
            "Cleaned".green().bold(),
            config.build_dir.display(),
            config.deploy_dir.display()
        );
    } else {
        println!(
            "{} {} entries could not be removed",
            "Cleaned with warnings:".yellow().bold(),
            report.leftover
        );
    }

    Ok(())
}
