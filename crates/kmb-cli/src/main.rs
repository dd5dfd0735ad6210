use anyhow::Result;
use clap::Parser;
use kmb_build::{BuildOptions, Platform};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Action;

/// kmb - build orchestrator for native C++ game projects.
///
/// Compiles every target declared in kmb.toml with the platform's toolchain,
/// stages data directories next to the executables and optionally packages a
/// deploy archive.
///
/// EXAMPLES:
///     kmb debug                    Build with debug settings
///     kmb release --deploy         Build optimized and write the deploy zip
///     kmb internal --ifchanged     Build only if sources changed
///     kmb run                      Launch the last build
///     kmb clean                    Empty the build and deploy directories
///
/// ENVIRONMENT VARIABLES:
///     KMB_PROJECT_DIR   Project directory containing kmb.toml
///     KMB_JSON          Set to '1' for a JSON build summary
///     RUST_LOG          Log filter (e.g. 'kmb_build=debug')
#[derive(Parser)]
#[command(name = "kmb")]
#[command(version)]
struct Cli {
    /// clean, run, or a compile mode: debug, internal, release
    #[arg(value_name = "MODE", value_parser = commands::parse_action)]
    action: Action,

    /// Skip the build when no source file changed since the last check
    #[arg(long)]
    ifchanged: bool,

    /// Package the build into a deploy archive afterwards
    #[arg(long)]
    deploy: bool,

    /// Open the built executable in the debugger (Windows only)
    #[arg(long)]
    debugger: bool,

    /// Project directory (searched upwards for kmb.toml)
    #[arg(long, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Explicit path to the project file
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Print the build summary as JSON
    #[arg(long, env = "KMB_JSON")]
    json: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Resolved once and passed to everything below
    let platform = Platform::current()?;
    let builder =
        commands::load_builder(cli.project_dir.as_deref(), cli.config.as_deref(), platform)?;

    match cli.action {
        Action::Clean | Action::Run => {
            for (set, flag) in [
                (cli.ifchanged, "--ifchanged"),
                (cli.deploy, "--deploy"),
                (cli.debugger, "--debugger"),
            ] {
                if set {
                    warn!("{} has no effect with '{}', ignoring", flag, cli.action);
                }
            }

            if cli.action == Action::Clean {
                commands::clean::run(&builder, cli.json)
            } else {
                commands::run::run(&builder)
            }
        }
        Action::Build(mode) => {
            let options = BuildOptions {
                if_changed: cli.ifchanged,
                deploy: cli.deploy,
                debugger: cli.debugger,
            };
            commands::build::run(&builder, mode, options, cli.json)
        }
    }
}
