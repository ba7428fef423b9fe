//! Conveyor — asset pipeline CLI.
//!
//! # Usage
//!
//! ```text
//! conveyor build [--json]
//! conveyor clean
//! conveyor styles
//! conveyor scripts
//! conveyor copy
//! conveyor size [--json]
//! conveyor diff
//! conveyor watch start|status|reload|stop
//! ```
//!
//! Every command runs against the project in the current directory
//! (`assets/config.yaml`, staging under `public/assets/`). Deployment mode,
//! asset host, and the reload port come from `NODE_ENV`, `ASSET_HOST`, and
//! `PORT`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{build::BuildArgs, diff::DiffArgs, size::SizeArgs, watch::WatchCommand};
use conveyor_stages::StageKind;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "conveyor",
    version,
    about = "Compose asset-pipeline stages into deployable builds",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline: clean, bundle, copy, rewrite, revision,
    /// compress, size report.
    Build(BuildArgs),

    /// Delete the staging root.
    Clean,

    /// Bundle configured style entries.
    Styles,

    /// Bundle configured script entries.
    Scripts,

    /// Copy configured files verbatim.
    Copy,

    /// Report per-file and aggregate staged sizes.
    Size(SizeArgs),

    /// Show unified diffs of what rebundling would change.
    Diff(DiffArgs),

    /// Watch sources, rebuild on change, notify live-reload clients.
    Watch {
        #[command(subcommand)]
        command: WatchCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => args.run(),
        Commands::Clean => commands::stage::run(StageKind::Clean),
        Commands::Styles => commands::stage::run(StageKind::Styles),
        Commands::Scripts => commands::stage::run(StageKind::Scripts),
        Commands::Copy => commands::stage::run(StageKind::Copy),
        Commands::Size(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Watch { command } => commands::watch::run(command),
    }
}
