//! Layout Sync CLI
//!
//! Usage:
//!   layout-sync -j <NETLIST> -o <BOARD> [OPTIONS]
//!
//! Options:
//!   -j, --json-input <FILE>  JSON netlist to import
//!   -o, --output <FILE>      Board document to update (created if missing)
//!   -s, --snapshot <FILE>    Write a layout snapshot after the run
//!   --only-snapshot          Only export the snapshot of the current board
//!   -c, --config <FILE>      Configuration file (TOML format)
//!   -h, --help               Print help
//!
//! Logging is controlled by `RUST_LOG` (default `error`).

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use layout_sync::{run, RunOptions};

#[derive(Parser)]
#[command(name = "layout-sync")]
#[command(about = "Synchronize a board layout with a hierarchical netlist")]
struct Cli {
    /// JSON netlist to import
    #[arg(short = 'j', long = "json-input", required_unless_present = "only_snapshot")]
    json_input: Option<PathBuf>,

    /// Board document to update (created if missing)
    #[arg(short, long)]
    output: PathBuf,

    /// Write a layout snapshot after the run
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Only export the snapshot of the current board
    #[arg(long)]
    only_snapshot: bool,

    /// Configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut options = RunOptions::new(cli.json_input.unwrap_or_default(), cli.output)
        .with_only_snapshot(cli.only_snapshot);
    if let Some(snapshot) = cli.snapshot {
        options = options.with_snapshot(snapshot);
    }
    if let Some(config) = cli.config {
        options = options.with_config(config);
    }

    match run(&options) {
        Ok(Some(report)) => {
            for warning in report.warnings() {
                eprintln!("Warning: {}", warning);
            }
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
