// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use edge_viewer::config::Config;
use edge_viewer::processing::ProcessorKind;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "edge-viewer")]
#[command(about = "Live camera edge detection viewer")]
#[command(version = edge_viewer::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Use the generated test pattern instead of a camera
    #[arg(long, global = true)]
    synthetic: bool,

    /// Camera device path (from 'edge-viewer list')
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Processor: canny, luma, invert or color
    #[arg(short, long, global = true)]
    processor: Option<ProcessorKind>,

    /// Config file (default: ~/.config/edge-viewer/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Run capture and processing without a window
    Headless {
        /// Run duration in seconds
        #[arg(short = 't', long, default_value = "10")]
        duration: u64,

        /// Save the last processed frame before exiting
        #[arg(short, long)]
        snapshot: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=edge_viewer=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::List) => cli::list_cameras(&config),
        Some(Commands::Headless { duration, snapshot }) => {
            cli::headless(&config, duration, snapshot)
        }
        None => Ok(edge_viewer::app::run(config)?),
    }
}

/// Config file merged with command-line overrides
fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    config.apply_overrides(cli.synthetic, cli.device.clone(), cli.processor);
    Ok(config)
}
