//! FramePress CLI: probe encoders and export the demo animation.
//!
//! Usage:
//!   framepress check               Report encoder and recorder support
//!   framepress export [OPTIONS]    Render the demo animation and export it
//!   framepress config [--init]     Show (or write) the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use framepress_common::config::{AppConfig, LoggingConfig};

mod commands;
mod synthetic;

#[derive(Parser)]
#[command(
    name = "framepress",
    about = "Frame-accurate video export with hardware and paced fallback encoding",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which codecs and recorder formats this host supports
    Check {
        /// Print the probe report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the demo animation and export it to WebM
    Export {
        /// Output file (default: <output_dir>/framepress-<timestamp>.webm)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Frames per second (default from config)
        #[arg(long)]
        fps: Option<u32>,

        /// Duration in milliseconds (default from config)
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Frame width
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "1080")]
        height: u32,

        /// Skip codec probing and use the paced stream recorder
        #[arg(long)]
        force_fallback: bool,
    },

    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    framepress_common::logging::init_logging(&LoggingConfig {
        level,
        ..config.logging.clone()
    });

    match cli.command {
        Commands::Check { json } => commands::check::run(&config, json).await,
        Commands::Export {
            output,
            fps,
            duration_ms,
            width,
            height,
            force_fallback,
        } => {
            commands::export::run(
                &config,
                commands::export::ExportArgs {
                    output,
                    fps: fps.unwrap_or(config.export.fps),
                    duration_ms: duration_ms.unwrap_or(config.export.duration_ms),
                    width,
                    height,
                    force_fallback,
                },
            )
            .await
        }
        Commands::Config { init } => commands::config::run(&config, init),
    }
}
