//! Marquee CLI - Headless Playback Driver
//!
//! Features:
//! - Source classification
//! - Time display formatting
//! - Simulated playback sessions with injected engine failures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Marquee CLI - embeddable player toolkit
#[derive(Parser)]
#[command(name = "marquee")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Headless driver for the Marquee playback controller", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the playback strategy chosen for a source
    Classify {
        /// Source URL
        url: String,

        /// Type hint (auto, segmented, progressive)
        #[arg(long, default_value = "auto")]
        hint: String,
    },

    /// Format seconds the way the control bar shows them
    Format {
        /// Position in seconds
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },

    /// Run a headless playback session on the simulated host
    Simulate {
        /// Source URL
        url: String,

        /// Type hint (auto, segmented, progressive)
        #[arg(long, default_value = "auto")]
        hint: String,

        /// Player configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fatal network errors to inject into the engine
        #[arg(short = 'n', long, default_value = "0")]
        network_failures: u32,

        /// Media duration reported by the element (seconds)
        #[arg(short, long, default_value = "30")]
        duration: f64,

        /// Report the adaptive engine as unsupported
        #[arg(long)]
        no_engine: bool,

        /// Give the element native segmented playback
        #[arg(long)]
        native: bool,
    },

    /// List bundled sample sources
    Samples,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Classify { url, hint } => {
            commands::classify(&url, &hint, &cli.format)?;
        }
        Commands::Format { seconds } => {
            commands::format(seconds, &cli.format);
        }
        Commands::Simulate { url, hint, config, network_failures, duration, no_engine, native } => {
            let options = commands::SimulateOptions {
                hint,
                config,
                network_failures,
                duration,
                no_engine,
                native,
            };
            commands::simulate(&url, options, &cli.format).await?;
        }
        Commands::Samples => {
            commands::samples(&cli.format);
        }
    }

    Ok(())
}
