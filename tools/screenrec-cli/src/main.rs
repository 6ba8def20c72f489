//! screenrec CLI: command-line front-end for the recording session controller.
//!
//! Usage:
//!   screenrec record [OPTIONS]    Record the screen until Ctrl+C
//!   screenrec check               Show capture capabilities
//!   screenrec config              Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use screenrec_common::config::{AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "screenrec",
    about = "Record the screen, system audio and microphone into a single file",
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
    /// Record until Ctrl+C or until --duration elapses
    Record {
        /// Requested resolution, e.g. 1920x1080
        #[arg(short, long)]
        resolution: Option<String>,

        /// Requested frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Target video bitrate in kbps (minimum 1000)
        #[arg(short, long)]
        bitrate: Option<u32>,

        /// Do not ask for system audio
        #[arg(long)]
        no_system_audio: bool,

        /// Mix the microphone into the recording
        #[arg(long)]
        mic: bool,

        /// Directory for the finished recording
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop automatically after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Check capture capabilities and supported formats
    Check,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write_default: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    screenrec_common::logging::init_logging(&LoggingConfig {
        level,
        ..config.logging.clone()
    });

    match cli.command {
        Commands::Record {
            resolution,
            fps,
            bitrate,
            no_system_audio,
            mic,
            output,
            duration,
        } => {
            commands::record::run(
                config,
                commands::record::RecordArgs {
                    resolution,
                    fps,
                    bitrate_kbps: bitrate,
                    no_system_audio,
                    microphone: mic,
                    output,
                    duration_secs: duration,
                },
            )
            .await
        }
        Commands::Check => commands::check::run(),
        Commands::Config { write_default } => commands::config::run(&config, write_default),
    }
}
