//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// MediRemind - medication reminder and health risk backend
#[derive(Parser, Debug)]
#[command(name = "mediremind")]
#[command(version)]
#[command(about = "Medication reminder and health risk assessment backend", long_about = None)]
pub struct Cli {
    /// Configuration file path (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start the HTTP API server (default)
    Serve,

    /// Run the reminder worker without the HTTP server
    Worker {
        /// Poll interval in seconds (overrides worker.poll_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Generate a VAPID key pair for Web Push
    VapidKeys,

    /// Generate an example configuration file
    ConfigGen {
        /// Output path (default: config.example.toml)
        output: Option<String>,

        /// Overwrite without prompting
        #[arg(long)]
        force: bool,
    },

    /// Show the most recent reminder
    Status,
}
