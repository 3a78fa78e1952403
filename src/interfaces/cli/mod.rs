//! CLI interface module
//!
//! One-shot commands that run without starting the HTTP server.

pub mod commands;

use crate::cli::Commands;
use crate::errors::Result;
use commands::{config_generate, generate_vapid_key_pair, reminder_status};

/// Run a one-shot command
///
/// `serve` and `worker` are long-running modes and never reach here.
pub async fn run_cli_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::VapidKeys => {
            generate_vapid_key_pair();
            Ok(())
        }
        Commands::ConfigGen { output, force } => config_generate(output, force),
        Commands::Status => reminder_status().await,
        Commands::Serve | Commands::Worker { .. } => Err(crate::errors::MediRemindError::validation(
            "serve and worker are not one-shot commands",
        )),
    }
}
