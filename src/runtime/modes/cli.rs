//! CLI mode
//!
//! Delegates one-shot commands to the CLI interface.

use crate::cli::Commands;
use crate::errors::Result;

/// Run CLI mode
pub async fn run_cli(cmd: Commands) -> Result<()> {
    crate::interfaces::cli::run_cli_command(cmd).await
}
