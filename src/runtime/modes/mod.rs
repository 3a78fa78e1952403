//! Mode routing
//!
//! - Server mode (HTTP API, optional embedded worker)
//! - Worker mode (reminder loop only)
//! - CLI mode (one-shot commands)

pub mod cli;
pub mod server;
pub mod worker;

pub use cli::run_cli;
pub use server::run_server;
pub use worker::run_worker;
