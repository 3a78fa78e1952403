pub mod jwt;
pub mod middleware;
pub mod services;
pub mod state;

pub use state::AppServices;
