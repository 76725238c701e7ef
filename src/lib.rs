pub mod auth;
pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::*;
pub use errors::auth_error::{AuthError, AuthResult};
pub use errors::config_error::{ConfigError, ConfigResult};
pub use state::AppState;
