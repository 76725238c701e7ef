//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `realtime` - Speech interpretation session WebSocket

pub mod api;
pub mod realtime;

pub use realtime::realtime_handler;
