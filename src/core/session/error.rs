//! Session error kinds and their wire codes.

use thiserror::Error;

/// Errors surfaced to the client as `error` events.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Malformed or unknown client message
    #[error("Invalid message: {0}")]
    Protocol(String),

    /// Init parameters out of range. The client may retry `init`.
    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    /// Message arrived before `init`
    #[error("Session not initialized")]
    NotReady,

    /// Second `init` on the same connection
    #[error("Session already initialized")]
    AlreadyInitialized,

    /// Upstream connect or setup failed
    #[error("Upstream connection failed: {0}")]
    UpstreamHandshake(String),

    /// Upstream failed mid-session
    #[error("Upstream stream failed: {0}")]
    UpstreamStream(String),

    /// Credential missing, invalid, or not allow-listed
    #[error("Unauthorized: {0}")]
    Authorization(String),
}

impl SessionError {
    /// Stable code sent in the `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Protocol(_) => "PROTOCOL_ERROR",
            SessionError::InvalidConfig(_) => "INVALID_CONFIG",
            SessionError::NotReady => "NOT_READY",
            SessionError::AlreadyInitialized => "ALREADY_INIT",
            SessionError::UpstreamHandshake(_) => "UPSTREAM_HANDSHAKE_FAILED",
            SessionError::UpstreamStream(_) => "UPSTREAM_STREAM_ERROR",
            SessionError::Authorization(_) => "UNAUTHORIZED",
        }
    }

    /// Fatal errors end the session after the error event is sent.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::UpstreamHandshake(_)
                | SessionError::UpstreamStream(_)
                | SessionError::Authorization(_)
        )
    }
}
