//! Base traits and types for realtime speech-to-speech providers.
//!
//! A provider owns one bidirectional connection to an upstream model. Audio
//! goes out through [`BaseRealtime::send_audio`]; everything the model sends
//! back is delivered in order on the [`RealtimeEventReceiver`] returned by
//! [`BaseRealtime::connect`].
//!
//! # Audio Format
//!
//! Input is PCM 16-bit signed little-endian mono at the client's negotiated
//! sample rate. Output audio is PCM 16-bit at the provider's native rate.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The provider did not acknowledge the session setup
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Base configuration for realtime providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// Model to use
    #[serde(default)]
    pub model: String,

    /// Prebuilt voice for synthesized output
    #[serde(default)]
    pub voice: Option<String>,

    /// System instructions for the model
    #[serde(default)]
    pub instructions: Option<String>,

    /// Response modalities requested from the model
    #[serde(default)]
    pub modalities: Option<Vec<String>>,

    /// Ask the provider to transcribe the user's audio
    #[serde(default)]
    pub input_audio_transcription: bool,

    /// Ask the provider to transcribe its own spoken output
    #[serde(default)]
    pub output_audio_transcription: bool,

    /// Override of the provider's WebSocket endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Upper bound on connect plus setup acknowledgement (milliseconds)
    #[serde(default)]
    pub handshake_timeout_ms: Option<u64>,
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection state for realtime providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the provider
    #[default]
    Disconnected,
    /// Currently connecting
    Connecting,
    /// Connected and ready
    Connected,
    /// Connection failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Chunk of transcript text from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// The transcribed text fragment
    pub text: String,
    /// Whose speech this fragment belongs to
    pub role: TranscriptRole,
}

/// Role of the speaker in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    /// User speech transcript
    User,
    /// Model speech transcript
    Assistant,
}

impl fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptRole::User => write!(f, "user"),
            TranscriptRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Audio data synthesized by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeAudioData {
    /// Raw audio bytes (PCM 16-bit, mono, little-endian)
    pub data: Bytes,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Everything a provider can report back to its owner.
///
/// The receive task emits exactly one [`RealtimeEvent::Closed`] and then
/// drops its sender.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// Incremental transcript text
    Transcript(TranscriptResult),
    /// Synthesized audio chunk
    Audio(RealtimeAudioData),
    /// The model finished its turn
    TurnComplete,
    /// The model's generation was cut short by new user speech
    Interrupted,
    /// Terminal status of the connection. `error` is `None` for a clean close.
    Closed { error: Option<RealtimeError> },
}

/// Receiving half of a provider's event stream.
pub type RealtimeEventReceiver = mpsc::Receiver<RealtimeEvent>;

// =============================================================================
// Base Trait
// =============================================================================

/// Base trait for realtime speech-to-speech providers.
#[async_trait]
pub trait BaseRealtime: Send + Sync {
    /// Open the connection and complete the provider's session setup.
    ///
    /// Returns the stream of events produced by the supervised receive task.
    async fn connect(&mut self) -> RealtimeResult<RealtimeEventReceiver>;

    /// Stop the receive task and close the connection. Safe to call repeatedly.
    async fn disconnect(&mut self) -> RealtimeResult<()>;

    /// Check if the provider is connected and ready.
    fn is_ready(&self) -> bool;

    /// Get the current connection state.
    fn get_connection_state(&self) -> ConnectionState;

    /// Send one frame of PCM 16-bit mono audio recorded at `sample_rate`.
    async fn send_audio(&mut self, audio_data: Bytes, sample_rate: u32) -> RealtimeResult<()>;

    /// Ask the provider to flush buffered input and abandon in-flight generation.
    async fn interrupt(&mut self) -> RealtimeResult<()>;

    /// Get provider information.
    fn get_provider_info(&self) -> serde_json::Value;
}

// =============================================================================
// Factory
// =============================================================================

/// Boxed trait object for realtime providers.
pub type BoxedRealtime = Box<dyn BaseRealtime>;

/// Factory for realtime providers, held in application state so tests can
/// substitute an in-process provider.
pub trait RealtimeFactory: Send + Sync {
    /// Create a new, unconnected provider from configuration.
    fn create(&self, config: RealtimeConfig) -> RealtimeResult<BoxedRealtime>;
}
