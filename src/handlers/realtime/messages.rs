//! Session WebSocket message types
//!
//! Every frame in either direction is a JSON text frame tagged by `type`.
//! Client messages use snake_case tags; server message fields are camelCase
//! so browser clients can consume them directly.

use base64::{Engine, prelude::BASE64_STANDARD};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::session::{SessionConfig, SessionEvent, SpeechState, TranscriptSource};

/// Maximum allowed size for the base64 payload of one audio message (1 MB)
pub const MAX_AUDIO_DATA_SIZE: usize = 1024 * 1024;

/// Maximum allowed size for an inline credential (8 KB)
pub const MAX_TOKEN_SIZE: usize = 8 * 1024;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Incoming WebSocket messages from client
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeIncomingMessage {
    /// Negotiate the session. Must be the first message.
    Init {
        #[serde(default)]
        config: SessionConfig,
        /// Credential for connections that did not present one on upgrade
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },

    /// One frame of 16-bit little-endian mono PCM, base64 encoded
    Audio {
        data: String,
        /// Client capture time, informational only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Abandon the model's in-flight response
    Interrupt,

    /// End the session
    Close,
}

impl RealtimeIncomingMessage {
    /// Wire name of the message, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            RealtimeIncomingMessage::Init { .. } => "init",
            RealtimeIncomingMessage::Audio { .. } => "audio",
            RealtimeIncomingMessage::Interrupt => "interrupt",
            RealtimeIncomingMessage::Close => "close",
        }
    }

    /// Validates message field sizes to prevent resource exhaustion attacks.
    pub fn validate_size(&self) -> Result<(), RealtimeValidationError> {
        match self {
            RealtimeIncomingMessage::Audio { data, .. } => {
                let size = data.len();
                if size > MAX_AUDIO_DATA_SIZE {
                    return Err(RealtimeValidationError::AudioTooLarge {
                        size,
                        max: MAX_AUDIO_DATA_SIZE,
                    });
                }
            }
            RealtimeIncomingMessage::Init {
                token: Some(token), ..
            } => {
                let size = token.len();
                if size > MAX_TOKEN_SIZE {
                    return Err(RealtimeValidationError::TokenTooLarge {
                        size,
                        max: MAX_TOKEN_SIZE,
                    });
                }
            }
            RealtimeIncomingMessage::Init { token: None, .. }
            | RealtimeIncomingMessage::Interrupt
            | RealtimeIncomingMessage::Close => {}
        }
        Ok(())
    }
}

/// Decode the base64 payload of an `audio` message into raw PCM bytes.
pub fn decode_audio(data: &str) -> Result<Bytes, RealtimeValidationError> {
    BASE64_STANDARD
        .decode(data)
        .map(Bytes::from)
        .map_err(|e| RealtimeValidationError::InvalidAudio {
            reason: e.to_string(),
        })
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Outgoing WebSocket messages to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RealtimeOutgoingMessage {
    /// Upstream session is ready
    Connected { session_id: String },

    /// Cumulative text of the user's side of the current turn, or the final
    /// text once it completes
    InputTranscription {
        text: String,
        is_final: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },

    /// Same as `InputTranscription`, for the model's spoken translation
    OutputTranscription {
        text: String,
        is_final: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },

    /// Synthesized speech, base64 PCM
    AudioResponse { data: String, sample_rate: u32 },

    TurnComplete {
        input_text: String,
        output_text: String,
    },

    SpeechState { state: SpeechState, timestamp: u64 },

    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl From<SessionEvent> for RealtimeOutgoingMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Connected { session_id } => {
                RealtimeOutgoingMessage::Connected { session_id }
            }
            SessionEvent::Transcription {
                text,
                is_final,
                language,
                source,
            } => match source {
                TranscriptSource::Input => RealtimeOutgoingMessage::InputTranscription {
                    text,
                    is_final,
                    language,
                },
                TranscriptSource::Output => RealtimeOutgoingMessage::OutputTranscription {
                    text,
                    is_final,
                    language,
                },
            },
            SessionEvent::AudioResponse { data, sample_rate } => {
                RealtimeOutgoingMessage::AudioResponse {
                    data: BASE64_STANDARD.encode(&data),
                    sample_rate,
                }
            }
            SessionEvent::TurnComplete {
                input_text,
                output_text,
            } => RealtimeOutgoingMessage::TurnComplete {
                input_text,
                output_text,
            },
            SessionEvent::SpeechState { state, timestamp } => {
                RealtimeOutgoingMessage::SpeechState { state, timestamp }
            }
            SessionEvent::Error { message, code } => {
                RealtimeOutgoingMessage::Error { message, code }
            }
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Error type for message validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeValidationError {
    /// Audio payload exceeds maximum allowed size
    AudioTooLarge { size: usize, max: usize },
    /// Inline token exceeds maximum allowed size
    TokenTooLarge { size: usize, max: usize },
    /// Audio payload is not valid base64
    InvalidAudio { reason: String },
}

impl std::fmt::Display for RealtimeValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AudioTooLarge { size, max } => {
                write!(f, "Audio too large: {} bytes (max: {} bytes)", size, max)
            }
            Self::TokenTooLarge { size, max } => {
                write!(f, "Token too large: {} bytes (max: {} bytes)", size, max)
            }
            Self::InvalidAudio { reason } => {
                write!(f, "Invalid audio data: {}", reason)
            }
        }
    }
}

impl std::error::Error for RealtimeValidationError {}
