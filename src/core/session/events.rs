//! Events a session emits towards its client connection.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use super::error::SessionError;

/// Which side of the conversation a transcription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    /// The user's speech
    Input,
    /// The model's spoken translation
    Output,
}

/// Coarse microphone activity reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechState {
    Speaking,
    Silent,
    /// Reserved for clients; the session never emits it.
    Processing,
}

impl fmt::Display for SpeechState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechState::Speaking => write!(f, "speaking"),
            SpeechState::Silent => write!(f, "silent"),
            SpeechState::Processing => write!(f, "processing"),
        }
    }
}

/// A session-level event, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected {
        session_id: String,
    },
    Transcription {
        text: String,
        is_final: bool,
        language: Option<String>,
        source: TranscriptSource,
    },
    AudioResponse {
        data: Bytes,
        sample_rate: u32,
    },
    TurnComplete {
        input_text: String,
        output_text: String,
    },
    SpeechState {
        state: SpeechState,
        /// Milliseconds since the Unix epoch
        timestamp: u64,
    },
    Error {
        message: String,
        code: Option<String>,
    },
}

impl SessionEvent {
    pub fn speech_state(state: SpeechState) -> Self {
        SessionEvent::SpeechState {
            state,
            timestamp: unix_millis(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionEvent::Error { .. })
    }
}

impl From<&SessionError> for SessionEvent {
    fn from(err: &SessionError) -> Self {
        SessionEvent::Error {
            message: err.to_string(),
            code: Some(err.code().to_string()),
        }
    }
}

/// What the connection writer receives: an event, or a request to close.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    Event(SessionEvent),
    Close { code: u16, reason: String },
}

/// Whether the connection should keep running after a session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlow {
    Continue,
    Close,
}

impl SessionFlow {
    pub fn should_close(self) -> bool {
        self == SessionFlow::Close
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
