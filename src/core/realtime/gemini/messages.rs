//! Gemini Live API WebSocket message types.
//!
//! Client messages (sent to server):
//! - `setup` - First message of every session: model, voice, transcription
//! - `realtimeInput` - Audio blobs and end-of-stream markers
//!
//! Server messages (received from server):
//! - `setupComplete` - Session is ready for input
//! - `serverContent` - Transcriptions, model audio, turn boundaries
//! - `goAway` - Server is about to close the connection
//! - `usageMetadata` / `toolCall` - Ignored by this gateway
//!
//! Field names are camelCase on the wire.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::pcm_mime_type;

// =============================================================================
// Client Messages
// =============================================================================

/// Messages sent to the Gemini Live API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientEvent {
    /// Session configuration, must be the first message
    Setup(SetupConfig),
    /// Streaming user input
    RealtimeInput(RealtimeInput),
}

impl ClientEvent {
    /// Wrap a PCM frame as a base64 realtime audio blob.
    pub fn audio(pcm: &[u8], sample_rate: u32) -> Self {
        ClientEvent::RealtimeInput(RealtimeInput {
            audio: Some(Blob {
                mime_type: pcm_mime_type(sample_rate),
                data: BASE64_STANDARD.encode(pcm),
            }),
            audio_stream_end: None,
        })
    }

    /// Tell the server that no more audio is coming for now, flushing cached input.
    pub fn audio_stream_end() -> Self {
        ClientEvent::RealtimeInput(RealtimeInput {
            audio: None,
            audio_stream_end: Some(true),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupConfig {
    /// Fully qualified model name (`models/...`)
    pub model: String,

    pub generation_config: GenerationConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<AudioTranscriptionConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<AudioTranscriptionConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Presence enables transcription; the API takes no options.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioTranscriptionConfig {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_end: Option<bool>,
}

// =============================================================================
// Shared Types
// =============================================================================

/// Inline binary payload, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.into()),
                inline_data: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

// =============================================================================
// Server Messages
// =============================================================================

/// One message from the Gemini Live API. Exactly one field is normally set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub go_away: Option<GoAway>,
    #[serde(default)]
    pub tool_call: Option<serde_json::Value>,
    #[serde(default)]
    pub usage_metadata: Option<serde_json::Value>,
}

impl ServerMessage {
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub generation_complete: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    #[serde(default)]
    pub time_left: Option<String>,
}
