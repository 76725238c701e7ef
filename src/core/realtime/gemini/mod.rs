//! Gemini Live API module.
//!
//! Streams microphone audio to a Gemini native-audio model and receives
//! translated speech together with input and output transcriptions.
//!
//! # Example
//!
//! ```rust,ignore
//! use voice_relay::core::realtime::{BaseRealtime, GeminiLive, RealtimeConfig, RealtimeEvent};
//!
//! let mut client = GeminiLive::new(RealtimeConfig {
//!     api_key: std::env::var("GEMINI_API_KEY")?,
//!     input_audio_transcription: true,
//!     output_audio_transcription: true,
//!     ..Default::default()
//! })?;
//!
//! let mut events = client.connect().await?;
//! client.send_audio(pcm_frame, 16000).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let RealtimeEvent::Closed { .. } = event {
//!         break;
//!     }
//! }
//! ```

mod client;
mod config;
mod messages;

pub use client::{GeminiLive, GeminiLiveFactory};
pub use config::{
    DEFAULT_INTERPRETER_INSTRUCTION, GEMINI_DEFAULT_MODEL, GEMINI_DEFAULT_VOICE,
    GEMINI_HANDSHAKE_TIMEOUT, GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE, pcm_mime_type,
};
pub use messages::{ClientEvent, ServerContent, ServerMessage, SetupConfig};
