//! Speech interpretation session WebSocket
//!
//! # Protocol
//!
//! All frames are JSON text frames tagged by `type`.
//!
//! ## Client → Server
//!
//! - **init**: `{ config: { language, useWhisper, sampleRate }, token? }`, must come first
//! - **audio**: `{ data, timestamp }` with base64 16-bit mono PCM
//! - **interrupt**: abandon the model's current response
//! - **close**: end the session
//!
//! ## Server → Client
//!
//! - **connected**: upstream session ready
//! - **input_transcription**: cumulative or final text of the user's speech
//! - **output_transcription**: cumulative or final text of the model's translation
//! - **audio_response**: translated speech, base64 PCM at 24 kHz
//! - **turn_complete**: final texts of the finished turn
//! - **speech_state**: `speaking` / `silent` edges of the voice gate
//! - **error**: `{ message, code }`

mod handler;
pub mod messages;

pub use handler::realtime_handler;
