//! Client session brokering.
//!
//! One [`SessionBroker`] per client connection ties together the VAD gate,
//! the turn accumulator and an upstream realtime provider, and turns their
//! activity into an ordered stream of [`SessionEvent`]s.

pub mod broker;
pub mod error;
pub mod events;

pub use broker::{
    AUTO_LANGUAGE, DEFAULT_SAMPLE_RATE, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, SessionBroker,
    SessionConfig, SessionSettings, SessionState, TURN_COOLDOWN,
};
pub use error::SessionError;
pub use events::{SessionEvent, SessionFlow, SessionOutput, SpeechState, TranscriptSource};
