//! Voice Activity Detection (VAD) module
//!
//! Gates the microphone stream before it reaches the upstream model. Each
//! session owns one detector; frames judged to be silence are dropped so the
//! model only hears speech plus a short hangover tail.
//!
//! # Example
//!
//! ```rust
//! use voice_relay::core::vad::{EnergyVAD, VADConfig};
//!
//! let mut vad = EnergyVAD::new(VADConfig::default());
//! let loud: Vec<u8> = std::iter::repeat_n(2000i16.to_le_bytes(), 160).flatten().collect();
//!
//! assert!(vad.process_frame(&loud).forward);
//! ```

pub mod config;
pub mod detector;

pub use config::{DEFAULT_HANGOVER_FRAMES, DEFAULT_VAD_THRESHOLD, VADConfig};
pub use detector::{EnergyVAD, VADDecision, VoiceActivityDetector, mean_abs_amplitude};
