//! Realtime speech-to-speech provider module.
//!
//! # Supported Providers
//!
//! - **Gemini Live** - native-audio Gemini models over a bidirectional WebSocket
//!
//! # Architecture
//!
//! - `BaseRealtime` trait for provider abstraction
//! - `RealtimeFactory` held in application state, so sessions never name a
//!   concrete provider
//! - Provider output is an ordered event channel rather than callbacks

mod base;
pub mod gemini;

pub use base::{
    BaseRealtime, BoxedRealtime, ConnectionState, RealtimeAudioData, RealtimeConfig,
    RealtimeError, RealtimeEvent, RealtimeEventReceiver, RealtimeFactory, RealtimeResult,
    TranscriptResult, TranscriptRole,
};
pub use gemini::{GEMINI_OUTPUT_SAMPLE_RATE, GeminiLive, GeminiLiveFactory};

/// Supported realtime providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeProvider {
    /// Google Gemini Live API
    Gemini,
}

impl RealtimeProvider {
    /// Parse provider from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "gemini-live" | "gemini_live" | "google" => Some(RealtimeProvider::Gemini),
            _ => None,
        }
    }
}

impl std::fmt::Display for RealtimeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RealtimeProvider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Factory for a named provider.
pub fn create_realtime_factory(
    provider_type: &str,
) -> RealtimeResult<std::sync::Arc<dyn RealtimeFactory>> {
    match RealtimeProvider::parse(provider_type) {
        Some(RealtimeProvider::Gemini) => Ok(std::sync::Arc::new(GeminiLiveFactory)),
        None => Err(RealtimeError::InvalidConfiguration(format!(
            "Unsupported realtime provider: {provider_type}. Supported providers: {}",
            get_supported_realtime_providers().join(", ")
        ))),
    }
}

/// Get list of supported realtime providers.
pub fn get_supported_realtime_providers() -> Vec<&'static str> {
    vec!["gemini"]
}
