//! Gemini Live API configuration constants.

use std::time::Duration;

/// Gemini Live bidirectional streaming endpoint. The API key goes in the `key` query parameter.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Native-audio model used when none is configured.
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Prebuilt voice used when none is configured.
pub const GEMINI_DEFAULT_VOICE: &str = "Zephyr";

/// Sample rate of the PCM audio Gemini synthesizes.
pub const GEMINI_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Default bound on WebSocket connect plus `setupComplete`.
pub const GEMINI_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default instruction turning the model into a Korean/English interpreter.
pub const DEFAULT_INTERPRETER_INSTRUCTION: &str = "You are a fast, bidirectional simultaneous interpreter in a voice-to-voice translation system.

Rules:
1. Detect the spoken language automatically. Translate Korean into English and English into Korean.
2. Speak only the translation. Never add commentary, greetings or explanations.
3. Keep a natural spoken tone with short, breathable phrasing.";

/// Mime type for one realtime input audio blob.
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={sample_rate}")
}

/// Gemini addresses models as `models/<name>`.
pub fn qualified_model_name(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}
