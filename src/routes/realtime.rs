//! Session WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::realtime::realtime_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Path of the session WebSocket
pub const WS_PATH: &str = "/ws";

/// Create the session WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for a speech interpretation session
///
/// # Example
///
/// ```json
/// // Client sends init
/// {"type": "init", "config": {"language": "auto", "sampleRate": 16000}}
///
/// // Server responds
/// {"type": "connected", "sessionId": "..."}
///
/// // Client streams audio
/// {"type": "audio", "data": "<base64 pcm>", "timestamp": 1700000000000}
///
/// // Server sends speech_state, input_transcription, output_transcription,
/// // audio_response, turn_complete
/// ```
///
/// # Authentication
///
/// The auth middleware must be layered on this router by the caller.
pub fn create_realtime_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(WS_PATH, get(realtime_handler))
        .layer(TraceLayer::new_for_http())
}
