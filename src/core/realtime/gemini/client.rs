//! Gemini Live API client implementation.
//!
//! # API Reference
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent?key=<api key>`
//! - Protocol: WebSocket with JSON messages (the server may send them in binary frames)
//! - Input audio: PCM 16-bit mono at the client's rate, base64 encoded
//! - Output audio: PCM 16-bit mono at 24kHz
//!
//! The session is opened with a `setup` message and becomes usable once the
//! server answers with `setupComplete`. After that a single supervised task
//! owns the socket: it writes queued client messages, answers pings, and turns
//! server content into [`RealtimeEvent`]s.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::config::{
    DEFAULT_INTERPRETER_INSTRUCTION, GEMINI_DEFAULT_MODEL, GEMINI_DEFAULT_VOICE,
    GEMINI_HANDSHAKE_TIMEOUT, GEMINI_LIVE_URL, GEMINI_OUTPUT_SAMPLE_RATE, qualified_model_name,
};
use super::messages::{
    AudioTranscriptionConfig, ClientEvent, Content, GenerationConfig, PrebuiltVoiceConfig,
    ServerMessage, SetupConfig, SpeechConfig, VoiceConfig,
};
use crate::core::realtime::base::{
    BaseRealtime, BoxedRealtime, ConnectionState, RealtimeAudioData, RealtimeConfig,
    RealtimeError, RealtimeEvent, RealtimeEventReceiver, RealtimeFactory, RealtimeResult,
    TranscriptResult, TranscriptRole,
};

/// Channel capacity for outgoing client messages.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for events delivered to the session.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long `disconnect` waits for the connection task before aborting it.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

type GeminiSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type GeminiSink = SplitSink<GeminiSocket, Message>;
type GeminiStream = SplitStream<GeminiSocket>;

// =============================================================================
// Gemini Live Client
// =============================================================================

/// Gemini Live API client.
pub struct GeminiLive {
    config: RealtimeConfig,
    /// Connection state, shared with the connection task
    state: Arc<RwLock<ConnectionState>>,
    /// Connected flag for fast checks, shared with the connection task
    connected: Arc<AtomicBool>,
    /// Outgoing message channel into the connection task
    ws_sender: Option<mpsc::Sender<ClientEvent>>,
    /// Cancels the connection task
    cancel: Option<CancellationToken>,
    connection_handle: Option<JoinHandle<()>>,
}

impl GeminiLive {
    pub fn new(config: RealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "Gemini API key is required".to_string(),
            ));
        }

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            connected: Arc::new(AtomicBool::new(false)),
            ws_sender: None,
            cancel: None,
            connection_handle: None,
        })
    }

    pub fn model(&self) -> &str {
        if self.config.model.is_empty() {
            GEMINI_DEFAULT_MODEL
        } else {
            &self.config.model
        }
    }

    pub fn voice(&self) -> &str {
        self.config.voice.as_deref().unwrap_or(GEMINI_DEFAULT_VOICE)
    }

    fn handshake_timeout(&self) -> Duration {
        self.config
            .handshake_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(GEMINI_HANDSHAKE_TIMEOUT)
    }

    /// Build the WebSocket URL with the API key parameter.
    fn build_ws_url(&self) -> RealtimeResult<url::Url> {
        let endpoint = self.config.endpoint.as_deref().unwrap_or(GEMINI_LIVE_URL);
        url::Url::parse_with_params(endpoint, &[("key", self.config.api_key.as_str())])
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("Invalid endpoint: {e}")))
    }

    /// Build the session setup message.
    fn build_setup(&self) -> SetupConfig {
        let response_modalities = self
            .config
            .modalities
            .clone()
            .unwrap_or_else(|| vec!["AUDIO".to_string()]);

        SetupConfig {
            model: qualified_model_name(self.model()),
            generation_config: GenerationConfig {
                response_modalities,
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.voice().to_string(),
                        },
                    },
                }),
            },
            system_instruction: Some(Content::text(
                self.config
                    .instructions
                    .as_deref()
                    .unwrap_or(DEFAULT_INTERPRETER_INSTRUCTION),
            )),
            input_audio_transcription: self
                .config
                .input_audio_transcription
                .then(AudioTranscriptionConfig::default),
            output_audio_transcription: self
                .config
                .output_audio_transcription
                .then(AudioTranscriptionConfig::default),
        }
    }

    /// Open the socket, send `setup` and wait for `setupComplete`.
    async fn open_session(&self, url: &url::Url) -> RealtimeResult<GeminiSocket> {
        let (mut ws, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let setup = serde_json::to_string(&ClientEvent::Setup(self.build_setup()))
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        ws.send(Message::Text(setup.into()))
            .await
            .map_err(|e| RealtimeError::WebSocketError(e.to_string()))?;

        while let Some(msg) = ws.next().await {
            let parsed = match msg {
                Ok(Message::Text(text)) => serde_json::from_str::<ServerMessage>(text.as_str()),
                Ok(Message::Binary(data)) => serde_json::from_slice::<ServerMessage>(&data),
                Ok(Message::Ping(data)) => {
                    ws.send(Message::Pong(data))
                        .await
                        .map_err(|e| RealtimeError::WebSocketError(e.to_string()))?;
                    continue;
                }
                Ok(Message::Close(frame)) => {
                    let reason = frame
                        .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                        .unwrap_or_else(|| "no close frame".to_string());
                    return Err(RealtimeError::HandshakeFailed(format!(
                        "closed during setup: {reason}"
                    )));
                }
                Ok(_) => continue,
                Err(e) => return Err(RealtimeError::WebSocketError(e.to_string())),
            };

            match parsed {
                Ok(message) if message.is_setup_complete() => return Ok(ws),
                Ok(_) => debug!("Ignoring Gemini message received before setupComplete"),
                Err(e) => warn!("Failed to parse Gemini setup response: {}", e),
            }
        }

        Err(RealtimeError::HandshakeFailed(
            "connection ended before setupComplete".to_string(),
        ))
    }

    /// Send an event to the connection task.
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()> {
        let sender = self.ws_sender.as_ref().ok_or(RealtimeError::NotConnected)?;
        sender
            .send(event)
            .await
            .map_err(|e| RealtimeError::WebSocketError(e.to_string()))
    }
}

// =============================================================================
// Connection Task
// =============================================================================

/// Owns the socket after setup. Emits exactly one `Closed` event on exit.
///
/// Server events are queued locally and handed to the session as channel
/// capacity frees up, so outgoing audio keeps flowing while the session is
/// busy. Reading from the server pauses once the queue holds a full channel's
/// worth of events.
async fn run_connection(
    mut sink: GeminiSink,
    mut stream: GeminiStream,
    mut outgoing: mpsc::Receiver<ClientEvent>,
    events: mpsc::Sender<RealtimeEvent>,
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    state: Arc<RwLock<ConnectionState>>,
) {
    let mut pending: VecDeque<RealtimeEvent> = VecDeque::new();

    let error = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Gemini connection task cancelled");
                let _ = sink.send(Message::Close(None)).await;
                break None;
            }

            event = outgoing.recv() => {
                let Some(event) = event else {
                    break None;
                };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize Gemini event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    error!("Failed to send Gemini message: {}", e);
                    break Some(RealtimeError::WebSocketError(e.to_string()));
                }
            }

            permit = events.reserve(), if !pending.is_empty() => {
                let Ok(permit) = permit else {
                    debug!("Event receiver dropped, stopping Gemini connection task");
                    break None;
                };
                if let Some(event) = pending.pop_front() {
                    permit.send(event);
                }
            }

            msg = stream.next(), if pending.len() < EVENT_CHANNEL_CAPACITY => {
                let parsed = match msg {
                    Some(Ok(Message::Text(text))) => serde_json::from_str::<ServerMessage>(text.as_str()),
                    Some(Ok(Message::Binary(data))) => serde_json::from_slice::<ServerMessage>(&data),
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            error!("Failed to send pong: {}", e);
                        }
                        continue;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Gemini closed the connection: {:?}", frame);
                        break match frame {
                            Some(f) if f.code != CloseCode::Normal => Some(RealtimeError::ProviderError(
                                format!("closed by server ({}): {}", u16::from(f.code), f.reason),
                            )),
                            _ => None,
                        };
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("Gemini WebSocket error: {}", e);
                        break Some(RealtimeError::WebSocketError(e.to_string()));
                    }
                    None => {
                        break Some(RealtimeError::ConnectionFailed(
                            "stream ended without close frame".to_string(),
                        ));
                    }
                };

                match parsed {
                    Ok(message) => pending.extend(server_message_events(message)),
                    Err(e) => warn!("Failed to parse Gemini message: {}", e),
                }
            }
        }
    };

    // Fail any audio send still waiting on the queue before flushing events
    drop(outgoing);

    connected.store(false, Ordering::SeqCst);
    *state.write() = if error.is_some() {
        ConnectionState::Failed
    } else {
        ConnectionState::Disconnected
    };

    for event in pending.drain(..).chain(std::iter::once(RealtimeEvent::Closed { error })) {
        if events.send(event).await.is_err() {
            break;
        }
    }
    info!("Gemini connection task ended");
}

/// Translate one server message into events, in the order the session
/// expects them: input transcript, output transcript, audio, then turn
/// boundaries.
fn server_message_events(message: ServerMessage) -> Vec<RealtimeEvent> {
    if let Some(go_away) = &message.go_away {
        warn!(time_left = ?go_away.time_left, "Gemini announced goAway");
    }

    let Some(content) = message.server_content else {
        trace!("Gemini message without server content");
        return Vec::new();
    };

    let mut batch = Vec::new();

    if let Some(text) = content.input_transcription.and_then(|t| t.text) {
        batch.push(RealtimeEvent::Transcript(TranscriptResult {
            text,
            role: TranscriptRole::User,
        }));
    }

    if let Some(text) = content.output_transcription.and_then(|t| t.text) {
        batch.push(RealtimeEvent::Transcript(TranscriptResult {
            text,
            role: TranscriptRole::Assistant,
        }));
    }

    for part in content.model_turn.into_iter().flat_map(|turn| turn.parts) {
        let Some(blob) = part.inline_data else {
            continue;
        };
        match BASE64_STANDARD.decode(blob.data.as_bytes()) {
            Ok(audio) => batch.push(RealtimeEvent::Audio(RealtimeAudioData {
                data: Bytes::from(audio),
                sample_rate: GEMINI_OUTPUT_SAMPLE_RATE,
            })),
            Err(e) => error!("Failed to decode Gemini audio: {}", e),
        }
    }

    if content.interrupted {
        batch.push(RealtimeEvent::Interrupted);
    }

    if content.turn_complete {
        batch.push(RealtimeEvent::TurnComplete);
    }

    batch
}

#[async_trait]
impl BaseRealtime for GeminiLive {
    async fn connect(&mut self) -> RealtimeResult<RealtimeEventReceiver> {
        if self.connection_handle.is_some() {
            return Err(RealtimeError::ConnectionFailed(
                "already connected".to_string(),
            ));
        }

        *self.state.write() = ConnectionState::Connecting;
        let url = self.build_ws_url()?;
        let timeout = self.handshake_timeout();

        let ws = match tokio::time::timeout(timeout, self.open_session(&url)).await {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                *self.state.write() = ConnectionState::Failed;
                return Err(e);
            }
            Err(_) => {
                *self.state.write() = ConnectionState::Failed;
                return Err(RealtimeError::Timeout(format!(
                    "no setupComplete within {}ms",
                    timeout.as_millis()
                )));
            }
        };

        info!(model = %self.model(), voice = %self.voice(), "Connected to Gemini Live API");

        let (sink, stream) = ws.split();
        let (tx, rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<RealtimeEvent>(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        self.connected.store(true, Ordering::SeqCst);
        *self.state.write() = ConnectionState::Connected;

        let handle = tokio::spawn(run_connection(
            sink,
            stream,
            rx,
            event_tx,
            cancel.clone(),
            self.connected.clone(),
            self.state.clone(),
        ));

        self.ws_sender = Some(tx);
        self.cancel = Some(cancel);
        self.connection_handle = Some(handle);

        Ok(event_rx)
    }

    async fn disconnect(&mut self) -> RealtimeResult<()> {
        self.ws_sender = None;

        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        if let Some(mut handle) = self.connection_handle.take() {
            if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                warn!("Gemini connection task did not stop in time, aborting");
                handle.abort();
            }
            info!("Disconnected from Gemini Live API");
        }

        self.connected.store(false, Ordering::SeqCst);
        *self.state.write() = ConnectionState::Disconnected;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn get_connection_state(&self) -> ConnectionState {
        *self.state.read()
    }

    async fn send_audio(&mut self, audio_data: Bytes, sample_rate: u32) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }
        self.send_event(ClientEvent::audio(&audio_data, sample_rate))
            .await
    }

    async fn interrupt(&mut self) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }
        self.send_event(ClientEvent::audio_stream_end()).await
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": "gemini",
            "api_type": "WebSocket Live",
            "endpoint": GEMINI_LIVE_URL,
            "model": self.model(),
            "voice": self.voice(),
            "output_sample_rate": GEMINI_OUTPUT_SAMPLE_RATE,
            "features": {
                "bidirectional_audio": true,
                "input_transcription": self.config.input_audio_transcription,
                "output_transcription": self.config.output_audio_transcription
            },
            "documentation": "https://ai.google.dev/gemini-api/docs/live"
        })
    }
}

impl Drop for GeminiLive {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Creates [`GeminiLive`] clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiLiveFactory;

impl RealtimeFactory for GeminiLiveFactory {
    fn create(&self, config: RealtimeConfig) -> RealtimeResult<BoxedRealtime> {
        Ok(Box::new(GeminiLive::new(config)?))
    }
}

// =============================================================================
// Tests
// =============================================================================
