//! Per-connection session state machine.
//!
//! ```text
//! UNINITIALIZED --init--> CONNECTING --setup ok--> ACTIVE --close/fatal--> TERMINATED
//!                              \--setup failed----------------------------/
//! ```
//!
//! The broker owns everything that belongs to one client: the VAD, the turn
//! accumulator, the upstream provider and its event stream. All output goes
//! through a single ordered channel to the connection writer.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::error::SessionError;
use super::events::{SessionEvent, SessionFlow, SessionOutput, SpeechState, TranscriptSource};
use crate::core::realtime::{
    BoxedRealtime, RealtimeConfig, RealtimeEvent, RealtimeEventReceiver, RealtimeFactory,
    TranscriptRole,
};
use crate::core::turn::TurnAccumulator;
use crate::core::vad::{EnergyVAD, VADConfig};

/// Lowest client sample rate accepted at init
pub const MIN_SAMPLE_RATE: u32 = 8000;
/// Highest client sample rate accepted at init
pub const MAX_SAMPLE_RATE: u32 = 48000;
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Minimum gap between a completed turn and the next forwarded speech
pub const TURN_COOLDOWN: Duration = Duration::from_millis(100);

/// Language value meaning "detect automatically"
pub const AUTO_LANGUAGE: &str = "auto";

// =============================================================================
// Configuration
// =============================================================================

/// Parameters negotiated by the client's `init` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// `"auto"` or a fixed language tag for the user's speech
    pub language: String,
    /// Client preference for an alternate transcription engine. Recorded only.
    #[serde(alias = "useWhisper")]
    pub use_alternate_transcription: bool,
    /// Sample rate of the PCM frames the client will send
    pub sample_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: AUTO_LANGUAGE.to_string(),
            use_alternate_transcription: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(SessionError::InvalidConfig(format!(
                "sampleRate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE}, got {}",
                self.sample_rate
            )));
        }
        if self.language.trim().is_empty() {
            return Err(SessionError::InvalidConfig(
                "language must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured language unless it is `"auto"`.
    pub fn fixed_language(&self) -> Option<&str> {
        if self.language.eq_ignore_ascii_case(AUTO_LANGUAGE) {
            None
        } else {
            Some(&self.language)
        }
    }
}

/// Server-side settings shared by every session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Template for the upstream provider configuration
    pub realtime: RealtimeConfig,
    pub vad: VADConfig,
    pub turn_cooldown: Duration,
}

impl SessionSettings {
    pub fn new(realtime: RealtimeConfig, vad: VADConfig) -> Self {
        Self {
            realtime,
            vad,
            turn_cooldown: TURN_COOLDOWN,
        }
    }
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Connecting,
    Active,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Active => write!(f, "active"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

// =============================================================================
// Broker
// =============================================================================

pub struct SessionBroker {
    factory: Arc<dyn RealtimeFactory>,
    settings: SessionSettings,
    output: mpsc::Sender<SessionOutput>,

    state: SessionState,
    session_id: Option<String>,
    config: SessionConfig,

    upstream: Option<BoxedRealtime>,
    upstream_events: Option<RealtimeEventReceiver>,

    vad: EnergyVAD,
    turn: TurnAccumulator,
    last_speech_state: Option<SpeechState>,
    turn_completed_at: Option<Instant>,
    failure: Option<SessionError>,
}

impl SessionBroker {
    pub fn new(
        factory: Arc<dyn RealtimeFactory>,
        settings: SessionSettings,
        output: mpsc::Sender<SessionOutput>,
    ) -> Self {
        let vad = EnergyVAD::new(settings.vad);
        Self {
            factory,
            settings,
            output,
            state: SessionState::Uninitialized,
            session_id: None,
            config: SessionConfig::default(),
            upstream: None,
            upstream_events: None,
            vad,
            turn: TurnAccumulator::new(),
            last_speech_state: None,
            turn_completed_at: None,
            failure: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The fatal error that ended the session, if any.
    pub fn failure(&self) -> Option<&SessionError> {
        self.failure.as_ref()
    }

    /// Negotiate the session and open the upstream connection.
    pub async fn on_init(&mut self, config: SessionConfig) -> SessionFlow {
        if self.state != SessionState::Uninitialized {
            return self.report(SessionError::AlreadyInitialized).await;
        }
        if let Err(e) = config.validate() {
            return self.report(e).await;
        }

        self.state = SessionState::Connecting;
        info!(
            language = %config.language,
            sample_rate = config.sample_rate,
            alternate_transcription = config.use_alternate_transcription,
            "Initializing session"
        );

        let mut upstream = match self.factory.create(self.settings.realtime.clone()) {
            Ok(upstream) => upstream,
            Err(e) => return self.report(SessionError::UpstreamHandshake(e.to_string())).await,
        };

        let events = match upstream.connect().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Upstream handshake failed: {}", e);
                return self.report(SessionError::UpstreamHandshake(e.to_string())).await;
            }
        };

        let session_id = Uuid::new_v4().to_string();
        info!(session_id = %session_id, "Session active");

        self.upstream = Some(upstream);
        self.upstream_events = Some(events);
        self.session_id = Some(session_id.clone());
        self.config = config;
        self.state = SessionState::Active;

        self.emit(SessionEvent::Connected { session_id }).await;
        SessionFlow::Continue
    }

    /// Gate one PCM frame through the VAD and forward it upstream.
    pub async fn on_audio_frame(&mut self, pcm: Bytes) -> SessionFlow {
        match self.state {
            SessionState::Uninitialized => return self.report(SessionError::NotReady).await,
            SessionState::Connecting | SessionState::Terminated => {
                trace!(state = %self.state, "Dropping audio frame");
                return SessionFlow::Continue;
            }
            SessionState::Active => {}
        }

        let decision = self.vad.process_frame(&pcm);

        if decision.forward {
            if decision.energy >= self.settings.vad.threshold
                && let Some(completed_at) = self.turn_completed_at.take()
            {
                let elapsed = completed_at.elapsed();
                if elapsed < self.settings.turn_cooldown {
                    tokio::time::sleep(self.settings.turn_cooldown - elapsed).await;
                }
                info!(
                    session_id = ?self.session_id,
                    since_turn_ms = completed_at.elapsed().as_millis() as u64,
                    energy = decision.energy,
                    "New turn started"
                );
            }

            let sample_rate = self.config.sample_rate;
            if let Some(upstream) = self.upstream.as_mut()
                && let Err(e) = upstream.send_audio(pcm, sample_rate).await
            {
                return self.report(SessionError::UpstreamStream(e.to_string())).await;
            }
        }

        let speech_state = if decision.forward {
            SpeechState::Speaking
        } else {
            SpeechState::Silent
        };
        if self.last_speech_state != Some(speech_state) {
            self.last_speech_state = Some(speech_state);
            self.emit(SessionEvent::speech_state(speech_state)).await;
        }

        SessionFlow::Continue
    }

    /// Ask the upstream to abandon in-flight generation.
    pub async fn on_interrupt(&mut self) -> SessionFlow {
        match self.state {
            SessionState::Uninitialized => return self.report(SessionError::NotReady).await,
            SessionState::Active => {}
            _ => return SessionFlow::Continue,
        }

        debug!(session_id = ?self.session_id, "Interrupt requested");
        if let Some(upstream) = self.upstream.as_mut()
            && let Err(e) = upstream.interrupt().await
        {
            return self.report(SessionError::UpstreamStream(e.to_string())).await;
        }
        SessionFlow::Continue
    }

    /// Client asked to end the session.
    pub async fn on_close(&mut self) -> SessionFlow {
        info!(session_id = ?self.session_id, "Session close requested");
        self.teardown().await;
        SessionFlow::Close
    }

    /// Wait for the next upstream event. Pends forever while no upstream is attached.
    pub async fn next_upstream_event(&mut self) -> RealtimeEvent {
        let Some(events) = self.upstream_events.as_mut() else {
            return std::future::pending().await;
        };
        match events.recv().await {
            Some(event) => event,
            None => {
                self.upstream_events = None;
                RealtimeEvent::Closed {
                    error: Some(crate::core::realtime::RealtimeError::ConnectionFailed(
                        "upstream event stream ended".to_string(),
                    )),
                }
            }
        }
    }

    /// Apply one upstream event to the turn state and relay it to the client.
    pub async fn on_upstream_event(&mut self, event: RealtimeEvent) -> SessionFlow {
        if self.state != SessionState::Active {
            trace!(state = %self.state, "Ignoring upstream event");
            return SessionFlow::Continue;
        }

        match event {
            RealtimeEvent::Transcript(transcript) => {
                let (text, source) = match transcript.role {
                    TranscriptRole::User => (
                        self.turn.append_input(&transcript.text),
                        TranscriptSource::Input,
                    ),
                    TranscriptRole::Assistant => (
                        self.turn.append_output(&transcript.text),
                        TranscriptSource::Output,
                    ),
                };
                if let Some(text) = text.map(str::to_string) {
                    self.emit(SessionEvent::Transcription {
                        text,
                        is_final: false,
                        language: None,
                        source,
                    })
                    .await;
                }
            }
            RealtimeEvent::Audio(audio) => {
                self.emit(SessionEvent::AudioResponse {
                    data: audio.data,
                    sample_rate: audio.sample_rate,
                })
                .await;
            }
            RealtimeEvent::TurnComplete => self.complete_turn().await,
            RealtimeEvent::Interrupted => {
                debug!(session_id = ?self.session_id, "Upstream generation interrupted");
            }
            RealtimeEvent::Closed { error } => {
                let reason = error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "upstream closed the session".to_string());
                self.upstream_events = None;
                return self.report(SessionError::UpstreamStream(reason)).await;
            }
        }

        SessionFlow::Continue
    }

    /// Emit an error event. Fatal errors also tear the session down.
    pub async fn report(&mut self, err: SessionError) -> SessionFlow {
        if err.is_fatal() {
            warn!(session_id = ?self.session_id, code = err.code(), "Session failed: {}", err);
        } else {
            debug!(session_id = ?self.session_id, code = err.code(), "Rejected client message: {}", err);
        }

        self.emit(SessionEvent::from(&err)).await;

        if err.is_fatal() {
            self.failure.get_or_insert(err);
            self.teardown().await;
            SessionFlow::Close
        } else {
            SessionFlow::Continue
        }
    }

    /// Release the upstream connection. Safe to call more than once.
    pub async fn teardown(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.state = SessionState::Terminated;
        self.upstream_events = None;
        self.turn.reset();

        if let Some(mut upstream) = self.upstream.take()
            && let Err(e) = upstream.disconnect().await
        {
            warn!("Failed to disconnect upstream: {}", e);
        }

        info!(session_id = ?self.session_id, "Session terminated");
    }

    async fn complete_turn(&mut self) {
        let language = self.config.fixed_language().map(str::to_string);
        let turn = self.turn.complete();

        info!(
            session_id = ?self.session_id,
            input = %turn.input,
            output = %turn.output,
            "Turn complete"
        );

        self.emit(SessionEvent::Transcription {
            text: turn.input.clone(),
            is_final: true,
            language,
            source: TranscriptSource::Input,
        })
        .await;
        self.emit(SessionEvent::Transcription {
            text: turn.output.clone(),
            is_final: true,
            language: None,
            source: TranscriptSource::Output,
        })
        .await;
        self.emit(SessionEvent::TurnComplete {
            input_text: turn.input,
            output_text: turn.output,
        })
        .await;

        self.turn_completed_at = Some(Instant::now());
    }

    async fn emit(&self, event: SessionEvent) {
        if self.output.send(SessionOutput::Event(event)).await.is_err() {
            debug!(session_id = ?self.session_id, "Connection writer gone, dropping event");
        }
    }
}
