pub mod realtime;
pub mod session;
pub mod turn;
pub mod vad;

// Re-export commonly used types for convenience
pub use realtime::{
    BaseRealtime, BoxedRealtime, GeminiLive, GeminiLiveFactory, RealtimeConfig, RealtimeError,
    RealtimeEvent, RealtimeFactory, RealtimeResult,
};

pub use session::{
    SessionBroker, SessionConfig, SessionError, SessionEvent, SessionFlow, SessionOutput,
    SessionSettings, SessionState, SpeechState, TranscriptSource,
};

pub use turn::{CompletedTurn, TurnAccumulator};

pub use vad::{EnergyVAD, VADConfig, VADDecision};
