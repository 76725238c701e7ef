//! In-process realtime provider for session tests

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use voice_relay::core::realtime::{
    BaseRealtime, BoxedRealtime, ConnectionState, RealtimeAudioData, RealtimeConfig,
    RealtimeError, RealtimeEvent, RealtimeEventReceiver, RealtimeFactory, RealtimeResult,
    TranscriptResult, TranscriptRole,
};

/// Shared view of every provider the factory created
#[derive(Default)]
pub struct MockControl {
    frames: Mutex<Vec<(Bytes, u32)>>,
    events: Mutex<Option<mpsc::Sender<RealtimeEvent>>>,
    configs: Mutex<Vec<RealtimeConfig>>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub interrupts: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_send: AtomicBool,
    connect_delay: Mutex<Option<Duration>>,
}

impl MockControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = Some(delay);
    }

    pub fn frames(&self) -> Vec<(Bytes, u32)> {
        self.frames.lock().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn configs(&self) -> Vec<RealtimeConfig> {
        self.configs.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn interrupt_count(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    /// Push an event as if the upstream had produced it.
    pub async fn emit(&self, event: RealtimeEvent) {
        let sender = self
            .events
            .lock()
            .clone()
            .expect("mock upstream is not connected");
        sender.send(event).await.expect("session dropped the event stream");
    }

    pub async fn emit_input(&self, text: &str) {
        self.emit(RealtimeEvent::Transcript(TranscriptResult {
            text: text.to_string(),
            role: TranscriptRole::User,
        }))
        .await;
    }

    pub async fn emit_output(&self, text: &str) {
        self.emit(RealtimeEvent::Transcript(TranscriptResult {
            text: text.to_string(),
            role: TranscriptRole::Assistant,
        }))
        .await;
    }

    pub async fn emit_audio(&self, data: &'static [u8]) {
        self.emit(RealtimeEvent::Audio(RealtimeAudioData {
            data: Bytes::from_static(data),
            sample_rate: 24000,
        }))
        .await;
    }

    /// Drop the event sender, as a crashed receive task would.
    pub fn drop_stream(&self) {
        self.events.lock().take();
    }
}

pub struct MockRealtime {
    control: Arc<MockControl>,
    state: ConnectionState,
}

#[async_trait]
impl BaseRealtime for MockRealtime {
    async fn connect(&mut self) -> RealtimeResult<RealtimeEventReceiver> {
        self.control.connects.fetch_add(1, Ordering::SeqCst);
        self.state = ConnectionState::Connecting;

        let delay = *self.control.connect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.control.fail_connect.load(Ordering::SeqCst) {
            self.state = ConnectionState::Failed;
            return Err(RealtimeError::HandshakeFailed(
                "mock setup rejected".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        *self.control.events.lock() = Some(tx);
        self.state = ConnectionState::Connected;
        Ok(rx)
    }

    async fn disconnect(&mut self) -> RealtimeResult<()> {
        self.control.disconnects.fetch_add(1, Ordering::SeqCst);
        self.control.events.lock().take();
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn get_connection_state(&self) -> ConnectionState {
        self.state
    }

    async fn send_audio(&mut self, audio_data: Bytes, sample_rate: u32) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }
        if self.control.fail_send.load(Ordering::SeqCst) {
            return Err(RealtimeError::WebSocketError("mock send failure".to_string()));
        }
        self.control.frames.lock().push((audio_data, sample_rate));
        Ok(())
    }

    async fn interrupt(&mut self) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }
        self.control.interrupts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_provider_info(&self) -> serde_json::Value {
        json!({ "provider": "mock" })
    }
}

pub struct MockRealtimeFactory {
    pub control: Arc<MockControl>,
}

impl MockRealtimeFactory {
    pub fn new() -> (Arc<Self>, Arc<MockControl>) {
        let control = MockControl::new();
        (
            Arc::new(Self {
                control: control.clone(),
            }),
            control,
        )
    }
}

impl RealtimeFactory for MockRealtimeFactory {
    fn create(&self, config: RealtimeConfig) -> RealtimeResult<BoxedRealtime> {
        self.control.configs.lock().push(config);
        Ok(Box::new(MockRealtime {
            control: self.control.clone(),
            state: ConnectionState::Disconnected,
        }))
    }
}
