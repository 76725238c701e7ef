//! WebSocket mock of the Gemini Live endpoint
//!
//! Accepts connections on an ephemeral port, answers `setup` according to the
//! configured [`SetupBehavior`], records every client message, and lets the
//! test push server messages or close the socket.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

/// How the mock answers the client's `setup` message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupBehavior {
    /// Reply with `setupComplete`
    Complete,
    /// Close with a policy violation, as for a bad API key
    Reject,
    /// Never answer
    Ignore,
}

/// Server-side action pushed by the test
#[derive(Debug)]
pub enum MockAction {
    Send(Value),
    SendBinary(Value),
    Close(u16, String),
    /// Drop the TCP connection without a close frame
    Drop,
}

pub struct GeminiMockServer {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
    request_uri: Arc<Mutex<Option<String>>>,
    actions: mpsc::UnboundedSender<MockAction>,
}

impl GeminiMockServer {
    /// Start a server that handles a single connection.
    pub async fn start(behavior: SetupBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");

        let received = Arc::new(Mutex::new(Vec::new()));
        let request_uri = Arc::new(Mutex::new(None));
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();

        let received_task = received.clone();
        let uri_task = request_uri.clone();
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                handle_connection(stream, behavior, received_task, uri_task, actions_rx).await;
            }
        });

        Self {
            url: format!("ws://{addr}/live"),
            received,
            request_uri,
            actions: actions_tx,
        }
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    pub fn request_uri(&self) -> Option<String> {
        self.request_uri.lock().clone()
    }

    pub fn send(&self, message: Value) {
        let _ = self.actions.send(MockAction::Send(message));
    }

    pub fn act(&self, action: MockAction) {
        let _ = self.actions.send(action);
    }

    /// Wait until at least `count` client messages have arrived.
    pub async fn wait_for_messages(&self, count: usize) -> Vec<Value> {
        for _ in 0..200 {
            let messages = self.received();
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} messages, got {}: {:?}",
            self.received().len(),
            self.received()
        );
    }
}

async fn handle_connection(
    stream: TcpStream,
    behavior: SetupBehavior,
    received: Arc<Mutex<Vec<Value>>>,
    request_uri: Arc<Mutex<Option<String>>>,
    mut actions: mpsc::UnboundedReceiver<MockAction>,
) {
    let callback = |request: &Request, response: Response| {
        *request_uri.lock() = Some(request.uri().to_string());
        Ok::<Response, ErrorResponse>(response)
    };
    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let is_setup = value.get("setup").is_some();
                    received.lock().push(value);

                    if is_setup {
                        match behavior {
                            SetupBehavior::Complete => {
                                let reply = json!({ "setupComplete": {} }).to_string();
                                if write.send(Message::Text(reply.into())).await.is_err() {
                                    return;
                                }
                            }
                            SetupBehavior::Reject => {
                                let frame = CloseFrame {
                                    code: CloseCode::Policy,
                                    reason: "API key not valid".into(),
                                };
                                let _ = write.send(Message::Close(Some(frame))).await;
                                return;
                            }
                            SetupBehavior::Ignore => {}
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => {}
            },
            action = actions.recv() => match action {
                Some(MockAction::Send(value)) => {
                    if write.send(Message::Text(value.to_string().into())).await.is_err() {
                        return;
                    }
                }
                Some(MockAction::SendBinary(value)) => {
                    let data = value.to_string().into_bytes();
                    if write.send(Message::Binary(data.into())).await.is_err() {
                        return;
                    }
                }
                Some(MockAction::Close(code, reason)) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    // Wait for the client's close reply
                    let _ = tokio::time::timeout(Duration::from_secs(1), read.next()).await;
                    return;
                }
                Some(MockAction::Drop) | None => return,
            },
        }
    }
}

/// `serverContent` message carrying an input transcription chunk
pub fn input_transcription(text: &str) -> Value {
    json!({ "serverContent": { "inputTranscription": { "text": text } } })
}

/// `serverContent` message carrying an output transcription chunk
pub fn output_transcription(text: &str) -> Value {
    json!({ "serverContent": { "outputTranscription": { "text": text } } })
}

/// `serverContent` message with one inline audio part
pub fn model_audio(base64_pcm: &str) -> Value {
    json!({
        "serverContent": {
            "modelTurn": {
                "parts": [
                    { "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": base64_pcm } }
                ]
            }
        }
    })
}

pub fn turn_complete() -> Value {
    json!({ "serverContent": { "turnComplete": true } })
}
