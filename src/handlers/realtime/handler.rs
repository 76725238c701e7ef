//! Session WebSocket handler
//!
//! Drives one [`SessionBroker`] per connection. Client frames and upstream
//! events are multiplexed in a single loop; everything the broker emits goes
//! through one channel to a dedicated writer task, so the client sees events
//! in exactly the order they were produced.

use axum::{
    Extension,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::{select, time::Duration};
use tracing::{debug, error, info, trace, warn};

use crate::auth::Auth;
use crate::core::session::{
    SessionBroker, SessionConfig, SessionError, SessionEvent, SessionFlow, SessionOutput,
};
use crate::state::AppState;

use super::messages::{RealtimeIncomingMessage, RealtimeOutgoingMessage, decode_audio};

/// Optimized channel buffer size for audio workloads
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How long the writer may take to flush pending events after the session ends
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Session WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket for a speech interpretation session.
///
/// # Arguments
/// * `ws` - The WebSocket upgrade request from Axum
/// * `state` - Application state containing configuration and the upstream factory
/// * `auth` - Auth context from middleware
///
/// # Returns
/// * `Response` - HTTP response that upgrades the connection to WebSocket
pub async fn realtime_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
) -> Response {
    info!(auth = %auth, "Session WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_realtime_socket(socket, state, auth))
}

/// Handle the session WebSocket connection
async fn handle_realtime_socket(socket: WebSocket, app_state: Arc<AppState>, mut auth: Auth) {
    info!(auth = %auth, "Session WebSocket connection established");

    let (sender, mut receiver) = socket.split();
    let (output_tx, output_rx) = mpsc::channel::<SessionOutput>(CHANNEL_BUFFER_SIZE);
    let mut sender_task = tokio::spawn(run_sender(sender, output_rx));

    let mut broker = SessionBroker::new(
        app_state.realtime_factory.clone(),
        app_state.session_settings.clone(),
        output_tx.clone(),
    );

    if let Auth::Rejected(reason) = &auth {
        warn!(reason = %reason, "Rejecting session WebSocket connection");
        broker
            .report(SessionError::Authorization(reason.clone()))
            .await;
    } else {
        loop {
            let flow = select! {
                msg_result = receiver.next() => match msg_result {
                    Some(Ok(msg)) => {
                        process_client_message(
                            msg,
                            &mut broker,
                            &mut receiver,
                            &mut auth,
                            &app_state,
                            &output_tx,
                        ).await
                    }
                    Some(Err(e)) => {
                        warn!("Session WebSocket error: {}", e);
                        SessionFlow::Close
                    }
                    None => {
                        info!("Session WebSocket connection closed by client");
                        SessionFlow::Close
                    }
                },
                event = broker.next_upstream_event() => broker.on_upstream_event(event).await,
            };

            if flow.should_close() {
                break;
            }
        }
    }

    // Cleanup
    broker.teardown().await;

    let (code, reason) = close_frame_for(broker.failure());
    let _ = output_tx.send(SessionOutput::Close { code, reason }).await;
    drop(broker);
    drop(output_tx);

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut sender_task)
        .await
        .is_err()
    {
        warn!("Session WebSocket writer did not finish in time, aborting");
        sender_task.abort();
    }

    info!("Session WebSocket connection terminated");
}

/// Drain session output into the socket until a close request or a send failure.
async fn run_sender(
    mut sender: SplitSink<WebSocket, Message>,
    mut outputs: mpsc::Receiver<SessionOutput>,
) {
    while let Some(output) = outputs.recv().await {
        let result = match output {
            SessionOutput::Event(event) => {
                let message = RealtimeOutgoingMessage::from(event);
                match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                }
            }
            SessionOutput::Close { code, reason } => {
                debug!(code, reason = %reason, "Closing session WebSocket connection");
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                if let Err(e) = sender.send(Message::Close(Some(frame))).await {
                    debug!("Failed to send close frame: {}", e);
                }
                break;
            }
        };

        if let Err(e) = result {
            debug!("Failed to send WebSocket message: {}", e);
            break;
        }
    }
}

/// Route one client frame to the broker.
async fn process_client_message(
    msg: Message,
    broker: &mut SessionBroker,
    receiver: &mut SplitStream<WebSocket>,
    auth: &mut Auth,
    app_state: &AppState,
    output: &mpsc::Sender<SessionOutput>,
) -> SessionFlow {
    match msg {
        Message::Text(text) => {
            let incoming = match parse_client_message(text.as_str()) {
                Ok(incoming) => incoming,
                Err(e) => return broker.report(e).await,
            };
            trace!(kind = incoming.kind(), "Received client message");

            match incoming {
                RealtimeIncomingMessage::Init { config, token } => {
                    if let Err(e) = authorize(auth, token.as_deref(), app_state) {
                        return broker.report(e).await;
                    }
                    run_init(broker, config, receiver, output).await
                }
                RealtimeIncomingMessage::Audio { data, .. } => match decode_audio(&data) {
                    Ok(pcm) => broker.on_audio_frame(pcm).await,
                    Err(e) => broker.report(SessionError::Protocol(e.to_string())).await,
                },
                RealtimeIncomingMessage::Interrupt => broker.on_interrupt().await,
                RealtimeIncomingMessage::Close => broker.on_close().await,
            }
        }
        Message::Binary(_) => {
            broker
                .report(SessionError::Protocol(
                    "binary frames are not supported, send audio messages".to_string(),
                ))
                .await
        }
        Message::Close(frame) => {
            info!(frame = ?frame, "Client sent close frame");
            SessionFlow::Close
        }
        // Pings are answered by axum
        Message::Ping(_) | Message::Pong(_) => SessionFlow::Continue,
    }
}

/// Run `init` while still listening to the client.
///
/// A `close` (or a dropped socket) during the upstream handshake abandons the
/// handshake. A second `init` is rejected; audio and interrupts are dropped.
async fn run_init(
    broker: &mut SessionBroker,
    config: SessionConfig,
    receiver: &mut SplitStream<WebSocket>,
    output: &mpsc::Sender<SessionOutput>,
) -> SessionFlow {
    let init = broker.on_init(config);
    tokio::pin!(init);

    loop {
        select! {
            flow = &mut init => return flow,
            msg_result = receiver.next() => match msg_result {
                Some(Ok(Message::Text(text))) => match parse_client_message(text.as_str()) {
                    Ok(RealtimeIncomingMessage::Close) => {
                        info!("Session closed while connecting upstream");
                        return SessionFlow::Close;
                    }
                    Ok(RealtimeIncomingMessage::Init { .. }) => {
                        send_error(output, SessionError::AlreadyInitialized).await;
                    }
                    Ok(other) => {
                        trace!(kind = other.kind(), "Dropping client message while connecting");
                    }
                    Err(e) => send_error(output, e).await,
                },
                Some(Ok(Message::Binary(_))) => {
                    send_error(
                        output,
                        SessionError::Protocol(
                            "binary frames are not supported, send audio messages".to_string(),
                        ),
                    )
                    .await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client disconnected while connecting upstream");
                    return SessionFlow::Close;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Session WebSocket error while connecting: {}", e);
                    return SessionFlow::Close;
                }
            },
        }
    }
}

fn parse_client_message(text: &str) -> Result<RealtimeIncomingMessage, SessionError> {
    let message: RealtimeIncomingMessage =
        serde_json::from_str(text).map_err(|e| SessionError::Protocol(e.to_string()))?;
    message
        .validate_size()
        .map_err(|e| SessionError::Protocol(e.to_string()))?;
    Ok(message)
}

/// Resolve a deferred credential carried by `init`.
fn authorize(auth: &mut Auth, token: Option<&str>, app_state: &AppState) -> Result<(), SessionError> {
    match auth {
        Auth::Disabled | Auth::Verified(_) => Ok(()),
        Auth::Rejected(reason) => Err(SessionError::Authorization(reason.clone())),
        Auth::Pending => {
            let token = token.ok_or_else(|| {
                SessionError::Authorization("missing credential".to_string())
            })?;
            let service = app_state.auth.as_ref().ok_or_else(|| {
                SessionError::Authorization("authentication is not configured".to_string())
            })?;
            let principal = service
                .verify(token)
                .map_err(|e| SessionError::Authorization(e.to_string()))?;
            info!(email = %principal.email, "First-message authentication successful");
            *auth = Auth::Verified(principal);
            Ok(())
        }
    }
}

/// Errors raised outside the broker (while it is busy connecting).
async fn send_error(output: &mpsc::Sender<SessionOutput>, err: SessionError) {
    debug!(code = err.code(), "Rejected client message: {}", err);
    let _ = output
        .send(SessionOutput::Event(SessionEvent::from(&err)))
        .await;
}

fn close_frame_for(failure: Option<&SessionError>) -> (u16, String) {
    match failure {
        Some(SessionError::Authorization(_)) => (close_code::POLICY, "unauthorized".to_string()),
        Some(err) => (close_code::ERROR, err.code().to_string()),
        None => (close_code::NORMAL, "session closed".to_string()),
    }
}
