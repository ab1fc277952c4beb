//! WebSocket connection handling
//!
//! One connection drives one session. A reader task turns inbound frames
//! into user turns on a channel; the connection task runs them one at a
//! time, so messages sent mid-run wait their turn. When the client goes
//! away the connection token is cancelled and the in-flight run is dropped.

use crate::audit::AuditTrail;
use crate::events::{fold_into_history, to_wire};
use crate::server::AppState;
use agenthub_agent::{AgentEvent, RunRequest};
use agenthub_core::{ClientMessage, EventFrame, Message, ServerEvent, SessionId, THINKING_TEXT};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const SESSION_NOT_FOUND_MESSAGE: &str = "Session not found. Please create a new session first.";
pub const PROCESSING_MESSAGE: &str = "Processing your request...";

/// User turns allowed to wait behind the running one.
pub const INBOX_CAPACITY: usize = 32;

type WsSink = SplitSink<WebSocket, WsMessage>;

/// The client is gone; nothing more can be sent.
#[derive(Debug)]
struct Disconnected;

pub async fn handle_connection(socket: WebSocket, state: Arc<AppState>, session_id: SessionId) {
    let (mut ws_tx, ws_rx) = socket.split();

    let mut session = match state.store.get(&session_id).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            warn!(session = %session_id, "WebSocket opened for unknown session");
            let _ = send_event(&mut ws_tx, ServerEvent::error(SESSION_NOT_FOUND_MESSAGE, true)).await;
            let _ = ws_tx.send(WsMessage::Close(None)).await;
            return;
        }
        Err(e) => {
            error!(session = %session_id, "Session lookup failed: {}", e);
            let _ = send_event(&mut ws_tx, ServerEvent::error(e.to_string(), true)).await;
            let _ = ws_tx.send(WsMessage::Close(None)).await;
            return;
        }
    };

    info!(session = %session_id, "Client connected");

    let cancel = CancellationToken::new();
    let (inbox_tx, mut inbox_rx) = mpsc::channel::<String>(INBOX_CAPACITY);

    if let Some(prompt) = session.initial_prompt.take() {
        if let Err(e) = state.store.put(session).await {
            warn!(session = %session_id, "Could not clear initial prompt: {}", e);
        }
        let _ = inbox_tx.try_send(prompt);
    }

    let reader = tokio::spawn(read_frames(ws_rx, inbox_tx, cancel.clone()));

    loop {
        let text = tokio::select! {
            _ = cancel.cancelled() => break,
            next = inbox_rx.recv() => match next {
                Some(text) => text,
                None => break,
            },
        };
        if run_turn(&state, &session_id, text, &mut ws_tx, &cancel).await.is_err() {
            break;
        }
    }

    cancel.cancel();
    reader.abort();
    info!(session = %session_id, "Client disconnected");
}

/// Forward user turns until the socket closes, then cancel.
async fn read_frames(
    mut ws_rx: SplitStream<WebSocket>,
    inbox: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(WsMessage::Text(raw)) => match serde_json::from_str::<ClientMessage>(&raw) {
                Ok(msg) => match msg.text() {
                    Some(text) => {
                        if !enqueue(&inbox, text.to_string()) {
                            break;
                        }
                    }
                    None => debug!("Ignoring blank message"),
                },
                Err(e) => warn!("Unparseable client frame: {}", e),
            },
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        }
    }
    cancel.cancel();
}

/// Queue a user turn. A full inbox drops the turn; `false` means the
/// connection task is gone.
fn enqueue(inbox: &mpsc::Sender<String>, text: String) -> bool {
    match inbox.try_send(text) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("Inbox full ({} turns waiting), dropping message", INBOX_CAPACITY);
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Run one user turn to completion and store what it leaves behind.
async fn run_turn(
    state: &AppState,
    session_id: &SessionId,
    user_message: String,
    ws_tx: &mut WsSink,
    cancel: &CancellationToken,
) -> Result<(), Disconnected> {
    let mut session = match state.store.get(session_id).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            send_event(ws_tx, ServerEvent::error(SESSION_NOT_FOUND_MESSAGE, true)).await?;
            return Err(Disconnected);
        }
        Err(e) => {
            error!(session = %session_id, "Session lookup failed: {}", e);
            let fatal = e.is_fatal();
            send_event(ws_tx, ServerEvent::error(format!("Agent loop error: {}", e), fatal)).await?;
            return if fatal { Err(Disconnected) } else { Ok(()) };
        }
    };

    let mut trail = AuditTrail::new();
    trail.record_user(user_message.clone());
    for event in [
        AgentEvent::Thinking(THINKING_TEXT.to_string()),
        AgentEvent::Status(PROCESSING_MESSAGE.to_string()),
    ] {
        trail.record(&event);
        send_event(ws_tx, to_wire(&event)).await?;
    }

    let request = RunRequest::new(user_message.clone(), session.workspace.clone())
        .with_history(session.history.clone())
        .with_agent_type(session.agent_type)
        .with_usage(session.usage);
    let mut turn = vec![Message::user(user_message)];
    let mut usage = session.usage;
    let mut events = state.agent.run(request);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(session = %session_id, "Run cancelled by disconnect");
                return Err(Disconnected);
            }
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                if let AgentEvent::TokenUsage(totals) = &event {
                    usage = *totals;
                }
                if event.is_terminal() {
                    debug!(session = %session_id, "Run finished");
                }
                fold_into_history(&event, &mut turn);
                trail.record(&event);
                send_event(ws_tx, to_wire(&event)).await?;
            }
            Some(Err(e)) => {
                warn!(session = %session_id, "Agent loop error: {}", e);
                let message = format!("Agent loop error: {}", e);
                trail.record_error(message.clone());
                send_event(ws_tx, ServerEvent::error(message, false)).await?;
                break;
            }
            None => break,
        }
    }

    session.record_run(turn, usage, trail);
    if let Err(e) = state.store.put(session).await {
        error!(session = %session_id, "Failed to save session: {}", e);
    }
    Ok(())
}

async fn send_event(ws_tx: &mut WsSink, event: ServerEvent) -> Result<(), Disconnected> {
    let json = match EventFrame::now(event).to_json() {
        Ok(j) => j,
        Err(e) => {
            error!("Failed to encode event: {}", e);
            return Ok(());
        }
    };
    ws_tx.send(WsMessage::Text(json)).await.map_err(|_| Disconnected)
}
