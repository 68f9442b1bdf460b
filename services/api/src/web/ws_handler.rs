//! services/api/src/web/ws_handler.rs
//!
//! Entry points and control loops for the two page sessions. Each connection
//! owns a `PageLifetime`; the backdrop timer and the board fetch run against it
//! and stop whenever the loop returns.

use crate::web::{
    board::{load_thoughts, BoardPage},
    introduction::{IntroductionPage, Transition},
    lifecycle::PageLifetime,
    middleware::resolve_session,
    protocol::{BoardMessage, IntroductionMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use futures::{
    stream::{SplitSink, SplitStream, StreamExt},
    SinkExt,
};
use memory_wall_core::backdrop::Backdrop;
use memory_wall_core::board::DisclosureMode;
use memory_wall_core::domain::Principal;
use memory_wall_core::gate::{GateDecision, GateTransition, SessionGate, LOGIN_PATH};
use memory_wall_core::ports::PortError;
use rand::{rngs::StdRng, SeedableRng};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Serializes and sends one message. Returns `false` once the client is gone.
async fn send_message(sender: &WsSender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {:?}", e);
            return false;
        }
    };
    sender.lock().await.send(Message::Text(json.into())).await.is_ok()
}

async fn send_all(sender: &WsSender, messages: &[ServerMessage]) -> bool {
    for message in messages {
        if !send_message(sender, message).await {
            return false;
        }
    }
    true
}

/// One inbound frame, classified.
enum Inbound<T> {
    Message(T),
    Ignored,
    Closed,
}

fn classify<T: DeserializeOwned>(frame: Option<Result<Message, axum::Error>>) -> Inbound<T> {
    match frame {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<T>(text.as_str()) {
            Ok(message) => Inbound::Message(message),
            Err(e) => {
                warn!("Failed to deserialize client message: {:?}", e);
                Inbound::Ignored
            }
        },
        Some(Ok(Message::Close(_))) => {
            info!("Client sent close message.");
            Inbound::Closed
        }
        Some(Ok(_)) => Inbound::Ignored,
        Some(Err(e)) => {
            warn!("WebSocket receive error: {:?}", e);
            Inbound::Closed
        }
        None => {
            info!("Client disconnected.");
            Inbound::Closed
        }
    }
}

//=========================================================================================
// Introduction
//=========================================================================================

/// Upgrades to the introduction page. Requests without an admitted session are
/// redirected to the login page before any page state exists, whether or not
/// they asked for an upgrade.
pub async fn introduction_ws_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let (session, decision) = resolve_session(&app_state, &headers).await;
    let token = match introduction_gate(session, decision) {
        Ok(token) => token,
        Err(redirect) => return redirect.into_response(),
    };
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_introduction(socket, app_state, token)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Admits a session to the introduction page, yielding its token, or names
/// where the visitor is sent instead.
pub fn introduction_gate(
    session: Option<(String, Principal)>,
    decision: GateDecision,
) -> Result<String, Redirect> {
    match (session, decision) {
        (Some((token, _)), decision) if decision.admits() => Ok(token),
        (_, decision) => Err(Redirect::to(redirect_target(decision))),
    }
}

/// The frame to send when the session changes under an open page, if the page
/// has to go.
pub fn on_gate_transition(transition: GateTransition) -> Option<ServerMessage> {
    match transition {
        GateTransition::Changed(denied @ GateDecision::Denied { .. }) => {
            Some(ServerMessage::Redirect {
                to: redirect_target(denied).to_string(),
            })
        }
        GateTransition::Changed(decision) => {
            warn!("Session access changed to {:?}; keeping the page as opened.", decision);
            None
        }
        GateTransition::Resolved(_) | GateTransition::Unchanged(_) => None,
    }
}

fn redirect_target(decision: GateDecision) -> &'static str {
    match decision {
        GateDecision::Denied { redirect } => redirect,
        _ => LOGIN_PATH,
    }
}

async fn handle_introduction(socket: WebSocket, app_state: Arc<AppState>, session_token: String) {
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));
    let lifetime = PageLifetime::new();

    let mut changes = match app_state.identity.on_session_change(&session_token).await {
        Ok(changes) => changes,
        Err(e) => {
            error!("Failed to watch session: {:?}", e);
            send_message(
                &ws_sender,
                &ServerMessage::Error {
                    message: "Failed to load session data.".to_string(),
                },
            )
            .await;
            return;
        }
    };

    // --- 1. Gate ---
    let mut gate = SessionGate::new(app_state.email_policy.clone());
    let current: Option<Principal> = changes.borrow_and_update().clone();
    let decision = gate.observe(current.as_ref()).decision();
    let principal = match current {
        Some(principal) if decision.admits() => principal,
        _ => {
            redirect(&ws_sender, decision).await;
            return;
        }
    };

    // --- 2. Page State and Timers ---
    let mut page = IntroductionPage::open(app_state.clone(), principal, decision).await;
    if !send_all(&ws_sender, &page.opening()).await {
        return;
    }
    lifetime.spawn(rotate_backdrop(
        ws_sender.clone(),
        Backdrop::reunion(),
        app_state.config.backdrop_interval,
    ));

    // --- 3. Main Message Loop ---
    let mut leaving: Option<(&'static str, Duration)> = None;
    loop {
        tokio::select! {
            frame = receiver.next() => {
                let message = match classify::<IntroductionMessage>(frame) {
                    Inbound::Message(message) => message,
                    Inbound::Ignored => continue,
                    Inbound::Closed => break,
                };
                let reply = page.handle(message).await;
                if !send_all(&ws_sender, &reply.messages).await {
                    break;
                }
                if let Transition::Leave { to, after } = reply.transition {
                    leaving = Some((to, after));
                    break;
                }
            }
            changed = changes.changed() => {
                // A closed channel means the session is gone.
                let session = match changed {
                    Ok(()) => changes.borrow_and_update().clone(),
                    Err(_) => None,
                };
                if let Some(leave) = on_gate_transition(gate.observe(session.as_ref())) {
                    info!("Session ended while the introduction was open.");
                    send_message(&ws_sender, &leave).await;
                    break;
                }
            }
        }
    }

    // --- 4. Leave ---
    if let Some((to, after)) = leaving {
        navigate_after(&ws_sender, &mut receiver, to, after).await;
    }
    if let Err(e) = ws_sender.lock().await.close().await {
        warn!("Failed to close WebSocket: {:?}", e);
    }
    lifetime.end();
    info!("Introduction page closed.");
}

async fn redirect(sender: &WsSender, decision: GateDecision) {
    let to = redirect_target(decision).to_string();
    send_message(sender, &ServerMessage::Redirect { to }).await;
}

/// Waits out `after`, then tells the client to navigate. Later client messages
/// are ignored; a disconnect ends the wait.
async fn navigate_after(
    sender: &WsSender,
    receiver: &mut SplitStream<WebSocket>,
    to: &'static str,
    after: Duration,
) {
    let deadline = tokio::time::sleep(after);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                send_message(sender, &ServerMessage::Navigate { to: to.to_string() }).await;
                return;
            }
            frame = receiver.next() => {
                if let Inbound::Closed = classify::<IntroductionMessage>(frame) {
                    return;
                }
            }
        }
    }
}

async fn rotate_backdrop(sender: WsSender, mut backdrop: Backdrop, interval: Duration) {
    let (index, image) = backdrop.current();
    let mut message = ServerMessage::Backdrop {
        index,
        image: image.to_string(),
    };
    loop {
        if !send_message(&sender, &message).await {
            return;
        }
        tokio::time::sleep(interval).await;
        let (index, image) = backdrop.tick();
        message = ServerMessage::Backdrop {
            index,
            image: image.to_string(),
        };
    }
}

//=========================================================================================
// Board
//=========================================================================================

/// Upgrades to the thought board. The board is public.
pub async fn board_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_board(socket, app_state))
}

async fn handle_board(socket: WebSocket, app_state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));
    let lifetime = PageLifetime::new();
    let breakpoint = app_state.config.narrow_breakpoint_px;

    // --- 1. One-shot Fetch ---
    let store = app_state.store.clone();
    let mut fetch = lifetime.spawn(async move { load_thoughts(store.as_ref()).await });
    let mut mode = DisclosureMode::Hover;

    let fetched = loop {
        tokio::select! {
            joined = &mut fetch => break joined,
            frame = receiver.next() => match classify::<BoardMessage>(frame) {
                Inbound::Message(BoardMessage::Viewport { width }) => {
                    mode = DisclosureMode::for_width(width, breakpoint);
                }
                Inbound::Message(_) | Inbound::Ignored => {}
                Inbound::Closed => {
                    info!("Board closed before its thoughts arrived.");
                    return;
                }
            },
        }
    };
    let fetched = match fetched {
        Ok(Some(result)) => result,
        Ok(None) => return,
        Err(e) => Err(PortError::Unexpected(format!("fetch task failed: {}", e))),
    };

    // --- 2. Layout ---
    let (mut page, notice) =
        BoardPage::from_fetch(fetched, mode, breakpoint, &mut StdRng::from_entropy());
    let mut opening = vec![page.layout()];
    opening.extend(notice);
    if !send_all(&ws_sender, &opening).await {
        return;
    }
    info!("Board opened with {} bubbles.", page.board().bubbles().len());

    // --- 3. Disclosure Loop ---
    loop {
        let message = match classify::<BoardMessage>(receiver.next().await) {
            Inbound::Message(message) => message,
            Inbound::Ignored => continue,
            Inbound::Closed => break,
        };
        if !send_all(&ws_sender, &page.handle(message)).await {
            break;
        }
    }

    lifetime.end();
    info!("Board page closed.");
}
