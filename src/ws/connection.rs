//! WebSocket connection state machine.
//!
//! Drives one connection through admission, registration, the active
//! receive/send loop, and cleanup. The socket is accepted before admission
//! runs, so a rejected client gets a proper close frame with a reason
//! rather than a failed handshake.

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::messages::ClientEvent;
use crate::app_state::AppState;
use crate::auth::{ADMISSION_CLOSE_CODE, AdmissionError, Identity};
use crate::domain::ReplySnapshot;
use crate::service::ChatService;

/// Runs the full lifecycle of one chat connection.
///
/// - Admission: the token is resolved once; any rejection closes the
///   socket with a distinguishing reason and the connection is never
///   registered.
/// - Active: a `select!` loop receives client events and drains the
///   connection's outbound broadcast queue.
/// - Cleanup: the handler unregisters exactly once on its own exit path;
///   the call is idempotent against a concurrent broadcast-failure prune.
pub async fn run_connection(socket: WebSocket, token: Option<String>, state: AppState) {
    let mut socket = socket;

    let Some(token) = token else {
        reject(&mut socket, AdmissionError::AuthRequired).await;
        return;
    };
    let identity = match state.identity_resolver.resolve(&token).await {
        Ok(identity) => identity,
        Err(reason) => {
            reject(&mut socket, reason).await;
            return;
        }
    };

    let registry = state.chat_service.broadcaster().registry();
    let (conn_id, mut outbound) = registry.register(&identity.user_id).await;

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Incoming event from the client
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&state.chat_service, &identity, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(connection = %conn_id, error = %err, "receive failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Broadcast payload queued for this connection
            queued = outbound.recv() => {
                match queued {
                    Some(json) => {
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    // Queue closed: a broadcast pass already pruned us
                    None => break,
                }
            }
        }
    }

    registry.unregister(conn_id).await;
    tracing::debug!(connection = %conn_id, user_id = %identity.user_id, "connection closed");
}

/// Decodes one frame and routes it to the service. Undecodable input is
/// logged and dropped; the caller's loop continues either way.
async fn dispatch(service: &ChatService, identity: &Identity, raw: &str) {
    let event = match serde_json::from_str::<ClientEvent>(raw) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(error = %err, "discarding undecodable frame");
            return;
        }
    };

    let result = match event {
        ClientEvent::Message {
            message,
            reply_to_id,
            reply_to_username,
            reply_to_content,
        } => {
            let reply = ReplySnapshot::from_parts(reply_to_id, reply_to_username, reply_to_content);
            service
                .post_message(identity, &message, reply)
                .await
                .map(|_| ())
        }
        ClientEvent::Edit { id, message } => service
            .edit_message(identity, &id, &message)
            .await
            .map(|_| ()),
        ClientEvent::Delete { id } => service.delete_message(identity, &id).await.map(|_| ()),
    };

    // Store failures abort the dispatch; the connection itself stays up.
    if let Err(err) = result {
        tracing::warn!(user_id = %identity.user_id, error = %err, "dispatch failed");
    }
}

/// Closes the socket with the admission rejection reason.
async fn reject(socket: &mut WebSocket, reason: AdmissionError) {
    tracing::info!(reason = reason.close_reason(), "admission rejected");
    let frame = CloseFrame {
        code: ADMISSION_CLOSE_CODE,
        reason: Utf8Bytes::from_static(reason.close_reason()),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}
