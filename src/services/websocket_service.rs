//! Player WebSocket lifecycle and realtime command routing.
//!
//! Connections follow the identification-first protocol: the first text
//! frame must be an `identify` message binding the socket to a user and
//! room. A dedicated writer task owns the sink so room broadcasts keep
//! flowing while an inbound frame is being processed. Every accepted or
//! rejected command is answered with exactly one ack or error event on
//! the issuing connection.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dto::events::{
    AnswerAcceptedEvent, ErrorEvent, GameStartedEvent, PresenceChangedEvent, VoteAcceptedEvent,
};
use crate::dto::ws::ClientMessage;
use crate::error::ServiceError;
use crate::services::{broadcast, round_service, sync_service};
use crate::state::{PlayerConnection, SharedState};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle for one player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let (user_id, room_id) = match ClientMessage::from_json_str(&initial_message) {
        Ok(ClientMessage::Identify { user_id, room_id }) => (user_id, room_id),
        Ok(other) => {
            warn!(action = other.action(), "first message was not identification");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to parse identification message");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    // Membership lives with the room collaborator; verify it when storage
    // is reachable and wave the connection through when it is not.
    if let Some(store) = state.store().await {
        match store.find_room(room_id).await {
            Ok(Some(room)) => {
                if !room.members.contains(&user_id) {
                    warn!(%user_id, %room_id, "connection refused: not a room member");
                    let _ = outbound_tx.send(Message::Close(None));
                    finalize(writer_task, outbound_tx).await;
                    return;
                }
            }
            Ok(None) => {
                warn!(%user_id, %room_id, "connection refused: unknown room");
                let _ = outbound_tx.send(Message::Close(None));
                finalize(writer_task, outbound_tx).await;
                return;
            }
            Err(err) => {
                warn!(%room_id, error = %err, "could not verify room membership; accepting");
            }
        }
    }

    state.connections().insert(
        user_id,
        PlayerConnection {
            user_id,
            room_id,
            tx: outbound_tx.clone(),
        },
    );
    info!(%user_id, %room_id, "player connected");
    if state.presence().connect(room_id, user_id) {
        broadcast::to_room(
            &state,
            room_id,
            broadcast::EVENT_PRESENCE_CHANGED,
            &PresenceChangedEvent {
                user_id,
                connected: true,
                connected_count: state.presence().count(room_id),
            },
        );
    }

    // Forward room events onto this socket until either side goes away.
    let mut hub_rx = state.hub(room_id).subscribe();
    let forward_tx = outbound_tx.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = forward_tx.closed() => break,
                event = hub_rx.recv() => match event {
                    Ok(event) => {
                        let Some(frame) = broadcast::ws_frame(&event) else {
                            continue;
                        };
                        if forward_tx.send(frame).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "socket forwarder lagged behind the room hub");
                        continue;
                    }
                },
            }
        }
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_frame(&state, user_id, room_id, &text).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                debug!(%user_id, "player closed the socket");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%user_id, error = %err, "websocket error");
                break;
            }
        }
    }

    forwarder.abort();

    // A reconnect may already have replaced this connection; only undo
    // our own registration.
    let still_ours = state
        .connections()
        .get(&user_id)
        .map(|connection| connection.tx.same_channel(&outbound_tx))
        .unwrap_or(false);
    if still_ours {
        state.connections().remove(&user_id);
        if state.presence().disconnect(room_id, user_id) {
            broadcast::to_room(
                &state,
                room_id,
                broadcast::EVENT_PRESENCE_CHANGED,
                &PresenceChangedEvent {
                    user_id,
                    connected: false,
                    connected_count: state.presence().count(room_id),
                },
            );
        }
        if state.presence().count(room_id) == 0 && state.session(room_id).is_none() {
            state.drop_hub(room_id);
        }
    }

    info!(%user_id, %room_id, "player disconnected");
    finalize(writer_task, outbound_tx).await;
}

/// Route one inbound text frame to the matching engine operation.
async fn handle_frame(state: &SharedState, user_id: Uuid, room_id: Uuid, text: &str) {
    let message = match ClientMessage::from_json_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(%user_id, error = %err, "failed to parse client message");
            send_error(state, user_id, "unknown", "invalid_payload", "message could not be parsed");
            return;
        }
    };

    let action = message.action();
    match message {
        ClientMessage::Identify { .. } => {
            warn!(%user_id, "ignoring duplicate identification message");
        }
        ClientMessage::StartGame {
            room_id: target,
            total_rounds,
        } => {
            if target != room_id {
                send_error(state, user_id, action, "wrong_room", "message targets another room");
                return;
            }
            match round_service::start_game(state, room_id, user_id, total_rounds).await {
                Ok(()) => broadcast::to_user(
                    state,
                    user_id,
                    broadcast::EVENT_GAME_STARTED,
                    &GameStartedEvent {
                        room_id,
                        total_rounds,
                    },
                ),
                Err(err) => send_service_error(state, user_id, action, &err),
            }
        }
        ClientMessage::SubmitAnswer {
            room_id: target,
            round_id,
            content,
        } => {
            if target != room_id {
                send_error(state, user_id, action, "wrong_room", "message targets another room");
                return;
            }
            match round_service::submit_answer(state, room_id, user_id, round_id, content).await {
                Ok(answer_id) => broadcast::to_user(
                    state,
                    user_id,
                    broadcast::EVENT_ANSWER_ACCEPTED,
                    &AnswerAcceptedEvent {
                        round_id,
                        answer_id,
                    },
                ),
                Err(err) => send_service_error(state, user_id, action, &err),
            }
        }
        ClientMessage::SubmitVote {
            room_id: target,
            round_id,
            answer_id,
        } => {
            if target != room_id {
                send_error(state, user_id, action, "wrong_room", "message targets another room");
                return;
            }
            match round_service::submit_vote(state, room_id, user_id, round_id, answer_id).await {
                Ok(_) => broadcast::to_user(
                    state,
                    user_id,
                    broadcast::EVENT_VOTE_ACCEPTED,
                    &VoteAcceptedEvent {
                        round_id,
                        answer_id,
                    },
                ),
                Err(err) => send_service_error(state, user_id, action, &err),
            }
        }
        ClientMessage::RequestState { room_id: target } => {
            if target != room_id {
                send_error(state, user_id, action, "wrong_room", "message targets another room");
                return;
            }
            match sync_service::build_snapshot(state, room_id, user_id).await {
                Ok(snapshot) => broadcast::to_user(
                    state,
                    user_id,
                    broadcast::EVENT_STATE_SNAPSHOT,
                    &snapshot,
                ),
                Err(err) => send_service_error(state, user_id, action, &err),
            }
        }
        ClientMessage::Unknown => {
            send_error(state, user_id, action, "unknown_action", "unsupported message type");
        }
    }
}

fn send_service_error(state: &SharedState, user_id: Uuid, action: &str, err: &ServiceError) {
    debug!(%user_id, action, code = err.code(), "action rejected");
    broadcast::to_user(
        state,
        user_id,
        broadcast::EVENT_ERROR,
        &ErrorEvent {
            action: action.to_owned(),
            code: err.code().to_owned(),
            message: err.to_string(),
        },
    );
}

fn send_error(state: &SharedState, user_id: Uuid, action: &str, code: &str, message: &str) {
    broadcast::to_user(
        state,
        user_id,
        broadcast::EVENT_ERROR,
        &ErrorEvent {
            action: action.to_owned(),
            code: code.to_owned(),
            message: message.to_owned(),
        },
    );
}

/// Ensure the writer task winds down before we return from the handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
