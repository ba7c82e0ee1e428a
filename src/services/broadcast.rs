//! Delivery helpers for room-scoped and single-connection events.
//!
//! Room events fan out through the room's [`EventHub`]; unicast events go
//! straight onto the target connection's writer channel. The presence
//! short-circuit here is an optimization only; offline players catch up
//! through a state snapshot on reconnect, never through replayed events.

use axum::extract::ws::Message;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dto::events::ServerEvent;
use crate::state::{EventHub, SharedState};

/// A round opened for answers.
pub const EVENT_ROUND_STARTED: &str = "round-started";
/// Voting opened with the anonymized ballot.
pub const EVENT_VOTING_STARTED: &str = "voting-started";
/// Running vote count changed for one answer.
pub const EVENT_VOTE_TALLY: &str = "vote-tally-update";
/// A round finished; tallies and scores revealed.
pub const EVENT_ROUND_FINISHED: &str = "round-finished";
/// The game is over; final scores attached.
pub const EVENT_GAME_FINISHED: &str = "game-finished";
/// Advisory remaining-time tick.
pub const EVENT_PHASE_TICK: &str = "phase-tick";
/// A player connected or disconnected.
pub const EVENT_PRESENCE_CHANGED: &str = "presence-changed";
/// Unicast full state snapshot.
pub const EVENT_STATE_SNAPSHOT: &str = "state-snapshot";
/// Unicast start-game acknowledgment.
pub const EVENT_GAME_STARTED: &str = "game-started";
/// Unicast answer acknowledgment.
pub const EVENT_ANSWER_ACCEPTED: &str = "answer-accepted";
/// Unicast vote acknowledgment.
pub const EVENT_VOTE_ACCEPTED: &str = "vote-accepted";
/// Unicast rejection of an action.
pub const EVENT_ERROR: &str = "error";

#[derive(Serialize)]
struct OutboundFrame<'a> {
    event: &'a str,
    data: &'a serde_json::Value,
}

/// Render a hub event as a WebSocket text frame.
pub fn ws_frame(event: &ServerEvent) -> Option<Message> {
    let frame = OutboundFrame {
        event: &event.event,
        data: &event.data,
    };
    match serde_json::to_string(&frame) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(err) => {
            warn!(event = %event.event, error = %err, "failed to serialize outbound frame");
            None
        }
    }
}

/// Deliver an event to every listener of a room.
pub fn to_room(state: &SharedState, room_id: Uuid, event: &str, payload: &impl Serialize) {
    if state.presence().count(room_id) == 0 && state.hub_receivers(room_id) == 0 {
        debug!(%room_id, event, "no listeners connected, skipping broadcast");
        return;
    }
    let hub: EventHub = state.hub(room_id);
    match ServerEvent::json(event, payload) {
        Ok(server_event) => hub.broadcast(server_event),
        Err(err) => warn!(%room_id, event, error = %err, "failed to serialize room event"),
    }
}

/// Deliver an event to one player's connection, if they are connected.
pub fn to_user(state: &SharedState, user_id: Uuid, event: &str, payload: &impl Serialize) {
    let Some(tx) = state
        .connections()
        .get(&user_id)
        .map(|connection| connection.tx.clone())
    else {
        debug!(%user_id, event, "player not connected, dropping unicast event");
        return;
    };

    let server_event = match ServerEvent::json(event, payload) {
        Ok(server_event) => server_event,
        Err(err) => {
            warn!(%user_id, event, error = %err, "failed to serialize unicast event");
            return;
        }
    };

    if let Some(frame) = ws_frame(&server_event) {
        let _ = tx.send(frame);
    }
}
