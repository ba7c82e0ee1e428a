//! Service helpers that expose read-only public projections of rooms.

use uuid::Uuid;

use crate::dao::models::RoomStatus;
use crate::dto::phase::VisiblePhase;
use crate::dto::public::{RoomPhaseResponse, RoomSummary, ScoreboardResponse};
use crate::error::ServiceError;
use crate::services::score_service;
use crate::state::SharedState;

/// Return the persisted metadata of a room.
pub async fn room_summary(state: &SharedState, room_id: Uuid) -> Result<RoomSummary, ServiceError> {
    let store = state.require_store().await?;
    let room = store
        .find_room(room_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}` not found")))?;
    Ok(room.into())
}

/// Return the current phase of a room, live when a game is running and
/// derived from the persisted room row otherwise.
pub async fn room_phase(
    state: &SharedState,
    room_id: Uuid,
) -> Result<RoomPhaseResponse, ServiceError> {
    let degraded = state.is_degraded();

    if let Some(session) = state.session(room_id) {
        let sess = session.lock().await;
        return Ok(RoomPhaseResponse {
            room_id,
            phase: sess.machine.phase().into(),
            degraded,
            round_number: Some(sess.current_round().sequence),
            total_rounds: Some(sess.total_rounds()),
        });
    }

    let store = state.require_store().await?;
    let room = store
        .find_room(room_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}` not found")))?;

    let phase = if room.status == RoomStatus::Done {
        VisiblePhase::Finished
    } else {
        VisiblePhase::Waiting
    };
    Ok(RoomPhaseResponse {
        room_id,
        phase,
        degraded,
        round_number: None,
        total_rounds: None,
    })
}

/// Return the scoreboard of a room: the in-session board during a game,
/// the persisted rows afterwards.
pub async fn room_scoreboard(
    state: &SharedState,
    room_id: Uuid,
) -> Result<ScoreboardResponse, ServiceError> {
    if let Some(session) = state.session(room_id) {
        let sess = session.lock().await;
        return Ok(ScoreboardResponse {
            room_id,
            scores: score_service::scoreboard(&sess.scores),
        });
    }

    let store = state.require_store().await?;
    if store.find_room(room_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    }
    let rows = store.fetch_scores(room_id).await?;
    Ok(ScoreboardResponse {
        room_id,
        scores: score_service::scoreboard_from_rows(rows),
    })
}
