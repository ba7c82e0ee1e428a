use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::{delete, get},
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::public::{ActionResponse, RoomPhaseResponse, RoomSummary, ScoreboardResponse},
    error::AppError,
    services::{public_service, round_service, sse_service},
    state::SharedState,
};

/// Configure the read-only room projection routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/rooms/{id}", get(room_summary))
        .route("/rooms/{id}/phase", get(room_phase))
        .route("/rooms/{id}/scores", get(room_scoreboard))
        .route("/rooms/{id}/events", get(room_events))
        .route("/rooms/{id}/session", delete(teardown_session))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room identifier")),
    responses((status = 200, description = "Room metadata", body = RoomSummary))
)]
/// Return the persisted metadata of a room.
pub async fn room_summary(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoomSummary>, AppError> {
    let response = public_service::room_summary(&state, id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/phase",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room identifier")),
    responses((status = 200, description = "Current phase", body = RoomPhaseResponse))
)]
/// Return the current phase of a room.
pub async fn room_phase(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoomPhaseResponse>, AppError> {
    let response = public_service::room_phase(&state, id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/scores",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room identifier")),
    responses((status = 200, description = "Scoreboard, best-first", body = ScoreboardResponse))
)]
/// Return the scoreboard of a room.
pub async fn room_scoreboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreboardResponse>, AppError> {
    let response = public_service::room_scoreboard(&state, id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/events",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room identifier")),
    responses((status = 200, description = "Spectator SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream a room's realtime events to a read-only spectator.
pub async fn room_events(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state, id);
    info!(room_id = %id, "new spectator SSE connection");
    sse_service::to_sse_stream(receiver, id)
}

#[utoipa::path(
    delete,
    path = "/rooms/{id}/session",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Session torn down", body = ActionResponse),
        (status = 404, description = "No running session for this room")
    )
)]
/// Abort a room's running game session. Used by the room-management
/// collaborator when a room is deleted.
pub async fn teardown_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    let existed = round_service::teardown_room(&state, id).await?;
    if !existed {
        return Err(AppError::NotFound(format!(
            "no running session for room `{id}`"
        )));
    }
    Ok(Json(ActionResponse {
        message: "session torn down".into(),
    }))
}
