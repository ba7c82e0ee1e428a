use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::storage::StorageError;
use crate::state::state_machine::InvalidTransition;

/// Rejections produced by the game engine for a player or host action.
///
/// Each variant maps to a stable wire code surfaced to the acting client;
/// none of them is ever broadcast to the rest of the room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    /// The addressed room does not exist.
    #[error("room `{0}` was not found")]
    RoomNotFound(Uuid),
    /// Only the room host may start a game.
    #[error("only the room host can start the game")]
    NotHost,
    /// A game is already running for this room.
    #[error("a game is already in progress for this room")]
    AlreadyStarted,
    /// The action is not valid in the room's current phase.
    #[error("action not allowed while the room is in the {phase} phase")]
    WrongPhase {
        /// Phase the room was in when the action arrived.
        phase: &'static str,
    },
    /// The referenced round is not the one currently being played.
    #[error("round `{0}` is not the active round")]
    UnknownRound(Uuid),
    /// Answers must carry non-blank content.
    #[error("answer content must not be empty")]
    EmptyAnswer,
    /// The player already submitted an answer this round.
    #[error("an answer was already submitted for this round")]
    DuplicateAnswer,
    /// The referenced answer does not exist in the current round.
    #[error("answer `{0}` does not exist in this round")]
    UnknownAnswer(Uuid),
    /// Players may not vote for their own answer.
    #[error("voting for your own answer is not allowed")]
    SelfVote,
    /// The player already cast a vote this round.
    #[error("a vote was already cast for this round")]
    DuplicateVote,
}

impl RoundError {
    /// Stable machine-readable code carried on error events.
    pub fn code(&self) -> &'static str {
        match self {
            RoundError::RoomNotFound(_) => "room_not_found",
            RoundError::NotHost => "not_host",
            RoundError::AlreadyStarted => "already_started",
            RoundError::WrongPhase { .. } => "wrong_phase",
            RoundError::UnknownRound(_) => "unknown_round",
            RoundError::EmptyAnswer => "empty_answer",
            RoundError::DuplicateAnswer => "duplicate_answer",
            RoundError::UnknownAnswer(_) => "unknown_answer",
            RoundError::SelfVote => "self_vote",
            RoundError::DuplicateVote => "duplicate_vote",
        }
    }
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// The engine rejected a player or host action.
    #[error(transparent)]
    Rejected(#[from] RoundError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl ServiceError {
    /// Machine-readable code carried on error events sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unavailable(_) => "storage_unavailable",
            ServiceError::Degraded => "degraded",
            ServiceError::Rejected(rejection) => rejection.code(),
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::InvalidState(_) => "invalid_state",
            ServiceError::NotFound(_) => "not_found",
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Rejected(rejection) => match rejection {
                RoundError::RoomNotFound(_) | RoundError::UnknownRound(_)
                | RoundError::UnknownAnswer(_) => AppError::NotFound(rejection.to_string()),
                RoundError::EmptyAnswer => AppError::BadRequest(rejection.to_string()),
                _ => AppError::Conflict(rejection.to_string()),
            },
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_error_codes_are_stable() {
        assert_eq!(RoundError::DuplicateAnswer.code(), "duplicate_answer");
        assert_eq!(RoundError::SelfVote.code(), "self_vote");
        assert_eq!(RoundError::DuplicateVote.code(), "duplicate_vote");
        assert_eq!(
            RoundError::WrongPhase { phase: "voting" }.code(),
            "wrong_phase"
        );
    }

    #[test]
    fn rejections_surface_their_code_through_service_error() {
        let err: ServiceError = RoundError::NotHost.into();
        assert_eq!(err.code(), "not_host");
    }
}
