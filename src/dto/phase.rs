use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::SessionPhase;

/// Publicly visible session phase exposed to clients (REST/WS/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// No game is running (or a session was created but not yet opened).
    Waiting,
    /// Players are answering the current question.
    Answering,
    /// Players are voting on the anonymized answers.
    Voting,
    /// The game is over; final scores are available.
    Finished,
}

impl From<SessionPhase> for VisiblePhase {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Waiting => VisiblePhase::Waiting,
            SessionPhase::Answering => VisiblePhase::Answering,
            SessionPhase::Voting => VisiblePhase::Voting,
            SessionPhase::Finished => VisiblePhase::Finished,
        }
    }
}
