use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::common::{BallotEntry, ScoreboardEntry};

/// Dispatched payload carried across room event hubs.
///
/// The same envelope is forwarded onto player WebSockets and spectator
/// SSE streams, so the payload is kept as a pre-serialized JSON value.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// Event name from the wire vocabulary.
    pub event: String,
    /// JSON payload of the event.
    pub data: Value,
}

impl ServerEvent {
    /// Convenience wrapper that serializes `payload` into the data field.
    pub fn json<T>(event: &str, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            event: event.to_owned(),
            data: serde_json::to_value(payload)?,
        })
    }
}

/// Broadcast when a round opens for answers.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundStartedEvent {
    /// Round that just opened.
    pub round_id: Uuid,
    /// 1-based round number.
    pub round_number: u32,
    /// Question to answer.
    pub question: String,
    /// Answering deadline as milliseconds since the Unix epoch.
    pub deadline_ms: u64,
    /// Length of the answering window in seconds.
    pub duration_seconds: u64,
}

/// Broadcast when voting opens, carrying the anonymized ballot.
#[derive(Debug, Serialize, ToSchema)]
pub struct VotingStartedEvent {
    /// Round being voted on.
    pub round_id: Uuid,
    /// Answers in shuffled order, id and content only.
    pub answers: Vec<BallotEntry>,
    /// Voting deadline as milliseconds since the Unix epoch.
    pub deadline_ms: u64,
    /// Length of the voting window in seconds.
    pub duration_seconds: u64,
}

/// Broadcast after every accepted vote with the updated running count.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoteTallyEvent {
    /// Answer whose count changed.
    pub answer_id: Uuid,
    /// Votes recorded so far for that answer.
    pub vote_count: usize,
}

/// Final result for one answer, revealed once the round is over.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResult {
    /// Answer identifier.
    pub answer_id: Uuid,
    /// Author, revealed now that voting is closed.
    pub author_id: Uuid,
    /// Answer text.
    pub content: String,
    /// Final vote count.
    pub vote_count: usize,
}

/// Broadcast when a round finishes, with final tallies and scores.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundFinishedEvent {
    /// Round that finished.
    pub round_id: Uuid,
    /// Per-answer results in ballot order.
    pub results: Vec<AnswerResult>,
    /// Updated scoreboard, best-first.
    pub scoreboard: Vec<ScoreboardEntry>,
}

/// Broadcast once after the last round's voting closes.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameFinishedEvent {
    /// Final scoreboard, best-first.
    pub scoreboard: Vec<ScoreboardEntry>,
}

/// Advisory remaining-time notification emitted between phase changes.
///
/// Carries display hints only; clients must compute remaining time from
/// the deadline timestamp to tolerate missed ticks.
#[derive(Debug, Serialize, ToSchema)]
pub struct PhaseTickEvent {
    /// Seconds left in the current phase.
    pub remaining_seconds: u64,
    /// Deadline as milliseconds since the Unix epoch.
    pub deadline_ms: u64,
}

/// Broadcast when a player connects to or disconnects from the room.
#[derive(Debug, Serialize, ToSchema)]
pub struct PresenceChangedEvent {
    /// Player whose connection state changed.
    pub user_id: Uuid,
    /// Whether the player is now connected.
    pub connected: bool,
    /// Number of players currently connected to the room.
    pub connected_count: usize,
}

/// Unicast acknowledgment for a host's accepted start-game action.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameStartedEvent {
    /// Room the game started in.
    pub room_id: Uuid,
    /// Number of rounds the game will run.
    pub total_rounds: u32,
}

/// Unicast acknowledgment for an accepted answer submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerAcceptedEvent {
    /// Round the answer was recorded for.
    pub round_id: Uuid,
    /// Identifier the answer will carry on the ballot.
    pub answer_id: Uuid,
}

/// Unicast acknowledgment for an accepted vote.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoteAcceptedEvent {
    /// Round the vote was recorded for.
    pub round_id: Uuid,
    /// Answer the vote was cast for.
    pub answer_id: Uuid,
}

/// Unicast rejection for any refused action.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEvent {
    /// Wire name of the rejected action.
    pub action: String,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}
