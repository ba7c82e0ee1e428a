use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Lifecycle status of a room as tracked in durable storage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// The room exists and no game has been played yet.
    Open,
    /// A game is currently in progress.
    Playing,
    /// The last game finished; final scores are available.
    Done,
}

/// Lifecycle status of a single round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Pre-generated, waiting for its turn.
    Pending,
    /// Players are answering the round's question.
    Active,
    /// Players are voting on the submitted answers.
    Voting,
    /// Votes are tallied and scores applied.
    Finished,
}

/// Room record owned by the room-management collaborator.
///
/// The engine only reads it (existence, host, membership) and flips
/// `status` at game start and game end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Primary key of the room.
    pub id: Uuid,
    /// Display name of the room.
    pub name: String,
    /// User allowed to start a game in this room.
    pub host_id: Uuid,
    /// Users belonging to the room.
    pub members: Vec<Uuid>,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// One question-answer-vote cycle, persisted up front at game start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Primary key of the round.
    pub id: Uuid,
    /// Room this round belongs to.
    pub room_id: Uuid,
    /// 1-based position within the game, strictly increasing per room.
    pub sequence: u32,
    /// Immutable question text.
    pub question: String,
    /// Current lifecycle status.
    pub status: RoundStatus,
}

/// A player's answer, flushed once when the answering phase closes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Primary key of the answer.
    pub id: Uuid,
    /// Round the answer belongs to. Unique together with `author_id`.
    pub round_id: Uuid,
    /// Player who wrote the answer.
    pub author_id: Uuid,
    /// Submitted text.
    pub content: String,
    /// Submission timestamp.
    pub submitted_at: SystemTime,
}

/// A player's vote, flushed once when the voting phase closes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteEntity {
    /// Round the vote belongs to. Unique together with `voter_id`.
    pub round_id: Uuid,
    /// Answer the vote was cast for.
    pub answer_id: Uuid,
    /// Player who cast the vote.
    pub voter_id: Uuid,
}

/// Cumulative score row for one player in one room. Never decreases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    /// Player the score belongs to.
    pub user_id: Uuid,
    /// Room the score was earned in.
    pub room_id: Uuid,
    /// Cumulative points.
    pub points: u32,
    /// When this row was first created; breaks scoreboard ties.
    pub first_scored_at: SystemTime,
}

/// Per-round points earned by one player, applied as `points += delta`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreDelta {
    /// Player the points go to.
    pub user_id: Uuid,
    /// Points earned this round (vote count on the player's answer).
    pub points: u32,
}
