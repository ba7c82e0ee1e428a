use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::phase::VisiblePhase;

/// One row of a room's scoreboard, ordered best-first.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ScoreboardEntry {
    /// Player the row belongs to.
    pub user_id: Uuid,
    /// Cumulative points.
    pub points: u32,
}

/// Anonymized answer shown on the voting ballot: id and content only.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct BallotEntry {
    /// Identifier to vote for.
    pub id: Uuid,
    /// Submitted text, with no authorship attached.
    pub content: String,
}

/// Identity of the round currently being played.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSnapshot {
    /// Round identifier.
    pub id: Uuid,
    /// 1-based round number.
    pub number: u32,
    /// Question text.
    pub question: String,
}

/// Current phase deadline, both absolute and relative.
///
/// Clients must derive remaining time from `deadline_ms`; the relative
/// field is a convenience that goes stale immediately.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeadlineSnapshot {
    /// Deadline as milliseconds since the Unix epoch.
    pub deadline_ms: u64,
    /// Seconds left at snapshot-assembly time.
    pub remaining_seconds: u64,
}

/// Answering-phase progress as visible to one requester.
///
/// Only the requester's own content is ever included; other players'
/// answers stay hidden until the voting ballot is published.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerProgress {
    /// Number of answers submitted so far.
    pub submitted_count: usize,
    /// Whether the requester already submitted.
    pub has_answered: bool,
    /// The requester's own answer content, when they submitted one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub own_content: Option<String>,
}

/// Running vote count for one answer. Voter identities are never exposed.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct AnswerCount {
    /// Answer the count belongs to.
    pub answer_id: Uuid,
    /// Votes recorded so far.
    pub vote_count: usize,
}

/// Voting-phase progress as visible to one requester.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VotingProgress {
    /// Anonymized answers in ballot order.
    pub ballot: Vec<BallotEntry>,
    /// Aggregate counts per answer.
    pub counts: Vec<AnswerCount>,
    /// Whether the requester already cast their vote.
    pub has_voted: bool,
}

/// Full state snapshot sent to a (re)joining client.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    /// Room the snapshot describes.
    pub room_id: Uuid,
    /// Current phase.
    pub phase: VisiblePhase,
    /// True when the backend operates without a storage connection.
    pub degraded: bool,
    /// Total rounds of the running game.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<u32>,
    /// Round currently being played.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundSnapshot>,
    /// Deadline of the current phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DeadlineSnapshot>,
    /// Present during the answering phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<AnswerProgress>,
    /// Present during the voting phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting: Option<VotingProgress>,
    /// Scoreboard, best-first.
    pub scoreboard: Vec<ScoreboardEntry>,
    /// Currently connected players, for display only.
    pub connected: Vec<Uuid>,
}
