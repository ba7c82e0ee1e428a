use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::RoomEntity;
use crate::dto::common::ScoreboardEntry;
use crate::dto::format_system_time;
use crate::dto::phase::VisiblePhase;

/// Phase projection of one room for public consumers.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomPhaseResponse {
    /// Room the projection describes.
    pub room_id: Uuid,
    /// Current phase.
    pub phase: VisiblePhase,
    /// True when the backend operates without a storage connection.
    pub degraded: bool,
    /// 1-based number of the round being played, when a game is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,
    /// Total rounds of the running game.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<u32>,
}

/// Scoreboard projection of one room for public consumers.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreboardResponse {
    /// Room the scoreboard belongs to.
    pub room_id: Uuid,
    /// Rows ordered best-first.
    pub scores: Vec<ScoreboardEntry>,
}

/// Read-only room metadata returned alongside projections.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    /// Room identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Lifecycle status label.
    pub status: String,
    /// Number of members.
    pub member_count: usize,
    /// Creation timestamp, RFC3339.
    pub created_at: String,
}

impl From<RoomEntity> for RoomSummary {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            status: format!("{:?}", value.status).to_lowercase(),
            member_count: value.members.len(),
            created_at: format_system_time(value.created_at),
        }
    }
}

/// Acknowledgment returned by operational actions (e.g. session teardown).
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Human-readable confirmation.
    pub message: String,
}
