use serde::Serialize;
use utoipa::ToSchema;

/// Health status returned by the healthcheck endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when storage answers the ping, `degraded` otherwise.
    pub status: String,
    /// Whether the backend currently runs without a storage connection.
    pub degraded: bool,
    /// Number of rooms with a running game.
    pub active_sessions: usize,
}
