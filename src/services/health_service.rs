use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with the backend health, pinging storage on the way.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    let degraded = state.is_degraded();
    HealthResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        degraded,
        active_sessions: state.active_sessions(),
    }
}
