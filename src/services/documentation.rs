use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quip Arena Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::room_summary,
        crate::routes::rooms::room_phase,
        crate::routes::rooms::room_scoreboard,
        crate::routes::rooms::room_events,
        crate::routes::rooms::teardown_session,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::phase::VisiblePhase,
            crate::dto::common::ScoreboardEntry,
            crate::dto::common::SessionSnapshot,
            crate::dto::public::RoomSummary,
            crate::dto::public::RoomPhaseResponse,
            crate::dto::public::ScoreboardResponse,
            crate::dto::public::ActionResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Read-only room projections and operational actions"),
        (name = "players", description = "WebSocket channel for player actions"),
    )
)]
pub struct ApiDoc;
