/// Delivery of room-scoped and single-connection events.
pub mod broadcast;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Read-only public projections of rooms.
pub mod public_service;
/// Round orchestration: the per-room game state machine driver.
pub mod round_service;
/// Score aggregation and scoreboard assembly.
pub mod score_service;
/// Spectator SSE streams.
pub mod sse_service;
/// Storage connection supervision with reconnect backoff.
pub mod storage_supervisor;
/// Snapshot assembly for joining and reconnecting clients.
pub mod sync_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
