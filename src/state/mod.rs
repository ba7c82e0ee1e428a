pub mod presence;
pub mod session;
pub mod state_machine;
pub mod tally;
pub mod timer;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{RwLock, broadcast, mpsc, watch};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dao::room_store::RoomStore;
use crate::dto::events::ServerEvent;
use crate::error::ServiceError;
use crate::state::presence::PresenceSet;
use crate::state::session::{RoomSession, SessionState};
use crate::state::timer::PhaseTimer;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Broadcast capacity of one room's event hub.
const HUB_CAPACITY: usize = 32;

/// Handle used to push frames to one player's WebSocket writer task.
#[derive(Clone)]
pub struct PlayerConnection {
    /// Player owning the connection.
    pub user_id: Uuid,
    /// Room the player identified into.
    pub room_id: Uuid,
    /// Outbound frame channel consumed by the writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Fan-out channel for one room's events.
///
/// Player connections and spectator streams subscribe; the broadcast
/// gateway publishes. Dropping all receivers is fine; sends to an empty
/// hub are ignored.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventHub {
    /// Construct a hub backed by a Tokio broadcast channel.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Central application state: storage handle, per-room registries, player
/// connections, presence, and the phase-timer scheduler.
///
/// Per-room mutable game state lives behind each room's
/// [`RoomSession`] lock; this struct only holds the registries, and the
/// registry maps are the single cross-room touch point.
pub struct AppState {
    config: Arc<AppConfig>,
    store: RwLock<Option<Arc<dyn RoomStore>>>,
    degraded: watch::Sender<bool>,
    sessions: DashMap<Uuid, Arc<RoomSession>>,
    hubs: DashMap<Uuid, EventHub>,
    connections: DashMap<Uuid, PlayerConnection>,
    presence: PresenceSet,
    timers: PhaseTimer,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a storage backend is
    /// installed.
    pub fn new(config: AppConfig) -> SharedState {
        let tick_interval = config.tick_interval();
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config: Arc::new(config),
            store: RwLock::new(None),
            degraded: degraded_tx,
            sessions: DashMap::new(),
            hubs: DashMap::new(),
            connections: DashMap::new(),
            presence: PresenceSet::new(),
            timers: PhaseTimer::new(tick_interval),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// Obtain a handle to the current storage backend, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn RoomStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Storage backend or a [`ServiceError::Degraded`] rejection.
    pub async fn require_store(&self) -> Result<Arc<dyn RoomStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a storage backend and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn RoomStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current storage backend and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Live session handle for a room, if a game is running.
    pub fn session(&self, room_id: Uuid) -> Option<Arc<RoomSession>> {
        self.sessions.get(&room_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Register a new session for a room.
    ///
    /// Returns `None` when the room already has one; at most one session
    /// exists per room at any time.
    pub fn try_insert_session(&self, room_id: Uuid, state: SessionState) -> Option<Arc<RoomSession>> {
        use dashmap::mapref::entry::Entry;
        match self.sessions.entry(room_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let session = Arc::new(RoomSession::new(state));
                slot.insert(Arc::clone(&session));
                Some(session)
            }
        }
    }

    /// Drop a room's session, cancelling its phase timer first so no
    /// stale expiry fires into a destroyed session.
    pub fn remove_session(&self, room_id: Uuid) -> Option<Arc<RoomSession>> {
        self.timers.cancel(room_id);
        self.sessions.remove(&room_id).map(|(_, session)| session)
    }

    /// Number of rooms with a running game.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Event hub for a room, created on first use.
    pub fn hub(&self, room_id: Uuid) -> EventHub {
        self.hubs
            .entry(room_id)
            .or_insert_with(|| EventHub::new(HUB_CAPACITY))
            .clone()
    }

    /// Live subscriber count of a room's hub without creating one.
    pub fn hub_receivers(&self, room_id: Uuid) -> usize {
        self.hubs
            .get(&room_id)
            .map(|hub| hub.receiver_count())
            .unwrap_or(0)
    }

    /// Drop a room's event hub once nobody is listening any more.
    pub fn drop_hub(&self, room_id: Uuid) {
        self.hubs.remove(&room_id);
    }

    /// Registry of active player connections keyed by user id.
    pub fn connections(&self) -> &DashMap<Uuid, PlayerConnection> {
        &self.connections
    }

    /// Connected players per room.
    pub fn presence(&self) -> &PresenceSet {
        &self.presence
    }

    /// Per-room phase deadline scheduler.
    pub fn timers(&self) -> &PhaseTimer {
        &self.timers
    }
}
