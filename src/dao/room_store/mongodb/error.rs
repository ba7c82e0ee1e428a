use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB backend operations.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Errors raised by the MongoDB [`super::MongoRoomStore`] backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The configured URI could not be parsed.
    #[error("invalid MongoDB URI `{uri}`")]
    InvalidUri {
        /// The rejected URI.
        uri: String,
        /// Driver-level parse failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// The driver client could not be constructed.
    #[error("failed to construct MongoDB client")]
    ClientConstruction {
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// The server never answered the initial ping.
    #[error("MongoDB did not answer the initial ping after {attempts} attempts")]
    InitialPing {
        /// Attempts made before giving up.
        attempts: u32,
        /// Last ping failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// Index creation failed for a collection.
    #[error("failed to ensure index `{index}` on `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index key description.
        index: &'static str,
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// A room document could not be written.
    #[error("failed to save room `{id}`")]
    SaveRoom {
        /// Room identifier.
        id: Uuid,
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// A room document could not be read.
    #[error("failed to load room `{id}`")]
    LoadRoom {
        /// Room identifier.
        id: Uuid,
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// The game-start batch could not be written.
    #[error("failed to persist game start for room `{room_id}`")]
    BeginGame {
        /// Room identifier.
        room_id: Uuid,
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// The answering-phase flush failed.
    #[error("failed to close answering phase for round `{round_id}`")]
    CloseAnswering {
        /// Round identifier.
        round_id: Uuid,
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// The voting-phase flush failed.
    #[error("failed to close voting phase for round `{round_id}`")]
    CloseVoting {
        /// Round identifier.
        round_id: Uuid,
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// Rounds of a room could not be listed.
    #[error("failed to list rounds for room `{room_id}`")]
    ListRounds {
        /// Room identifier.
        room_id: Uuid,
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// Scores of a room could not be listed.
    #[error("failed to list scores for room `{room_id}`")]
    ListScores {
        /// Room identifier.
        room_id: Uuid,
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
    /// The health-check ping failed.
    #[error("MongoDB health ping failed")]
    HealthPing {
        /// Driver-level failure.
        #[source]
        source: mongodb::error::Error,
    },
}
