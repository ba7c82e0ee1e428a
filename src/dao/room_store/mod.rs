pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, RoomEntity, RoundEntity, ScoreDelta, ScoreEntity, VoteEntity,
};
use crate::dao::storage::StorageResult;

/// What happens to the game once a round's voting phase closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Another pending round follows; it becomes active.
    NextRound(Uuid),
    /// This was the last round; the room is marked done.
    GameOver(Uuid),
}

/// Abstraction over the persistence layer for rooms, rounds, answers,
/// votes, and scores.
///
/// The engine touches storage only at phase boundaries. Each boundary is a
/// single trait call so a backend can commit it atomically; backends must
/// also enforce uniqueness of `(round_id, author_id)` for answers and
/// `(round_id, voter_id)` for votes.
pub trait RoomStore: Send + Sync {
    /// Look up a room record.
    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Persist a room record (used by the room-management collaborator).
    fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Persist all pre-generated rounds of a new game and mark the room
    /// as playing. The first round is expected to carry `Active` status.
    fn begin_game(
        &self,
        room_id: Uuid,
        rounds: Vec<RoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Close the answering phase: flush the answer batch and move the
    /// round to `Voting`.
    fn close_answering(
        &self,
        round_id: Uuid,
        answers: Vec<AnswerEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Close the voting phase: flush the vote batch, apply score deltas
    /// (creating rows as needed), finish the round, and either activate
    /// the next round or mark the room done.
    fn close_voting(
        &self,
        round_id: Uuid,
        votes: Vec<VoteEntity>,
        deltas: Vec<ScoreDelta>,
        outcome: RoundOutcome,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// All rounds of a room, ordered by sequence.
    fn fetch_rounds(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    /// All score rows of a room, ordered by row creation.
    fn fetch_scores(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Cheap liveness probe used by the supervisor and health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a lost backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
