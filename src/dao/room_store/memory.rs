use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, RoomEntity, RoomStatus, RoundEntity, RoundStatus, ScoreDelta, ScoreEntity,
    VoteEntity,
};
use crate::dao::room_store::{RoomStore, RoundOutcome};
use crate::dao::storage::StorageResult;

/// In-memory [`RoomStore`] backend.
///
/// Used by the test suite and as the boot fallback when no database is
/// configured. All maps sit behind one mutex, which makes every
/// phase-boundary call atomic.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    rooms: HashMap<Uuid, RoomEntity>,
    rounds: HashMap<Uuid, RoundEntity>,
    answers: HashMap<(Uuid, Uuid), AnswerEntity>,
    votes: HashMap<(Uuid, Uuid), VoteEntity>,
    /// Score rows in creation order; the order is load-bearing for
    /// scoreboard tie-breaking.
    scores: Vec<ScoreEntity>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with room records.
    pub fn with_rooms(rooms: impl IntoIterator<Item = RoomEntity>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().expect("memory store poisoned");
            for room in rooms {
                inner.rooms.insert(room.id, room);
            }
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store poisoned")
    }
}

impl Inner {
    fn apply_deltas(&mut self, room_id: Uuid, deltas: &[ScoreDelta]) {
        for delta in deltas {
            match self
                .scores
                .iter_mut()
                .find(|row| row.room_id == room_id && row.user_id == delta.user_id)
            {
                Some(row) => row.points += delta.points,
                None => self.scores.push(ScoreEntity {
                    user_id: delta.user_id,
                    room_id,
                    points: delta.points,
                    first_scored_at: SystemTime::now(),
                }),
            }
        }
    }

    fn set_round_status(&mut self, round_id: Uuid, status: RoundStatus) {
        if let Some(round) = self.rounds.get_mut(&round_id) {
            round.status = status;
        }
    }
}

impl RoomStore for MemoryRoomStore {
    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().rooms.get(&id).cloned()) })
    }

    fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.lock().rooms.insert(room.id, room);
            Ok(())
        })
    }

    fn begin_game(
        &self,
        room_id: Uuid,
        rounds: Vec<RoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            if let Some(room) = inner.rooms.get_mut(&room_id) {
                room.status = RoomStatus::Playing;
            }
            for round in rounds {
                inner.rounds.insert(round.id, round);
            }
            Ok(())
        })
    }

    fn close_answering(
        &self,
        round_id: Uuid,
        answers: Vec<AnswerEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            for answer in answers {
                // First write wins, mirroring the unique index on
                // (round_id, author_id).
                inner
                    .answers
                    .entry((answer.round_id, answer.author_id))
                    .or_insert(answer);
            }
            inner.set_round_status(round_id, RoundStatus::Voting);
            Ok(())
        })
    }

    fn close_voting(
        &self,
        round_id: Uuid,
        votes: Vec<VoteEntity>,
        deltas: Vec<ScoreDelta>,
        outcome: RoundOutcome,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let room_id = inner.rounds.get(&round_id).map(|round| round.room_id);
            for vote in votes {
                inner
                    .votes
                    .entry((vote.round_id, vote.voter_id))
                    .or_insert(vote);
            }
            if let Some(room_id) = room_id {
                inner.apply_deltas(room_id, &deltas);
            }
            inner.set_round_status(round_id, RoundStatus::Finished);
            match outcome {
                RoundOutcome::NextRound(next_round_id) => {
                    inner.set_round_status(next_round_id, RoundStatus::Active);
                }
                RoundOutcome::GameOver(room_id) => {
                    if let Some(room) = inner.rooms.get_mut(&room_id) {
                        room.status = RoomStatus::Done;
                    }
                }
            }
            Ok(())
        })
    }

    fn fetch_rounds(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.lock();
            let mut rounds: Vec<RoundEntity> = inner
                .rounds
                .values()
                .filter(|round| round.room_id == room_id)
                .cloned()
                .collect();
            rounds.sort_by_key(|round| round.sequence);
            Ok(rounds)
        })
    }

    fn fetch_scores(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .lock()
                .scores
                .iter()
                .filter(|row| row.room_id == room_id)
                .cloned()
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(host: Uuid) -> RoomEntity {
        RoomEntity {
            id: Uuid::new_v4(),
            name: "lounge".into(),
            host_id: host,
            members: vec![host],
            status: RoomStatus::Open,
            created_at: SystemTime::now(),
        }
    }

    fn answer(round_id: Uuid, author_id: Uuid, content: &str) -> AnswerEntity {
        AnswerEntity {
            id: Uuid::new_v4(),
            round_id,
            author_id,
            content: content.into(),
            submitted_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_answer_rows_keep_the_first_content() {
        let store = MemoryRoomStore::new();
        let round_id = Uuid::new_v4();
        let author = Uuid::new_v4();

        store
            .close_answering(
                round_id,
                vec![
                    answer(round_id, author, "first"),
                    answer(round_id, author, "second"),
                ],
            )
            .await
            .unwrap();

        let inner = store.lock();
        assert_eq!(inner.answers.len(), 1);
        assert_eq!(inner.answers[&(round_id, author)].content, "first");
    }

    #[tokio::test]
    async fn close_voting_marks_room_done_on_game_over() {
        let host = Uuid::new_v4();
        let room = room(host);
        let room_id = room.id;
        let store = MemoryRoomStore::with_rooms([room]);

        let round = RoundEntity {
            id: Uuid::new_v4(),
            room_id,
            sequence: 1,
            question: "q".into(),
            status: RoundStatus::Active,
        };
        let round_id = round.id;
        store.begin_game(room_id, vec![round]).await.unwrap();

        store
            .close_voting(
                round_id,
                vec![],
                vec![ScoreDelta {
                    user_id: host,
                    points: 2,
                }],
                RoundOutcome::GameOver(room_id),
            )
            .await
            .unwrap();

        let found = store.find_room(room_id).await.unwrap().unwrap();
        assert_eq!(found.status, RoomStatus::Done);
        let scores = store.fetch_scores(room_id).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].points, 2);
    }

    #[tokio::test]
    async fn score_rows_accumulate_and_never_reset() {
        let store = MemoryRoomStore::new();
        let room_id = Uuid::new_v4();
        let round_a = Uuid::new_v4();
        let round_b = Uuid::new_v4();
        let user = Uuid::new_v4();

        {
            let mut inner = store.lock();
            inner.rounds.insert(
                round_a,
                RoundEntity {
                    id: round_a,
                    room_id,
                    sequence: 1,
                    question: "a".into(),
                    status: RoundStatus::Voting,
                },
            );
            inner.rounds.insert(
                round_b,
                RoundEntity {
                    id: round_b,
                    room_id,
                    sequence: 2,
                    question: "b".into(),
                    status: RoundStatus::Pending,
                },
            );
        }

        let delta = |points| {
            vec![ScoreDelta {
                user_id: user,
                points,
            }]
        };
        store
            .close_voting(round_a, vec![], delta(3), RoundOutcome::NextRound(round_b))
            .await
            .unwrap();
        store
            .close_voting(round_b, vec![], delta(0), RoundOutcome::GameOver(room_id))
            .await
            .unwrap();

        let scores = store.fetch_scores(room_id).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].points, 3);
    }
}
