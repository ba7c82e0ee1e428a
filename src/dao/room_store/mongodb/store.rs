//! MongoDB-backed [`RoomStore`] implementation.

use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoAnswerDocument, MongoRoomDocument, MongoRoundDocument, MongoScoreDocument,
        MongoVoteDocument, doc_id, uuid_as_binary,
    },
};
use crate::dao::{
    models::{AnswerEntity, RoomEntity, RoundEntity, ScoreDelta, ScoreEntity, VoteEntity},
    room_store::{RoomStore, RoundOutcome},
    storage::StorageResult,
};

const ROOM_COLLECTION: &str = "rooms";
const ROUND_COLLECTION: &str = "rounds";
const ANSWER_COLLECTION: &str = "answers";
const VOTE_COLLECTION: &str = "votes";
const SCORE_COLLECTION: &str = "scores";

/// [`RoomStore`] backend persisting game state into MongoDB collections.
#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Create the indexes the engine relies on. The unique indexes on
    /// answers and votes are the storage-level half of the dedup
    /// invariants.
    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let unique = |name: &str| {
            IndexOptions::builder()
                .name(Some(name.to_owned()))
                .unique(Some(true))
                .build()
        };

        let round_index = mongodb::IndexModel::builder()
            .keys(doc! {"room_id": 1, "sequence": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("round_room_seq_idx".to_owned()))
                    .build(),
            )
            .build();
        database
            .collection::<MongoRoundDocument>(ROUND_COLLECTION)
            .create_index(round_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ROUND_COLLECTION,
                index: "room_id,sequence",
                source,
            })?;

        let answer_index = mongodb::IndexModel::builder()
            .keys(doc! {"round_id": 1, "author_id": 1})
            .options(unique("answer_round_author_idx"))
            .build();
        database
            .collection::<MongoAnswerDocument>(ANSWER_COLLECTION)
            .create_index(answer_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ANSWER_COLLECTION,
                index: "round_id,author_id",
                source,
            })?;

        let vote_index = mongodb::IndexModel::builder()
            .keys(doc! {"round_id": 1, "voter_id": 1})
            .options(unique("vote_round_voter_idx"))
            .build();
        database
            .collection::<MongoVoteDocument>(VOTE_COLLECTION)
            .create_index(vote_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: VOTE_COLLECTION,
                index: "round_id,voter_id",
                source,
            })?;

        let score_index = mongodb::IndexModel::builder()
            .keys(doc! {"room_id": 1, "user_id": 1})
            .options(unique("score_room_user_idx"))
            .build();
        database
            .collection::<MongoScoreDocument>(SCORE_COLLECTION)
            .create_index(score_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SCORE_COLLECTION,
                index: "room_id,user_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn rooms(&self) -> Collection<MongoRoomDocument> {
        self.database().await.collection(ROOM_COLLECTION)
    }

    async fn rounds(&self) -> Collection<MongoRoundDocument> {
        self.database().await.collection(ROUND_COLLECTION)
    }

    async fn answers(&self) -> Collection<MongoAnswerDocument> {
        self.database().await.collection(ANSWER_COLLECTION)
    }

    async fn votes(&self) -> Collection<MongoVoteDocument> {
        self.database().await.collection(VOTE_COLLECTION)
    }

    async fn scores(&self) -> Collection<MongoScoreDocument> {
        self.database().await.collection(SCORE_COLLECTION)
    }

    async fn find_room(&self, id: Uuid) -> MongoResult<Option<RoomEntity>> {
        let document = self
            .rooms()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadRoom { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn save_room(&self, room: RoomEntity) -> MongoResult<()> {
        let id = room.id;
        let document: MongoRoomDocument = room.into();
        self.rooms()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRoom { id, source })?;
        Ok(())
    }

    async fn begin_game(&self, room_id: Uuid, rounds: Vec<RoundEntity>) -> MongoResult<()> {
        self.rooms()
            .await
            .update_one(
                doc_id(room_id),
                doc! { "$set": { "status": "playing" } },
            )
            .await
            .map_err(|source| MongoDaoError::BeginGame { room_id, source })?;

        if !rounds.is_empty() {
            let documents: Vec<MongoRoundDocument> =
                rounds.into_iter().map(Into::into).collect();
            self.rounds()
                .await
                .insert_many(documents)
                .await
                .map_err(|source| MongoDaoError::BeginGame { room_id, source })?;
        }
        Ok(())
    }

    async fn set_round_status(&self, round_id: Uuid, status: &str) -> MongoResult<()> {
        self.rounds()
            .await
            .update_one(doc_id(round_id), doc! { "$set": { "status": status } })
            .await
            .map_err(|source| MongoDaoError::CloseVoting { round_id, source })?;
        Ok(())
    }

    async fn close_answering(
        &self,
        round_id: Uuid,
        answers: Vec<AnswerEntity>,
    ) -> MongoResult<()> {
        if !answers.is_empty() {
            let documents: Vec<MongoAnswerDocument> =
                answers.into_iter().map(Into::into).collect();
            self.answers()
                .await
                .insert_many(documents)
                .ordered(false)
                .await
                .map_err(|source| MongoDaoError::CloseAnswering { round_id, source })?;
        }

        self.rounds()
            .await
            .update_one(doc_id(round_id), doc! { "$set": { "status": "voting" } })
            .await
            .map_err(|source| MongoDaoError::CloseAnswering { round_id, source })?;
        Ok(())
    }

    async fn close_voting(
        &self,
        round_id: Uuid,
        votes: Vec<VoteEntity>,
        deltas: Vec<ScoreDelta>,
        outcome: RoundOutcome,
    ) -> MongoResult<()> {
        let round = self
            .rounds()
            .await
            .find_one(doc_id(round_id))
            .await
            .map_err(|source| MongoDaoError::CloseVoting { round_id, source })?;
        let room_id = round.map(|doc| RoundEntity::from(doc).room_id);

        if !votes.is_empty() {
            let documents: Vec<MongoVoteDocument> = votes.into_iter().map(Into::into).collect();
            self.votes()
                .await
                .insert_many(documents)
                .ordered(false)
                .await
                .map_err(|source| MongoDaoError::CloseVoting { round_id, source })?;
        }

        if let Some(room_id) = room_id {
            let scores = self.scores().await;
            for delta in deltas {
                scores
                    .update_one(
                        doc! {
                            "room_id": uuid_as_binary(room_id),
                            "user_id": uuid_as_binary(delta.user_id),
                        },
                        doc! {
                            "$inc": { "points": delta.points },
                            "$setOnInsert": { "first_scored_at": DateTime::now() },
                        },
                    )
                    .upsert(true)
                    .await
                    .map_err(|source| MongoDaoError::CloseVoting { round_id, source })?;
            }
        }

        self.set_round_status(round_id, "finished").await?;

        match outcome {
            RoundOutcome::NextRound(next_round_id) => {
                self.set_round_status(next_round_id, "active").await?;
            }
            RoundOutcome::GameOver(room_id) => {
                self.rooms()
                    .await
                    .update_one(doc_id(room_id), doc! { "$set": { "status": "done" } })
                    .await
                    .map_err(|source| MongoDaoError::CloseVoting { round_id, source })?;
            }
        }
        Ok(())
    }

    async fn fetch_rounds(&self, room_id: Uuid) -> MongoResult<Vec<RoundEntity>> {
        let documents: Vec<MongoRoundDocument> = self
            .rounds()
            .await
            .find(doc! { "room_id": uuid_as_binary(room_id) })
            .sort(doc! { "sequence": 1 })
            .await
            .map_err(|source| MongoDaoError::ListRounds { room_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListRounds { room_id, source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn fetch_scores(&self, room_id: Uuid) -> MongoResult<Vec<ScoreEntity>> {
        let documents: Vec<MongoScoreDocument> = self
            .scores()
            .await
            .find(doc! { "room_id": uuid_as_binary(room_id) })
            .sort(doc! { "first_scored_at": 1 })
            .await
            .map_err(|source| MongoDaoError::ListScores { room_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListScores { room_id, source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl RoomStore for MongoRoomStore {
    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_room(id).await.map_err(Into::into) })
    }

    fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_room(room).await.map_err(Into::into) })
    }

    fn begin_game(
        &self,
        room_id: Uuid,
        rounds: Vec<RoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.begin_game(room_id, rounds).await.map_err(Into::into) })
    }

    fn close_answering(
        &self,
        round_id: Uuid,
        answers: Vec<AnswerEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .close_answering(round_id, answers)
                .await
                .map_err(Into::into)
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
            store
                .close_voting(round_id, votes, deltas, outcome)
                .await
                .map_err(Into::into)
        })
    }

    fn fetch_rounds(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.fetch_rounds(room_id).await.map_err(Into::into) })
    }

    fn fetch_scores(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.fetch_scores(room_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
