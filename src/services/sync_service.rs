//! Snapshot assembly for joining and reconnecting clients.
//!
//! A snapshot carries everything a client needs to render the room after
//! missing any number of broadcasts. During the answering phase it never
//! includes another player's answer content; only the requester's own
//! submission plus an aggregate count crosses the wire.

use tracing::warn;
use uuid::Uuid;

use crate::dao::models::RoomStatus;
use crate::dto::common::{
    AnswerCount, AnswerProgress, BallotEntry, DeadlineSnapshot, RoundSnapshot, SessionSnapshot,
    VotingProgress,
};
use crate::dto::phase::VisiblePhase;
use crate::error::ServiceError;
use crate::services::score_service;
use crate::state::SharedState;
use crate::state::state_machine::SessionPhase;

/// Assemble a full-state snapshot of a room for one requester.
///
/// Falls back to persisted state when no session is live: a finished
/// room yields the final scoreboard, anything else a minimal waiting
/// snapshot.
pub async fn build_snapshot(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    let connected = state.presence().users(room_id);
    let degraded = state.is_degraded();

    if let Some(session) = state.session(room_id) {
        let sess = session.lock().await;
        let phase = sess.machine.phase();
        let round = sess.current_round();

        let deadline = sess.deadline_unix_ms.map(|deadline_ms| DeadlineSnapshot {
            deadline_ms,
            remaining_seconds: state.timers().remaining(room_id).as_secs(),
        });

        let answers = (phase == SessionPhase::Answering).then(|| AnswerProgress {
            submitted_count: sess.tally.answer_count(),
            has_answered: sess.tally.answer_of(user_id).is_some(),
            own_content: sess
                .tally
                .answer_of(user_id)
                .map(|draft| draft.content.clone()),
        });

        let voting = (phase == SessionPhase::Voting).then(|| VotingProgress {
            ballot: sess
                .ballot
                .iter()
                .filter_map(|id| sess.tally.find_answer(*id))
                .map(|draft| BallotEntry {
                    id: draft.id,
                    content: draft.content.clone(),
                })
                .collect(),
            counts: sess
                .ballot
                .iter()
                .map(|id| AnswerCount {
                    answer_id: *id,
                    vote_count: sess.tally.votes_for(*id),
                })
                .collect(),
            has_voted: sess.tally.ballot_of(user_id).is_some(),
        });

        return Ok(SessionSnapshot {
            room_id,
            phase: phase.into(),
            degraded,
            total_rounds: Some(sess.total_rounds()),
            round: Some(RoundSnapshot {
                id: round.id,
                number: round.sequence,
                question: round.question.clone(),
            }),
            deadline,
            answers,
            voting,
            scoreboard: score_service::scoreboard(&sess.scores),
            connected,
        });
    }

    let Some(store) = state.store().await else {
        // Storage is down and no game is running: nothing better to
        // report than an empty waiting room.
        return Ok(minimal_snapshot(room_id, VisiblePhase::Waiting, degraded, connected));
    };

    let room = store
        .find_room(room_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}` not found")))?;

    if room.status == RoomStatus::Done {
        let scoreboard = match store.fetch_scores(room_id).await {
            Ok(rows) => score_service::scoreboard_from_rows(rows),
            Err(err) => {
                warn!(%room_id, error = %err, "failed to load persisted scores for snapshot");
                Vec::new()
            }
        };
        let mut snapshot = minimal_snapshot(room_id, VisiblePhase::Finished, degraded, connected);
        snapshot.scoreboard = scoreboard;
        return Ok(snapshot);
    }

    Ok(minimal_snapshot(room_id, VisiblePhase::Waiting, degraded, connected))
}

fn minimal_snapshot(
    room_id: Uuid,
    phase: VisiblePhase,
    degraded: bool,
    connected: Vec<Uuid>,
) -> SessionSnapshot {
    SessionSnapshot {
        room_id,
        phase,
        degraded,
        total_rounds: None,
        round: None,
        deadline: None,
        answers: None,
        voting: None,
        scoreboard: Vec::new(),
        connected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::SystemTime;

    use crate::config::AppConfig;
    use crate::dao::models::RoomEntity;
    use crate::dao::room_store::memory::MemoryRoomStore;
    use crate::services::round_service;
    use crate::state::AppState;

    async fn setup(players: usize) -> (SharedState, Uuid, Vec<Uuid>) {
        let users: Vec<Uuid> = (0..players).map(|_| Uuid::new_v4()).collect();
        let room = RoomEntity {
            id: Uuid::new_v4(),
            name: "snapshot room".into(),
            host_id: users[0],
            members: users.clone(),
            status: crate::dao::models::RoomStatus::Open,
            created_at: SystemTime::now(),
        };
        let room_id = room.id;
        let state = AppState::new(AppConfig::default());
        state
            .install_store(Arc::new(MemoryRoomStore::with_rooms([room])))
            .await;
        (state, room_id, users)
    }

    async fn active_round_id(state: &SharedState, room_id: Uuid) -> Uuid {
        let session = state.session(room_id).unwrap();
        let sess = session.lock().await;
        sess.current_round().id
    }

    async fn answering_generation(state: &SharedState, room_id: Uuid) -> u64 {
        let session = state.session(room_id).unwrap();
        let sess = session.lock().await;
        sess.timer_generation
    }

    #[tokio::test(start_paused = true)]
    async fn answering_snapshot_hides_other_answers() {
        let (state, room_id, users) = setup(3).await;
        round_service::start_game(&state, room_id, users[0], 1)
            .await
            .unwrap();
        let round_id = active_round_id(&state, room_id).await;

        round_service::submit_answer(&state, room_id, users[0], round_id, "mine".into())
            .await
            .unwrap();
        round_service::submit_answer(&state, room_id, users[1], round_id, "theirs".into())
            .await
            .unwrap();

        let snapshot = build_snapshot(&state, room_id, users[0]).await.unwrap();
        assert_eq!(snapshot.phase, VisiblePhase::Answering);
        let answers = snapshot.answers.unwrap();
        assert_eq!(answers.submitted_count, 2);
        assert!(answers.has_answered);
        assert_eq!(answers.own_content.as_deref(), Some("mine"));
        assert!(snapshot.voting.is_none());

        // A player who has not answered sees counts but no content at all.
        let other = build_snapshot(&state, room_id, users[2]).await.unwrap();
        let answers = other.answers.as_ref().unwrap();
        assert!(!answers.has_answered);
        assert!(answers.own_content.is_none());

        let raw = serde_json::to_string(&other).unwrap();
        assert!(!raw.contains("mine"));
        assert!(!raw.contains("theirs"));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_snapshot_mid_voting_reports_ballot_and_vote_status() {
        let (state, room_id, users) = setup(3).await;
        round_service::start_game(&state, room_id, users[0], 1)
            .await
            .unwrap();
        let round_id = active_round_id(&state, room_id).await;

        let answer_a = round_service::submit_answer(
            &state,
            room_id,
            users[0],
            round_id,
            "a ghost-run bakery".into(),
        )
        .await
        .unwrap();
        round_service::submit_answer(&state, room_id, users[1], round_id, "socks with soup".into())
            .await
            .unwrap();

        let generation = answering_generation(&state, room_id).await;
        round_service::handle_answering_expired(Arc::clone(&state), room_id, generation).await;

        round_service::submit_vote(&state, room_id, users[1], round_id, answer_a)
            .await
            .unwrap();

        let voter_view = build_snapshot(&state, room_id, users[1]).await.unwrap();
        assert_eq!(voter_view.phase, VisiblePhase::Voting);
        let voting = voter_view.voting.as_ref().unwrap();
        assert_eq!(voting.ballot.len(), 2);
        assert!(voting.has_voted);
        let total_votes: usize = voting.counts.iter().map(|count| count.vote_count).sum();
        assert_eq!(total_votes, 1);
        let deadline = voter_view.deadline.as_ref().unwrap();
        assert!(deadline.remaining_seconds > 0);

        let bystander_view = build_snapshot(&state, room_id, users[2]).await.unwrap();
        assert!(!bystander_view.voting.unwrap().has_voted);
        // Authors are not part of the ballot payload.
        let raw = serde_json::to_string(&voter_view).unwrap();
        assert!(!raw.contains(&users[0].to_string()));
    }

    #[tokio::test]
    async fn unknown_room_snapshot_is_not_found() {
        let (state, _room_id, users) = setup(1).await;
        let err = build_snapshot(&state, Uuid::new_v4(), users[0])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn open_room_without_session_reports_waiting() {
        let (state, room_id, users) = setup(2).await;
        let snapshot = build_snapshot(&state, room_id, users[0]).await.unwrap();
        assert_eq!(snapshot.phase, VisiblePhase::Waiting);
        assert!(snapshot.round.is_none());
        assert!(snapshot.scoreboard.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_room_snapshot_serves_persisted_scores() {
        let (state, room_id, users) = setup(2).await;
        round_service::start_game(&state, room_id, users[0], 1)
            .await
            .unwrap();
        let round_id = active_round_id(&state, room_id).await;
        let answer_a = round_service::submit_answer(
            &state,
            room_id,
            users[0],
            round_id,
            "a closing act".into(),
        )
        .await
        .unwrap();
        round_service::submit_answer(&state, room_id, users[1], round_id, "other".into())
            .await
            .unwrap();

        let generation = answering_generation(&state, room_id).await;
        round_service::handle_answering_expired(Arc::clone(&state), room_id, generation).await;
        round_service::submit_vote(&state, room_id, users[1], round_id, answer_a)
            .await
            .unwrap();
        let generation = answering_generation(&state, room_id).await;
        round_service::handle_voting_expired(Arc::clone(&state), room_id, generation).await;

        assert!(state.session(room_id).is_none());
        let snapshot = build_snapshot(&state, room_id, users[1]).await.unwrap();
        assert_eq!(snapshot.phase, VisiblePhase::Finished);
        assert_eq!(snapshot.scoreboard.len(), 2);
        assert_eq!(snapshot.scoreboard[0].user_id, users[0]);
        assert_eq!(snapshot.scoreboard[0].points, 1);
        assert_eq!(snapshot.scoreboard[1].points, 0);
    }
}
