//! Round orchestration: the state machine driver for one room's game.
//!
//! Player actions and timer expirations for a room all serialize on the
//! room's session lock; every function here holds it for the full
//! operation, including the storage flush at phase boundaries, so no
//! later event can observe a half-applied transition. Persistence is
//! best-effort: a failed flush is logged and the game moves on.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rand::seq::SliceRandom;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dao::models::{AnswerEntity, RoundEntity, RoundStatus, VoteEntity};
use crate::dao::room_store::RoundOutcome;
use crate::dto::common::BallotEntry;
use crate::dto::epoch_millis;
use crate::dto::events::{
    AnswerResult, GameFinishedEvent, PhaseTickEvent, RoundFinishedEvent, RoundStartedEvent,
    VoteTallyEvent, VotingStartedEvent,
};
use crate::dto::validation;
use crate::error::{RoundError, ServiceError};
use crate::services::{broadcast, score_service};
use crate::state::SharedState;
use crate::state::session::{RoundSlot, SessionState};
use crate::state::state_machine::{SessionEvent, SessionPhase};

/// Which phase a timer expiry closes.
#[derive(Debug, Clone, Copy)]
enum PhaseEnd {
    Answering,
    Voting,
}

/// Start a game in a room: pre-generate all rounds, create the session,
/// and open round one for answers.
///
/// Requires the room to exist, the caller to be its host, and no session
/// to be running for it.
pub async fn start_game(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
    total_rounds: u32,
) -> Result<(), ServiceError> {
    let config = state.config();
    validation::validate_total_rounds(total_rounds, config.max_rounds())
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let store = state.require_store().await?;
    let room = store
        .find_room(room_id)
        .await?
        .ok_or(RoundError::RoomNotFound(room_id))?;
    if room.host_id != user_id {
        return Err(RoundError::NotHost.into());
    }
    if state.session(room_id).is_some() {
        return Err(RoundError::AlreadyStarted.into());
    }

    let questions = config.draw_prompts(total_rounds as usize);
    let rounds: Vec<RoundSlot> = questions
        .into_iter()
        .enumerate()
        .map(|(index, question)| RoundSlot {
            id: Uuid::new_v4(),
            sequence: index as u32 + 1,
            question,
            status: if index == 0 {
                RoundStatus::Active
            } else {
                RoundStatus::Pending
            },
        })
        .collect();

    let session = state
        .try_insert_session(room_id, SessionState::new(room_id, user_id, rounds))
        .ok_or(RoundError::AlreadyStarted)?;
    let mut sess = session.lock().await;

    let entities: Vec<RoundEntity> = sess
        .rounds
        .iter()
        .map(|slot| slot.to_entity(room_id))
        .collect();
    if let Err(err) = store.begin_game(room_id, entities).await {
        warn!(%room_id, error = %err, "failed to persist game start; continuing");
    }

    if let Err(err) = sess.machine.apply(SessionEvent::Start) {
        warn!(%room_id, error = %err, "fresh session refused to start");
        drop(sess);
        state.remove_session(room_id);
        return Err(ServiceError::InvalidState(err.to_string()));
    }

    info!(%room_id, %user_id, total_rounds, "game started");
    open_round(state, &mut sess, room_id);
    Ok(())
}

/// Record a player's answer for the active round.
///
/// Valid only during the answering phase. A second submission from the
/// same player fails without touching the stored content; the submitter
/// is acknowledged individually and nothing is broadcast, preserving
/// answer anonymity until voting opens.
pub async fn submit_answer(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
    round_id: Uuid,
    content: String,
) -> Result<Uuid, ServiceError> {
    if content.trim().is_empty() {
        return Err(RoundError::EmptyAnswer.into());
    }
    validation::validate_answer_content(&content)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let session = state
        .session(room_id)
        .ok_or(RoundError::WrongPhase { phase: "waiting" })?;
    let mut sess = session.lock().await;

    let phase = sess.machine.phase();
    if phase != SessionPhase::Answering {
        return Err(RoundError::WrongPhase {
            phase: phase.as_str(),
        }
        .into());
    }
    if sess.current_round().id != round_id {
        return Err(RoundError::UnknownRound(round_id).into());
    }

    let draft = sess
        .tally
        .record_answer(user_id, content)
        .ok_or(RoundError::DuplicateAnswer)?;
    let answer_id = draft.id;
    debug!(%room_id, %user_id, %answer_id, "answer recorded");
    Ok(answer_id)
}

/// Record a player's vote for an answer of the active round.
///
/// Valid only during the voting phase; self-votes and second votes are
/// rejected. On success the updated running count is broadcast to the
/// room (counts only, never voter identities).
pub async fn submit_vote(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
    round_id: Uuid,
    answer_id: Uuid,
) -> Result<usize, ServiceError> {
    let session = state
        .session(room_id)
        .ok_or(RoundError::WrongPhase { phase: "waiting" })?;
    let mut sess = session.lock().await;

    let phase = sess.machine.phase();
    if phase != SessionPhase::Voting {
        return Err(RoundError::WrongPhase {
            phase: phase.as_str(),
        }
        .into());
    }
    if sess.current_round().id != round_id {
        return Err(RoundError::UnknownRound(round_id).into());
    }

    let author_id = sess
        .tally
        .find_answer(answer_id)
        .map(|draft| draft.author_id)
        .ok_or(RoundError::UnknownAnswer(answer_id))?;
    if author_id == user_id {
        return Err(RoundError::SelfVote.into());
    }
    if !sess.tally.record_vote(user_id, answer_id) {
        return Err(RoundError::DuplicateVote.into());
    }

    let vote_count = sess.tally.votes_for(answer_id);
    debug!(%room_id, %user_id, %answer_id, vote_count, "vote recorded");
    drop(sess);

    broadcast::to_room(
        state,
        room_id,
        broadcast::EVENT_VOTE_TALLY,
        &VoteTallyEvent {
            answer_id,
            vote_count,
        },
    );
    Ok(vote_count)
}

/// Close the answering phase: flush answers, shuffle the ballot, open
/// voting. Invoked by the phase timer; stale or orphaned expirations
/// no-op silently.
pub(crate) async fn handle_answering_expired(state: SharedState, room_id: Uuid, generation: u64) {
    let Some(session) = state.session(room_id) else {
        debug!(%room_id, "answering deadline for a room without a session, ignoring");
        return;
    };
    let mut sess = session.lock().await;
    if !expiry_is_live(&state, &session, &sess, room_id, generation) {
        return;
    }
    if sess.machine.phase() != SessionPhase::Answering {
        debug!(%room_id, phase = sess.machine.phase().as_str(), "answering deadline in wrong phase, ignoring");
        return;
    }

    let round_id = sess.current_round().id;
    let answers: Vec<AnswerEntity> = sess
        .tally
        .answers()
        .map(|draft| AnswerEntity {
            id: draft.id,
            round_id,
            author_id: draft.author_id,
            content: draft.content.clone(),
            submitted_at: draft.submitted_at,
        })
        .collect();

    match state.store().await {
        Some(store) => {
            if let Err(err) = store.close_answering(round_id, answers).await {
                warn!(%room_id, %round_id, error = %err, "failed to flush answers; continuing");
            }
        }
        None => warn!(%room_id, %round_id, "storage degraded, skipping answer flush"),
    }

    if let Err(err) = sess.machine.apply(SessionEvent::CloseAnswers) {
        warn!(%room_id, error = %err, "could not close the answering phase");
        return;
    }
    sess.current_round_mut().status = RoundStatus::Voting;

    // Shuffling decorrelates ballot position from submission order, so
    // early answers are not identifiable by their slot.
    let mut ballot: Vec<Uuid> = sess.tally.answers().map(|draft| draft.id).collect();
    ballot.shuffle(&mut rand::rng());
    sess.ballot = ballot;

    let duration = state.config().voting_duration();
    let (timer_generation, deadline_ms) = arm_timer(&state, room_id, duration, PhaseEnd::Voting);
    sess.timer_generation = timer_generation;
    sess.deadline_unix_ms = Some(deadline_ms);

    let answers_payload: Vec<BallotEntry> = sess
        .ballot
        .iter()
        .filter_map(|id| sess.tally.find_answer(*id))
        .map(|draft| BallotEntry {
            id: draft.id,
            content: draft.content.clone(),
        })
        .collect();
    info!(%room_id, %round_id, answers = answers_payload.len(), "voting opened");
    broadcast::to_room(
        &state,
        room_id,
        broadcast::EVENT_VOTING_STARTED,
        &VotingStartedEvent {
            round_id,
            answers: answers_payload,
            deadline_ms,
            duration_seconds: duration.as_secs(),
        },
    );
}

/// Close the voting phase: flush votes, apply scores, reveal results, and
/// either open the next round or end the game.
pub(crate) async fn handle_voting_expired(state: SharedState, room_id: Uuid, generation: u64) {
    let Some(session) = state.session(room_id) else {
        debug!(%room_id, "voting deadline for a room without a session, ignoring");
        return;
    };
    let mut sess = session.lock().await;
    if !expiry_is_live(&state, &session, &sess, room_id, generation) {
        return;
    }
    if sess.machine.phase() != SessionPhase::Voting {
        debug!(%room_id, phase = sess.machine.phase().as_str(), "voting deadline in wrong phase, ignoring");
        return;
    }

    let round_id = sess.current_round().id;
    let votes: Vec<VoteEntity> = sess
        .tally
        .ballots()
        .map(|(voter_id, answer_id)| VoteEntity {
            round_id,
            answer_id,
            voter_id,
        })
        .collect();
    let results = sess.tally.tally();
    let deltas = score_service::round_deltas(&results);
    score_service::apply_round(&mut sess.scores, &deltas);
    sess.current_round_mut().status = RoundStatus::Finished;

    let next = sess.next_pending();
    let outcome = match next {
        Some(index) => RoundOutcome::NextRound(sess.rounds[index].id),
        None => RoundOutcome::GameOver(room_id),
    };

    match state.store().await {
        Some(store) => {
            if let Err(err) = store.close_voting(round_id, votes, deltas, outcome).await {
                warn!(%room_id, %round_id, error = %err, "failed to flush votes and scores; continuing");
            }
        }
        None => warn!(%room_id, %round_id, "storage degraded, skipping vote flush"),
    }

    let scoreboard = score_service::scoreboard(&sess.scores);
    let ordered_results: Vec<AnswerResult> = sess
        .ballot
        .iter()
        .filter_map(|id| results.iter().find(|tally| tally.answer.id == *id))
        .map(|tally| AnswerResult {
            answer_id: tally.answer.id,
            author_id: tally.answer.author_id,
            content: tally.answer.content.clone(),
            vote_count: tally.voters.len(),
        })
        .collect();
    info!(%room_id, %round_id, votes = sess.tally.vote_count(), "round finished");
    broadcast::to_room(
        &state,
        room_id,
        broadcast::EVENT_ROUND_FINISHED,
        &RoundFinishedEvent {
            round_id,
            results: ordered_results,
            scoreboard: scoreboard.clone(),
        },
    );

    sess.tally.clear();
    sess.ballot.clear();

    match next {
        Some(index) => {
            sess.current = index;
            if let Err(err) = sess.machine.apply(SessionEvent::NextRound) {
                warn!(%room_id, error = %err, "could not open the next round");
                return;
            }
            sess.current_round_mut().status = RoundStatus::Active;
            open_round(&state, &mut sess, room_id);
        }
        None => {
            if let Err(err) = sess.machine.apply(SessionEvent::Finish) {
                warn!(%room_id, error = %err, "could not finish the game");
            }
            sess.deadline_unix_ms = None;
            broadcast::to_room(
                &state,
                room_id,
                broadcast::EVENT_GAME_FINISHED,
                &GameFinishedEvent { scoreboard },
            );
            drop(sess);
            state.remove_session(room_id);
            info!(%room_id, "game finished, session destroyed");
        }
    }
}

/// Abort a room's running session, cancelling its timer first.
///
/// Returns whether a session existed. Used when the room itself is being
/// torn down by the room-management collaborator.
pub async fn teardown_room(state: &SharedState, room_id: Uuid) -> Result<bool, ServiceError> {
    let existed = state.remove_session(room_id).is_some();
    if existed {
        info!(%room_id, "running session torn down");
    }
    Ok(existed)
}

/// Open the current round for answers: arm the answering timer and
/// broadcast the question.
fn open_round(state: &SharedState, sess: &mut SessionState, room_id: Uuid) {
    let duration = state.config().answering_duration();
    let (generation, deadline_ms) = arm_timer(state, room_id, duration, PhaseEnd::Answering);
    sess.timer_generation = generation;
    sess.deadline_unix_ms = Some(deadline_ms);

    let round = sess.current_round();
    info!(%room_id, round_id = %round.id, round_number = round.sequence, "round opened");
    broadcast::to_room(
        state,
        room_id,
        broadcast::EVENT_ROUND_STARTED,
        &RoundStartedEvent {
            round_id: round.id,
            round_number: round.sequence,
            question: round.question.clone(),
            deadline_ms,
            duration_seconds: duration.as_secs(),
        },
    );
}

/// Arm the room's phase timer and return its generation token and the
/// absolute deadline in Unix milliseconds.
fn arm_timer(
    state: &SharedState,
    room_id: Uuid,
    duration: Duration,
    end: PhaseEnd,
) -> (u64, u64) {
    let deadline_ms = epoch_millis(SystemTime::now() + duration);

    let tick_state = Arc::clone(state);
    let expire_state = Arc::clone(state);
    let generation = state.timers().start(
        room_id,
        duration,
        move |remaining| {
            broadcast::to_room(
                &tick_state,
                room_id,
                broadcast::EVENT_PHASE_TICK,
                &PhaseTickEvent {
                    remaining_seconds: remaining.as_secs(),
                    deadline_ms,
                },
            );
        },
        move |generation| async move {
            match end {
                PhaseEnd::Answering => {
                    handle_answering_expired(expire_state, room_id, generation).await;
                }
                PhaseEnd::Voting => {
                    handle_voting_expired(expire_state, room_id, generation).await;
                }
            }
        },
    );
    (generation, deadline_ms)
}

/// Guard shared by both expiry handlers: the expiration must carry the
/// generation the session armed, and the session must still be the one
/// registered for the room (teardown can race an in-flight expiry).
fn expiry_is_live(
    state: &SharedState,
    session: &Arc<crate::state::session::RoomSession>,
    sess: &SessionState,
    room_id: Uuid,
    generation: u64,
) -> bool {
    if sess.timer_generation != generation {
        debug!(%room_id, generation, "stale phase deadline, ignoring");
        return false;
    }
    let registered = state
        .session(room_id)
        .map(|current| Arc::ptr_eq(&current, session))
        .unwrap_or(false);
    if !registered {
        debug!(%room_id, "phase deadline for a removed session, ignoring");
    }
    registered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    use tokio::sync::broadcast::Receiver;
    use tokio::time::sleep;

    use crate::config::AppConfig;
    use crate::dao::models::{RoomEntity, RoomStatus};
    use crate::dao::room_store::memory::MemoryRoomStore;
    use crate::dto::events::ServerEvent;
    use crate::state::AppState;

    async fn setup(players: usize) -> (SharedState, Uuid, Vec<Uuid>) {
        let users: Vec<Uuid> = (0..players).map(|_| Uuid::new_v4()).collect();
        let room = RoomEntity {
            id: Uuid::new_v4(),
            name: "game night".into(),
            host_id: users[0],
            members: users.clone(),
            status: RoomStatus::Open,
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

    async fn timer_generation(state: &SharedState, room_id: Uuid) -> u64 {
        let session = state.session(room_id).unwrap();
        let sess = session.lock().await;
        sess.timer_generation
    }

    fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
        use tokio::sync::broadcast::error::TryRecvError;
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }

    fn events_named<'a>(events: &'a [ServerEvent], name: &str) -> Vec<&'a ServerEvent> {
        events.iter().filter(|event| event.event == name).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_two_players_one_round_full_flow() {
        let (state, room_id, users) = setup(2).await;
        let mut rx = state.hub(room_id).subscribe();
        let config = state.config();

        start_game(&state, room_id, users[0], 1).await.unwrap();
        let round_id = active_round_id(&state, room_id).await;

        let answer_a = submit_answer(&state, room_id, users[0], round_id, "a pun".into())
            .await
            .unwrap();
        submit_answer(&state, room_id, users[1], round_id, "a worse pun".into())
            .await
            .unwrap();

        // Answering window elapses; the timer drives the transition.
        sleep(config.answering_duration() + Duration::from_secs(1)).await;

        let events = drain(&mut rx);
        let voting_started = events_named(&events, broadcast::EVENT_VOTING_STARTED);
        assert_eq!(voting_started.len(), 1);
        let answers = voting_started[0].data["answers"].as_array().unwrap();
        assert_eq!(answers.len(), 2);
        for answer in answers {
            assert!(answer.get("author_id").is_none());
            assert!(answer.get("content").is_some());
        }

        submit_vote(&state, room_id, users[1], round_id, answer_a)
            .await
            .unwrap();

        sleep(config.voting_duration() + Duration::from_secs(1)).await;

        let events = drain(&mut rx);
        let finished = events_named(&events, broadcast::EVENT_ROUND_FINISHED);
        assert_eq!(finished.len(), 1);
        let scoreboard = finished[0].data["scoreboard"].as_array().unwrap();
        assert_eq!(scoreboard.len(), 2);
        assert_eq!(scoreboard[0]["user_id"], users[0].to_string());
        assert_eq!(scoreboard[0]["points"], 1);
        assert_eq!(scoreboard[1]["points"], 0);

        // Single round, so the game ends immediately after.
        assert_eq!(events_named(&events, broadcast::EVENT_GAME_FINISHED).len(), 1);
        assert!(state.session(room_id).is_none());
        assert_eq!(state.timers().remaining(room_id), Duration::ZERO);

        let store = state.store().await.unwrap();
        let room = store.find_room(room_id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Done);
        let scores = store.fetch_scores(room_id).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().any(|row| row.user_id == users[0] && row.points == 1));
        assert!(scores.iter().any(|row| row.user_id == users[1] && row.points == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_duplicate_answer_keeps_the_first_submission() {
        let (state, room_id, users) = setup(2).await;
        start_game(&state, room_id, users[0], 1).await.unwrap();
        let round_id = active_round_id(&state, room_id).await;

        submit_answer(&state, room_id, users[1], round_id, "original".into())
            .await
            .unwrap();
        let err = submit_answer(&state, room_id, users[1], round_id, "changed my mind".into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(RoundError::DuplicateAnswer)
        ));

        let session = state.session(room_id).unwrap();
        let sess = session.lock().await;
        assert_eq!(sess.tally.answer_of(users[1]).unwrap().content, "original");
        assert_eq!(sess.tally.answer_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_self_vote_is_rejected_without_a_tally_update() {
        let (state, room_id, users) = setup(2).await;
        start_game(&state, room_id, users[0], 1).await.unwrap();
        let round_id = active_round_id(&state, room_id).await;

        let own_answer = submit_answer(&state, room_id, users[0], round_id, "mine".into())
            .await
            .unwrap();
        let generation = timer_generation(&state, room_id).await;
        handle_answering_expired(Arc::clone(&state), room_id, generation).await;

        let mut rx = state.hub(room_id).subscribe();
        let err = submit_vote(&state, room_id, users[0], round_id, own_answer)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(RoundError::SelfVote)));

        let session = state.session(room_id).unwrap();
        let sess = session.lock().await;
        assert_eq!(sess.tally.vote_count(), 0);
        drop(sess);
        assert!(events_named(&drain(&mut rx), broadcast::EVENT_VOTE_TALLY).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn second_vote_fails_regardless_of_target() {
        let (state, room_id, users) = setup(3).await;
        start_game(&state, room_id, users[0], 1).await.unwrap();
        let round_id = active_round_id(&state, room_id).await;

        let answer_a = submit_answer(&state, room_id, users[0], round_id, "a".into())
            .await
            .unwrap();
        let answer_b = submit_answer(&state, room_id, users[1], round_id, "b".into())
            .await
            .unwrap();
        let generation = timer_generation(&state, room_id).await;
        handle_answering_expired(Arc::clone(&state), room_id, generation).await;

        submit_vote(&state, room_id, users[2], round_id, answer_a)
            .await
            .unwrap();
        let err = submit_vote(&state, room_id, users[2], round_id, answer_b)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(RoundError::DuplicateVote)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn start_game_validations() {
        let (state, room_id, users) = setup(2).await;

        let err = start_game(&state, Uuid::new_v4(), users[0], 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(RoundError::RoomNotFound(_))
        ));

        let err = start_game(&state, room_id, users[1], 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(RoundError::NotHost)));

        let err = start_game(&state, room_id, users[0], 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        start_game(&state, room_id, users[0], 2).await.unwrap();
        let err = start_game(&state, room_id, users[0], 2).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(RoundError::AlreadyStarted)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn actions_in_the_wrong_phase_are_rejected() {
        let (state, room_id, users) = setup(2).await;

        // No session yet.
        let err = submit_answer(&state, room_id, users[0], Uuid::new_v4(), "early".into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(RoundError::WrongPhase { .. })
        ));

        start_game(&state, room_id, users[0], 1).await.unwrap();
        let round_id = active_round_id(&state, room_id).await;

        // Voting before the answering window closed.
        let err = submit_vote(&state, room_id, users[0], round_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(RoundError::WrongPhase { .. })
        ));

        // Answer targeting a round that is not active.
        let err = submit_answer(&state, room_id, users[0], Uuid::new_v4(), "late".into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(RoundError::UnknownRound(_))
        ));

        let generation = timer_generation(&state, room_id).await;
        handle_answering_expired(Arc::clone(&state), room_id, generation).await;
        let err = submit_answer(&state, room_id, users[0], round_id, "too late".into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(RoundError::WrongPhase { .. })
        ));

        let err = submit_vote(&state, room_id, users[0], round_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rejected(RoundError::UnknownAnswer(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn round_with_no_answers_still_completes() {
        let (state, room_id, users) = setup(2).await;
        let mut rx = state.hub(room_id).subscribe();
        let config = state.config();

        start_game(&state, room_id, users[0], 1).await.unwrap();
        sleep(config.answering_duration() + Duration::from_secs(1)).await;
        sleep(config.voting_duration() + Duration::from_secs(1)).await;

        let events = drain(&mut rx);
        let voting_started = events_named(&events, broadcast::EVENT_VOTING_STARTED);
        assert_eq!(voting_started.len(), 1);
        assert!(voting_started[0].data["answers"].as_array().unwrap().is_empty());
        assert_eq!(events_named(&events, broadcast::EVENT_GAME_FINISHED).len(), 1);
        assert!(state.session(room_id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_chain_until_the_last_one() {
        let (state, room_id, users) = setup(2).await;
        let mut rx = state.hub(room_id).subscribe();
        let config = state.config();
        let cycle = config.answering_duration() + config.voting_duration();

        start_game(&state, room_id, users[0], 3).await.unwrap();
        sleep(cycle + Duration::from_secs(2)).await;
        let mut events = drain(&mut rx);

        // Round two opened automatically.
        let session = state.session(room_id).unwrap();
        {
            let sess = session.lock().await;
            assert_eq!(sess.current_round().sequence, 2);
            assert_eq!(sess.machine.phase(), SessionPhase::Answering);
        }

        sleep(cycle * 2 + Duration::from_secs(2)).await;
        assert!(state.session(room_id).is_none());
        events.extend(drain(&mut rx));

        assert_eq!(events_named(&events, broadcast::EVENT_ROUND_STARTED).len(), 3);
        assert_eq!(events_named(&events, broadcast::EVENT_ROUND_FINISHED).len(), 3);
        assert_eq!(events_named(&events, broadcast::EVENT_GAME_FINISHED).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_the_phase_timer() {
        let (state, room_id, users) = setup(2).await;
        start_game(&state, room_id, users[0], 1).await.unwrap();
        assert!(state.timers().remaining(room_id) > Duration::ZERO);

        assert!(teardown_room(&state, room_id).await.unwrap());
        assert!(state.session(room_id).is_none());
        assert_eq!(state.timers().remaining(room_id), Duration::ZERO);

        // The already-scheduled expiry must not resurrect anything.
        sleep(Duration::from_secs(300)).await;
        assert!(state.session(room_id).is_none());
        assert!(!teardown_room(&state, room_id).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_expiry_generation_is_ignored() {
        let (state, room_id, users) = setup(2).await;
        start_game(&state, room_id, users[0], 1).await.unwrap();
        let generation = timer_generation(&state, room_id).await;

        handle_answering_expired(Arc::clone(&state), room_id, generation + 1).await;
        let session = state.session(room_id).unwrap();
        let sess = session.lock().await;
        assert_eq!(sess.machine.phase(), SessionPhase::Answering);
    }
}
