use std::time::SystemTime;

use indexmap::IndexMap;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::dao::models::{RoundEntity, RoundStatus};
use crate::state::state_machine::SessionStateMachine;
use crate::state::tally::RoundTally;

/// One pre-generated round tracked inside a live session.
#[derive(Debug, Clone)]
pub struct RoundSlot {
    /// Identifier shared with the persisted round row.
    pub id: Uuid,
    /// 1-based position within the game.
    pub sequence: u32,
    /// Immutable question text.
    pub question: String,
    /// Current lifecycle status.
    pub status: RoundStatus,
}

impl RoundSlot {
    /// Projection of this slot as a persistence entity.
    pub fn to_entity(&self, room_id: Uuid) -> RoundEntity {
        RoundEntity {
            id: self.id,
            room_id,
            sequence: self.sequence,
            question: self.question.clone(),
            status: self.status,
        }
    }
}

/// Cumulative in-session score of one player.
///
/// Mirrors the persisted score row so the game keeps a correct scoreboard
/// even while storage is degraded. Map insertion order doubles as row
/// creation order for tie-breaking.
#[derive(Debug, Clone, Copy)]
pub struct ScoreEntry {
    /// Cumulative points earned this game.
    pub points: u32,
    /// When the entry was first created.
    pub first_scored_at: SystemTime,
}

/// The mutable state of one room's game, owned exclusively by its
/// [`RoomSession`] lock.
#[derive(Debug)]
pub struct SessionState {
    /// Room the session belongs to.
    pub room_id: Uuid,
    /// User allowed to start the game (checked before session creation,
    /// kept for snapshots).
    pub host_id: Uuid,
    /// Phase machine for the round cycle.
    pub machine: SessionStateMachine,
    /// All rounds of the game, ordered by sequence.
    pub rounds: Vec<RoundSlot>,
    /// Index of the round currently being played.
    pub current: usize,
    /// Answers and votes of the current round.
    pub tally: RoundTally,
    /// Shuffled answer ids shown during the voting phase.
    pub ballot: Vec<Uuid>,
    /// Cumulative scoreboard, insertion-ordered by first score.
    pub scores: IndexMap<Uuid, ScoreEntry>,
    /// Deadline of the current phase as a Unix-epoch millisecond
    /// timestamp, for client display.
    pub deadline_unix_ms: Option<u64>,
    /// Generation token of the armed phase timer. Expiry handlers that
    /// carry a different token are stale and must not act.
    pub timer_generation: u64,
}

impl SessionState {
    /// Build a fresh session in the waiting phase.
    pub fn new(room_id: Uuid, host_id: Uuid, rounds: Vec<RoundSlot>) -> Self {
        Self {
            room_id,
            host_id,
            machine: SessionStateMachine::new(),
            rounds,
            current: 0,
            tally: RoundTally::new(),
            ballot: Vec::new(),
            scores: IndexMap::new(),
            deadline_unix_ms: None,
            timer_generation: 0,
        }
    }

    /// The round currently being played.
    pub fn current_round(&self) -> &RoundSlot {
        &self.rounds[self.current]
    }

    /// Mutable access to the round currently being played.
    pub fn current_round_mut(&mut self) -> &mut RoundSlot {
        &mut self.rounds[self.current]
    }

    /// Index of the next pending round (lowest sequence), if any.
    pub fn next_pending(&self) -> Option<usize> {
        self.rounds
            .iter()
            .position(|round| round.status == RoundStatus::Pending)
    }

    /// Total number of rounds in this game.
    pub fn total_rounds(&self) -> u32 {
        self.rounds.len() as u32
    }
}

/// Handle to one room's serialized game state.
///
/// Every orchestrator operation, player actions and timer expirations
/// alike, locks the inner mutex for its full duration, including the
/// storage flush at phase boundaries. The mutex queue is what gives the
/// engine its FIFO processing guarantee per room; rooms never share a
/// lock.
#[derive(Debug)]
pub struct RoomSession {
    state: Mutex<SessionState>,
}

impl RoomSession {
    /// Wrap a fresh session state.
    pub fn new(state: SessionState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Acquire exclusive access to the session.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(n: u32) -> Vec<RoundSlot> {
        (1..=n)
            .map(|sequence| RoundSlot {
                id: Uuid::new_v4(),
                sequence,
                question: format!("question {sequence}"),
                status: if sequence == 1 {
                    RoundStatus::Active
                } else {
                    RoundStatus::Pending
                },
            })
            .collect()
    }

    #[test]
    fn next_pending_walks_rounds_in_order() {
        let mut state = SessionState::new(Uuid::new_v4(), Uuid::new_v4(), slots(3));
        assert_eq!(state.next_pending(), Some(1));

        state.rounds[1].status = RoundStatus::Finished;
        assert_eq!(state.next_pending(), Some(2));

        state.rounds[2].status = RoundStatus::Finished;
        assert_eq!(state.next_pending(), None);
    }

    #[test]
    fn round_slot_entity_projection_keeps_identity() {
        let state = SessionState::new(Uuid::new_v4(), Uuid::new_v4(), slots(1));
        let entity = state.current_round().to_entity(state.room_id);
        assert_eq!(entity.id, state.current_round().id);
        assert_eq!(entity.room_id, state.room_id);
        assert_eq!(entity.sequence, 1);
        assert_eq!(entity.status, RoundStatus::Active);
    }
}
