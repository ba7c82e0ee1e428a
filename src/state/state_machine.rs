use thiserror::Error;

/// Phase of a room's live game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Session created, first round not yet opened.
    Waiting,
    /// Players are answering the current round's question.
    Answering,
    /// Players are voting on the anonymized answers.
    Voting,
    /// The last round is done; the session is about to be torn down.
    Finished,
}

impl SessionPhase {
    /// Stable lowercase label used in logs and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Waiting => "waiting",
            SessionPhase::Answering => "answering",
            SessionPhase::Voting => "voting",
            SessionPhase::Finished => "finished",
        }
    }
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Open the first round for answers.
    Start,
    /// The answering window elapsed; move to voting.
    CloseAnswers,
    /// Voting elapsed and another round is pending; open it for answers.
    NextRound,
    /// Voting elapsed on the last round; the game is over.
    Finish,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine implementing the answer/vote round cycle of one room.
///
/// The owning [`crate::state::session::RoomSession`] serializes all access,
/// so transitions apply directly; there is no pending/commit step.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Waiting,
            version: 0,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine in the waiting phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Apply an event, moving to the next phase when the transition is
    /// valid from the current one.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(self.phase)
    }

    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Waiting, SessionEvent::Start) => SessionPhase::Answering,
            (SessionPhase::Answering, SessionEvent::CloseAnswers) => SessionPhase::Voting,
            (SessionPhase::Voting, SessionEvent::NextRound) => SessionPhase::Answering,
            (SessionPhase::Voting, SessionEvent::Finish) => SessionPhase::Finished,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_phase_is_waiting() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Waiting);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn two_round_happy_path() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(apply(&mut sm, SessionEvent::Start), SessionPhase::Answering);
        assert_eq!(
            apply(&mut sm, SessionEvent::CloseAnswers),
            SessionPhase::Voting
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::NextRound),
            SessionPhase::Answering
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::CloseAnswers),
            SessionPhase::Voting
        );
        assert_eq!(apply(&mut sm, SessionEvent::Finish), SessionPhase::Finished);
        assert_eq!(sm.version(), 5);
    }

    #[test]
    fn voting_cannot_open_from_waiting() {
        let mut sm = SessionStateMachine::new();
        let err = sm.apply(SessionEvent::CloseAnswers).unwrap_err();
        assert_eq!(err.from, SessionPhase::Waiting);
        assert_eq!(err.event, SessionEvent::CloseAnswers);
        assert_eq!(sm.phase(), SessionPhase::Waiting);
    }

    #[test]
    fn finished_is_terminal() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::CloseAnswers);
        apply(&mut sm, SessionEvent::Finish);

        for event in [
            SessionEvent::Start,
            SessionEvent::CloseAnswers,
            SessionEvent::NextRound,
            SessionEvent::Finish,
        ] {
            assert!(sm.apply(event).is_err());
        }
        assert_eq!(sm.phase(), SessionPhase::Finished);
    }

    #[test]
    fn failed_transition_does_not_bump_version() {
        let mut sm = SessionStateMachine::new();
        let _ = sm.apply(SessionEvent::Finish);
        assert_eq!(sm.version(), 0);
    }
}
