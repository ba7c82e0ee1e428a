use std::time::SystemTime;

use indexmap::IndexMap;
use uuid::Uuid;

/// An answer held in memory while its round is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerDraft {
    /// Identifier the answer will keep when flushed to storage.
    pub id: Uuid,
    /// Player who wrote the answer.
    pub author_id: Uuid,
    /// Submitted text.
    pub content: String,
    /// Submission timestamp.
    pub submitted_at: SystemTime,
}

/// Per-answer result of a finished voting phase.
#[derive(Debug, Clone)]
pub struct AnswerTally {
    /// The answer the votes were cast for.
    pub answer: AnswerDraft,
    /// Identities of the voters, in ballot order. Server-side only.
    pub voters: Vec<Uuid>,
}

/// In-memory answers and votes for the round currently in progress.
///
/// Two independent dedup structures: answers are keyed by author (at most
/// one answer per player per round), votes are keyed by voter (at most one
/// ballot per player per round, regardless of target). Insertion order is
/// preserved; score rows are later created in answer-submission order.
#[derive(Debug, Default)]
pub struct RoundTally {
    answers: IndexMap<Uuid, AnswerDraft>,
    ballots: IndexMap<Uuid, Uuid>,
}

impl RoundTally {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer for `author_id`. Returns the stored draft, or
    /// `None` when the author already has an entry; the first
    /// submission always wins.
    pub fn record_answer(&mut self, author_id: Uuid, content: String) -> Option<&AnswerDraft> {
        if self.answers.contains_key(&author_id) {
            return None;
        }
        let draft = AnswerDraft {
            id: Uuid::new_v4(),
            author_id,
            content,
            submitted_at: SystemTime::now(),
        };
        let stored = self.answers.entry(author_id).or_insert(draft);
        Some(&*stored)
    }

    /// Record a ballot from `voter_id` for `answer_id`. Returns `false`
    /// when the voter already cast a ballot this round; there is no way
    /// to change a vote once recorded.
    pub fn record_vote(&mut self, voter_id: Uuid, answer_id: Uuid) -> bool {
        if self.ballots.contains_key(&voter_id) {
            return false;
        }
        self.ballots.insert(voter_id, answer_id);
        true
    }

    /// The draft submitted by `author_id`, if any.
    pub fn answer_of(&self, author_id: Uuid) -> Option<&AnswerDraft> {
        self.answers.get(&author_id)
    }

    /// Look up a draft by its answer identifier.
    pub fn find_answer(&self, answer_id: Uuid) -> Option<&AnswerDraft> {
        self.answers.values().find(|draft| draft.id == answer_id)
    }

    /// The answer `voter_id` voted for, if they voted.
    pub fn ballot_of(&self, voter_id: Uuid) -> Option<Uuid> {
        self.ballots.get(&voter_id).copied()
    }

    /// Number of answers submitted so far.
    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    /// Number of ballots cast so far.
    pub fn vote_count(&self) -> usize {
        self.ballots.len()
    }

    /// Votes currently counted for one answer.
    pub fn votes_for(&self, answer_id: Uuid) -> usize {
        self.ballots.values().filter(|id| **id == answer_id).count()
    }

    /// All drafts in submission order.
    pub fn answers(&self) -> impl Iterator<Item = &AnswerDraft> {
        self.answers.values()
    }

    /// All ballots as `(voter_id, answer_id)` pairs in submission order.
    pub fn ballots(&self) -> impl Iterator<Item = (Uuid, Uuid)> + '_ {
        self.ballots.iter().map(|(voter, answer)| (*voter, *answer))
    }

    /// Full per-answer tally (vote counts and voter identities), in
    /// answer-submission order. Voter identities never leave the server
    /// before the round finishes.
    pub fn tally(&self) -> Vec<AnswerTally> {
        self.answers
            .values()
            .map(|draft| AnswerTally {
                answer: draft.clone(),
                voters: self
                    .ballots
                    .iter()
                    .filter(|(_, answer_id)| **answer_id == draft.id)
                    .map(|(voter_id, _)| *voter_id)
                    .collect(),
            })
            .collect()
    }

    /// Drop all per-round state. Called after the round's artifacts were
    /// flushed to storage.
    pub fn clear(&mut self) {
        self.answers.clear();
        self.ballots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_answer_from_same_author_is_rejected() {
        let mut tally = RoundTally::new();
        let author = Uuid::new_v4();

        let first = tally.record_answer(author, "soup".into()).unwrap().clone();
        assert!(tally.record_answer(author, "salad".into()).is_none());

        let stored = tally.answer_of(author).unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.content, "soup");
        assert_eq!(tally.answer_count(), 1);
    }

    #[test]
    fn one_ballot_per_voter_regardless_of_target() {
        let mut tally = RoundTally::new();
        let a = tally.record_answer(Uuid::new_v4(), "a".into()).unwrap().id;
        let b = tally.record_answer(Uuid::new_v4(), "b".into()).unwrap().id;
        let voter = Uuid::new_v4();

        assert!(tally.record_vote(voter, a));
        assert!(!tally.record_vote(voter, b));
        assert_eq!(tally.ballot_of(voter), Some(a));
        assert_eq!(tally.votes_for(a), 1);
        assert_eq!(tally.votes_for(b), 0);
    }

    #[test]
    fn tally_reports_counts_and_voters_in_submission_order() {
        let mut tally = RoundTally::new();
        let author_a = Uuid::new_v4();
        let author_b = Uuid::new_v4();
        let a = tally.record_answer(author_a, "a".into()).unwrap().id;
        let b = tally.record_answer(author_b, "b".into()).unwrap().id;

        let v1 = Uuid::new_v4();
        let v2 = Uuid::new_v4();
        tally.record_vote(v1, a);
        tally.record_vote(v2, a);
        tally.record_vote(author_a, b);

        let results = tally.tally();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].answer.id, a);
        assert_eq!(results[0].voters, vec![v1, v2]);
        assert_eq!(results[1].answer.id, b);
        assert_eq!(results[1].voters, vec![author_a]);
    }

    #[test]
    fn clear_drops_everything() {
        let mut tally = RoundTally::new();
        let author = Uuid::new_v4();
        let answer = tally.record_answer(author, "x".into()).unwrap().id;
        tally.record_vote(Uuid::new_v4(), answer);

        tally.clear();
        assert_eq!(tally.answer_count(), 0);
        assert_eq!(tally.vote_count(), 0);
        assert!(tally.find_answer(answer).is_none());
    }
}
