//! Score aggregation: vote tallies become point deltas, deltas become a
//! monotonically growing scoreboard.

use std::time::SystemTime;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::dao::models::{ScoreDelta, ScoreEntity};
use crate::dto::common::ScoreboardEntry;
use crate::state::session::ScoreEntry;
use crate::state::tally::AnswerTally;

/// Points earned this round: one delta per answer author, equal to the
/// answer's vote count. Authors with zero votes still get a delta so
/// their score row exists from the round they first played.
pub fn round_deltas(results: &[AnswerTally]) -> Vec<ScoreDelta> {
    results
        .iter()
        .map(|tally| ScoreDelta {
            user_id: tally.answer.author_id,
            points: tally.voters.len() as u32,
        })
        .collect()
}

/// Merge round deltas into the in-session scoreboard. Accumulation only;
/// no delta can reduce a score.
pub fn apply_round(scores: &mut IndexMap<Uuid, ScoreEntry>, deltas: &[ScoreDelta]) {
    for delta in deltas {
        scores
            .entry(delta.user_id)
            .and_modify(|entry| entry.points += delta.points)
            .or_insert(ScoreEntry {
                points: delta.points,
                first_scored_at: SystemTime::now(),
            });
    }
}

/// Scoreboard rows ordered by points descending. The sort is stable over
/// map insertion order, so ties rank whoever scored first ahead.
pub fn scoreboard(scores: &IndexMap<Uuid, ScoreEntry>) -> Vec<ScoreboardEntry> {
    let mut rows: Vec<ScoreboardEntry> = scores
        .iter()
        .map(|(user_id, entry)| ScoreboardEntry {
            user_id: *user_id,
            points: entry.points,
        })
        .collect();
    rows.sort_by(|a, b| b.points.cmp(&a.points));
    rows
}

/// Scoreboard assembled from persisted rows, used once a game is over.
pub fn scoreboard_from_rows(mut rows: Vec<ScoreEntity>) -> Vec<ScoreboardEntry> {
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| a.first_scored_at.cmp(&b.first_scored_at))
    });
    rows.into_iter()
        .map(|row| ScoreboardEntry {
            user_id: row.user_id,
            points: row.points,
        })
        .collect()
}
