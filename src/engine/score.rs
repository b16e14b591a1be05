//! Score and commit count derivation over the commit ledger.
//!
//! Only commit events count. Both figures are recomputed from scratch on every
//! pass.

use serde_json::{Map, Value, json};

use crate::domain::{CommitLedger, fields};
use crate::engine::window::TimeWindow;

/// Derived figures for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreCard {
    /// Sum of commit_count x stars_count over windowed events
    pub score: u64,
    /// Sum of commit_count over windowed events
    pub commits_total_count: u64,
}

impl ScoreCard {
    /// Fields to write back onto the user document
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(fields::SCORE.to_string(), json!(self.score));
        map.insert(fields::COMMITS_TOTAL_COUNT.to_string(), json!(self.commits_total_count));
        map
    }
}

pub fn score_ledger(ledger: &CommitLedger, window: &TimeWindow) -> ScoreCard {
    window
        .select(ledger)
        .fold(ScoreCard::default(), |mut card, (stars, event)| {
            card.score = card.score.saturating_add(event.commit_count.saturating_mul(stars));
            card.commits_total_count = card.commits_total_count.saturating_add(event.commit_count);
            card
        })
}
