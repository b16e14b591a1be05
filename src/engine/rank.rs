//! Standard competition ranking ("1224").

use std::cmp::Ordering;

/// One subject's rank for one metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub subject_key: String,
    pub ranked_value: u64,
    pub rank: u64,
}

/// Rank `(key, value)` pairs by value, highest first.
///
/// Equal values share a rank and the counter still advances past the tie
/// group. Ties are listed in ascending key order.
pub fn assign_ranks<I, K>(values: I) -> Vec<RankEntry>
where
    I: IntoIterator<Item = (K, u64)>,
    K: Into<String>,
{
    let mut sorted: Vec<(String, u64)> = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
    sorted.sort_by(|a, b| match b.1.cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });

    let mut entries: Vec<RankEntry> = Vec::with_capacity(sorted.len());
    for (position, (subject_key, ranked_value)) in sorted.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.ranked_value == ranked_value => prev.rank,
            _ => position as u64 + 1,
        };
        entries.push(RankEntry {
            subject_key,
            ranked_value,
            rank,
        });
    }
    entries
}
