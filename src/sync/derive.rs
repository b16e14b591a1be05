//! Derived fields, recomputed in full on every pass.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::{Stat, fields};
use crate::engine::{TimeWindow, assign_ranks, score_ledger};
use crate::error::Result;
use crate::storage::{OrgStore, Sort, StatStore, Storage, UserStore};

/// Write `score` and `commitsTotalCount` for every user.
///
/// Returns the number of users updated.
pub fn update_scores<S: Storage>(storage: &S, window: &TimeWindow) -> Result<usize> {
    let users = UserStore::new(storage);
    let all = users.list_sorted(&[Sort::asc("username")])?;

    for user in &all {
        let card = score_ledger(&user.commit_contributions, window);
        users.set_scalar_fields(&user.username, card.to_fields())?;
        log::debug!(
            "User {}: score {}, commits {}",
            user.username,
            card.score,
            card.commits_total_count
        );
    }

    log::info!("Scored {} users", all.len());
    Ok(all.len())
}

#[derive(Debug, Deserialize)]
struct RepositoryCount {
    username: String,
    #[serde(default)]
    repositories: Vec<Value>,
}

/// Write `repositories_count` for every organization
pub fn update_repository_counts<S: Storage>(storage: &S) -> Result<usize> {
    let orgs = OrgStore::new(storage);
    let rows: Vec<RepositoryCount> = orgs.list_projected(&[Sort::asc("username")])?;

    for row in &rows {
        let mut update = Map::new();
        update.insert(fields::REPOSITORIES_COUNT.to_string(), Value::from(row.repositories.len() as u64));
        orgs.set_scalar_fields(&row.username, update)?;
    }

    Ok(rows.len())
}

/// Which derived metric a rank pass orders by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMetric {
    Score,
    Contributions,
}

impl RankMetric {
    fn value_field(&self) -> &'static str {
        match self {
            RankMetric::Score => fields::SCORE,
            RankMetric::Contributions => fields::COMMITS_TOTAL_COUNT,
        }
    }

    fn rank_field(&self) -> &'static str {
        match self {
            RankMetric::Score => fields::SCORE_RANK,
            RankMetric::Contributions => fields::CONTRIBUTIONS_RANK,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RankRow {
    username: String,
    #[serde(default)]
    score: u64,
    #[serde(rename = "commitsTotalCount", default)]
    commits_total_count: u64,
}

/// Assign standard competition ranks for `metric`, one write per user
pub fn rank_users<S: Storage>(storage: &S, metric: RankMetric) -> Result<usize> {
    let users = UserStore::new(storage);
    let rows: Vec<RankRow> = users.list_projected(&[Sort::desc(metric.value_field()), Sort::asc("username")])?;

    let entries = assign_ranks(rows.into_iter().map(|row| {
        let value = match metric {
            RankMetric::Score => row.score,
            RankMetric::Contributions => row.commits_total_count,
        };
        (row.username, value)
    }));

    for entry in &entries {
        let mut update = Map::new();
        update.insert(metric.rank_field().to_string(), Value::from(entry.rank));
        users.set_scalar_fields(&entry.subject_key, update)?;
    }

    log::info!("Ranked {} users by {}", entries.len(), metric.value_field());
    Ok(entries.len())
}

/// Append a run snapshot with current totals
pub fn record_stats<S: Storage>(storage: &S, now: DateTime<Utc>) -> Result<Stat> {
    let users = UserStore::new(storage);
    let rows: Vec<RankRow> = users.list_projected(&[])?;
    let total_commits = rows.iter().map(|r| r.commits_total_count).sum();
    let total_orgs = OrgStore::new(storage).count()? as u64;

    let stats = StatStore::new(storage);
    let mut stat = Stat::new(rows.len() as u64, total_orgs, total_commits, now);
    // Two snapshots in the same millisecond
    if stats.exists(&stat.id)? {
        stat.id = format!("{}-{}", stat.id, stats.count()?);
    }
    stats.insert(&stat)?;
    Ok(stat)
}
