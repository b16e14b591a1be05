//! Full run and per-command entry points.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::domain::Stat;
use crate::engine::{Blocklist, LocationClassifier, TimeWindow};
use crate::error::Result;
use crate::github::GraphqlTransport;
use crate::storage::Storage;
use crate::sync::{
    RankMetric, StageReport, SyncContext, derive, discover_orgs, discover_users, sync_all_contributions,
    sync_org_members, sync_org_repositories,
};

/// Summary of a full run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub users: StageReport,
    pub orgs: StageReport,
    pub scored: usize,
    pub ranked: usize,
    pub stat: Option<Stat>,
}

/// Owns the collaborators of a run and exposes its stages
pub struct Pipeline<S: Storage, T: GraphqlTransport> {
    storage: S,
    transport: T,
    blocklist: Blocklist,
    classifier: LocationClassifier,
    config: Config,
}

impl<S: Storage, T: GraphqlTransport> Pipeline<S, T> {
    pub fn new(config: Config, storage: S, transport: T) -> Result<Self> {
        let blocklist = Blocklist::from_config(&config.blocklist)?;
        let classifier = LocationClassifier::from_config(&config.region);
        Ok(Self {
            storage,
            transport,
            blocklist,
            classifier,
            config,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn context(&self) -> SyncContext<'_, S, T> {
        SyncContext::new(
            &self.storage,
            &self.transport,
            &self.blocklist,
            &self.classifier,
            &self.config,
        )
    }

    /// Discover users, then sync contributions of every stored user
    pub async fn sync_users(&self, now: DateTime<Utc>) -> Result<StageReport> {
        let ctx = self.context();
        let mut report = discover_users(&ctx).await?;
        report += sync_all_contributions(&ctx, now).await?;
        Ok(report)
    }

    /// Discover organizations, then refresh their repositories and members
    pub async fn sync_orgs(&self) -> Result<StageReport> {
        let ctx = self.context();
        let mut report = discover_orgs(&ctx).await?;
        report += sync_org_repositories(&ctx).await?;
        report += sync_org_members(&ctx).await?;
        Ok(report)
    }

    /// Score and commit count for every user
    pub fn score(&self, now: DateTime<Utc>) -> Result<usize> {
        let window = TimeWindow::trailing_days(now, self.config.scoring.window_days);
        derive::update_scores(&self.storage, &window)
    }

    /// Score rank, then contribution rank
    pub fn rank(&self) -> Result<usize> {
        derive::rank_users(&self.storage, RankMetric::Score)?;
        derive::rank_users(&self.storage, RankMetric::Contributions)
    }

    /// Every stage in order, ending with a stats snapshot
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let users = self.sync_users(now).await?;
        let orgs = self.sync_orgs().await?;
        let scored = self.score(now)?;
        derive::update_repository_counts(&self.storage)?;
        let ranked = self.rank()?;
        let stat = derive::record_stats(&self.storage, now)?;
        log::info!(
            "Run finished: {} users, {} organizations, {} commits in window",
            stat.total_users,
            stat.total_orgs,
            stat.total_commits
        );

        Ok(RunReport {
            users,
            orgs,
            scored,
            ranked,
            stat: Some(stat),
        })
    }
}
