//! Organization discovery, repository listings and members.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Map;

use crate::domain::{Organization, fields};
use crate::engine::ContributionMerger;
use crate::error::Result;
use crate::github::{GithubError, GraphqlTransport, OrgRepositorySource, OrgSearchSource, fetch_org_members};
use crate::storage::{OrgStore, Sort, Storage};
use crate::sync::{StageReport, SyncContext, date_part};

#[derive(Debug, Deserialize)]
struct OrgKey {
    username: String,
    #[serde(rename = "organization_createdAt", default)]
    organization_created_at: Option<String>,
}

fn org_keys<S: Storage>(storage: &S) -> Result<Vec<OrgKey>> {
    OrgStore::new(storage).list_projected(&[Sort::asc("username")])
}

/// Search every configured location for organizations and insert unknown ones.
///
/// Existing organizations are left untouched.
pub async fn discover_orgs<S, T>(ctx: &SyncContext<'_, S, T>) -> Result<StageReport>
where
    S: Storage,
    T: GraphqlTransport + ?Sized,
{
    let orgs = OrgStore::new(ctx.storage);
    let newest: Vec<OrgKey> = orgs.list_projected(&[Sort::desc("organization_createdAt")])?;
    let since = newest
        .first()
        .and_then(|o| o.organization_created_at.as_deref())
        .and_then(date_part)
        .unwrap_or(ctx.config.region.discovery_start.as_str())
        .to_string();
    log::info!("Discovering organizations created since {}", since);

    let mut seen = HashSet::new();
    let mut report = StageReport::default();

    for location in &ctx.config.region.search_locations {
        let source = OrgSearchSource::new(ctx.transport, location, &since, ctx.page_size());
        let (profiles, halted) = ctx.walker.walk(&source).await.into_parts();

        for profile in profiles {
            if !ctx.classifier.matches(profile.location.as_deref()) || !seen.insert(profile.login.clone()) {
                continue;
            }
            if orgs.exists(&profile.login)? {
                continue;
            }
            orgs.insert(&Organization::from_profile(&profile))?;
            log::info!("Organization {} added", profile.login);
            report.inserted += 1;
        }

        if let Some(err) = halted {
            return Err(err.into());
        }
    }

    Ok(report)
}

/// Refresh the public repository list of every organization
pub async fn sync_org_repositories<S, T>(ctx: &SyncContext<'_, S, T>) -> Result<StageReport>
where
    S: Storage,
    T: GraphqlTransport + ?Sized,
{
    let orgs = OrgStore::new(ctx.storage);
    let merger = ContributionMerger::new(ctx.blocklist);
    let mut report = StageReport::default();

    for key in org_keys(ctx.storage)? {
        let Some(mut org) = orgs.find_by_key(&key.username)? else {
            continue;
        };

        let source = OrgRepositorySource::new(ctx.transport, org.username.as_str(), ctx.page_size());
        let walk = ctx.walker.walk(&source).await;
        if walk.is_not_found() {
            orgs.delete_by_key(&org.username)?;
            log::info!("Organization {} not found upstream, removed", org.username);
            report.removed += 1;
            continue;
        }

        let (fetched, halted) = walk.into_parts();
        let added = merger.merge_repositories(&mut org.repositories, fetched);

        let mut update = Map::new();
        update.insert(fields::REPOSITORIES.to_string(), serde_json::to_value(&org.repositories)?);
        orgs.set_scalar_fields(&org.username, update)?;
        log::debug!("Organization {}: {} new repositories", org.username, added);
        report.updated += 1;

        if let Some(err) = halted {
            return Err(err.into());
        }
    }

    Ok(report)
}

/// Replace the member list of every organization
pub async fn sync_org_members<S, T>(ctx: &SyncContext<'_, S, T>) -> Result<StageReport>
where
    S: Storage,
    T: GraphqlTransport + ?Sized,
{
    let orgs = OrgStore::new(ctx.storage);
    let mut report = StageReport::default();

    for key in org_keys(ctx.storage)? {
        let label = format!("members of {}", key.username);
        let fetched = ctx
            .retry()
            .run_while(
                &label,
                || fetch_org_members(ctx.transport, &key.username),
                GithubError::is_retryable,
            )
            .await;

        match fetched {
            Ok(members) => {
                let mut update = Map::new();
                update.insert(fields::MEMBERS.to_string(), serde_json::to_value(&members)?);
                orgs.set_scalar_fields(&key.username, update)?;
                report.updated += 1;
            }
            Err(err) if err.is_not_found() => {
                orgs.delete_by_key(&key.username)?;
                log::info!("Organization {} not found upstream, removed", key.username);
                report.removed += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(report)
}
