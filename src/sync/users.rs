//! User discovery, profile refresh and contribution sync.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{ContributionKind, User, UserProfile};
use crate::engine::{ContributionMerger, MergeStats, ledger_value};
use crate::error::Result;
use crate::github::{ContributionSource, GraphqlTransport, UserSearchSource};
use crate::storage::{Sort, Storage, UserStore};
use crate::sync::{StageReport, SyncContext, date_part, fetch_range};

#[derive(Debug, Deserialize)]
struct UserKey {
    username: String,
    #[serde(rename = "user_createdAt", default)]
    user_created_at: Option<String>,
}

/// Lower bound for the `created:>=` search qualifier
fn discovery_since<S: Storage, T: GraphqlTransport + ?Sized>(ctx: &SyncContext<'_, S, T>) -> Result<String> {
    let users = UserStore::new(ctx.storage);
    let newest: Vec<UserKey> = users.list_projected(&[Sort::desc("user_createdAt")])?;
    let since = newest
        .first()
        .and_then(|u| u.user_created_at.as_deref())
        .and_then(date_part)
        .unwrap_or(ctx.config.region.discovery_start.as_str());
    Ok(since.to_string())
}

/// Search every configured location for users in the region and save them.
///
/// If a search fails part way, the users found so far are saved before the
/// error is returned.
pub async fn discover_users<S, T>(ctx: &SyncContext<'_, S, T>) -> Result<StageReport>
where
    S: Storage,
    T: GraphqlTransport + ?Sized,
{
    let since = discovery_since(ctx)?;
    log::info!("Discovering users created since {}", since);

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut failure = None;

    for location in &ctx.config.region.search_locations {
        let source = UserSearchSource::new(ctx.transport, location, &since, ctx.page_size());
        let (profiles, halted) = ctx.walker.walk(&source).await.into_parts();

        for profile in profiles {
            if !ctx.classifier.matches(profile.location.as_deref()) {
                continue;
            }
            if ctx.blocklist.is_user_blocked(&profile.login) {
                log::debug!("Skipping blocked user {}", profile.login);
                continue;
            }
            if seen.insert(profile.login.clone()) {
                found.push(profile);
            }
        }

        if halted.is_some() {
            failure = halted;
            break;
        }
    }

    let report = save_users(ctx, found)?;
    match failure {
        Some(err) => Err(err.into()),
        None => Ok(report),
    }
}

/// Insert new users; refresh known ones and drop those who left the region
pub fn save_users<S, T>(ctx: &SyncContext<'_, S, T>, profiles: Vec<UserProfile>) -> Result<StageReport>
where
    S: Storage,
    T: GraphqlTransport + ?Sized,
{
    let users = UserStore::new(ctx.storage);
    let mut report = StageReport::default();

    for profile in profiles {
        match users.find_by_key(&profile.login)? {
            None => {
                if ctx.classifier.matches(profile.location.as_deref()) {
                    users.insert(&User::from_profile(&profile))?;
                    log::info!("User {} added", profile.login);
                    report.inserted += 1;
                }
            }
            Some(mut user) => {
                user.refresh_profile(&profile);
                if ctx.classifier.matches(user.location.as_deref()) {
                    users.replace(&user)?;
                    report.updated += 1;
                } else {
                    users.delete_by_key(&user.username)?;
                    log::info!("User {} left the region, removed", user.username);
                    report.removed += 1;
                }
            }
        }
    }

    Ok(report)
}

/// What happened to one user during contribution sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSyncOutcome {
    /// `truncated` is set when a walk hit the page limit or a stuck cursor
    Synced { stats: MergeStats, truncated: bool },
    /// The user no longer exists upstream and was deleted
    Removed,
}

/// Walk and merge all four contribution kinds for one user.
///
/// Each ledger is written as soon as its walk finishes, including the partial
/// result of a failed walk, before that failure is returned.
pub async fn sync_user<S, T>(
    ctx: &SyncContext<'_, S, T>,
    mut user: User,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<UserSyncOutcome>
where
    S: Storage,
    T: GraphqlTransport + ?Sized,
{
    let users = UserStore::new(ctx.storage);
    let merger = ContributionMerger::new(ctx.blocklist);
    let mut total = MergeStats::default();
    let mut truncated = Vec::new();

    for kind in ContributionKind::ALL {
        let source = ContributionSource::new(ctx.transport, user.username.as_str(), kind, from, to, ctx.page_size());
        let walk = ctx.walker.walk(&source).await;

        if walk.is_not_found() {
            users.delete_by_key(&user.username)?;
            log::info!("User {} not found upstream, removed", user.username);
            return Ok(UserSyncOutcome::Removed);
        }

        if walk.is_truncated() {
            truncated.push(kind.ledger_field());
        }
        let (records, halted) = walk.into_parts();
        let stats = merger.merge_into(&mut user, records);
        users.upsert_ledger(&user.username, kind.ledger_field(), &ledger_value(&user, kind)?)?;
        total += stats;

        if let Some(err) = halted {
            return Err(err.into());
        }
    }

    if truncated.is_empty() {
        log::info!(
            "User {}: {} new contributions, {} already stored, {} skipped",
            user.username,
            total.added,
            total.duplicates,
            total.skipped()
        );
    } else {
        log::warn!(
            "User {}: {} new contributions, {} already stored, {} skipped; truncated walks: {}",
            user.username,
            total.added,
            total.duplicates,
            total.skipped(),
            truncated.join(", ")
        );
    }
    Ok(UserSyncOutcome::Synced {
        stats: total,
        truncated: !truncated.is_empty(),
    })
}

/// Contribution sync for every stored user, in username order
pub async fn sync_all_contributions<S, T>(ctx: &SyncContext<'_, S, T>, now: DateTime<Utc>) -> Result<StageReport>
where
    S: Storage,
    T: GraphqlTransport + ?Sized,
{
    let users = UserStore::new(ctx.storage);
    let (from, to) = fetch_range(now, ctx.config.scoring.window_days);
    let keys: Vec<UserKey> = users.list_projected(&[Sort::asc("username")])?;
    let mut report = StageReport::default();

    for key in keys {
        if ctx.blocklist.is_user_blocked(&key.username) {
            users.delete_by_key(&key.username)?;
            log::info!("User {} is blocked, removed", key.username);
            report.removed += 1;
            continue;
        }

        let Some(user) = users.find_by_key(&key.username)? else {
            continue;
        };

        match sync_user(ctx, user, from, to).await? {
            UserSyncOutcome::Synced { .. } => report.updated += 1,
            UserSyncOutcome::Removed => report.removed += 1,
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::{Blocklist, LocationClassifier};
    use crate::github::{GithubError, MockTransport};
    use crate::storage::JsonlStorage;
    use chrono::TimeZone;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn config() -> Config {
        let mut config = Config::default();
        config.retry.attempts = 1;
        config.retry.delay_secs = 0;
        config.region.search_locations = vec!["Amman".to_string()];
        config
    }

    fn profile(login: &str, location: &str) -> UserProfile {
        UserProfile {
            login: login.to_string(),
            avatar_url: format!("https://avatars.example/{}", login),
            name: None,
            location: Some(location.to_string()),
            bio: None,
            company: None,
            is_hireable: None,
            url: format!("https://github.com/{}", login),
            created_at: Some("2016-05-01T00:00:00Z".to_string()),
        }
    }

    fn search_node(login: &str, location: &str) -> Value {
        json!({"login": login, "avatarUrl": "a", "location": location, "url": format!("https://github.com/{}", login), "createdAt": "2016-05-01T00:00:00Z"})
    }

    fn empty_contributions(query: &str) -> Value {
        let connection = ["issueContributions", "pullRequestReviewContributions", "pullRequestContributions"]
            .into_iter()
            .find(|c| query.contains(&format!("{}(", c)));
        match connection {
            Some(name) => json!({"user": {"contributionsCollection": {
                name: {"nodes": [], "pageInfo": {"endCursor": null, "hasNextPage": false}}
            }}}),
            None => json!({"user": {"contributionsCollection": {"commitContributionsByRepository": []}}}),
        }
    }

    #[tokio::test]
    async fn test_discover_filters_region_and_blocklist() {
        let temp = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp.path()).unwrap();
        let config = config();
        let blocklist = Blocklist::new(Vec::<String>::new(), ["spambot"]);
        let classifier = LocationClassifier::from_config(&config.region);
        let transport = MockTransport::new(|_query, _vars| {
            Ok(json!({"search": {
                "nodes": [
                    search_node("alice", "Amman, Jordan"),
                    search_node("bob", "Berlin"),
                    search_node("spambot", "Amman"),
                    search_node("alice", "Amman, Jordan")
                ],
                "pageInfo": {"endCursor": null, "hasNextPage": false}
            }}))
        });
        let ctx = SyncContext::new(&storage, &transport, &blocklist, &classifier, &config);

        let report = discover_users(&ctx).await.unwrap();

        assert_eq!(report.inserted, 1);
        let users = UserStore::new(&storage);
        assert!(users.exists("alice").unwrap());
        assert!(!users.exists("bob").unwrap());
        assert!(!users.exists("spambot").unwrap());
        assert_eq!(transport.calls()[0]["q"], "location:Amman type:user created:>=2008-01-01");
    }

    #[tokio::test]
    async fn test_discovery_starts_from_newest_stored_user() {
        let temp = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp.path()).unwrap();
        let config = config();
        let blocklist = Blocklist::default();
        let classifier = LocationClassifier::from_config(&config.region);
        let transport = MockTransport::new(|_query, _vars| {
            Ok(json!({"search": {"nodes": [], "pageInfo": {"endCursor": null, "hasNextPage": false}}}))
        });
        let ctx = SyncContext::new(&storage, &transport, &blocklist, &classifier, &config);

        let mut older = profile("old", "Amman");
        older.created_at = Some("2012-01-01T00:00:00Z".to_string());
        save_users(&ctx, vec![older, profile("new", "Irbid")]).unwrap();

        discover_users(&ctx).await.unwrap();

        assert_eq!(transport.calls()[0]["q"], "location:Amman type:user created:>=2016-05-01");
    }

    #[test]
    fn test_save_refreshes_and_removes_movers() {
        let temp = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp.path()).unwrap();
        let config = config();
        let blocklist = Blocklist::default();
        let classifier = LocationClassifier::from_config(&config.region);
        let transport = MockTransport::new(|_q, _v| Err(GithubError::Graphql("unused".to_string())));
        let ctx = SyncContext::new(&storage, &transport, &blocklist, &classifier, &config);

        save_users(&ctx, vec![profile("alice", "Amman"), profile("carol", "Zarqa")]).unwrap();

        let mut renamed = profile("alice", "Aqaba");
        renamed.name = Some("Alice A.".to_string());
        let report = save_users(&ctx, vec![renamed, profile("carol", "Paris")]).unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.removed, 1);
        let users = UserStore::new(&storage);
        let alice = users.find_by_key("alice").unwrap().unwrap();
        assert_eq!(alice.name.as_deref(), Some("Alice A."));
        assert_eq!(alice.location.as_deref(), Some("Aqaba"));
        assert!(!users.exists("carol").unwrap());
    }

    #[tokio::test]
    async fn test_not_found_user_is_deleted() {
        let temp = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp.path()).unwrap();
        let config = config();
        let blocklist = Blocklist::default();
        let classifier = LocationClassifier::from_config(&config.region);
        let transport = MockTransport::new(|_q, _v| Err(GithubError::NotFound("user ghost".to_string())));
        let ctx = SyncContext::new(&storage, &transport, &blocklist, &classifier, &config);
        save_users(&ctx, vec![profile("ghost", "Amman")]).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let report = sync_all_contributions(&ctx, now).await.unwrap();

        assert_eq!(report.removed, 1);
        assert!(!UserStore::new(&storage).exists("ghost").unwrap());
    }

    #[tokio::test]
    async fn test_blocked_user_is_deleted_without_queries() {
        let temp = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp.path()).unwrap();
        let config = config();
        let classifier = LocationClassifier::from_config(&config.region);
        let transport = MockTransport::new(|query, _vars| Ok(empty_contributions(query)));
        {
            let blocklist = Blocklist::default();
            let ctx = SyncContext::new(&storage, &transport, &blocklist, &classifier, &config);
            save_users(&ctx, vec![profile("spambot", "Amman")]).unwrap();
        }

        let blocklist = Blocklist::new(Vec::<String>::new(), ["spambot"]);
        let ctx = SyncContext::new(&storage, &transport, &blocklist, &classifier, &config);
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        sync_all_contributions(&ctx, now).await.unwrap();

        assert!(!UserStore::new(&storage).exists("spambot").unwrap());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_partial_walk_is_persisted_then_error_returned() {
        let temp = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp.path()).unwrap();
        let config = config();
        let blocklist = Blocklist::default();
        let classifier = LocationClassifier::from_config(&config.region);
        let transport = MockTransport::new(|query, vars| {
            if query.contains("issueContributions(") {
                if vars["after"].is_null() {
                    return Ok(json!({"user": {"contributionsCollection": {"issueContributions": {
                        "nodes": [{"occurredAt": "2024-06-01T00:00:00Z", "issue": {"repository": {
                            "name": "y", "url": "https://github.com/x/y", "stargazerCount": 3, "isPrivate": false
                        }}}],
                        "pageInfo": {"endCursor": "p1", "hasNextPage": true}
                    }}}}));
                }
                return Err(GithubError::Graphql("secondary rate limit".to_string()));
            }
            Ok(empty_contributions(query))
        });
        let ctx = SyncContext::new(&storage, &transport, &blocklist, &classifier, &config);
        save_users(&ctx, vec![profile("alice", "Amman")]).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let err = sync_all_contributions(&ctx, now).await.unwrap_err();

        assert!(!err.is_not_found());
        let alice = UserStore::new(&storage).find_by_key("alice").unwrap().unwrap();
        assert_eq!(alice.issue_contributions.event_count(), 1);
    }

    #[tokio::test]
    async fn test_sync_user_drops_private_commit_sharing_a_url() {
        let temp = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp.path()).unwrap();
        let config = config();
        let blocklist = Blocklist::default();
        let classifier = LocationClassifier::from_config(&config.region);
        let transport = MockTransport::new(|query, _vars| {
            if query.contains("commitContributionsByRepository") {
                let repo = |private: bool| {
                    json!({"name": "y", "url": "https://github.com/x/y", "stargazerCount": 5, "isPrivate": private})
                };
                return Ok(json!({"user": {"contributionsCollection": {"commitContributionsByRepository": [
                    {"contributions": {"nodes": [
                        {"commitCount": 7, "occurredAt": "2024-06-01T10:00:00Z", "repository": repo(true)},
                        {"commitCount": 2, "occurredAt": "2024-06-01T08:00:00Z", "repository": repo(false)}
                    ]}}
                ]}}}));
            }
            Ok(empty_contributions(query))
        });
        let ctx = SyncContext::new(&storage, &transport, &blocklist, &classifier, &config);
        save_users(&ctx, vec![profile("alice", "Amman")]).unwrap();
        let alice = UserStore::new(&storage).find_by_key("alice").unwrap().unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let (from, to) = fetch_range(now, config.scoring.window_days);
        let outcome = sync_user(&ctx, alice, from, to).await.unwrap();

        let UserSyncOutcome::Synced { stats, truncated } = outcome else {
            panic!("alice should have been synced");
        };
        assert!(!truncated);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.skipped_private, 1);
        assert_eq!(transport.count_matching("commitContributionsByRepository"), 1);

        let stored = UserStore::new(&storage).find_by_key("alice").unwrap().unwrap();
        let buckets = stored.commit_contributions.buckets();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].url, "https://github.com/x/y");
        assert_eq!(buckets[0].stars_count, 5);
        assert_eq!(buckets[0].events().len(), 1);
        assert_eq!(buckets[0].events()[0].commit_count, 2);
    }

    #[tokio::test]
    async fn test_page_limit_marks_sync_truncated() {
        let temp = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp.path()).unwrap();
        let mut config = config();
        config.github.max_pages = 1;
        let blocklist = Blocklist::default();
        let classifier = LocationClassifier::from_config(&config.region);
        let transport = MockTransport::new(|query, vars| {
            if query.contains("issueContributions(") {
                let cursor = if vars["after"].is_null() { "p1" } else { "p2" };
                return Ok(json!({"user": {"contributionsCollection": {"issueContributions": {
                    "nodes": [{"occurredAt": "2024-06-01T00:00:00Z", "issue": {"repository": {
                        "name": "y", "url": "https://github.com/x/y", "stargazerCount": 3, "isPrivate": false
                    }}}],
                    "pageInfo": {"endCursor": cursor, "hasNextPage": true}
                }}}}));
            }
            Ok(empty_contributions(query))
        });
        let ctx = SyncContext::new(&storage, &transport, &blocklist, &classifier, &config);
        save_users(&ctx, vec![profile("alice", "Amman")]).unwrap();
        let alice = UserStore::new(&storage).find_by_key("alice").unwrap().unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let (from, to) = fetch_range(now, config.scoring.window_days);
        let outcome = sync_user(&ctx, alice, from, to).await.unwrap();

        assert!(matches!(outcome, UserSyncOutcome::Synced { truncated: true, .. }));
        assert_eq!(transport.count_matching("issueContributions("), 1);
        let stored = UserStore::new(&storage).find_by_key("alice").unwrap().unwrap();
        assert_eq!(stored.issue_contributions.event_count(), 1);
    }
}
