//! Paged sources backed by a `GraphqlTransport`.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::domain::{ContributionKind, ContributionRecord, Member, OrgProfile, OrgRepository, UserProfile};
use crate::engine::{Page, PageSource};
use crate::github::client::{GithubError, GraphqlTransport};
use crate::github::queries;

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One kind of contribution for one user over a date range
pub struct ContributionSource<'a, T: GraphqlTransport + ?Sized> {
    transport: &'a T,
    login: String,
    kind: ContributionKind,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    page_size: u32,
}

impl<'a, T: GraphqlTransport + ?Sized> ContributionSource<'a, T> {
    pub fn new(
        transport: &'a T,
        login: impl Into<String>,
        kind: ContributionKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page_size: u32,
    ) -> Self {
        Self {
            transport,
            login: login.into(),
            kind,
            from,
            to,
            page_size,
        }
    }

    fn variables(&self, after: Option<String>) -> Value {
        let mut vars = json!({
            "login": self.login,
            "from": timestamp(self.from),
            "to": timestamp(self.to),
        });
        if self.kind != ContributionKind::Commit {
            vars["first"] = json!(self.page_size);
            vars["after"] = json!(after);
        }
        vars
    }
}

#[async_trait]
impl<T: GraphqlTransport + ?Sized> PageSource for ContributionSource<'_, T> {
    type Item = ContributionRecord;

    fn describe(&self) -> String {
        format!("{} contributions of {}", self.kind, self.login)
    }

    async fn fetch_page(&self, after: Option<String>) -> Result<Page<ContributionRecord>, GithubError> {
        let variables = self.variables(after);
        match self.kind {
            // grouped by repository, always a single page
            ContributionKind::Commit => {
                let data = self
                    .transport
                    .execute(&queries::commit_contributions_query(), variables)
                    .await?;
                queries::decode_commit_contributions(&data, &self.login)
            }
            kind => {
                let data = self
                    .transport
                    .execute(&queries::activity_contributions_query(kind), variables)
                    .await?;
                queries::decode_activity_contributions(&data, &self.login, kind)
            }
        }
    }
}

/// Search query string for profiles in `location` created on or after `created_since`
pub fn search_query(location: &str, kind: &str, created_since: &str) -> String {
    let location = if location.contains(' ') {
        format!("\"{}\"", location)
    } else {
        location.to_string()
    };
    format!("location:{} type:{} created:>={}", location, kind, created_since)
}

/// User search for one location
pub struct UserSearchSource<'a, T: GraphqlTransport + ?Sized> {
    transport: &'a T,
    query: String,
    page_size: u32,
}

impl<'a, T: GraphqlTransport + ?Sized> UserSearchSource<'a, T> {
    pub fn new(transport: &'a T, location: &str, created_since: &str, page_size: u32) -> Self {
        Self {
            transport,
            query: search_query(location, "user", created_since),
            page_size,
        }
    }
}

#[async_trait]
impl<T: GraphqlTransport + ?Sized> PageSource for UserSearchSource<'_, T> {
    type Item = UserProfile;

    fn describe(&self) -> String {
        format!("user search '{}'", self.query)
    }

    async fn fetch_page(&self, after: Option<String>) -> Result<Page<UserProfile>, GithubError> {
        let variables = json!({"q": self.query, "first": self.page_size, "after": after});
        let data = self.transport.execute(queries::USER_SEARCH_QUERY, variables).await?;
        queries::decode_user_search(&data)
    }
}

/// Organization search for one location
pub struct OrgSearchSource<'a, T: GraphqlTransport + ?Sized> {
    transport: &'a T,
    query: String,
    page_size: u32,
}

impl<'a, T: GraphqlTransport + ?Sized> OrgSearchSource<'a, T> {
    pub fn new(transport: &'a T, location: &str, created_since: &str, page_size: u32) -> Self {
        Self {
            transport,
            query: search_query(location, "org", created_since),
            page_size,
        }
    }
}

#[async_trait]
impl<T: GraphqlTransport + ?Sized> PageSource for OrgSearchSource<'_, T> {
    type Item = OrgProfile;

    fn describe(&self) -> String {
        format!("organization search '{}'", self.query)
    }

    async fn fetch_page(&self, after: Option<String>) -> Result<Page<OrgProfile>, GithubError> {
        let variables = json!({"q": self.query, "first": self.page_size, "after": after});
        let data = self.transport.execute(queries::ORG_SEARCH_QUERY, variables).await?;
        queries::decode_org_search(&data)
    }
}

/// Public repositories of one organization
pub struct OrgRepositorySource<'a, T: GraphqlTransport + ?Sized> {
    transport: &'a T,
    login: String,
    page_size: u32,
}

impl<'a, T: GraphqlTransport + ?Sized> OrgRepositorySource<'a, T> {
    pub fn new(transport: &'a T, login: impl Into<String>, page_size: u32) -> Self {
        Self {
            transport,
            login: login.into(),
            page_size,
        }
    }
}

#[async_trait]
impl<T: GraphqlTransport + ?Sized> PageSource for OrgRepositorySource<'_, T> {
    type Item = OrgRepository;

    fn describe(&self) -> String {
        format!("repositories of {}", self.login)
    }

    async fn fetch_page(&self, after: Option<String>) -> Result<Page<OrgRepository>, GithubError> {
        let variables = json!({"login": self.login, "first": self.page_size, "after": after});
        let data = self.transport.execute(queries::ORG_REPOSITORIES_QUERY, variables).await?;
        queries::decode_org_repositories(&data, &self.login)
    }
}

/// First hundred members of an organization
pub async fn fetch_org_members<T: GraphqlTransport + ?Sized>(
    transport: &T,
    login: &str,
) -> Result<Vec<Member>, GithubError> {
    let data = transport
        .execute(queries::ORG_MEMBERS_QUERY, json!({ "login": login }))
        .await?;
    queries::decode_org_members(&data, login)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PageWalker, RetryExecutor};
    use crate::github::MockTransport;
    use chrono::TimeZone;
    use std::time::Duration;

    fn walker() -> PageWalker {
        PageWalker::new(RetryExecutor::new(1, Duration::ZERO), 10)
    }

    #[test]
    fn test_search_query_quotes_multiword_locations() {
        assert_eq!(
            search_query("Amman", "user", "2020-01-01"),
            "location:Amman type:user created:>=2020-01-01"
        );
        assert_eq!(
            search_query("Al Karak", "org", "2008-01-01"),
            "location:\"Al Karak\" type:org created:>=2008-01-01"
        );
    }

    #[tokio::test]
    async fn test_issue_source_follows_cursor() {
        let transport = MockTransport::new(|_query, vars| {
            let node = json!({"occurredAt": "2024-03-01T07:00:00Z", "issue": {"repository": {
                "name": "y", "url": "https://github.com/x/y", "stargazerCount": 1, "isPrivate": false
            }}});
            let page_info = if vars["after"].is_null() {
                json!({"endCursor": "next", "hasNextPage": true})
            } else {
                json!({"endCursor": "next", "hasNextPage": false})
            };
            Ok(json!({"user": {"contributionsCollection": {"issueContributions": {
                "nodes": [node], "pageInfo": page_info
            }}}}))
        });

        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let source = ContributionSource::new(&transport, "alice", ContributionKind::Issue, from, to, 50);

        let walk = walker().walk(&source).await;

        assert!(walk.is_complete());
        assert_eq!(walk.records.len(), 2);
        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0]["login"], "alice");
        assert_eq!(calls[0]["first"], 50);
        assert_eq!(calls[0]["from"], "2024-01-01T00:00:00Z");
        assert_eq!(calls[1]["after"], "next");
    }

    #[tokio::test]
    async fn test_commit_source_is_single_page() {
        let transport = MockTransport::new(|_query, _vars| {
            Ok(json!({"user": {"contributionsCollection": {"commitContributionsByRepository": []}}}))
        });
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let source = ContributionSource::new(&transport, "alice", ContributionKind::Commit, now, now, 100);

        let walk = walker().walk(&source).await;

        assert_eq!(walk.pages, 1);
        assert!(transport.calls()[0].get("after").is_none());
    }

    #[tokio::test]
    async fn test_fetch_members_not_found() {
        let transport = MockTransport::new(|_query, _vars| Err(GithubError::NotFound("organization gone".to_string())));
        let err = fetch_org_members(&transport, "gone").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
