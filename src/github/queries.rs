//! GraphQL documents and decoding of their responses into domain types.
//!
//! Every value reaches GitHub through query variables, never through string
//! interpolation into the document.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use chrono::{DateTime, Utc};

use crate::domain::{ContributionKind, ContributionRecord, Member, OrgProfile, OrgRepository, RepositoryRef, UserProfile};
use crate::engine::Page;
use crate::github::client::GithubError;

const REPOSITORY_FIELDS: &str = "repository { name url stargazerCount isPrivate }";

pub const USER_SEARCH_QUERY: &str = r#"
query($q: String!, $first: Int!, $after: String) {
  search(query: $q, type: USER, first: $first, after: $after) {
    nodes {
      ... on User { login avatarUrl name location bio url company isHireable createdAt }
    }
    pageInfo { endCursor hasNextPage }
  }
}"#;

pub const ORG_SEARCH_QUERY: &str = r#"
query($q: String!, $first: Int!, $after: String) {
  search(query: $q, type: USER, first: $first, after: $after) {
    nodes {
      ... on Organization { login avatarUrl name location url createdAt }
    }
    pageInfo { endCursor hasNextPage }
  }
}"#;

pub const ORG_REPOSITORIES_QUERY: &str = r#"
query($login: String!, $first: Int!, $after: String) {
  organization(login: $login) {
    repositories(privacy: PUBLIC, first: $first, after: $after) {
      nodes { name url stargazerCount }
      pageInfo { endCursor hasNextPage }
    }
  }
}"#;

pub const ORG_MEMBERS_QUERY: &str = r#"
query($login: String!) {
  organization(login: $login) {
    membersWithRole(first: 100) {
      nodes { login name avatarUrl url }
    }
  }
}"#;

/// Commit contributions come grouped by repository in a single response
pub fn commit_contributions_query() -> String {
    format!(
        r#"
query($login: String!, $from: DateTime!, $to: DateTime!) {{
  user(login: $login) {{
    contributionsCollection(from: $from, to: $to) {{
      commitContributionsByRepository(maxRepositories: 100) {{
        contributions(first: 100) {{
          nodes {{ commitCount occurredAt {REPOSITORY_FIELDS} }}
        }}
      }}
    }}
  }}
}}"#
    )
}

/// Paginated issue, pull request, or review contributions
pub fn activity_contributions_query(kind: ContributionKind) -> String {
    let selection = match kind {
        ContributionKind::Issue => format!("issueContributions(first: $first, after: $after) {{ nodes {{ occurredAt issue {{ {REPOSITORY_FIELDS} }} }}"),
        ContributionKind::PullRequest => format!(
            "pullRequestContributions(first: $first, after: $after) {{ nodes {{ occurredAt pullRequest {{ {REPOSITORY_FIELDS} }} }}"
        ),
        ContributionKind::Review | ContributionKind::Commit => format!(
            "pullRequestReviewContributions(first: $first, after: $after) {{ nodes {{ occurredAt {REPOSITORY_FIELDS} }}"
        ),
    };
    format!(
        r#"
query($login: String!, $from: DateTime!, $to: DateTime!, $first: Int!, $after: String) {{
  user(login: $login) {{
    contributionsCollection(from: $from, to: $to) {{
      {selection}
        pageInfo {{ endCursor hasNextPage }}
      }}
    }}
  }}
}}"#
    )
}

/// Connection name under `contributionsCollection` for an activity kind
fn activity_connection(kind: ContributionKind) -> &'static str {
    match kind {
        ContributionKind::Issue => "issueContributions",
        ContributionKind::PullRequest => "pullRequestContributions",
        ContributionKind::Review | ContributionKind::Commit => "pullRequestReviewContributions",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    name: String,
    url: String,
    #[serde(default)]
    stargazer_count: u64,
    #[serde(default)]
    is_private: bool,
}

impl From<RepositoryNode> for RepositoryRef {
    fn from(node: RepositoryNode) -> Self {
        let repository = RepositoryRef::new(node.name, node.url, node.stargazer_count);
        if node.is_private { repository.private() } else { repository }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    end_cursor: Option<String>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound = "N: DeserializeOwned")]
struct Connection<N> {
    #[serde(default)]
    nodes: Vec<Option<N>>,
    page_info: Option<PageInfo>,
}

impl<N> Connection<N> {
    fn into_page<T>(self, convert: impl FnMut(N) -> Option<T>) -> Page<T> {
        let records = self.nodes.into_iter().flatten().filter_map(convert).collect();
        match self.page_info {
            Some(info) => Page {
                records,
                end_cursor: info.end_cursor,
                has_next_page: info.has_next_page,
            },
            None => Page::last(records),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitNode {
    commit_count: u64,
    occurred_at: DateTime<Utc>,
    repository: RepositoryNode,
}

#[derive(Debug, Deserialize)]
struct CommitGroup {
    contributions: Connection<CommitNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryHolder {
    repository: RepositoryNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityNode {
    occurred_at: DateTime<Utc>,
    #[serde(default)]
    repository: Option<RepositoryNode>,
    #[serde(default)]
    issue: Option<RepositoryHolder>,
    #[serde(default)]
    pull_request: Option<RepositoryHolder>,
}

impl ActivityNode {
    fn into_parts(self) -> Option<(RepositoryRef, DateTime<Utc>)> {
        let repository = self
            .repository
            .or(self.issue.map(|h| h.repository))
            .or(self.pull_request.map(|h| h.repository))?;
        Some((repository.into(), self.occurred_at))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNode {
    login: Option<String>,
    avatar_url: Option<String>,
    name: Option<String>,
    location: Option<String>,
    bio: Option<String>,
    company: Option<String>,
    is_hireable: Option<bool>,
    url: Option<String>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryListingNode {
    name: String,
    url: String,
    #[serde(default)]
    stargazer_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberNode {
    login: String,
    name: Option<String>,
    avatar_url: String,
    url: String,
}

/// The user or organization object, or NotFound when GitHub returned null
fn subject<'a>(data: &'a Value, key: &str, login: &str) -> Result<&'a Value, GithubError> {
    match data.get(key) {
        Some(Value::Null) | None => Err(GithubError::NotFound(format!("{} {}", key, login))),
        Some(value) => Ok(value),
    }
}

fn decode_at<T: DeserializeOwned>(value: &Value, pointer: &str) -> Result<T, GithubError> {
    let target = value
        .pointer(pointer)
        .ok_or_else(|| GithubError::InvalidResponse(format!("missing {}", pointer)))?;
    Ok(T::deserialize(target)?)
}

pub fn decode_commit_contributions(data: &Value, login: &str) -> Result<Page<ContributionRecord>, GithubError> {
    let user = subject(data, "user", login)?;
    let groups: Vec<CommitGroup> = decode_at(user, "/contributionsCollection/commitContributionsByRepository")?;

    let records = groups
        .into_iter()
        .flat_map(|group| group.contributions.nodes.into_iter().flatten())
        .map(|node| ContributionRecord::Commit {
            repository: node.repository.into(),
            commit_count: node.commit_count,
            occurred_at: node.occurred_at,
        })
        .collect();

    Ok(Page::last(records))
}

pub fn decode_activity_contributions(
    data: &Value,
    login: &str,
    kind: ContributionKind,
) -> Result<Page<ContributionRecord>, GithubError> {
    let user = subject(data, "user", login)?;
    let pointer = format!("/contributionsCollection/{}", activity_connection(kind));
    let connection: Connection<ActivityNode> = decode_at(user, &pointer)?;

    Ok(connection.into_page(|node| {
        let (repository, occurred_at) = node.into_parts()?;
        Some(match kind {
            ContributionKind::Issue => ContributionRecord::Issue {
                repository,
                occurred_at,
            },
            ContributionKind::PullRequest => ContributionRecord::PullRequest {
                repository,
                occurred_at,
            },
            ContributionKind::Review | ContributionKind::Commit => ContributionRecord::Review {
                repository,
                occurred_at,
            },
        })
    }))
}

/// Non-user nodes in a user search come back as empty objects and are dropped
pub fn decode_user_search(data: &Value) -> Result<Page<UserProfile>, GithubError> {
    let connection: Connection<SearchNode> = decode_at(data, "/search")?;
    Ok(connection.into_page(|node| {
        Some(UserProfile {
            login: node.login?,
            avatar_url: node.avatar_url.unwrap_or_default(),
            name: node.name,
            location: node.location,
            bio: node.bio,
            company: node.company,
            is_hireable: node.is_hireable,
            url: node.url.unwrap_or_default(),
            created_at: node.created_at,
        })
    }))
}

pub fn decode_org_search(data: &Value) -> Result<Page<OrgProfile>, GithubError> {
    let connection: Connection<SearchNode> = decode_at(data, "/search")?;
    Ok(connection.into_page(|node| {
        Some(OrgProfile {
            login: node.login?,
            avatar_url: node.avatar_url.unwrap_or_default(),
            name: node.name,
            location: node.location,
            url: node.url.unwrap_or_default(),
            created_at: node.created_at,
        })
    }))
}

pub fn decode_org_repositories(data: &Value, login: &str) -> Result<Page<OrgRepository>, GithubError> {
    let org = subject(data, "organization", login)?;
    let connection: Connection<RepositoryListingNode> = decode_at(org, "/repositories")?;
    Ok(connection.into_page(|node| {
        Some(OrgRepository {
            name: node.name,
            url: node.url,
            stars_count: node.stargazer_count,
        })
    }))
}

pub fn decode_org_members(data: &Value, login: &str) -> Result<Vec<Member>, GithubError> {
    let org = subject(data, "organization", login)?;
    let connection: Connection<MemberNode> = decode_at(org, "/membersWithRole")?;
    Ok(connection
        .into_page(|node| {
            Some(Member {
                login: node.login,
                name: node.name,
                avatar_url: node.avatar_url,
                url: node.url,
            })
        })
        .records)
}
