//! Contribution records as decoded from GitHub.
//!
//! Each kind of contribution carries only the fields it needs. The GraphQL
//! layer decodes raw nodes into these variants before anything else sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository metadata attached to every contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub name: String,
    /// Stable identity; names collide across owners, URLs do not
    pub url: String,
    pub stars_count: u64,
    pub is_private: bool,
}

impl RepositoryRef {
    pub fn new(name: impl Into<String>, url: impl Into<String>, stars_count: u64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            stars_count,
            is_private: false,
        }
    }

    /// Mark the repository as private
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }
}

/// Which ledger a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    Commit,
    Issue,
    PullRequest,
    Review,
}

impl ContributionKind {
    pub const ALL: [ContributionKind; 4] = [
        ContributionKind::Commit,
        ContributionKind::Issue,
        ContributionKind::PullRequest,
        ContributionKind::Review,
    ];

    /// Field name of the matching ledger on the user document
    pub fn ledger_field(&self) -> &'static str {
        match self {
            ContributionKind::Commit => "commit_contributions",
            ContributionKind::Issue => "issue_contributions",
            ContributionKind::PullRequest => "pr_contributions",
            ContributionKind::Review => "code_review_contributions",
        }
    }
}

impl std::fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContributionKind::Commit => "commit",
            ContributionKind::Issue => "issue",
            ContributionKind::PullRequest => "pull request",
            ContributionKind::Review => "review",
        };
        write!(f, "{}", name)
    }
}

/// One contribution as returned by a page of the GitHub API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContributionRecord {
    Commit {
        repository: RepositoryRef,
        commit_count: u64,
        occurred_at: DateTime<Utc>,
    },
    Issue {
        repository: RepositoryRef,
        occurred_at: DateTime<Utc>,
    },
    PullRequest {
        repository: RepositoryRef,
        occurred_at: DateTime<Utc>,
    },
    Review {
        repository: RepositoryRef,
        occurred_at: DateTime<Utc>,
    },
}

impl ContributionRecord {
    pub fn kind(&self) -> ContributionKind {
        match self {
            ContributionRecord::Commit { .. } => ContributionKind::Commit,
            ContributionRecord::Issue { .. } => ContributionKind::Issue,
            ContributionRecord::PullRequest { .. } => ContributionKind::PullRequest,
            ContributionRecord::Review { .. } => ContributionKind::Review,
        }
    }

    pub fn repository(&self) -> &RepositoryRef {
        match self {
            ContributionRecord::Commit { repository, .. }
            | ContributionRecord::Issue { repository, .. }
            | ContributionRecord::PullRequest { repository, .. }
            | ContributionRecord::Review { repository, .. } => repository,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ContributionRecord::Commit { occurred_at, .. }
            | ContributionRecord::Issue { occurred_at, .. }
            | ContributionRecord::PullRequest { occurred_at, .. }
            | ContributionRecord::Review { occurred_at, .. } => *occurred_at,
        }
    }

    pub fn is_private(&self) -> bool {
        self.repository().is_private
    }
}
