//! Users and organizations tracked by the ledger.

use serde::{Deserialize, Serialize};

use crate::domain::ledger::{ActivityLedger, CommitLedger};
use crate::storage::HasId;

/// Derived scalar field names on the user document
pub mod fields {
    pub const SCORE: &str = "score";
    pub const COMMITS_TOTAL_COUNT: &str = "commitsTotalCount";
    pub const SCORE_RANK: &str = "score_rank";
    pub const CONTRIBUTIONS_RANK: &str = "contributions_rank";
    pub const REPOSITORIES: &str = "repositories";
    pub const REPOSITORIES_COUNT: &str = "repositories_count";
    pub const MEMBERS: &str = "members";
}

/// Profile of a GitHub user as returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub avatar_url: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub is_hireable: Option<bool>,
    pub url: String,
    pub created_at: Option<String>,
}

/// Profile of a GitHub organization as returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgProfile {
    pub login: String,
    pub avatar_url: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub url: String,
    pub created_at: Option<String>,
}

/// A tracked GitHub user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub avatar_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(rename = "isHireable", default)]
    pub is_hireable: Option<bool>,
    pub github_profile_url: String,
    #[serde(rename = "user_createdAt", default)]
    pub user_created_at: Option<String>,

    #[serde(default)]
    pub commit_contributions: CommitLedger,
    #[serde(default)]
    pub issue_contributions: ActivityLedger,
    #[serde(default)]
    pub pr_contributions: ActivityLedger,
    #[serde(default)]
    pub code_review_contributions: ActivityLedger,

    #[serde(default)]
    pub score: u64,
    #[serde(rename = "commitsTotalCount", default)]
    pub commits_total_count: u64,
    #[serde(default)]
    pub score_rank: Option<u64>,
    #[serde(default)]
    pub contributions_rank: Option<u64>,
}

impl User {
    /// Create a user with empty ledgers from a freshly discovered profile
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            username: profile.login.clone(),
            avatar_url: profile.avatar_url.clone(),
            name: profile.name.clone(),
            location: profile.location.clone(),
            bio: profile.bio.clone(),
            company: profile.company.clone(),
            is_hireable: profile.is_hireable,
            github_profile_url: profile.url.clone(),
            user_created_at: profile.created_at.clone(),
            commit_contributions: CommitLedger::new(),
            issue_contributions: ActivityLedger::new(),
            pr_contributions: ActivityLedger::new(),
            code_review_contributions: ActivityLedger::new(),
            score: 0,
            commits_total_count: 0,
            score_rank: None,
            contributions_rank: None,
        }
    }

    /// Overwrite the volatile profile fields, leaving ledgers and ranks alone
    pub fn refresh_profile(&mut self, profile: &UserProfile) {
        self.username = profile.login.clone();
        self.avatar_url = profile.avatar_url.clone();
        self.name = profile.name.clone();
        self.location = profile.location.clone();
        self.bio = profile.bio.clone();
        self.company = profile.company.clone();
        self.is_hireable = profile.is_hireable;
        self.github_profile_url = profile.url.clone();
    }
}

impl HasId for User {
    fn id(&self) -> &str {
        &self.username
    }

    fn id_field() -> &'static str {
        "username"
    }
}

/// A public repository owned by an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgRepository {
    pub name: String,
    #[serde(default)]
    pub url: String,
    pub stars_count: u64,
}

/// A member of an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    pub avatar_url: String,
    pub url: String,
}

/// A tracked GitHub organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub username: String,
    pub avatar_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub github_profile_url: String,
    #[serde(rename = "organization_createdAt", default)]
    pub organization_created_at: Option<String>,
    #[serde(default)]
    pub repositories: Vec<OrgRepository>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub repositories_count: u64,
}

impl Organization {
    pub fn from_profile(profile: &OrgProfile) -> Self {
        Self {
            username: profile.login.clone(),
            avatar_url: profile.avatar_url.clone(),
            name: profile.name.clone(),
            location: profile.location.clone(),
            github_profile_url: profile.url.clone(),
            organization_created_at: profile.created_at.clone(),
            repositories: Vec::new(),
            members: Vec::new(),
            repositories_count: 0,
        }
    }
}

impl HasId for Organization {
    fn id(&self) -> &str {
        &self.username
    }

    fn id_field() -> &'static str {
        "username"
    }
}
