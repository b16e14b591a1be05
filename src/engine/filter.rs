//! Eligibility predicates: region membership and the blocklist.

use std::collections::HashSet;
use std::fs;

use serde::Deserialize;

use crate::config::{BlocklistConfig, RegionConfig};
use crate::domain::RepositoryRef;
use crate::error::{LedgerError, Result};

/// Decides whether a free-text profile location belongs to the region
#[derive(Debug, Clone)]
pub struct LocationClassifier {
    exact: String,
    keywords: Vec<String>,
}

impl LocationClassifier {
    pub fn new(exact: impl Into<String>, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            exact: exact.into().to_lowercase(),
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &RegionConfig) -> Self {
        Self::new(config.name.clone(), config.keywords.iter().cloned())
    }

    /// Exact match on the region name, or any keyword as a substring
    pub fn matches(&self, location: Option<&str>) -> bool {
        let location = match location.map(str::trim) {
            Some(l) if !l.is_empty() => l.to_lowercase(),
            _ => return false,
        };

        location == self.exact || self.keywords.iter().any(|k| location.contains(k.as_str()))
    }
}

/// On-disk shape of a blocklist file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BlocklistFile {
    repositories: Vec<String>,
    users: Vec<String>,
}

/// Immutable set of blocked repositories and users.
///
/// Built once at startup and passed by reference to whoever needs it.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    repositories: HashSet<String>,
    users: HashSet<String>,
}

impl Blocklist {
    pub fn new(
        repositories: impl IntoIterator<Item = impl AsRef<str>>,
        users: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        let normalize = |s: &str| s.trim().to_lowercase();
        Self {
            repositories: repositories
                .into_iter()
                .map(|r| normalize(r.as_ref()))
                .filter(|r| !r.is_empty())
                .collect(),
            users: users
                .into_iter()
                .map(|u| normalize(u.as_ref()))
                .filter(|u| !u.is_empty())
                .collect(),
        }
    }

    /// Inline lists merged with the optional blocklist file
    pub fn from_config(config: &BlocklistConfig) -> Result<Self> {
        let mut repositories = config.repositories.clone();
        let mut users = config.users.clone();

        if let Some(path) = &config.path {
            let content = fs::read_to_string(path)
                .map_err(|e| LedgerError::Config(format!("Failed to read blocklist {}: {}", path.display(), e)))?;
            let file: BlocklistFile = serde_yaml::from_str(&content)?;
            log::info!(
                "Loaded blocklist from {}: {} repositories, {} users",
                path.display(),
                file.repositories.len(),
                file.users.len()
            );
            repositories.extend(file.repositories);
            users.extend(file.users);
        }

        Ok(Self::new(repositories, users))
    }

    /// True if any entry equals the given repository name or URL
    pub fn is_repository_blocked(&self, name_or_url: &str) -> bool {
        let needle = name_or_url.trim().to_lowercase();
        self.repositories.contains(&needle)
    }

    /// Matches on the repository name, its URL, or its `owner/name` path
    pub fn blocks(&self, repository: &RepositoryRef) -> bool {
        if self.is_repository_blocked(&repository.name) || self.is_repository_blocked(&repository.url) {
            return true;
        }
        owner_and_name(&repository.url).is_some_and(|path| self.is_repository_blocked(&path))
    }

    pub fn is_user_blocked(&self, login: &str) -> bool {
        self.users.contains(&login.trim().to_lowercase())
    }
}

fn owner_and_name(url: &str) -> Option<String> {
    let mut segments = url.trim_end_matches('/').rsplit('/');
    let name = segments.next()?;
    let owner = segments.next()?;
    Some(format!("{}/{}", owner, name))
}
