//! Run-level totals, appended once per full run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::HasId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub id: String,
    pub total_users: u64,
    pub total_orgs: u64,
    pub total_commits: u64,
    pub created_at: DateTime<Utc>,
}

impl Stat {
    pub fn new(total_users: u64, total_orgs: u64, total_commits: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("stat-{}", created_at.timestamp_millis()),
            total_users,
            total_orgs,
            total_commits,
            created_at,
        }
    }
}

impl HasId for Stat {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stat_id_derives_from_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let stat = Stat::new(3, 1, 42, at);
        assert_eq!(stat.id(), format!("stat-{}", at.timestamp_millis()));
        assert_eq!(stat.total_commits, 42);
    }
}
