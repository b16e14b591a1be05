//! Trailing time window used for score and count derivation.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Ledger, LedgerEvent};

/// The half-open interval `(now - length, now]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn trailing(now: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start: now - length,
            end: now,
        }
    }

    pub fn trailing_days(now: DateTime<Utc>, days: u32) -> Self {
        Self::trailing(now, Duration::days(i64::from(days)))
    }

    /// Exclusive lower bound
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Inclusive upper bound
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at > self.start && at <= self.end
    }

    /// Events of each bucket that fall inside the window, paired with the bucket's stars
    pub fn select<'a, E: LedgerEvent>(&'a self, ledger: &'a Ledger<E>) -> impl Iterator<Item = (u64, &'a E)> + 'a {
        ledger.buckets().iter().flat_map(move |bucket| {
            bucket
                .events()
                .iter()
                .filter(move |e| self.contains(e.occurred_at()))
                .map(move |e| (bucket.stars_count, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommitEvent, CommitLedger, RepositoryRef};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_lower_bound_is_exclusive() {
        let window = TimeWindow::trailing_days(now(), 30);
        assert!(!window.contains(now() - Duration::days(30)));
        assert!(window.contains(now() - Duration::days(30) + Duration::seconds(1)));
    }

    #[test]
    fn test_upper_bound_is_inclusive() {
        let window = TimeWindow::trailing_days(now(), 30);
        assert!(window.contains(now()));
        assert!(!window.contains(now() + Duration::seconds(1)));
    }

    #[test]
    fn test_inside_window() {
        let window = TimeWindow::trailing_days(now(), 30);
        assert!(window.contains(now() - Duration::days(29)));
        assert!(!window.contains(now() - Duration::days(31)));
    }

    #[test]
    fn test_select_filters_per_bucket() {
        let mut ledger = CommitLedger::new();
        let a = RepositoryRef::new("a", "https://github.com/x/a", 10);
        let b = RepositoryRef::new("b", "https://github.com/x/b", 2);
        ledger.merge_event(&a, CommitEvent::new(3, now() - Duration::days(1)));
        ledger.merge_event(&a, CommitEvent::new(9, now() - Duration::days(40)));
        ledger.merge_event(&b, CommitEvent::new(1, now()));

        let window = TimeWindow::trailing_days(now(), 30);
        let selected: Vec<(u64, u64)> = window.select(&ledger).map(|(stars, e)| (stars, e.commit_count)).collect();

        assert_eq!(selected, vec![(10, 3), (2, 1)]);
    }
}
