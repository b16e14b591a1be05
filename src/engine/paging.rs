//! Cursor-based pagination over a GitHub connection.
//!
//! A `PageSource` knows how to fetch one page given the previous page's end
//! cursor. `PageWalker` drives it to exhaustion one page at a time, sending
//! every request through the `RetryExecutor`, and keeps whatever it collected
//! when a page finally fails.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::engine::retry::RetryExecutor;
use crate::github::GithubError;

/// One page of a connection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    /// A page with nothing after it
    pub fn last(records: Vec<T>) -> Self {
        Self {
            records,
            end_cursor: None,
            has_next_page: false,
        }
    }

    pub fn with_next(records: Vec<T>, end_cursor: impl Into<String>) -> Self {
        Self {
            records,
            end_cursor: Some(end_cursor.into()),
            has_next_page: true,
        }
    }
}

/// A paged query whose cursor is supplied by the walker.
///
/// `after = None` requests the first page.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Short label used in logs
    fn describe(&self) -> String;

    async fn fetch_page(&self, after: Option<String>) -> Result<Page<Self::Item>, GithubError>;
}

/// The outcome of walking a source
#[derive(Debug)]
pub struct Walk<T> {
    pub records: Vec<T>,
    /// Pages successfully fetched
    pub pages: u32,
    /// Set when a page failed after retries
    pub halted: Option<GithubError>,
    /// The source still had pages when a guard stopped the walk
    pub truncated: bool,
}

impl<T> Walk<T> {
    pub fn not_found(err: GithubError) -> Self {
        Self {
            records: Vec::new(),
            pages: 0,
            halted: Some(err),
            truncated: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_not_found(&self) -> bool {
        self.halted.as_ref().is_some_and(GithubError::is_not_found)
    }

    /// Split into the collected records and the error that stopped the walk
    pub fn into_parts(self) -> (Vec<T>, Option<GithubError>) {
        (self.records, self.halted)
    }
}

/// Drives a `PageSource` sequentially until it is exhausted
#[derive(Debug, Clone)]
pub struct PageWalker {
    retry: RetryExecutor,
    max_pages: u32,
}

impl PageWalker {
    pub fn new(retry: RetryExecutor, max_pages: u32) -> Self {
        Self {
            retry,
            max_pages: max_pages.max(1),
        }
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    pub async fn walk<S: PageSource>(&self, source: &S) -> Walk<S::Item> {
        let label = source.describe();
        let mut records = Vec::new();
        let mut seen_cursors = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        let mut truncated = false;

        loop {
            if pages >= self.max_pages {
                tracing::warn!(
                    source = %label,
                    max_pages = self.max_pages,
                    records = records.len(),
                    "Page limit reached, stopping walk"
                );
                truncated = true;
                break;
            }

            let fetched = self
                .retry
                .run_while(&label, || source.fetch_page(cursor.clone()), GithubError::is_retryable)
                .await;

            let page = match fetched {
                Ok(page) => page,
                Err(err) if err.is_not_found() => {
                    log::info!("{} not found upstream", label);
                    return Walk::not_found(err);
                }
                Err(err) => {
                    tracing::warn!(
                        source = %label,
                        pages,
                        records = records.len(),
                        error = %err,
                        "Page request failed, keeping partial results"
                    );
                    return Walk {
                        records,
                        pages,
                        halted: Some(err),
                        truncated: false,
                    };
                }
            };

            pages += 1;
            records.extend(page.records);

            if !page.has_next_page {
                break;
            }

            match page.end_cursor {
                Some(next) if seen_cursors.insert(next.clone()) => cursor = Some(next),
                other => {
                    tracing::warn!(source = %label, cursor = ?other, "Cursor did not advance, stopping walk");
                    truncated = true;
                    break;
                }
            }
        }

        log::debug!("{}: {} records over {} pages", label, records.len(), pages);
        Walk {
            records,
            pages,
            halted: None,
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves scripted pages and records the cursors it was asked for
    struct MockSource {
        pages: Mutex<VecDeque<Result<Page<u32>, GithubError>>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl MockSource {
        fn new(pages: Vec<Result<Page<u32>, GithubError>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                cursors: Mutex::new(Vec::new()),
            }
        }

        fn cursors(&self) -> Vec<Option<String>> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for MockSource {
        type Item = u32;

        fn describe(&self) -> String {
            "mock".to_string()
        }

        async fn fetch_page(&self, after: Option<String>) -> Result<Page<u32>, GithubError> {
            self.cursors.lock().unwrap().push(after);
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GithubError::InvalidResponse("script exhausted".to_string())))
        }
    }

    fn walker() -> PageWalker {
        PageWalker::new(RetryExecutor::new(1, Duration::ZERO), 100)
    }

    fn transient() -> GithubError {
        GithubError::Graphql("something went wrong".to_string())
    }

    #[tokio::test]
    async fn test_walks_until_no_next_page() {
        let source = MockSource::new(vec![
            Ok(Page::with_next(vec![1, 2], "c1")),
            Ok(Page::with_next(vec![3], "c2")),
            Ok(Page::last(vec![4])),
        ]);

        let walk = walker().walk(&source).await;

        assert!(walk.is_complete());
        assert!(!walk.is_truncated());
        assert_eq!(walk.records, vec![1, 2, 3, 4]);
        assert_eq!(walk.pages, 3);
        assert_eq!(
            source.cursors(),
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_partial_results_survive_failed_page() {
        let source = MockSource::new(vec![
            Ok(Page::with_next(vec![1, 2], "c1")),
            Err(transient()),
            Ok(Page::last(vec![3])),
        ]);

        let walk = walker().walk(&source).await;

        assert_eq!(walk.records, vec![1, 2]);
        assert_eq!(walk.pages, 1);
        assert!(!walk.is_complete());
        assert!(!walk.is_not_found());
        // third page is never requested
        assert_eq!(source.cursors().len(), 2);
    }

    #[tokio::test]
    async fn test_not_found_yields_empty_walk() {
        let source = MockSource::new(vec![Err(GithubError::NotFound("ghost".to_string()))]);

        let walk = walker().walk(&source).await;

        assert!(walk.records.is_empty());
        assert!(walk.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_page_is_retried_with_same_cursor() {
        let source = MockSource::new(vec![
            Ok(Page::with_next(vec![1], "c1")),
            Err(transient()),
            Ok(Page::last(vec![2])),
        ]);
        let walker = PageWalker::new(RetryExecutor::new(2, Duration::from_secs(5)), 100);

        let walk = walker.walk(&source).await;

        assert!(walk.is_complete());
        assert_eq!(walk.records, vec![1, 2]);
        assert_eq!(
            source.cursors(),
            vec![None, Some("c1".to_string()), Some("c1".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let source = MockSource::new(vec![
            Err(GithubError::NotFound("ghost".to_string())),
            Ok(Page::last(vec![1])),
        ]);
        let walker = PageWalker::new(RetryExecutor::new(3, Duration::from_secs(5)), 100);

        let walk = walker.walk(&source).await;

        assert!(walk.is_not_found());
        assert_eq!(source.cursors().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_cursor_stops_walk() {
        let source = MockSource::new(vec![
            Ok(Page::with_next(vec![1], "same")),
            Ok(Page::with_next(vec![2], "same")),
            Ok(Page::last(vec![3])),
        ]);

        let walk = walker().walk(&source).await;

        assert!(walk.is_complete());
        assert!(walk.is_truncated());
        assert_eq!(walk.records, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_missing_cursor_with_next_page_stops_walk() {
        let source = MockSource::new(vec![Ok(Page {
            records: vec![1],
            end_cursor: None,
            has_next_page: true,
        })]);

        let walk = walker().walk(&source).await;

        assert_eq!(walk.records, vec![1]);
        assert!(walk.is_truncated());
        assert_eq!(source.cursors().len(), 1);
    }

    #[tokio::test]
    async fn test_max_pages_bounds_walk() {
        let pages = (0..10).map(|i| Ok(Page::with_next(vec![i], format!("c{}", i)))).collect();
        let source = MockSource::new(pages);
        let walker = PageWalker::new(RetryExecutor::new(1, Duration::ZERO), 3);

        let walk = walker.walk(&source).await;

        assert_eq!(walk.records, vec![0, 1, 2]);
        assert_eq!(walk.pages, 3);
        assert!(walk.is_complete());
        assert!(walk.is_truncated());
        // the page after the limit is never requested
        assert_eq!(source.cursors().len(), 3);
    }

    #[tokio::test]
    async fn test_last_page_at_limit_is_not_truncated() {
        let source = MockSource::new(vec![Ok(Page::with_next(vec![1], "c1")), Ok(Page::last(vec![2]))]);
        let walker = PageWalker::new(RetryExecutor::new(1, Duration::ZERO), 2);

        let walk = walker.walk(&source).await;

        assert_eq!(walk.records, vec![1, 2]);
        assert!(!walk.is_truncated());
    }
}
