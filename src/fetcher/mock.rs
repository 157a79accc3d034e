//! Scripted fetcher for tests.
//!
//! Pages are queued per page number, failures are injected per call kind and
//! every call is recorded. Calls can be held open to exercise interleavings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::app::{FeedError, Result};
use crate::fetcher::{Fetcher, PageResponse};

/// A call observed by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCall {
    Page { page: u32, limit: u32 },
    MarkSeen(String),
    Remove(String),
    ClearAll,
}

#[derive(Debug, Default)]
pub struct MockFetcher {
    inner: Arc<Mutex<MockFetcherInner>>,
}

#[derive(Debug, Default)]
struct MockFetcherInner {
    pages: HashMap<u32, PageResponse>,
    calls: Vec<FetchCall>,
    fail_next_page: Option<FeedError>,
    fail_next_mutation: Option<FeedError>,
    hold_next_page: Option<oneshot::Receiver<()>>,
    hold_next_mutation: Option<oneshot::Receiver<()>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockFetcherInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `response` for every request of `page`.
    pub fn set_page(&self, page: u32, response: PageResponse) {
        self.inner().pages.insert(page, response);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.inner().calls.clone()
    }

    /// Cause the next page request to fail with the given error.
    pub fn fail_next_page(&self, error: FeedError) {
        self.inner().fail_next_page = Some(error);
    }

    /// Cause the next mark-seen, remove or clear-all to fail with the given error.
    pub fn fail_next_mutation(&self, error: FeedError) {
        self.inner().fail_next_mutation = Some(error);
    }

    /// Hold the next page request until the returned sender fires or drops.
    pub fn hold_next_page(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner().hold_next_page = Some(rx);
        tx
    }

    /// Hold the next mutation until the returned sender fires or drops.
    pub fn hold_next_mutation(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner().hold_next_mutation = Some(rx);
        tx
    }

    async fn mutation(&self, call: FetchCall) -> Result<()> {
        let hold = {
            let mut inner = self.inner();
            inner.calls.push(call);
            inner.hold_next_mutation.take()
        };
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        match self.inner().fail_next_mutation.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Clone for MockFetcher {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<PageResponse> {
        let hold = {
            let mut inner = self.inner();
            inner.calls.push(FetchCall::Page { page, limit });
            inner.hold_next_page.take()
        };
        if let Some(hold) = hold {
            let _ = hold.await;
        }

        let mut inner = self.inner();
        if let Some(error) = inner.fail_next_page.take() {
            return Err(error);
        }
        Ok(inner.pages.get(&page).cloned().unwrap_or_else(|| PageResponse {
            current_page: page,
            ..Default::default()
        }))
    }

    async fn mark_seen(&self, id: &str) -> Result<()> {
        self.mutation(FetchCall::MarkSeen(id.to_string())).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.mutation(FetchCall::Remove(id.to_string())).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.mutation(FetchCall::ClearAll).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_page_is_empty() {
        let mock = MockFetcher::new();
        let page = mock.fetch_page(4, 10).await.unwrap();
        assert_eq!(page.current_page, 4);
        assert!(!page.has_more_pages());
        assert_eq!(mock.calls(), vec![FetchCall::Page { page: 4, limit: 10 }]);
    }

    #[tokio::test]
    async fn test_failure_applies_once() {
        let mock = MockFetcher::new();
        mock.fail_next_mutation(FeedError::Remote("nope".into()));
        assert!(mock.remove("a").await.is_err());
        assert!(mock.remove("a").await.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let mock = MockFetcher::new();
        let other = mock.clone();
        other.clear_all().await.unwrap();
        assert_eq!(mock.calls(), vec![FetchCall::ClearAll]);
    }
}
