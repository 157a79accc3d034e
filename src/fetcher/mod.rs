pub mod http_fetcher;
#[doc(hidden)]
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::{FeedError, Result};
use crate::domain::Notification;

pub use http_fetcher::HttpFetcher;
#[doc(hidden)]
pub use mock::MockFetcher;

/// One page of backfill as reported by the notification service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageResponse {
    pub current_page: u32,
    pub has_more: bool,
    pub unseen: Vec<Notification>,
    pub seen: Vec<Notification>,
    pub total_count: u64,
    pub total_pages: u32,
    pub unseen_count: u64,
}

impl PageResponse {
    /// The service sets either flag depending on version; trust whichever says yes.
    pub fn has_more_pages(&self) -> bool {
        self.has_more || self.current_page < self.total_pages
    }

    /// Drop notifications whose kind is excluded from the feed.
    pub fn retain_kinds(&mut self, excluded: &[String]) {
        if excluded.is_empty() {
            return;
        }
        let keep = |n: &Notification| !excluded.iter().any(|k| *k == n.kind);
        self.unseen.retain(keep);
        self.seen.retain(keep);
    }
}

/// Response wrapper used by every endpoint of the service.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// A successful envelope without data is `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>> {
        if self.success {
            Ok(self.data)
        } else if self.message.is_empty() {
            Err(FeedError::Remote("request was not successful".into()))
        } else {
            Err(FeedError::Remote(self.message))
        }
    }
}

/// Remote side of the feed. Implementations perform the network calls; the
/// engine only relies on success or failure of each one.
#[async_trait]
pub trait Fetcher {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<PageResponse>;

    async fn mark_seen(&self, id: &str) -> Result<()>;

    async fn remove(&self, id: &str) -> Result<()>;

    /// A "not found" outcome is reported as [`FeedError::NotFound`], never as success.
    async fn clear_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::fixtures::notification;

    #[test]
    fn test_has_more_from_either_flag() {
        let mut page = PageResponse {
            current_page: 1,
            total_pages: 3,
            ..Default::default()
        };
        assert!(page.has_more_pages());

        page.current_page = 3;
        assert!(!page.has_more_pages());

        page.has_more = true;
        assert!(page.has_more_pages());
    }

    #[test]
    fn test_retain_kinds_filters_both_partitions() {
        let mut call = notification("A", false);
        call.kind = "call".into();
        let mut seen_call = notification("C", true);
        seen_call.kind = "call".into();
        let mut page = PageResponse {
            unseen: vec![call, notification("B", false)],
            seen: vec![seen_call, notification("D", true)],
            ..Default::default()
        };

        page.retain_kinds(&["call".to_string()]);
        assert_eq!(page.unseen.len(), 1);
        assert_eq!(page.unseen[0].id, "B");
        assert_eq!(page.seen.len(), 1);
        assert_eq!(page.seen[0].id, "D");
    }

    #[test]
    fn test_envelope_parses_page() {
        let body = r#"{
            "success": true,
            "message": "ok",
            "data": {
                "currentPage": 1, "hasMore": false, "totalCount": 0,
                "totalPages": 2, "unseenCount": 5, "unseen": [], "seen": []
            }
        }"#;
        let envelope: Envelope<PageResponse> = serde_json::from_str(body).unwrap();
        let page = envelope.into_result().unwrap().unwrap();
        assert_eq!(page.unseen_count, 5);
        assert!(page.has_more_pages());
    }

    #[test]
    fn test_envelope_failure_carries_message() {
        let body = r#"{ "success": false, "message": "token expired" }"#;
        let envelope: Envelope<PageResponse> = serde_json::from_str(body).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.user_message(), "token expired");
    }

    #[test]
    fn test_envelope_success_without_data() {
        let envelope: Envelope<PageResponse> =
            serde_json::from_str(r#"{ "success": true, "message": "" }"#).unwrap();
        assert!(envelope.into_result().unwrap().is_none());
    }
}
