use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::{FeedError, Result};
use crate::config::FeedConfig;
use crate::fetcher::{Fetcher, PageResponse};
use crate::mutation::{MutationCoordinator, MutationOutcome};
use crate::pagination::{FeedTab, LoadTicket, PaginationCursor};
use crate::realtime::{spawn_realtime_merger, MergeStats, RealtimeHandle, RealtimeMerger};
use crate::store::{self, FeedState, FeedStore, SharedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page was fetched and applied to the store.
    Applied,
    /// The cursor refused the request (in flight, exhausted, or wrong tab).
    Gated,
    /// The tab changed or a reload started while the page was in flight;
    /// the result was discarded.
    Stale,
}

/// One user's notification feed: store, backfill cursor, mutations and
/// realtime merging wired to a single fetcher.
pub struct FeedSession {
    store: SharedStore,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    coordinator: MutationCoordinator,
    merger: RealtimeMerger,
    cursor: Mutex<PaginationCursor>,
    settings: FeedConfig,
    last_error: Mutex<Option<String>>,
}

impl FeedSession {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, settings: FeedConfig) -> Self {
        let store = store::shared(FeedStore::new());
        let coordinator = MutationCoordinator::new(store.clone(), fetcher.clone());
        let merger = RealtimeMerger::new(store.clone(), settings.excluded_kinds.clone());

        Self {
            store,
            fetcher,
            coordinator,
            merger,
            cursor: Mutex::new(PaginationCursor::default()),
            settings,
            last_error: Mutex::new(None),
        }
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    pub fn state(&self) -> FeedState {
        store::lock(&self.store).snapshot()
    }

    pub fn cursor(&self) -> PaginationCursor {
        self.lock_cursor().clone()
    }

    /// Message from the last failed load, cleared by the next reload.
    pub fn last_error(&self) -> Option<String> {
        self.lock_error().clone()
    }

    pub fn realtime(&self) -> &RealtimeMerger {
        &self.merger
    }

    pub fn spawn_realtime(&self) -> (RealtimeHandle, JoinHandle<MergeStats>) {
        spawn_realtime_merger(self.merger.clone(), self.settings.push_buffer)
    }

    fn lock_cursor(&self) -> MutexGuard<'_, PaginationCursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_error(&self) -> MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn filtered(&self, mut page: PageResponse) -> PageResponse {
        page.retain_kinds(&self.settings.excluded_kinds);
        page
    }

    /// First load of the feed. Same as [`FeedSession::refresh`].
    pub async fn load_initial(&self) -> Result<LoadOutcome> {
        self.refresh().await
    }

    /// Reload page 1 and replace the feed wholesale, resetting the cursor.
    ///
    /// On failure the feed is emptied, paging stops and the error is kept
    /// for [`FeedSession::last_error`].
    pub async fn refresh(&self) -> Result<LoadOutcome> {
        let ticket = {
            let mut cursor = self.lock_cursor();
            let tab = cursor.tab();
            cursor.reset(tab);
            cursor.reload_ticket()
        };
        *self.lock_error() = None;

        let result = self.fetcher.fetch_page(ticket.page, self.settings.page_size).await;
        self.apply_reload(&ticket, result)
    }

    fn apply_reload(&self, ticket: &LoadTicket, result: Result<PageResponse>) -> Result<LoadOutcome> {
        let mut cursor = self.lock_cursor();
        if !cursor.is_current(ticket) {
            debug!("discarding reload result for a superseded context");
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(page) => {
                let page = self.filtered(page);
                let has_more = page.has_more_pages();
                info!(
                    unseen = page.unseen.len(),
                    seen = page.seen.len(),
                    unseen_count = page.unseen_count,
                    has_more,
                    "notifications loaded"
                );
                store::lock(&self.store).replace_all(page.unseen, page.seen, page.unseen_count);
                cursor.complete(ticket, has_more);
                Ok(LoadOutcome::Applied)
            }
            Err(error) => {
                let message = error.user_message();
                warn!(%error, "initial notification load failed");
                store::lock(&self.store).replace_all(Vec::new(), Vec::new(), 0);
                cursor.end_load(ticket, false);
                *self.lock_error() = Some(message.clone());
                Err(FeedError::Load(message))
            }
        }
    }

    /// Fetch and append the next page if the cursor allows it.
    ///
    /// Paging pauses while a clear-all is in flight, so a rollback only has
    /// realtime arrivals to carry over.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let ticket = {
            let mut cursor = self.lock_cursor();
            if cursor.tab() != FeedTab::Notifications || self.coordinator.is_clearing() {
                return Ok(LoadOutcome::Gated);
            }
            match cursor.begin_load() {
                Some(ticket) => ticket,
                None => return Ok(LoadOutcome::Gated),
            }
        };

        let result = self.fetcher.fetch_page(ticket.page, self.settings.page_size).await;
        self.apply_page(&ticket, result)
    }

    fn apply_page(&self, ticket: &LoadTicket, result: Result<PageResponse>) -> Result<LoadOutcome> {
        let mut cursor = self.lock_cursor();
        if !cursor.is_current(ticket) {
            debug!(page = ticket.page, "discarding page for a superseded context");
            return Ok(LoadOutcome::Stale);
        }
        if self.coordinator.is_clearing() {
            // Released without advancing, the page is requested again later.
            debug!(page = ticket.page, "discarding page that landed during clear-all");
            let has_more = cursor.has_more();
            cursor.end_load(ticket, has_more);
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(page) => {
                let page = self.filtered(page);
                let has_more = page.has_more_pages();
                debug!(
                    page = ticket.page,
                    unseen = page.unseen.len(),
                    seen = page.seen.len(),
                    has_more,
                    "appending notification page"
                );
                store::lock(&self.store).append_page(page.unseen, page.seen);
                cursor.complete(ticket, has_more);
                Ok(LoadOutcome::Applied)
            }
            Err(error) => {
                let message = error.user_message();
                warn!(page = ticket.page, %error, "loading more notifications failed");
                cursor.end_load(ticket, false);
                *self.lock_error() = Some(message.clone());
                Err(FeedError::Load(message))
            }
        }
    }

    /// Switch the active tab. Progress for the previous tab is discarded and
    /// in-flight pages become stale; the notifications tab reloads.
    pub async fn switch_tab(&self, tab: FeedTab) -> Result<LoadOutcome> {
        self.lock_cursor().reset(tab);
        if tab == FeedTab::Notifications {
            self.refresh().await
        } else {
            Ok(LoadOutcome::Gated)
        }
    }

    pub async fn mark_seen(&self, id: &str) -> Result<MutationOutcome> {
        self.coordinator.mark_seen(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<MutationOutcome> {
        self.coordinator.delete(id).await
    }

    pub async fn clear_all(&self) -> Result<MutationOutcome> {
        self.coordinator.clear_all().await
    }
}
