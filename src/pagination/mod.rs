//! Backfill progress for one feed context.
//!
//! The cursor only gates requests. Whatever decides that the consumer is
//! close to the end of the list (scrolling, a timer, an explicit command)
//! asks [`PaginationCursor::begin_load`] for a ticket and hands it back when
//! the fetch resolves.

use std::fmt;

use tracing::debug;

/// The context a cursor's pages belong to. Switching tabs discards progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedTab {
    #[default]
    Notifications,
    FriendRequests,
    SentRequests,
}

impl fmt::Display for FeedTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedTab::Notifications => "notifications",
            FeedTab::FriendRequests => "friend-requests",
            FeedTab::SentRequests => "requests-sent",
        };
        f.write_str(name)
    }
}

/// Permission to fetch one page, valid until the cursor is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub page: u32,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct PaginationCursor {
    tab: FeedTab,
    page: u32,
    has_more: bool,
    is_loading_more: bool,
    generation: u64,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::new(FeedTab::default())
    }
}

impl PaginationCursor {
    pub fn new(tab: FeedTab) -> Self {
        Self {
            tab,
            page: 1,
            has_more: true,
            is_loading_more: false,
            generation: 0,
        }
    }

    pub fn tab(&self) -> FeedTab {
        self.tab
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.is_loading_more
    }

    /// Ticket for a full reload of page 1. Claims the in-flight flag, so no
    /// further page is issued until the reload is released.
    pub fn reload_ticket(&mut self) -> LoadTicket {
        self.is_loading_more = true;
        LoadTicket {
            page: 1,
            generation: self.generation,
        }
    }

    /// Claim the next page. Returns `None` while a load is in flight or when
    /// the feed is exhausted.
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        if !self.can_load_more() {
            return None;
        }
        self.is_loading_more = true;
        Some(LoadTicket {
            page: self.page + 1,
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Release a ticket without advancing the page, e.g. after a failure.
    /// Returns false when the ticket predates the last reset.
    pub fn end_load(&mut self, ticket: &LoadTicket, has_more: bool) -> bool {
        if !self.is_current(ticket) {
            debug!(page = ticket.page, tab = %self.tab, "ignoring stale page ticket");
            return false;
        }
        self.is_loading_more = false;
        self.has_more = has_more;
        true
    }

    /// Release a ticket whose page was applied.
    pub fn complete(&mut self, ticket: &LoadTicket, has_more: bool) -> bool {
        if !self.end_load(ticket, has_more) {
            return false;
        }
        self.page = ticket.page;
        true
    }

    /// Back to `(1, true, false)` for `tab`. Outstanding tickets go stale.
    pub fn reset(&mut self, tab: FeedTab) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::new(tab)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cursor_can_load() {
        let cursor = PaginationCursor::default();
        assert_eq!(cursor.page(), 1);
        assert!(cursor.has_more());
        assert!(!cursor.is_loading_more());
        assert!(cursor.can_load_more());
    }

    #[test]
    fn test_begin_load_gates_second_request() {
        let mut cursor = PaginationCursor::default();
        let ticket = cursor.begin_load().unwrap();
        assert_eq!(ticket.page, 2);
        assert!(cursor.is_loading_more());
        assert!(cursor.begin_load().is_none());

        assert!(cursor.complete(&ticket, true));
        assert_eq!(cursor.page(), 2);
        assert_eq!(cursor.begin_load().unwrap().page, 3);
    }

    #[test]
    fn test_end_load_without_more_stops_paging() {
        let mut cursor = PaginationCursor::default();
        let ticket = cursor.begin_load().unwrap();
        cursor.end_load(&ticket, false);
        assert_eq!(cursor.page(), 1);
        assert!(!cursor.is_loading_more());
        assert!(!cursor.can_load_more());
    }

    #[test]
    fn test_reset_restores_defaults_and_invalidates_tickets() {
        let mut cursor = PaginationCursor::default();
        let first = cursor.begin_load().unwrap();
        cursor.complete(&first, true);
        let in_flight = cursor.begin_load().unwrap();

        cursor.reset(FeedTab::FriendRequests);
        assert_eq!(cursor.tab(), FeedTab::FriendRequests);
        assert_eq!(cursor.page(), 1);
        assert!(cursor.can_load_more());

        assert!(!cursor.complete(&in_flight, false));
        assert_eq!(cursor.page(), 1);
        assert!(cursor.has_more());
    }

    #[test]
    fn test_reload_ticket_targets_first_page() {
        let mut cursor = PaginationCursor::default();
        let ticket = cursor.reload_ticket();
        assert_eq!(ticket.page, 1);
        assert!(cursor.complete(&ticket, false));
        assert!(!cursor.can_load_more());
    }

    #[test]
    fn test_reload_ticket_gates_next_page_until_released() {
        let mut cursor = PaginationCursor::default();
        let reload = cursor.reload_ticket();
        assert!(cursor.is_loading_more());
        assert!(cursor.begin_load().is_none());

        assert!(cursor.complete(&reload, true));
        assert_eq!(cursor.begin_load().unwrap().page, 2);
    }

    #[test]
    fn test_tab_display_names() {
        assert_eq!(FeedTab::Notifications.to_string(), "notifications");
        assert_eq!(FeedTab::SentRequests.to_string(), "requests-sent");
    }
}
