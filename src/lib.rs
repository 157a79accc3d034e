//! # notifeed
//!
//! A client-held view of a per-user notification feed, kept consistent
//! across paginated backfill, optimistic local mutations and realtime pushes.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher ──────────────► FeedStore ◄──── RealtimeMerger ◄── push channel
//!    ▲                        ▲
//!    └── MutationCoordinator ─┘
//! ```
//!
//! - [`store`]: the single writer of feed state, driven by commands
//! - [`pagination`]: gates backfill requests per feed context
//! - [`mutation`]: optimistic apply with compensating rollback
//! - [`realtime`]: merges pushed notifications into the feed
//! - [`fetcher`]: the remote contract and its HTTP implementation
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the first two pages
//! notifeed list --pages 2
//!
//! # Mark one notification as seen
//! notifeed seen 65f0c2a1
//!
//! # Merge pushed notifications from a JSON-lines stream
//! socket-tail | notifeed watch
//! ```

/// Application context, feed session and error types.
///
/// [`FeedSession`](app::FeedSession) wires the store, cursor, mutation
/// coordinator and realtime merger to one fetcher.
pub mod app;

/// Command-line interface using clap.
///
/// - `list [--pages N]` - Load and print the feed
/// - `seen <id>` - Mark a notification as seen
/// - `delete <id>` - Delete a notification
/// - `clear` - Delete every notification
/// - `watch` - Merge pushes read from stdin
pub mod cli;

/// Configuration loaded from `~/.config/notifeed/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Notification`](domain::Notification): one feed entry
/// - [`Partition`](domain::Partition): unseen or seen
pub mod domain;

/// Remote service contract.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for page loads and mutations
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`MockFetcher`](fetcher::MockFetcher): Scripted implementation for tests
pub mod fetcher;

/// Optimistic mutations and the coordinator that runs them.
pub mod mutation;

/// Backfill cursor.
pub mod pagination;

/// Realtime push reconciliation.
pub mod realtime;

/// Feed state, commands and the store that hosts them.
pub mod store;
