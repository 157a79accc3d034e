//! Reconciliation of pushed notifications into the feed.
//!
//! Pushes are applied locally only; nothing here talks to the remote.
//! Delivery may repeat or arrive out of order relative to local mutations,
//! which the merge rules in [`crate::store::FeedCommand::MergeIncoming`]
//! absorb.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::Notification;
use crate::store::{self, Effect, SharedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// New id, placed at the head of its partition.
    Inserted,
    /// Known id whose seen state changed; moved across partitions.
    Moved,
    /// Known id already in the right partition.
    Duplicate,
    /// Kind excluded from the feed.
    Filtered,
}

#[derive(Clone)]
pub struct RealtimeMerger {
    store: SharedStore,
    excluded_kinds: Arc<[String]>,
}

impl RealtimeMerger {
    pub fn new(store: SharedStore, excluded_kinds: Vec<String>) -> Self {
        Self {
            store,
            excluded_kinds: excluded_kinds.into(),
        }
    }

    pub fn on_push(&self, notification: Notification) -> MergeOutcome {
        if self.excluded_kinds.iter().any(|k| *k == notification.kind) {
            debug!(id = %notification.id, kind = %notification.kind, "push filtered");
            return MergeOutcome::Filtered;
        }

        let id = notification.id.clone();
        let outcome = match store::lock(&self.store).merge_incoming(notification) {
            Effect::Inserted(_) => MergeOutcome::Inserted,
            Effect::Moved { .. } => MergeOutcome::Moved,
            _ => MergeOutcome::Duplicate,
        };
        debug!(%id, ?outcome, "push merged");
        outcome
    }
}

/// Parse one push payload as delivered by the realtime channel.
pub fn parse_event(payload: &str) -> Result<Notification> {
    Ok(serde_json::from_str(payload)?)
}

/// Message type for the background merger
#[derive(Debug)]
pub enum PushMessage {
    Notification(Box<Notification>),
    Shutdown,
}

/// Handle to feed pushes to the background merger
#[derive(Clone)]
pub struct RealtimeHandle {
    tx: mpsc::Sender<PushMessage>,
}

impl RealtimeHandle {
    /// Queue a pushed notification. Waits while the queue is full.
    pub async fn push(&self, notification: Notification) {
        if let Err(e) = self
            .tx
            .send(PushMessage::Notification(Box::new(notification)))
            .await
        {
            warn!("Failed to queue pushed notification: {}", e);
        }
    }

    /// Stop the background merger after it drains what is already queued
    pub async fn shutdown(&self) {
        let _ = self.tx.send(PushMessage::Shutdown).await;
    }
}

/// Tally of what the background merger did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub moved: usize,
    pub duplicates: usize,
    pub filtered: usize,
}

impl MergeStats {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Moved => self.moved += 1,
            MergeOutcome::Duplicate => self.duplicates += 1,
            MergeOutcome::Filtered => self.filtered += 1,
        }
    }
}

/// Drains the push queue one notification at a time.
pub struct BackgroundMerger {
    merger: RealtimeMerger,
    rx: mpsc::Receiver<PushMessage>,
}

impl BackgroundMerger {
    pub fn new(merger: RealtimeMerger, buffer: usize) -> (Self, RealtimeHandle) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { merger, rx }, RealtimeHandle { tx })
    }

    /// Run until shutdown or until every handle is dropped.
    pub async fn run(mut self) -> MergeStats {
        info!("Realtime merger started");
        let mut stats = MergeStats::default();

        while let Some(msg) = self.rx.recv().await {
            match msg {
                PushMessage::Notification(notification) => {
                    stats.record(self.merger.on_push(*notification));
                }
                PushMessage::Shutdown => {
                    info!("Realtime merger shutting down");
                    break;
                }
            }
        }

        stats
    }
}

/// Spawn the background merger as a tokio task
pub fn spawn_realtime_merger(
    merger: RealtimeMerger,
    buffer: usize,
) -> (RealtimeHandle, JoinHandle<MergeStats>) {
    let (background, handle) = BackgroundMerger::new(merger, buffer);
    let task = tokio::spawn(background.run());
    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::fixtures::notification;
    use crate::store::{FeedState, FeedStore};

    fn merger() -> (SharedStore, RealtimeMerger) {
        let store = store::shared(FeedStore::with_state(FeedState::new(
            vec![notification("A", false), notification("B", false)],
            vec![notification("C", true)],
            2,
        )));
        let merger = RealtimeMerger::new(store.clone(), vec!["call".into()]);
        (store, merger)
    }

    #[test]
    fn test_duplicate_push_changes_state_once() {
        let (store, merger) = merger();
        assert_eq!(merger.on_push(notification("N", false)), MergeOutcome::Inserted);
        let after_first = store::lock(&store).snapshot();

        assert_eq!(merger.on_push(notification("N", false)), MergeOutcome::Duplicate);
        assert_eq!(store::lock(&store).state(), &after_first);
        assert_eq!(after_first.unseen_count(), 3);
    }

    #[test]
    fn test_seen_push_for_unseen_item_moves_it() {
        let (store, merger) = merger();
        assert_eq!(merger.on_push(notification("B", true)), MergeOutcome::Moved);

        let store = store::lock(&store);
        let state = store.state();
        assert_eq!(state.unseen().len(), 1);
        assert_eq!(state.seen()[0].id, "B");
        assert_eq!(state.unseen_count(), 1);
    }

    #[test]
    fn test_excluded_kind_is_filtered() {
        let (store, merger) = merger();
        let mut call = notification("X", false);
        call.kind = "call".into();

        assert_eq!(merger.on_push(call), MergeOutcome::Filtered);
        assert!(!store::lock(&store).state().contains("X"));
    }

    #[test]
    fn test_parse_event_rejects_garbage() {
        assert!(parse_event("{ not json").is_err());
    }

    #[tokio::test]
    async fn test_background_merger_applies_in_order() {
        let (store, merger) = merger();
        let (handle, task) = spawn_realtime_merger(merger, 8);

        handle.push(notification("N", false)).await;
        handle.push(notification("N", true)).await;
        handle.push(notification("N", true)).await;
        handle.shutdown().await;

        let stats = task.await.unwrap();
        assert_eq!(
            stats,
            MergeStats {
                inserted: 1,
                moved: 1,
                duplicates: 1,
                filtered: 0,
            }
        );
        let store = store::lock(&store);
        assert_eq!(store.state().seen()[0].id, "N");
        assert_eq!(store.state().unseen_count(), 2);
    }
}
