use async_trait::async_trait;

use crate::app::Result;
use crate::domain::Notification;
use crate::fetcher::Fetcher;
use crate::mutation::{Mutation, MutationKey, MutationKind};
use crate::store::{Effect, FeedCommand, FeedState, FeedStore};

#[derive(Debug, Clone)]
pub struct MarkSeen {
    id: String,
}

impl MarkSeen {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Mutation for MarkSeen {
    /// Index the notification held in `unseen` before the move, and whether
    /// the move decremented the counter.
    type Snapshot = (usize, bool);

    fn kind(&self) -> MutationKind {
        MutationKind::MarkSeen
    }

    fn key(&self) -> MutationKey {
        MutationKey::Id(self.id.clone())
    }

    fn apply(&self, store: &mut FeedStore) -> Option<(usize, bool)> {
        match store.mark_seen(&self.id) {
            Effect::Moved {
                position, counted, ..
            } => Some((position, counted)),
            _ => None,
        }
    }

    async fn remote(&self, fetcher: &(dyn Fetcher + Send + Sync)) -> Result<()> {
        fetcher.mark_seen(&self.id).await
    }

    fn compensate(&self, store: &mut FeedStore, (position, recount): (usize, bool)) {
        store.dispatch(FeedCommand::RevertSeen {
            id: self.id.clone(),
            position,
            recount,
        });
    }
}

#[derive(Debug, Clone)]
pub struct Delete {
    id: String,
}

impl Delete {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Mutation for Delete {
    /// The removed notification, its index within its partition and
    /// whether the removal decremented the counter.
    type Snapshot = (Notification, usize, bool);

    fn kind(&self) -> MutationKind {
        MutationKind::Delete
    }

    fn key(&self) -> MutationKey {
        MutationKey::Id(self.id.clone())
    }

    fn apply(&self, store: &mut FeedStore) -> Option<(Notification, usize, bool)> {
        match store.remove(&self.id) {
            Effect::Removed {
                notification,
                position,
                counted,
            } => Some((notification, position, counted)),
            _ => None,
        }
    }

    async fn remote(&self, fetcher: &(dyn Fetcher + Send + Sync)) -> Result<()> {
        fetcher.remove(&self.id).await
    }

    fn compensate(
        &self,
        store: &mut FeedStore,
        (notification, position, recount): (Notification, usize, bool),
    ) {
        store.restore(notification, Some(position), recount);
    }
}

/// Empties the feed. Always reaches the remote, even for an empty feed.
#[derive(Debug, Clone, Default)]
pub struct ClearAll;

#[async_trait]
impl Mutation for ClearAll {
    type Snapshot = FeedState;

    fn kind(&self) -> MutationKind {
        MutationKind::ClearAll
    }

    fn key(&self) -> MutationKey {
        MutationKey::All
    }

    fn apply(&self, store: &mut FeedStore) -> Option<FeedState> {
        let snapshot = store.snapshot();
        store.clear_all();
        Some(snapshot)
    }

    async fn remote(&self, fetcher: &(dyn Fetcher + Send + Sync)) -> Result<()> {
        fetcher.clear_all().await
    }

    /// Pushes merged while the clear was in flight survive the rollback.
    fn compensate(&self, store: &mut FeedStore, snapshot: FeedState) {
        store.restore_beneath(snapshot);
    }
}
