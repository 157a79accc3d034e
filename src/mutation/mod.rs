//! Optimistic mutations with compensating rollback.
//!
//! A [`Mutation`] is a small transaction: it snapshots whatever it needs,
//! applies itself to the store, then asks the remote to confirm. If the
//! remote refuses, the snapshot is handed back to [`Mutation::compensate`].
//! A confirmed mutation needs no further work; the optimistic state is the
//! committed state.

pub mod ops;

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::app::{FeedError, Result};
use crate::fetcher::Fetcher;
use crate::store::{self, FeedStore, SharedStore};

pub use ops::{ClearAll, Delete, MarkSeen};

/// What a mutation locks while it is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationKey {
    Id(String),
    All,
}

impl MutationKey {
    /// `All` conflicts with everything, ids only with themselves.
    pub fn conflicts_with(&self, other: &MutationKey) -> bool {
        match (self, other) {
            (MutationKey::All, _) | (_, MutationKey::All) => true,
            (MutationKey::Id(a), MutationKey::Id(b)) => a == b,
        }
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKey::Id(id) => write!(f, "notification {id}"),
            MutationKey::All => f.write_str("all notifications"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    MarkSeen,
    Delete,
    ClearAll,
}

impl MutationKind {
    pub fn failure_notice(&self) -> &'static str {
        match self {
            MutationKind::MarkSeen => "Failed to mark notification as seen. Please try again.",
            MutationKind::Delete => "Failed to delete notification. Please try again.",
            MutationKind::ClearAll => "Failed to clear notifications.",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::MarkSeen => "mark-seen",
            MutationKind::Delete => "delete",
            MutationKind::ClearAll => "clear-all",
        };
        f.write_str(name)
    }
}

#[async_trait]
pub trait Mutation: Send + Sync {
    /// State needed to undo `apply`.
    type Snapshot: Send;

    fn kind(&self) -> MutationKind;

    fn key(&self) -> MutationKey;

    /// Apply locally. `None` means the store was left untouched (unknown
    /// id, already seen) and the remote call is skipped.
    fn apply(&self, store: &mut FeedStore) -> Option<Self::Snapshot>;

    async fn remote(&self, fetcher: &(dyn Fetcher + Send + Sync)) -> Result<()>;

    fn compensate(&self, store: &mut FeedStore, snapshot: Self::Snapshot);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Applied locally and confirmed by the remote.
    Committed,
    /// Nothing to do locally; the remote was not contacted.
    Skipped,
}

/// Runs mutations against the shared store, one per key at a time.
pub struct MutationCoordinator {
    store: SharedStore,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    in_flight: Mutex<HashSet<MutationKey>>,
}

/// Releases a key when the mutation finishes or its future is dropped.
struct InFlight<'a> {
    keys: &'a Mutex<HashSet<MutationKey>>,
    key: MutationKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl MutationCoordinator {
    pub fn new(store: SharedStore, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self {
            store,
            fetcher,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_in_flight(&self, key: &MutationKey) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|held| held.conflicts_with(key))
    }

    /// True while a clear-all holds the whole feed.
    pub fn is_clearing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&MutationKey::All)
    }

    fn reserve(&self, key: MutationKey) -> Result<InFlight<'_>> {
        let mut keys = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if keys.iter().any(|held| held.conflicts_with(&key)) {
            return Err(FeedError::MutationInFlight(key));
        }
        keys.insert(key.clone());
        Ok(InFlight {
            keys: &self.in_flight,
            key,
        })
    }

    pub async fn execute<M: Mutation>(&self, mutation: M) -> Result<MutationOutcome> {
        let kind = mutation.kind();
        let reservation = self.reserve(mutation.key())?;

        let snapshot = mutation.apply(&mut store::lock(&self.store));
        let Some(snapshot) = snapshot else {
            debug!(%kind, key = %reservation.key, "nothing to apply, skipping remote call");
            return Ok(MutationOutcome::Skipped);
        };

        match mutation.remote(self.fetcher.as_ref()).await {
            Ok(()) => {
                debug!(%kind, key = %reservation.key, "mutation confirmed");
                Ok(MutationOutcome::Committed)
            }
            Err(error) => {
                warn!(%kind, key = %reservation.key, %error, "mutation rejected, rolling back");
                mutation.compensate(&mut store::lock(&self.store), snapshot);
                Err(FeedError::MutationFailed {
                    kind,
                    source: Box::new(error),
                })
            }
        }
    }

    pub async fn mark_seen(&self, id: &str) -> Result<MutationOutcome> {
        self.execute(MarkSeen::new(id)).await
    }

    pub async fn delete(&self, id: &str) -> Result<MutationOutcome> {
        self.execute(Delete::new(id)).await
    }

    pub async fn clear_all(&self) -> Result<MutationOutcome> {
        self.execute(ClearAll).await
    }
}
