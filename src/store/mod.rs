pub mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::domain::Notification;

pub use state::{reduce, Effect, FeedCommand, FeedState};

/// Shared handle to the single writer of feed state.
///
/// Locks are only ever held for one `dispatch`, never across an await.
pub type SharedStore = Arc<Mutex<FeedStore>>;

pub fn shared(store: FeedStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Lock a shared store. Transitions are total, so a poisoned lock still
/// guards a consistent state and is recovered rather than propagated.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, FeedStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hosts a [`FeedState`] behind a command-dispatch interface.
///
/// Callers read through [`FeedStore::state`] or take a [`FeedStore::snapshot`];
/// every write goes through [`FeedStore::dispatch`].
#[derive(Debug, Default)]
pub struct FeedStore {
    state: FeedState,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: FeedState) -> Self {
        Self { state }
    }

    pub fn dispatch(&mut self, command: FeedCommand) -> Effect {
        let effect = self.state.apply(command);
        trace!(
            ?effect,
            unseen = self.state.unseen().len(),
            seen = self.state.seen().len(),
            unseen_count = self.state.unseen_count(),
            "feed command applied"
        );
        effect
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn snapshot(&self) -> FeedState {
        self.state.clone()
    }

    pub fn replace_all(
        &mut self,
        unseen: Vec<Notification>,
        seen: Vec<Notification>,
        unseen_count: u64,
    ) -> Effect {
        self.dispatch(FeedCommand::ReplaceAll {
            unseen,
            seen,
            unseen_count,
        })
    }

    pub fn append_page(&mut self, unseen: Vec<Notification>, seen: Vec<Notification>) -> Effect {
        self.dispatch(FeedCommand::AppendPage { unseen, seen })
    }

    pub fn mark_seen(&mut self, id: &str) -> Effect {
        self.dispatch(FeedCommand::MarkSeen { id: id.to_string() })
    }

    pub fn remove(&mut self, id: &str) -> Effect {
        self.dispatch(FeedCommand::Remove { id: id.to_string() })
    }

    pub fn restore(
        &mut self,
        notification: Notification,
        position: Option<usize>,
        recount: bool,
    ) -> Effect {
        self.dispatch(FeedCommand::Restore {
            notification,
            position,
            recount,
        })
    }

    pub fn clear_all(&mut self) -> Effect {
        self.dispatch(FeedCommand::ClearAll)
    }

    pub fn restore_all(&mut self, snapshot: FeedState) -> Effect {
        self.dispatch(FeedCommand::RestoreAll(snapshot))
    }

    pub fn restore_beneath(&mut self, snapshot: FeedState) -> Effect {
        self.dispatch(FeedCommand::RestoreBeneath(snapshot))
    }

    pub fn merge_incoming(&mut self, notification: Notification) -> Effect {
        self.dispatch(FeedCommand::MergeIncoming(notification))
    }

    pub fn set_unseen_count(&mut self, count: u64) -> Effect {
        self.dispatch(FeedCommand::SetUnseenCount(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::fixtures::notification;

    #[test]
    fn test_dispatch_matches_reduce() {
        let commands = vec![
            FeedCommand::ReplaceAll {
                unseen: vec![notification("A", false), notification("B", false)],
                seen: vec![notification("C", true)],
                unseen_count: 2,
            },
            FeedCommand::MarkSeen { id: "A".into() },
            FeedCommand::MergeIncoming(notification("D", false)),
            FeedCommand::Remove { id: "C".into() },
        ];

        let mut store = FeedStore::new();
        let mut expected = FeedState::default();
        for command in commands {
            store.dispatch(command.clone());
            expected = reduce(expected, command);
        }
        assert_eq!(store.state(), &expected);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = FeedStore::new();
        store.replace_all(vec![notification("A", false)], vec![], 1);
        let snapshot = store.snapshot();
        store.clear_all();
        assert_eq!(snapshot.unseen().len(), 1);
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_shared_lock_round_trip() {
        let store = shared(FeedStore::new());
        lock(&store).merge_incoming(notification("A", false));
        assert_eq!(lock(&store).state().unseen_count(), 1);
    }
}
