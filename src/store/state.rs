use std::collections::HashSet;

use tracing::debug;

use crate::domain::{Notification, Partition};

/// The two partitions of a feed plus the server-asserted unseen counter.
///
/// `unseen_count` is adjusted by the transitions below and overwritten on a
/// full reload. It is never derived from `unseen().len()`; after a partial
/// page append the two are expected to differ.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    unseen: Vec<Notification>,
    seen: Vec<Notification>,
    unseen_count: u64,
}

/// A state transition. Every command is total: unknown ids and duplicate
/// inserts are no-ops.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedCommand {
    /// Full reset after a first load or refresh.
    ReplaceAll {
        unseen: Vec<Notification>,
        seen: Vec<Notification>,
        unseen_count: u64,
    },
    /// Tail-append one backfill page, skipping ids already held.
    AppendPage {
        unseen: Vec<Notification>,
        seen: Vec<Notification>,
    },
    MarkSeen {
        id: String,
    },
    /// Undo a `MarkSeen`, putting the item back at its old unseen position.
    /// `recount` gives back the decrement the forward move made, if any.
    RevertSeen {
        id: String,
        position: usize,
        recount: bool,
    },
    Remove {
        id: String,
    },
    /// Undo a `Remove`. Without a position the item is placed newest-first
    /// by timestamp. The counter is only bumped when `recount` is set.
    Restore {
        notification: Notification,
        position: Option<usize>,
        recount: bool,
    },
    ClearAll,
    RestoreAll(FeedState),
    /// Undo a `ClearAll`: bring the snapshot back and replay whatever was
    /// merged into the cleared feed on top of it.
    RestoreBeneath(FeedState),
    MergeIncoming(Notification),
    SetUnseenCount(u64),
}

/// What a dispatched command actually did.
///
/// `counted` records whether `unseen_count` moved. A decrement at 0 is
/// swallowed by the floor and must not be given back on rollback.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Unchanged,
    Updated,
    Inserted(Partition),
    Moved {
        from: Partition,
        position: usize,
        counted: bool,
    },
    Removed {
        notification: Notification,
        position: usize,
        counted: bool,
    },
}

impl Effect {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Effect::Unchanged)
    }
}

/// Pure transition: consumes a state and returns the next one.
pub fn reduce(mut state: FeedState, command: FeedCommand) -> FeedState {
    state.apply(command);
    state
}

impl FeedState {
    /// Build a state from raw partitions, with the same normalisation as a
    /// full reload.
    pub fn new(unseen: Vec<Notification>, seen: Vec<Notification>, unseen_count: u64) -> Self {
        let mut state = Self::default();
        state.replace_all(unseen, seen, unseen_count);
        state
    }

    pub fn unseen(&self) -> &[Notification] {
        &self.unseen
    }

    pub fn seen(&self) -> &[Notification] {
        &self.seen
    }

    pub fn unseen_count(&self) -> u64 {
        self.unseen_count
    }

    pub fn len(&self) -> usize {
        self.unseen.len() + self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unseen.is_empty() && self.seen.is_empty()
    }

    /// Display order: unseen first, then seen.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.unseen.iter().chain(self.seen.iter())
    }

    pub fn locate(&self, id: &str) -> Option<(Partition, usize)> {
        if let Some(position) = self.unseen.iter().position(|n| n.id == id) {
            return Some((Partition::Unseen, position));
        }
        self.seen
            .iter()
            .position(|n| n.id == id)
            .map(|position| (Partition::Seen, position))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.locate(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.iter().find(|n| n.id == id)
    }

    pub fn apply(&mut self, command: FeedCommand) -> Effect {
        match command {
            FeedCommand::ReplaceAll {
                unseen,
                seen,
                unseen_count,
            } => self.replace_all(unseen, seen, unseen_count),
            FeedCommand::AppendPage { unseen, seen } => self.append_page(unseen, seen),
            FeedCommand::MarkSeen { id } => self.mark_seen(&id),
            FeedCommand::RevertSeen {
                id,
                position,
                recount,
            } => self.revert_seen(&id, position, recount),
            FeedCommand::Remove { id } => self.remove(&id),
            FeedCommand::Restore {
                notification,
                position,
                recount,
            } => self.restore(notification, position, recount),
            FeedCommand::ClearAll => {
                self.unseen.clear();
                self.seen.clear();
                self.unseen_count = 0;
                Effect::Updated
            }
            FeedCommand::RestoreAll(snapshot) => {
                *self = snapshot;
                Effect::Updated
            }
            FeedCommand::RestoreBeneath(snapshot) => self.restore_beneath(snapshot),
            FeedCommand::MergeIncoming(notification) => self.merge_incoming(notification),
            FeedCommand::SetUnseenCount(count) => {
                self.unseen_count = count;
                Effect::Updated
            }
        }
    }

    /// Decrement the counter, reporting whether it actually moved.
    fn uncount(&mut self) -> bool {
        let counted = self.unseen_count > 0;
        self.unseen_count = self.unseen_count.saturating_sub(1);
        counted
    }

    fn partition_mut(&mut self, partition: Partition) -> &mut Vec<Notification> {
        match partition {
            Partition::Unseen => &mut self.unseen,
            Partition::Seen => &mut self.seen,
        }
    }

    fn replace_all(
        &mut self,
        unseen: Vec<Notification>,
        seen: Vec<Notification>,
        unseen_count: u64,
    ) -> Effect {
        self.unseen.clear();
        self.seen.clear();
        let mut known = HashSet::new();
        self.extend(Partition::Unseen, unseen, &mut known);
        self.extend(Partition::Seen, seen, &mut known);
        self.unseen_count = unseen_count;
        Effect::Updated
    }

    fn append_page(&mut self, unseen: Vec<Notification>, seen: Vec<Notification>) -> Effect {
        let mut known: HashSet<String> = self.iter().map(|n| n.id.clone()).collect();
        let added = self.extend(Partition::Unseen, unseen, &mut known)
            + self.extend(Partition::Seen, seen, &mut known);
        if added == 0 {
            Effect::Unchanged
        } else {
            Effect::Updated
        }
    }

    /// Items take the seen flag of the list they arrive in.
    fn extend(
        &mut self,
        partition: Partition,
        items: Vec<Notification>,
        known: &mut HashSet<String>,
    ) -> usize {
        let mut added = 0;
        for mut item in items {
            if !known.insert(item.id.clone()) {
                debug!(id = %item.id, "skipping duplicate notification");
                continue;
            }
            item.seen = partition == Partition::Seen;
            self.partition_mut(partition).push(item);
            added += 1;
        }
        added
    }

    fn mark_seen(&mut self, id: &str) -> Effect {
        let Some(position) = self.unseen.iter().position(|n| n.id == id) else {
            return Effect::Unchanged;
        };
        let mut notification = self.unseen.remove(position);
        notification.seen = true;
        self.seen.insert(0, notification);
        let counted = self.uncount();
        Effect::Moved {
            from: Partition::Unseen,
            position,
            counted,
        }
    }

    fn revert_seen(&mut self, id: &str, position: usize, recount: bool) -> Effect {
        let Some(at) = self.seen.iter().position(|n| n.id == id) else {
            return Effect::Unchanged;
        };
        let mut notification = self.seen.remove(at);
        notification.seen = false;
        let position = position.min(self.unseen.len());
        self.unseen.insert(position, notification);
        if recount {
            self.unseen_count = self.unseen_count.saturating_add(1);
        }
        Effect::Moved {
            from: Partition::Seen,
            position: at,
            counted: recount,
        }
    }

    fn remove(&mut self, id: &str) -> Effect {
        let Some((partition, position)) = self.locate(id) else {
            return Effect::Unchanged;
        };
        let notification = self.partition_mut(partition).remove(position);
        let counted = partition == Partition::Unseen && self.uncount();
        Effect::Removed {
            notification,
            position,
            counted,
        }
    }

    fn restore(
        &mut self,
        notification: Notification,
        position: Option<usize>,
        recount: bool,
    ) -> Effect {
        if self.contains(&notification.id) {
            debug!(id = %notification.id, "restore skipped, notification already present");
            return Effect::Unchanged;
        }
        let partition = notification.partition();
        let list = self.partition_mut(partition);
        let at = match position {
            Some(position) => position.min(list.len()),
            None => list
                .iter()
                .position(|n| n.timestamp < notification.timestamp)
                .unwrap_or(list.len()),
        };
        list.insert(at, notification);
        if partition == Partition::Unseen && recount {
            self.unseen_count = self.unseen_count.saturating_add(1);
        }
        Effect::Inserted(partition)
    }

    fn restore_beneath(&mut self, snapshot: FeedState) -> Effect {
        let arrivals = std::mem::replace(self, snapshot);
        if !arrivals.is_empty() {
            debug!(count = arrivals.len(), "replaying arrivals over restored feed");
        }
        // Arrivals sit newest-first, so replay from the oldest.
        for notification in arrivals.seen.into_iter().rev() {
            self.merge_incoming(notification);
        }
        for notification in arrivals.unseen.into_iter().rev() {
            self.merge_incoming(notification);
        }
        Effect::Updated
    }

    fn merge_incoming(&mut self, notification: Notification) -> Effect {
        let target = notification.partition();
        match self.locate(&notification.id) {
            None => {
                if target == Partition::Unseen {
                    self.unseen_count = self.unseen_count.saturating_add(1);
                }
                self.partition_mut(target).insert(0, notification);
                Effect::Inserted(target)
            }
            Some((current, _)) if current == target => Effect::Unchanged,
            Some((current, position)) => {
                self.partition_mut(current).remove(position);
                let counted = match target {
                    Partition::Unseen => {
                        self.unseen_count = self.unseen_count.saturating_add(1);
                        true
                    }
                    Partition::Seen => self.uncount(),
                };
                self.partition_mut(target).insert(0, notification);
                Effect::Moved {
                    from: current,
                    position,
                    counted,
                }
            }
        }
    }
}
