//! Subscribers to published trees.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;
use parking_lot::Mutex;
use text_size::{TextRange, TextSize};

use crate::error::SyncError;
use crate::lexicon::Lexicon;
use crate::tree::Tree;

/// Identifies one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A published tree and the part of it that changed since the previous one.
pub struct TreeUpdate<L: Lexicon> {
    pub tree: Arc<Tree<L>>,
    /// Span of the new tree whose presentation must be recomputed
    pub changed: TextRange,
    /// Number of edits folded into this publish
    pub edits: usize,
}

impl<L: Lexicon> Clone for TreeUpdate<L> {
    fn clone(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            changed: self.changed,
            edits: self.edits,
        }
    }
}

impl<L: Lexicon> fmt::Debug for TreeUpdate<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeUpdate")
            .field("version", &self.tree.version())
            .field("changed", &self.changed)
            .field("edits", &self.edits)
            .finish()
    }
}

/// Events delivered to channel subscribers.
pub enum SyncEvent<L: Lexicon> {
    /// The worker started building after being idle.
    Started,
    Updated(TreeUpdate<L>),
    /// A build is taking long; `tree` holds what it has lexed so far, new
    /// from `start` to its end. Never becomes the current tree.
    Preview { start: TextSize, tree: Arc<Tree<L>> },
    /// An edit did not fit the tree; edits are dropped until re-initialized.
    Desynced(SyncError),
}

impl<L: Lexicon> Clone for SyncEvent<L> {
    fn clone(&self) -> Self {
        match self {
            Self::Started => Self::Started,
            Self::Updated(update) => Self::Updated(update.clone()),
            Self::Preview { start, tree } => Self::Preview {
                start: *start,
                tree: Arc::clone(tree),
            },
            Self::Desynced(err) => Self::Desynced(err.clone()),
        }
    }
}

impl<L: Lexicon> fmt::Debug for SyncEvent<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("Started"),
            Self::Updated(update) => f.debug_tuple("Updated").field(update).finish(),
            Self::Preview { start, tree } => f
                .debug_struct("Preview")
                .field("start", start)
                .field("len", &tree.len())
                .finish(),
            Self::Desynced(err) => f.debug_tuple("Desynced").field(err).finish(),
        }
    }
}

type Callback<L> = Arc<dyn Fn(&TreeUpdate<L>) + Send + Sync>;

enum Sink<L: Lexicon> {
    Callback(Callback<L>),
    Channel(Sender<SyncEvent<L>>),
}

impl<L: Lexicon> Clone for Sink<L> {
    fn clone(&self) -> Self {
        match self {
            Self::Callback(callback) => Self::Callback(Arc::clone(callback)),
            Self::Channel(sender) => Self::Channel(sender.clone()),
        }
    }
}

/// Registered subscribers, in registration order.
pub(crate) struct Subscribers<L: Lexicon> {
    sinks: Mutex<IndexMap<SubscriptionId, Sink<L>>>,
    next_id: AtomicU64,
}

impl<L: Lexicon> Subscribers<L> {
    pub(crate) fn new() -> Self {
        Self {
            sinks: Mutex::new(IndexMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn add(&self, sink: Sink<L>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sinks.lock().insert(id, sink);
        id
    }

    pub(crate) fn subscribe(
        &self,
        callback: impl Fn(&TreeUpdate<L>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.add(Sink::Callback(Arc::new(callback)))
    }

    pub(crate) fn channel(&self) -> (SubscriptionId, Receiver<SyncEvent<L>>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (self.add(Sink::Channel(sender)), receiver)
    }

    /// Returns whether the subscription existed.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.sinks.lock().shift_remove(&id).is_some()
    }

    pub(crate) fn started(&self) {
        self.deliver(None, || SyncEvent::Started);
    }

    pub(crate) fn updated(&self, update: &TreeUpdate<L>) {
        self.deliver(Some(update), || SyncEvent::Updated(update.clone()));
    }

    pub(crate) fn preview(&self, start: TextSize, tree: &Arc<Tree<L>>) {
        self.deliver(None, || SyncEvent::Preview {
            start,
            tree: Arc::clone(tree),
        });
    }

    pub(crate) fn desynced(&self, error: &SyncError) {
        self.deliver(None, || SyncEvent::Desynced(error.clone()));
    }

    /// Callbacks only see updates; channels see every event.
    fn deliver(&self, update: Option<&TreeUpdate<L>>, event: impl Fn() -> SyncEvent<L>) {
        // Sinks run outside the lock so a callback may subscribe or unsubscribe.
        let sinks: Vec<(SubscriptionId, Sink<L>)> = self
            .sinks
            .lock()
            .iter()
            .map(|(id, sink)| (*id, sink.clone()))
            .collect();

        let mut closed = Vec::new();
        for (id, sink) in sinks {
            match sink {
                Sink::Callback(callback) => {
                    if let Some(update) = update {
                        callback(update);
                    }
                }
                Sink::Channel(sender) => {
                    if sender.send(event()).is_err() {
                        closed.push(id);
                    }
                }
            }
        }

        if !closed.is_empty() {
            tracing::debug!(count = closed.len(), "pruning closed event channels");
            let mut sinks = self.sinks.lock();
            for id in closed {
                sinks.shift_remove(&id);
            }
        }
    }
}
