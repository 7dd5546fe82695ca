//! The worker thread.
//!
//! Commands arrive over an unbounded channel. Before every build pass the
//! worker drains the channel and installs a fresh cancellation token, both
//! under the in-flight lock; submitters send and cancel under the same lock.
//! An edit submitted after a pass drained the queue therefore always cancels
//! that pass, and a pass never misses an edit it should have seen.
//!
//! A pass applies pending commands one at a time to a worker-private tree and
//! publishes only when nothing was submitted while it ran, so a burst of
//! edits produces one publish covering all of them.

use std::collections::VecDeque;
use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use ropey::Rope;
use text_size::TextRange;
use tokio_util::sync::CancellationToken;

use super::config::{SupersedePolicy, SyncConfig};
use super::state::{Status, SyncState};
use super::subscription::{Subscribers, TreeUpdate};
use crate::base::{Edit, map_range};
use crate::buffer::EditListener;
use crate::error::{Result, SyncError};
use crate::incremental::{Outcome, Preview, apply_edit_with_preview, full_parse_with_preview};
use crate::lexicon::Lexicon;
use crate::tree::Tree;

pub(crate) enum Command<L> {
    Edit(Edit),
    /// Full reparse of the given text.
    Reset(Rope),
    /// Full reparse of the working text, which includes every edit queued
    /// before it.
    Reparse,
    /// Switch lexicons and reparse the current text.
    Relex(Arc<L>),
    Shutdown,
}

/// State shared between the handle, buffer listeners and the worker.
pub(crate) struct Shared<L: Lexicon> {
    pub(crate) current: ArcSwap<Tree<L>>,
    /// The lexicon most recently submitted
    pub(crate) lexicon: ArcSwap<L>,
    pub(crate) subscribers: Subscribers<L>,
    pub(crate) status: Status,
    in_flight: Mutex<Option<CancellationToken>>,
    sender: Sender<Command<L>>,
}

impl<L: Lexicon> Shared<L> {
    pub(crate) fn new(tree: Tree<L>, lexicon: Arc<L>) -> (Arc<Self>, Receiver<Command<L>>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let shared = Arc::new(Self {
            current: ArcSwap::from_pointee(tree),
            lexicon: ArcSwap::new(lexicon),
            subscribers: Subscribers::new(),
            status: Status::new(),
            in_flight: Mutex::new(None),
            sender,
        });
        (shared, receiver)
    }

    /// Queue a command and cancel the build in flight, if any.
    pub(crate) fn submit(&self, command: Command<L>) -> Result<()> {
        if matches!(&command, Command::Edit(edit) if edit.is_noop()) {
            return Ok(());
        }
        let in_flight = self.in_flight.lock();
        let counted = !matches!(command, Command::Shutdown);
        if counted {
            self.status.submit();
        }
        let lexicon = match &command {
            Command::Relex(lexicon) => Some(Arc::clone(lexicon)),
            _ => None,
        };
        if self.sender.send(command).is_err() {
            if counted {
                self.status.complete(1);
            }
            return Err(SyncError::Detached);
        }
        if let Some(lexicon) = lexicon {
            self.lexicon.store(lexicon);
        }
        if let Some(cancel) = in_flight.as_ref() {
            cancel.cancel();
        }
        Ok(())
    }

    /// Hand a provisional tree to channel subscribers, unless the build that
    /// produced it has been superseded already.
    fn preview(&self, cancel: &CancellationToken, version: u64, preview: Preview<L>) {
        if cancel.is_cancelled() {
            return;
        }
        tracing::trace!(start = ?preview.start, len = ?preview.tree.len(), "build preview");
        let tree = Arc::new(preview.tree.with_version(version));
        self.subscribers.preview(preview.start, &tree);
    }

    /// Drain everything queued into `pending` and install the token the next
    /// pass polls.
    fn begin_pass(
        &self,
        receiver: &Receiver<Command<L>>,
        pending: &mut VecDeque<Command<L>>,
    ) -> CancellationToken {
        let mut in_flight = self.in_flight.lock();
        pending.extend(receiver.try_iter());
        let cancel = CancellationToken::new();
        *in_flight = Some(cancel.clone());
        cancel
    }
}

/// Forwards buffer notifications to the worker.
pub(crate) struct Forwarder<L: Lexicon> {
    pub(crate) shared: Arc<Shared<L>>,
}

impl<L: Lexicon> EditListener for Forwarder<L> {
    fn on_edit(&self, edit: &Edit) {
        if self.shared.submit(Command::Edit(edit.clone())).is_err() {
            tracing::debug!(?edit, "edit arrived after the worker stopped");
        }
    }

    fn on_reset(&self, text: Rope) {
        if self.shared.submit(Command::Reset(text)).is_err() {
            tracing::debug!("reset arrived after the worker stopped");
        }
    }
}

/// Work done since the last publish.
struct Batch<L> {
    /// Span of the working tree changed since the last publish
    changed: Option<TextRange>,
    edits: usize,
    /// Commands consumed, published or dropped
    consumed: u64,
    /// Consumed commands kept for a restart
    applied: Vec<Command<L>>,
}

impl<L> Default for Batch<L> {
    fn default() -> Self {
        Self {
            changed: None,
            edits: 0,
            consumed: 0,
            applied: Vec::new(),
        }
    }
}

enum Pass {
    Done,
    Superseded,
    Shutdown,
}

pub(crate) struct Worker<L: Lexicon> {
    shared: Arc<Shared<L>>,
    receiver: Receiver<Command<L>>,
    lexicon: Arc<L>,
    config: SyncConfig,
    pending: VecDeque<Command<L>>,
    working: Tree<L>,
    batch: Batch<L>,
    failed: bool,
}

impl<L: Lexicon> Worker<L> {
    pub(crate) fn new(
        shared: Arc<Shared<L>>,
        receiver: Receiver<Command<L>>,
        lexicon: Arc<L>,
        config: SyncConfig,
    ) -> Self {
        let working = Tree::clone(&shared.current.load());
        Self {
            shared,
            receiver,
            lexicon,
            config,
            pending: VecDeque::new(),
            working,
            batch: Batch::default(),
            failed: false,
        }
    }

    pub(crate) fn run(mut self) {
        let shared = Arc::clone(&self.shared);
        let _guard = ExitGuard(&shared.status);
        tracing::debug!(thread = %self.config.thread_name, "worker started");
        loop {
            if self.pending.is_empty() {
                match self.receiver.recv() {
                    Ok(command) => self.pending.push_back(command),
                    Err(_) => break,
                }
            }
            let cancel = shared.begin_pass(&self.receiver, &mut self.pending);
            if self.pending.iter().any(|c| matches!(c, Command::Shutdown)) {
                break;
            }
            let was_idle = shared.status.state() == SyncState::Idle;
            shared.status.enter(SyncState::Building);
            if was_idle {
                shared.subscribers.started();
            }
            match self.pass(&cancel) {
                // Newer commands are queued; they join this batch.
                Pass::Done if cancel.is_cancelled() => {
                    tracing::trace!("deferring publish behind newer commands");
                }
                Pass::Done => self.publish(),
                Pass::Superseded => self.supersede(),
                Pass::Shutdown => break,
            }
        }
        tracing::debug!(thread = %self.config.thread_name, "worker stopped");
    }

    fn pass(&mut self, cancel: &CancellationToken) -> Pass {
        while let Some(command) = self.pending.front() {
            let shared = Arc::clone(&self.shared);
            let version = self.working.version() + 1;
            let preview = |preview: Preview<L>| shared.preview(cancel, version, preview);
            let outcome = match command {
                Command::Shutdown => return Pass::Shutdown,
                Command::Edit(edit) if self.failed => {
                    tracing::warn!(?edit, "dropping edit until the engine is re-initialized");
                    self.consume(false);
                    continue;
                }
                Command::Edit(edit) => apply_edit_with_preview(
                    &*self.lexicon,
                    &self.working,
                    edit,
                    &self.config.build,
                    cancel,
                    preview,
                ),
                Command::Reset(text) => full_parse_with_preview(
                    &*self.lexicon,
                    text.clone(),
                    &self.config.build,
                    cancel,
                    preview,
                ),
                Command::Reparse => full_parse_with_preview(
                    &*self.lexicon,
                    self.working.text().clone(),
                    &self.config.build,
                    cancel,
                    preview,
                ),
                Command::Relex(lexicon) => {
                    self.lexicon = Arc::clone(lexicon);
                    if self.failed {
                        // The working text is not trustworthy; wait for a reset.
                        self.consume(false);
                        continue;
                    }
                    full_parse_with_preview(
                        &*self.lexicon,
                        self.working.text().clone(),
                        &self.config.build,
                        cancel,
                        preview,
                    )
                }
            };
            match outcome {
                Ok(Outcome::Cancelled) => return Pass::Superseded,
                Ok(Outcome::Unchanged) => self.consume(false),
                Ok(Outcome::Rebuilt(reparse)) => {
                    let version = self.working.version() + 1;
                    match self.pending.front() {
                        Some(Command::Edit(edit)) => {
                            self.batch.changed = Some(match self.batch.changed {
                                Some(prev) => map_range(prev, edit).cover(reparse.changed),
                                None => reparse.changed,
                            });
                            self.batch.edits += 1;
                        }
                        _ => {
                            self.batch.changed = Some(reparse.changed);
                            if self.failed {
                                self.failed = false;
                                self.shared.status.recover();
                                tracing::debug!("recovered from desync");
                            }
                        }
                    }
                    self.working = reparse.tree.with_version(version);
                    self.consume(true);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "engine desynchronized");
                    // Work applied before the bad edit is still valid.
                    self.publish();
                    self.failed = true;
                    self.shared.status.fail(err.clone());
                    self.shared.subscribers.desynced(&err);
                    self.consume(false);
                }
            }
        }
        Pass::Done
    }

    /// Retire the front command. Applied commands are kept for a restart.
    fn consume(&mut self, applied: bool) {
        let Some(command) = self.pending.pop_front() else {
            return;
        };
        self.batch.consumed += 1;
        if applied && self.config.supersede == SupersedePolicy::Restart {
            self.batch.applied.push(command);
        }
    }

    fn supersede(&mut self) {
        self.shared.status.enter(SyncState::Superseded);
        tracing::debug!(
            policy = ?self.config.supersede,
            pending = self.pending.len(),
            "build superseded"
        );
        if self.config.supersede == SupersedePolicy::Restart && !self.batch.applied.is_empty() {
            let batch = std::mem::take(&mut self.batch);
            let restarted = batch.applied.len() as u64;
            for command in batch.applied.into_iter().rev() {
                self.pending.push_front(command);
            }
            self.working = Tree::clone(&self.shared.current.load());
            // Dropped commands stay consumed.
            self.batch.consumed = batch.consumed - restarted;
        }
    }

    fn publish(&mut self) {
        let batch = std::mem::take(&mut self.batch);
        let Some(changed) = batch.changed else {
            self.shared.status.complete(batch.consumed);
            return;
        };
        self.shared.status.enter(SyncState::Publishing);
        let tree = Arc::new(self.working.clone());
        self.shared.current.store(Arc::clone(&tree));
        tracing::debug!(
            version = tree.version(),
            ?changed,
            edits = batch.edits,
            "published tree"
        );
        let update = TreeUpdate {
            tree,
            changed,
            edits: batch.edits,
        };
        self.shared.subscribers.updated(&update);
        self.shared.status.complete(batch.consumed);
    }
}

/// Marks the scheduler detached when the worker exits, and records a panic.
struct ExitGuard<'a>(&'a Status);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::warn!("worker thread panicked");
            self.0.fail(SyncError::WorkerPanicked);
        }
        self.0.detach();
    }
}
