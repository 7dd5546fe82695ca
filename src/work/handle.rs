//! The handle owning one synchronization engine.

use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use ropey::Rope;
use tokio_util::sync::CancellationToken;

use super::config::SyncConfig;
use super::state::SyncState;
use super::subscription::{SubscriptionId, SyncEvent, TreeUpdate};
use super::worker::{Command, Forwarder, Shared, Worker};
use crate::base::Edit;
use crate::buffer::{BufferAdapter, ListenerId};
use crate::error::{Result, SyncError};
use crate::incremental::full_parse;
use crate::lexicon::Lexicon;
use crate::tree::Tree;

struct Attachment {
    buffer: Arc<dyn BufferAdapter>,
    listener: ListenerId,
}

/// Keeps a token tree in sync with a text buffer on a dedicated worker
/// thread.
///
/// Readers call [`current`](Self::current) for the latest published tree, or
/// subscribe to be told about each publish together with the span that
/// changed. Dropping the handle detaches it.
pub struct SyncHandle<L: Lexicon> {
    shared: Arc<Shared<L>>,
    attachment: Option<Attachment>,
    worker: Option<JoinHandle<()>>,
}

/// Follow `buffer` with `lexicon` using default options.
pub fn attach<L, B>(buffer: &B, lexicon: L) -> Result<SyncHandle<L>>
where
    L: Lexicon,
    B: BufferAdapter + Clone + 'static,
{
    attach_with_config(buffer, lexicon, SyncConfig::default())
}

/// Follow `buffer` with `lexicon`.
///
/// The initial tree is parsed before this returns, so [`SyncHandle::current`]
/// is valid right away. Edits made to the buffer from now on are picked up in
/// order.
pub fn attach_with_config<L, B>(buffer: &B, lexicon: L, config: SyncConfig) -> Result<SyncHandle<L>>
where
    L: Lexicon,
    B: BufferAdapter + Clone + 'static,
{
    let buffer: Arc<dyn BufferAdapter> = Arc::new(buffer.clone());
    SyncHandle::start(lexicon, config, move |shared| {
        let forwarder = Arc::new(Forwarder {
            shared: Arc::clone(shared),
        });
        let (listener, text) = buffer.listen(forwarder);
        (text, Some(Attachment { buffer, listener }))
    })
}

impl<L: Lexicon> SyncHandle<L> {
    /// An engine following edits submitted through [`submit`](Self::submit)
    /// instead of a buffer.
    pub fn new(lexicon: L, text: &str, config: SyncConfig) -> Result<Self> {
        let text = Rope::from_str(text);
        Self::start(lexicon, config, |_| (text, None))
    }

    fn start(
        lexicon: L,
        config: SyncConfig,
        source: impl FnOnce(&Arc<Shared<L>>) -> (Rope, Option<Attachment>),
    ) -> Result<Self> {
        let lexicon = Arc::new(lexicon);
        let (shared, receiver) = Shared::new(Tree::empty(&*lexicon), Arc::clone(&lexicon));
        let (text, attachment) = source(&shared);
        // From here on, bailing out drops the handle, which stops listening.
        let mut handle = Self {
            shared,
            attachment,
            worker: None,
        };

        let tree = full_parse(&*lexicon, text, &config.build, &CancellationToken::new())?
            .into_reparse()
            .map_or_else(|| Tree::empty(&*lexicon), |reparse| reparse.tree);
        tracing::debug!(len = ?tree.len(), tokens = tree.token_count(), "initial parse");
        handle.shared.current.store(Arc::new(tree));

        let worker = Worker::new(Arc::clone(&handle.shared), receiver, lexicon, config.clone());
        let thread = std::thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || worker.run())?;
        handle.worker = Some(thread);
        Ok(handle)
    }

    /// The latest published tree.
    pub fn current(&self) -> Arc<Tree<L>> {
        self.shared.current.load_full()
    }

    pub fn state(&self) -> SyncState {
        self.shared.status.state()
    }

    /// The error that put the engine in [`SyncState::Failed`], if any.
    pub fn error(&self) -> Option<SyncError> {
        self.shared.status.error()
    }

    /// Queue an edit measured against the text as of all previously
    /// submitted edits.
    pub fn submit(&self, edit: Edit) -> Result<()> {
        self.shared.submit(Command::Edit(edit))
    }

    /// Reparse from scratch: from the buffer's current text when attached,
    /// otherwise from the text as of every edit submitted before this call.
    ///
    /// Clears a desync. While failed, edits submitted after the desync were
    /// dropped and are not part of that text.
    pub fn reinitialize(&self) -> Result<()> {
        match &self.attachment {
            Some(attachment) => attachment.buffer.resync(attachment.listener),
            None => self.shared.submit(Command::Reparse),
        }
    }

    /// Reparse `text` from scratch, replacing whatever the engine followed.
    pub fn reset(&self, text: &str) -> Result<()> {
        self.shared.submit(Command::Reset(Rope::from_str(text)))
    }

    /// Switch to another lexicon and reparse the current text.
    pub fn set_lexicon(&self, lexicon: L) -> Result<()> {
        self.shared.submit(Command::Relex(Arc::new(lexicon)))
    }

    /// The lexicon set last, which builds from here on use. Trees already
    /// published may still come from an earlier one.
    pub fn root_lexicon(&self) -> Arc<L> {
        self.shared.lexicon.load_full()
    }

    /// Call `callback` with every published update, on the worker thread.
    pub fn subscribe(
        &self,
        callback: impl Fn(&TreeUpdate<L>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.shared.subscribers.subscribe(callback)
    }

    /// A channel receiving every [`SyncEvent`]. Dropping the receiver ends
    /// the subscription.
    pub fn events(&self) -> (SubscriptionId, Receiver<SyncEvent<L>>) {
        self.shared.subscribers.channel()
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.unsubscribe(id)
    }

    /// Block until everything submitted so far is built and published.
    pub fn wait(&self) -> Result<Arc<Tree<L>>> {
        self.wait_until(None)
    }

    /// Like [`wait`](Self::wait), giving up with [`SyncError::Timeout`].
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Arc<Tree<L>>> {
        self.wait_until(Some(Instant::now() + timeout))
    }

    fn wait_until(&self, deadline: Option<Instant>) -> Result<Arc<Tree<L>>> {
        let target = self.shared.status.submitted();
        self.shared.status.wait_for(target, deadline)?;
        match self.shared.status.error() {
            Some(err) => Err(err),
            None => Ok(self.current()),
        }
    }

    /// Stop following the buffer and shut the worker down. A build in flight
    /// is abandoned without publishing.
    pub fn detach(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(attachment) = self.attachment.take() {
            attachment.buffer.unlisten(attachment.listener);
        }
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        // Fails only if the worker is already gone.
        let _ = self.shared.submit(Command::Shutdown);
        let joined = worker.join();
        self.shared.status.detach();
        tracing::debug!("detached");
        joined.map_err(|_| SyncError::WorkerPanicked)
    }
}

impl<L: Lexicon> Drop for SyncHandle<L> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "worker did not shut down cleanly");
        }
    }
}

impl<L: Lexicon> fmt::Debug for SyncHandle<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHandle")
            .field("state", &self.state())
            .field("attached", &self.attachment.is_some())
            .field("current", &self.current())
            .finish()
    }
}
