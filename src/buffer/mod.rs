//! Buffer adapters: where text and edit notifications come from.
//!
//! The engine never owns the text it follows. A [`BufferAdapter`] presents an
//! external mutable text source as readable text plus an ordered stream of
//! [`Edit`]s, each measured against the buffer as it was at that moment.
//! [`Document`] is a rope-backed adapter for callers without a buffer of
//! their own.

mod document;

pub use document::Document;

use std::sync::Arc;

use ropey::Rope;
use text_size::{TextRange, TextSize};

use crate::base::Edit;
use crate::error::Result;

/// Identifies one registered [`EditListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Receives buffer mutations in the order they happen.
///
/// Calls are made while the buffer is locked, so implementations must not
/// call back into the buffer.
pub trait EditListener: Send + Sync {
    fn on_edit(&self, edit: &Edit);

    /// The buffer's whole text, replacing everything seen so far.
    fn on_reset(&self, text: Rope);
}

/// A mutable text source the engine can follow.
pub trait BufferAdapter: Send + Sync {
    /// Current length in bytes.
    fn len(&self) -> TextSize;

    fn is_empty(&self) -> bool {
        self.len() == TextSize::from(0)
    }

    /// Copy of the text covered by `range`.
    fn read(&self, range: TextRange) -> Result<String>;

    /// Register `listener` and return the text it starts from. No edit can
    /// fall between the snapshot and the first notification.
    fn listen(&self, listener: Arc<dyn EditListener>) -> (ListenerId, Rope);

    /// Stop notifying a listener. Unknown ids are ignored.
    fn unlisten(&self, id: ListenerId);

    /// Hand a listener the current text through
    /// [`EditListener::on_reset`], ordered with respect to edits.
    fn resync(&self, id: ListenerId) -> Result<()>;
}
