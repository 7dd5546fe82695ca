//! Rope-backed document

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use ropey::Rope;
use rustc_hash::FxHashMap;
use text_size::{TextRange, TextSize};

use super::{BufferAdapter, EditListener, ListenerId};
use crate::base::{Edit, is_char_boundary, line_range, slice_text};
use crate::error::{Result, SyncError};

#[derive(Default)]
struct Inner {
    text: Rope,
    listeners: FxHashMap<ListenerId, Arc<dyn EditListener>>,
    next_listener: u64,
}

impl Inner {
    fn len(&self) -> TextSize {
        TextSize::try_from(self.text.len_bytes()).unwrap_or(TextSize::from(u32::MAX))
    }

    fn check_range(&self, range: TextRange) -> Result<()> {
        let len = self.len();
        if range.end() > len {
            return Err(SyncError::out_of_bounds(range, len));
        }
        for offset in [range.start(), range.end()] {
            if !is_char_boundary(&self.text, offset) {
                return Err(SyncError::NotCharBoundary { offset });
            }
        }
        Ok(())
    }

    fn check_edit(&self, edit: &Edit) -> Result<()> {
        self.check_range(edit.removed_range())?;
        let new_len = self.text.len_bytes() as u64 + u64::from(u32::from(edit.inserted_len()))
            - u64::from(u32::from(edit.removed_len()));
        if new_len > u64::from(u32::MAX) {
            return Err(SyncError::TooLarge {
                len: new_len as usize,
            });
        }
        Ok(())
    }

    /// Apply a checked edit and notify listeners.
    fn commit(&mut self, edit: Edit) {
        let removed = edit.removed_range();
        let start = self.text.byte_to_char(usize::from(removed.start()));
        let end = self.text.byte_to_char(usize::from(removed.end()));
        self.text.remove(start..end);
        self.text.insert(start, edit.inserted());
        tracing::trace!(?edit, listeners = self.listeners.len(), "document edited");
        for listener in self.listeners.values() {
            listener.on_edit(&edit);
        }
    }
}

/// A thread-safe text buffer implementing [`BufferAdapter`].
///
/// Cloning yields another handle to the same document.
#[derive(Clone, Default)]
pub struct Document {
    inner: Arc<Mutex<Inner>>,
}

impl Document {
    pub fn new(text: &str) -> Self {
        Self::from_rope(Rope::from_str(text))
    }

    pub fn from_rope(text: Rope) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                text,
                ..Inner::default()
            })),
        }
    }

    /// Snapshot of the whole text.
    pub fn text(&self) -> Rope {
        self.inner.lock().text.clone()
    }

    pub fn len(&self) -> TextSize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == TextSize::from(0)
    }

    pub fn read(&self, range: TextRange) -> Result<String> {
        let inner = self.inner.lock();
        inner.check_range(range)?;
        Ok(slice_text(&inner.text, range))
    }

    pub fn insert(&self, offset: TextSize, text: &str) -> Result<()> {
        self.apply(Edit::insert(offset, text))
    }

    pub fn remove(&self, range: TextRange) -> Result<()> {
        self.apply(Edit::delete(range))
    }

    pub fn replace(&self, range: TextRange, text: &str) -> Result<()> {
        self.apply(Edit::replace(range, text))
    }

    /// Apply one edit. Invalid edits are rejected without touching the text;
    /// edits that change nothing are not forwarded to listeners.
    pub fn apply(&self, edit: Edit) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_edit(&edit)?;
        if !edit.is_noop() {
            inner.commit(edit);
        }
        Ok(())
    }

    /// Apply several edits, all measured against the text before the batch.
    ///
    /// The edits must not overlap. They are applied from the back, so every
    /// forwarded edit is valid for the text at its own moment. Either all
    /// edits are applied or none.
    pub fn apply_batch(&self, edits: impl IntoIterator<Item = Edit>) -> Result<()> {
        let mut edits: Vec<Edit> = edits.into_iter().filter(|e| !e.is_noop()).collect();
        edits.sort_by_key(|e| (e.position(), e.removed_len()));

        let mut inner = self.inner.lock();
        for edit in &edits {
            inner.check_edit(edit)?;
        }
        for pair in edits.windows(2) {
            let (first, second) = (pair[0].removed_range(), pair[1].removed_range());
            // Two insertions at one offset have no defined order either.
            if first.end() > second.start() || first.start() == second.start() {
                return Err(SyncError::Overlap { first, second });
            }
        }
        for edit in edits.into_iter().rev() {
            inner.commit(edit);
        }
        Ok(())
    }

    /// Grow `range` to whole lines.
    pub fn line_range(&self, range: TextRange) -> TextRange {
        line_range(&self.inner.lock().text, range)
    }
}

impl BufferAdapter for Document {
    fn len(&self) -> TextSize {
        Document::len(self)
    }

    fn read(&self, range: TextRange) -> Result<String> {
        Document::read(self, range)
    }

    fn listen(&self, listener: Arc<dyn EditListener>) -> (ListenerId, Rope) {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.insert(id, listener);
        (id, inner.text.clone())
    }

    fn unlisten(&self, id: ListenerId) {
        self.inner.lock().listeners.remove(&id);
    }

    fn resync(&self, id: ListenerId) -> Result<()> {
        let inner = self.inner.lock();
        let listener = inner.listeners.get(&id).ok_or(SyncError::Detached)?;
        listener.on_reset(inner.text.clone());
        Ok(())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Document")
            .field("len", &inner.len())
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}
