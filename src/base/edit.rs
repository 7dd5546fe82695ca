//! Buffer edits.

use std::fmt;
use std::sync::Arc;

use text_size::{TextRange, TextSize};

/// One atomic buffer mutation.
///
/// `position` and `removed` are measured against the buffer as it was at the
/// moment of the edit, never retroactively adjusted. Edits are immutable once
/// created; cloning only bumps the reference count of the inserted text.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Edit {
    position: TextSize,
    removed: TextSize,
    inserted: Arc<str>,
}

impl Edit {
    pub fn new(position: TextSize, removed: TextSize, inserted: impl Into<Arc<str>>) -> Self {
        Self {
            position,
            removed,
            inserted: inserted.into(),
        }
    }

    /// Insert `text` at `position`.
    pub fn insert(position: TextSize, text: impl Into<Arc<str>>) -> Self {
        Self::new(position, TextSize::from(0), text)
    }

    /// Remove the text covered by `range`.
    pub fn delete(range: TextRange) -> Self {
        Self::new(range.start(), range.len(), "")
    }

    /// Replace the text covered by `range` with `text`.
    pub fn replace(range: TextRange, text: impl Into<Arc<str>>) -> Self {
        Self::new(range.start(), range.len(), text)
    }

    pub fn position(&self) -> TextSize {
        self.position
    }

    /// Number of bytes removed at `position`.
    pub fn removed_len(&self) -> TextSize {
        self.removed
    }

    pub fn inserted(&self) -> &str {
        &self.inserted
    }

    pub fn inserted_len(&self) -> TextSize {
        TextSize::of(&*self.inserted)
    }

    /// The range removed from the pre-edit buffer.
    pub fn removed_range(&self) -> TextRange {
        TextRange::at(self.position, self.removed)
    }

    /// The range occupied by the inserted text in the post-edit buffer.
    pub fn inserted_range(&self) -> TextRange {
        TextRange::at(self.position, self.inserted_len())
    }

    /// Net length change caused by this edit.
    pub fn delta(&self) -> i64 {
        i64::from(u32::from(self.inserted_len())) - i64::from(u32::from(self.removed))
    }

    /// An edit that removes nothing and inserts nothing.
    pub fn is_noop(&self) -> bool {
        self.removed == TextSize::from(0) && self.inserted.is_empty()
    }
}

impl fmt::Debug for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Edit({:?} -> {:?})",
            self.removed_range(),
            self.inserted()
        )
    }
}
