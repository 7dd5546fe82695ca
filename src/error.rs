//! Error types for tree synchronization.

use std::sync::Arc;

use text_size::{TextRange, TextSize};
use thiserror::Error;

use crate::base::Edit;

/// Errors surfaced by the synchronization engine and its buffers.
///
/// Supersession of an in-flight build is not an error and never appears here.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// An edit does not fit the text the engine believes is current. Indicates
    /// a missed or duplicated notification upstream; the engine stays invalid
    /// until re-initialized with a full reparse.
    #[error("edit {edit:?} does not fit a buffer of {len:?} bytes")]
    Desync { edit: Edit, len: TextSize },

    /// A buffer rejected an edit outside its bounds.
    #[error("range {range:?} is out of bounds for a buffer of {len:?} bytes")]
    OutOfBounds { range: TextRange, len: TextSize },

    /// Two edits of one batch touch the same text.
    #[error("batch edits {first:?} and {second:?} overlap")]
    Overlap { first: TextRange, second: TextRange },

    /// An offset splits a UTF-8 character.
    #[error("offset {offset:?} is not on a character boundary")]
    NotCharBoundary { offset: TextSize },

    /// The buffer exceeds the addressable size.
    #[error("buffer of {len} bytes exceeds the 4 GiB limit")]
    TooLarge { len: usize },

    /// The engine was detached from its buffer.
    #[error("engine is detached")]
    Detached,

    /// The worker thread panicked.
    #[error("worker thread panicked")]
    WorkerPanicked,

    /// Waiting for the worker timed out.
    #[error("timed out waiting for the worker")]
    Timeout,

    /// Spawning the worker thread failed.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] Arc<std::io::Error>),
}

impl SyncError {
    pub fn desync(edit: &Edit, len: TextSize) -> Self {
        Self::Desync {
            edit: edit.clone(),
            len,
        }
    }

    pub fn out_of_bounds(range: TextRange, len: TextSize) -> Self {
        Self::OutOfBounds { range, len }
    }

    /// Whether the engine must be re-initialized before accepting edits again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Desync { .. } | Self::WorkerPanicked)
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Spawn(Arc::new(err))
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
