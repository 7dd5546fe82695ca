//! # treesync-base
//!
//! Keeps a token tree continuously consistent with a live-edited text buffer.
//!
//! Edits are re-lexed incrementally on a worker thread: only the tokens from
//! the edit to the first point where the new token stream lines up with the
//! old one again are rebuilt, every other subtree is shared with the previous
//! tree. Readers get immutable snapshots and are told exactly which span
//! changed.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! work        → Worker thread, SyncHandle, subscriptions, config
//!   ↓
//! buffer      → BufferAdapter trait, edit listeners, rope-backed Document
//!   ↓
//! incremental → Full parse, single-edit rebuild, changed spans
//!   ↓
//! tree        → Immutable nodes, Tree snapshots, cursors, stack builder
//!   ↓
//! lexicon     → Lexicon trait, LexState, windowed relexer, sample lexicon
//!   ↓
//! base        → Primitives (TextRange, TextSize, Edit, span mapping)
//! ```

// ============================================================================
// MODULES (dependency order: base → lexicon → tree → incremental → buffer → work)
// ============================================================================

/// Foundation types: TextRange, Edit, span mapping
pub mod base;

/// Error type shared by every layer
pub mod error;

/// Pluggable lexicons and windowed lexing over ropes
pub mod lexicon;

/// Immutable token trees with structural sharing
pub mod tree;

/// Full and incremental tree builds
pub mod incremental;

/// Text sources and edit notifications
pub mod buffer;

/// Worker thread, supersession and publishing
pub mod work;


// Re-export foundation types
pub use base::{Edit, TextRange, TextSize};

pub use buffer::{BufferAdapter, Document, EditListener, ListenerId};
pub use error::{Result, SyncError};
pub use incremental::{
    BuildConfig, Outcome, Preview, Reparse, apply_edit, apply_edit_with_preview, full_parse,
    full_parse_with_preview,
};
pub use lexicon::{LexState, Lexeme, Lexicon, tokenize};
pub use tree::{Tree, WalkEvent};
pub use work::{
    SubscriptionId, SupersedePolicy, SyncConfig, SyncEvent, SyncHandle, SyncState, TreeUpdate,
    attach, attach_with_config,
};
