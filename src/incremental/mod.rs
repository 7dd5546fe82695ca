//! Incremental tree builder.
//!
//! Given the previous tree and one edit, [`apply_edit`] re-lexes the smallest
//! stretch of tokens that can be affected and shares everything else:
//!
//! 1. **Anchor.** The first token whose end, plus the lexicon's lookahead,
//!    reaches the edit position. Its recorded start state is where lexing
//!    resumes; [`BuildConfig::backtrack`] moves the anchor further left.
//! 2. **Left fringe.** Every element left of the anchor, at every depth of the
//!    path down to it, is handed to a [`TreeBuilder`](crate::tree::TreeBuilder) as already-built
//!    children of still-open groups.
//! 3. **Re-lex.** Tokens are lexed from the anchor against the edited text.
//!    Before each one, once past the inserted text, the position is mapped
//!    back to the old text: if an old token starts exactly there and was lexed
//!    in an equal state, the rest of the old token stream is what lexing would
//!    produce anyway. That is the re-merge point.
//! 4. **Right fringe.** The old elements from the re-merge point on are pushed
//!    as shared subtrees. Nodes store lengths only, so shifting them by the
//!    edit's delta costs nothing.
//!
//! Without a re-merge point lexing runs to the end of the text. The builder
//! re-derives only the groups along the two fringe paths; groups that end up
//! adjacent with equal contexts are merged, so the result is node-for-node
//! what [`full_parse`] builds for the same text.
//!
//! Builds poll a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! and give up with [`Outcome::Cancelled`] once it is signalled. A long build
//! can offer one [`Preview`] on the way, so a consumer can show the start of
//! the new tree before the rest is lexed.

mod config;
mod rebuild;

pub use config::{BuildConfig, DEFAULT_PEEK_THRESHOLD};
pub use rebuild::{apply_edit, apply_edit_with_preview, full_parse, full_parse_with_preview};

use text_size::{TextRange, TextSize};

use crate::lexicon::Lexicon;
use crate::tree::Tree;

/// Result of a build that ran to completion.
pub struct Reparse<L: Lexicon> {
    pub tree: Tree<L>,
    /// The span of the new text whose tokens were re-lexed
    pub changed: TextRange,
    /// Number of tokens lexed
    pub relexed: usize,
    /// Index in the old tree of the first token shared after the re-lexed
    /// stretch, if lexing re-synchronized before the end of the text
    pub reused_from: Option<usize>,
}

/// A provisional tree handed out while a build is still lexing.
pub struct Preview<L: Lexicon> {
    /// Where lexing started; the tree is new from here to its end
    pub start: TextSize,
    /// Covers the text up to the last token lexed so far
    pub tree: Tree<L>,
}

/// What a build produced.
pub enum Outcome<L: Lexicon> {
    /// The edit changes nothing.
    Unchanged,
    Rebuilt(Reparse<L>),
    /// The cancellation token was signalled; nothing was produced.
    Cancelled,
}

impl<L: Lexicon> Outcome<L> {
    pub fn into_reparse(self) -> Option<Reparse<L>> {
        match self {
            Self::Rebuilt(reparse) => Some(reparse),
            Self::Unchanged | Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl<L: Lexicon> std::fmt::Debug for Outcome<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => f.write_str("Unchanged"),
            Self::Rebuilt(reparse) => f
                .debug_struct("Rebuilt")
                .field("tree", &reparse.tree)
                .field("changed", &reparse.changed)
                .field("relexed", &reparse.relexed)
                .field("reused_from", &reparse.reused_from)
                .finish(),
            Self::Cancelled => f.write_str("Cancelled"),
        }
    }
}

#[cfg(test)]
mod tests;
