//! Immutable token trees.
//!
//! A [`Tree`] is a snapshot: the root group of a buffer at one point in time
//! together with the text it was built from. Trees are never modified after
//! construction. A new version shares every subtree the edit did not touch
//! with the previous one, so holding on to an old tree is cheap and safe.
//!
//! ## Layout
//!
//! Tokens are leaves. Groups are internal nodes, one per lexicon context
//! entered above the root context. A token lives in the groups named by the
//! state it was lexed in; a group is a maximal run of tokens sharing the
//! context at its depth. The group structure is therefore a pure function of
//! the token sequence, and [`Tree::same_structure`] can compare trees built in
//! different ways node for node.

mod builder;
mod cursor;
mod node;

pub use builder::TreeBuilder;
pub use cursor::{
    GroupRef, PathStep, Preorder, TokenRef, Tokens, WalkEvent, groups_at, path_to_index,
    token_index_at,
};
pub use node::{Element, GroupNode, TokenNode};

use std::fmt::{self, Write as _};
use std::marker::PhantomData;
use std::sync::Arc;

use ropey::Rope;
use text_size::{TextRange, TextSize};

use crate::base::{line_range, slice_text};
use crate::lexicon::Lexicon;

/// Token node type for a lexicon.
pub type Token<L> = TokenNode<<L as Lexicon>::Kind, <L as Lexicon>::Context>;
/// Group node type for a lexicon.
pub type Group<L> = GroupNode<<L as Lexicon>::Kind, <L as Lexicon>::Context>;
/// Child node type for a lexicon.
pub type Node<L> = Element<<L as Lexicon>::Kind, <L as Lexicon>::Context>;

/// Adjacent tokens of one kind, merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindRun<K> {
    pub kind: K,
    pub range: TextRange,
}

/// A published token tree for one buffer state.
pub struct Tree<L: Lexicon> {
    root: Arc<Group<L>>,
    text: Rope,
    version: u64,
    _lexicon: PhantomData<fn() -> L>,
}

impl<L: Lexicon> Clone for Tree<L> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
            text: self.text.clone(),
            version: self.version,
            _lexicon: PhantomData,
        }
    }
}

impl<L: Lexicon> Tree<L> {
    /// Wrap a built root and the text it covers.
    pub fn new(root: Arc<Group<L>>, text: Rope, version: u64) -> Self {
        debug_assert_eq!(usize::from(root.len()), text.len_bytes());
        Self {
            root,
            text,
            version,
            _lexicon: PhantomData,
        }
    }

    /// An empty tree for an empty buffer.
    pub fn empty(lexicon: &L) -> Self {
        let root = GroupNode::new(lexicon.root_context(), Vec::new());
        Self::new(Arc::new(root), Rope::new(), 0)
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn root(&self) -> &Arc<Group<L>> {
        &self.root
    }

    /// The text this tree was built from.
    pub fn text(&self) -> &Rope {
        &self.text
    }

    pub fn len(&self) -> TextSize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Publish version. Increases with every tree derived from this one.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn token_count(&self) -> usize {
        self.root.token_count()
    }

    /// All tokens in buffer order.
    pub fn tokens(&self) -> Tokens<'_, L::Kind, L::Context> {
        Tokens::new(&self.root)
    }

    /// Tokens overlapping `range`. An empty range selects the token containing
    /// its offset.
    pub fn tokens_in(
        &self,
        range: TextRange,
    ) -> impl Iterator<Item = TokenRef<'_, L::Kind, L::Context>> + '_ {
        let end = range.end().max(range.start() + TextSize::from(1));
        Tokens::at_offset(&self.root, range.start()).take_while(move |t| t.range.start() < end)
    }

    /// The token containing `offset`, if any.
    pub fn token_at(&self, offset: TextSize) -> Option<TokenRef<'_, L::Kind, L::Context>> {
        Tokens::at_offset(&self.root, offset).next()
    }

    /// Tokens overlapping `range` with runs of equal kinds merged, clipped to
    /// the range.
    pub fn kind_runs(&self, range: TextRange) -> Vec<KindRun<L::Kind>> {
        let mut runs: Vec<KindRun<L::Kind>> = Vec::new();
        for token in self.tokens_in(range) {
            let Some(clipped) = token.range.intersect(range) else {
                continue;
            };
            match runs.last_mut() {
                Some(last) if last.kind == token.kind() && last.range.end() == clipped.start() => {
                    last.range = last.range.cover(clipped);
                }
                _ => runs.push(KindRun {
                    kind: token.kind(),
                    range: clipped,
                }),
            }
        }
        runs
    }

    /// Groups containing `offset`, root first.
    pub fn context_path(&self, offset: TextSize) -> Vec<GroupRef<'_, L::Kind, L::Context>> {
        groups_at(&self.root, offset)
    }

    pub fn preorder(&self) -> Preorder<'_, L::Kind, L::Context> {
        Preorder::new(&self.root)
    }

    /// Text of a token of this tree.
    pub fn token_text(&self, token: &TokenRef<'_, L::Kind, L::Context>) -> String {
        slice_text(&self.text, token.range)
    }

    /// Text covered by `range`.
    pub fn slice(&self, range: TextRange) -> String {
        slice_text(&self.text, range)
    }

    /// Grow `range` to whole lines of this tree's text.
    pub fn expand_to_lines(&self, range: TextRange) -> TextRange {
        line_range(&self.text, range)
    }

    /// Whether both trees have the same nodes with the same kinds, lengths,
    /// states and contexts.
    pub fn same_structure(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.root, &other.root) || self.root.same_structure(&other.root)
    }

    /// Indented dump of every group and token.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let mut depth = 0usize;
        for event in self.preorder() {
            // Writing to a String cannot fail.
            let _ = match event {
                WalkEvent::Enter(group) => {
                    depth += 1;
                    writeln!(
                        out,
                        "{:indent$}{:?}@{:?}",
                        "",
                        group.context(),
                        group.range,
                        indent = (depth - 1) * 2
                    )
                }
                WalkEvent::Token(token) => writeln!(
                    out,
                    "{:indent$}{:?}@{:?} {:?}",
                    "",
                    token.kind(),
                    token.range,
                    self.token_text(&token),
                    indent = depth * 2
                ),
                WalkEvent::Leave(_) => {
                    depth -= 1;
                    Ok(())
                }
            };
        }
        out
    }
}

impl<L: Lexicon> fmt::Debug for Tree<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("version", &self.version)
            .field("len", &self.len())
            .field("tokens", &self.token_count())
            .finish()
    }
}
