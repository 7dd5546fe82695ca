//! Pluggable lexicons.
//!
//! A [`Lexicon`] is the grammar entry point the engine re-lexes text with. It
//! is pure: the lexeme it returns depends only on the text it is handed and
//! the [`LexState`] it starts in. The incremental builder relies on this to
//! decide where freshly lexed output re-synchronizes with an older tree.
//!
//! ## Contract
//!
//! - `lex` returns the first lexeme of `text`, or `None` when nothing
//!   matches. `None`, a zero length, or a length that splits a character are
//!   grammar errors; the engine recovers by emitting a one-character token of
//!   [`Lexicon::error_kind`] and keeping the state.
//! - A lexeme may depend on at most [`Lexicon::lookahead`] bytes past its
//!   end (one by default: the character that ended a maximal munch). Text is
//!   handed out in windows; a lexeme ending closer than that to the end of a
//!   window that is not the end of the buffer is retried on a larger window.
//!   The same bound decides which tokens in front of an edit are re-lexed.

mod relex;
mod state;

pub mod clike;

pub use relex::{DEFAULT_WINDOW, Lexed, Relexer, tokenize};
pub use state::LexState;

use std::fmt;
use std::hash::Hash;

use text_size::TextSize;

/// One lexeme: kind, length and the state following it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme<K, C> {
    pub kind: K,
    pub len: TextSize,
    pub next: LexState<C>,
}

impl<K, C> Lexeme<K, C> {
    pub fn new(kind: K, len: TextSize, next: LexState<C>) -> Self {
        Self { kind, len, next }
    }
}

/// A pure, deterministic tokenizing function with explicit state.
pub trait Lexicon: Send + Sync + 'static {
    /// Token kinds produced by this lexicon.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    /// Contexts the lexicon can be in; each pushed context opens a group node.
    type Context: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// The context a buffer starts in.
    fn root_context(&self) -> Self::Context;

    /// Lex the first lexeme of `text` in `state`.
    fn lex(
        &self,
        text: &str,
        state: &LexState<Self::Context>,
    ) -> Option<Lexeme<Self::Kind, Self::Context>>;

    /// Kind of the one-character tokens emitted when nothing matches.
    fn error_kind(&self) -> Self::Kind;

    /// Bytes past a lexeme's end the lexicon may inspect. At least one is
    /// always assumed.
    fn lookahead(&self) -> usize {
        1
    }

    /// The state a buffer starts in.
    fn initial_state(&self) -> LexState<Self::Context> {
        LexState::new(self.root_context())
    }
}

/// Shorthand for the lexeme type of a lexicon.
pub type LexemeOf<L> = Lexeme<<L as Lexicon>::Kind, <L as Lexicon>::Context>;

/// Shorthand for the state type of a lexicon.
pub type StateOf<L> = LexState<<L as Lexicon>::Context>;
