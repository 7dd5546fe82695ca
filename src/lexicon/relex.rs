//! Windowed lexing over a rope.
//!
//! Lexicons work on `&str`, buffers are ropes. The relexer copies a window of
//! the rope starting at the current offset and hands the lexicon the rest of
//! that window, growing it whenever a lexeme could depend on text beyond it.

use ropey::Rope;
use text_size::{TextRange, TextSize};

use super::{LexState, Lexicon, StateOf};

/// Default minimum window size in bytes.
pub const DEFAULT_WINDOW: usize = 4096;

/// A token produced by the relexer: kind, absolute range and the state it was
/// lexed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed<K, C> {
    pub kind: K,
    pub range: TextRange,
    pub state: LexState<C>,
}

/// A contiguous copy of part of a rope.
struct Window<'a> {
    rope: &'a Rope,
    start: usize,
    text: String,
    min_len: usize,
}

impl<'a> Window<'a> {
    fn new(rope: &'a Rope, min_len: usize) -> Self {
        Self {
            rope,
            start: 0,
            text: String::new(),
            min_len: min_len.max(1),
        }
    }

    /// Text from `pos`, at least `want` bytes long unless it runs into the end
    /// of the buffer. The flag tells whether it does.
    fn view(&mut self, pos: usize, want: usize) -> (&str, bool) {
        let total = self.rope.len_bytes();
        let wanted_end = pos.saturating_add(want).min(total);
        if pos < self.start || wanted_end > self.start + self.text.len() {
            self.fill(pos, want.max(self.min_len));
        }
        let at_end = self.start + self.text.len() == total;
        (&self.text[pos - self.start..], at_end)
    }

    fn fill(&mut self, pos: usize, len: usize) {
        let end = pos.saturating_add(len).min(self.rope.len_bytes());
        let first = self.rope.byte_to_char(pos);
        let mut last = self.rope.byte_to_char(end);
        if self.rope.char_to_byte(last) < end {
            last += 1;
        }
        self.start = self.rope.char_to_byte(first);
        self.text = String::from(self.rope.slice(first..last));
    }
}

/// Lexes a rope forward from some offset and state, one token at a time.
///
/// Grammar errors are recovered here: when the lexicon finds no match, a
/// one-character token of the lexicon's error kind is produced and the state
/// is kept, so lexing always terminates and always covers the text.
pub struct Relexer<'a, L: Lexicon> {
    lexicon: &'a L,
    window: Window<'a>,
    len: usize,
    pos: usize,
    state: StateOf<L>,
    errors: usize,
}

impl<'a, L: Lexicon> Relexer<'a, L> {
    /// Start lexing `rope` at byte offset `start` in `state`.
    ///
    /// `start` must lie on a character boundary.
    pub fn new(
        lexicon: &'a L,
        rope: &'a Rope,
        start: TextSize,
        state: StateOf<L>,
        window: usize,
    ) -> Self {
        Self {
            lexicon,
            window: Window::new(rope, window),
            len: rope.len_bytes(),
            pos: usize::from(start),
            state,
            errors: 0,
        }
    }

    /// The offset the next token starts at.
    pub fn offset(&self) -> TextSize {
        TextSize::from(self.pos as u32)
    }

    /// The state the next token will be lexed in.
    pub fn state(&self) -> &StateOf<L> {
        &self.state
    }

    /// Number of error tokens produced so far.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.len
    }

    fn lex_next(&mut self) -> (L::Kind, usize, StateOf<L>) {
        let margin = self.lexicon.lookahead().max(1);
        let mut want = self.window.min_len;
        loop {
            let (rest, at_end) = self.window.view(self.pos, want);
            let error_len = rest.chars().next().map_or(rest.len(), char::len_utf8);
            match self.lexicon.lex(rest, &self.state) {
                Some(lexeme) => {
                    let len = usize::from(lexeme.len);
                    if len == 0 || len > rest.len() || !rest.is_char_boundary(len) {
                        tracing::warn!(
                            offset = self.pos,
                            kind = ?lexeme.kind,
                            len,
                            "lexicon returned an invalid lexeme length"
                        );
                        return (self.lexicon.error_kind(), error_len, self.state.clone());
                    }
                    if !at_end && len + margin > rest.len() {
                        want = rest.len().saturating_mul(2);
                        continue;
                    }
                    return (lexeme.kind, len, lexeme.next);
                }
                None => return (self.lexicon.error_kind(), error_len, self.state.clone()),
            }
        }
    }
}

impl<L: Lexicon> Iterator for Relexer<'_, L> {
    type Item = Lexed<L::Kind, L::Context>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_at_end() {
            return None;
        }
        let (kind, len, next) = self.lex_next();
        if kind == self.lexicon.error_kind() {
            self.errors += 1;
        }
        let start = self.pos;
        self.pos += len;
        let state = std::mem::replace(&mut self.state, next);
        Some(Lexed {
            kind,
            range: TextRange::new(
                TextSize::from(start as u32),
                TextSize::from(self.pos as u32),
            ),
            state,
        })
    }
}

/// Lex all of `text` from the lexicon's initial state.
pub fn tokenize<L: Lexicon>(lexicon: &L, text: &str) -> Vec<Lexed<L::Kind, L::Context>> {
    let rope = Rope::from_str(text);
    Relexer::new(
        lexicon,
        &rope,
        TextSize::from(0),
        lexicon.initial_state(),
        DEFAULT_WINDOW,
    )
    .collect()
}
