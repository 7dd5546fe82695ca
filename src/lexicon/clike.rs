//! Logos-based sample lexicon for brace-structured text.
//!
//! Covers identifiers, keywords, numbers, punctuation, `{ }` blocks, string
//! literals with escapes, and line and block comments. Blocks, strings and
//! block comments are contexts, so they become group nodes in the tree.
//!
//! Each context has its own logos token set; the lexicon picks the set from
//! the innermost context of the state it is asked to lex in.

use logos::Logos;
use text_size::TextSize;

use super::{LexState, Lexeme, Lexicon};

/// Token kinds produced by [`CLike`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CKind {
    Whitespace,
    Ident,
    Keyword,
    Number,
    Punct,
    OpenBrace,
    CloseBrace,
    StringDelim,
    StringText,
    StringEscape,
    CommentDelim,
    CommentText,
    LineComment,
    Error,
}

/// Contexts of [`CLike`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CContext {
    Root,
    Block,
    String,
    Comment,
}

const KEYWORDS: &[&str] = &[
    "if", "else", "while", "for", "return", "fn", "let", "struct", "break", "continue",
];

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum CodeToken {
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*", priority = 3, allow_greedy = true)]
    LineComment,

    #[token("/*", priority = 3)]
    CommentOpen,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Number,

    #[token("\"")]
    Quote,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[regex(r"[-+*/%=<>!&|^~?:;,.()\[\]]")]
    Punct,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum StringToken {
    #[regex(r#"[^"\\]+"#, allow_greedy = true)]
    Text,

    #[regex(r"\\.")]
    Escape,

    #[token("\"")]
    Quote,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum CommentToken {
    #[regex(r"[^*]+", allow_greedy = true)]
    Text,

    #[token("*")]
    Star,

    #[token("*/")]
    Close,
}

/// First token of `text` for a logos token set, with its byte length.
fn first<'s, T>(text: &'s str) -> Option<(T, TextSize)>
where
    T: Logos<'s, Source = str>,
    T::Extras: Default,
{
    let mut lexer = T::lexer(text);
    let token = lexer.next()?.ok()?;
    Some((token, TextSize::from(lexer.span().end as u32)))
}

/// A lexicon for C-like, brace-structured text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CLike;

impl CLike {
    fn lex_code(
        &self,
        text: &str,
        state: &LexState<CContext>,
    ) -> Option<Lexeme<CKind, CContext>> {
        let (token, len) = first::<CodeToken>(text)?;
        let same = || state.clone();
        let lexeme = match token {
            CodeToken::Whitespace => Lexeme::new(CKind::Whitespace, len, same()),
            CodeToken::LineComment => Lexeme::new(CKind::LineComment, len, same()),
            CodeToken::CommentOpen => {
                Lexeme::new(CKind::CommentDelim, len, state.push(CContext::Comment))
            }
            CodeToken::Ident => {
                let word = &text[..usize::from(len)];
                let kind = if KEYWORDS.contains(&word) {
                    CKind::Keyword
                } else {
                    CKind::Ident
                };
                Lexeme::new(kind, len, same())
            }
            CodeToken::Number => Lexeme::new(CKind::Number, len, same()),
            CodeToken::Quote => Lexeme::new(CKind::StringDelim, len, state.push(CContext::String)),
            CodeToken::LBrace => Lexeme::new(CKind::OpenBrace, len, state.push(CContext::Block)),
            CodeToken::RBrace => {
                // An unmatched closing brace at the top level is a grammar error.
                if *state.top() != CContext::Block {
                    return None;
                }
                Lexeme::new(CKind::CloseBrace, len, state.pop())
            }
            CodeToken::Punct => Lexeme::new(CKind::Punct, len, same()),
        };
        Some(lexeme)
    }
}

impl Lexicon for CLike {
    type Kind = CKind;
    type Context = CContext;

    fn root_context(&self) -> CContext {
        CContext::Root
    }

    fn lex(&self, text: &str, state: &LexState<CContext>) -> Option<Lexeme<CKind, CContext>> {
        match state.top() {
            CContext::Root | CContext::Block => self.lex_code(text, state),
            CContext::String => {
                let (token, len) = first::<StringToken>(text)?;
                Some(match token {
                    StringToken::Text => Lexeme::new(CKind::StringText, len, state.clone()),
                    StringToken::Escape => Lexeme::new(CKind::StringEscape, len, state.clone()),
                    StringToken::Quote => Lexeme::new(CKind::StringDelim, len, state.pop()),
                })
            }
            CContext::Comment => {
                let (token, len) = first::<CommentToken>(text)?;
                Some(match token {
                    CommentToken::Text | CommentToken::Star => {
                        Lexeme::new(CKind::CommentText, len, state.clone())
                    }
                    CommentToken::Close => Lexeme::new(CKind::CommentDelim, len, state.pop()),
                })
            }
        }
    }

    fn error_kind(&self) -> CKind {
        CKind::Error
    }
}
