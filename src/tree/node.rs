//! Immutable tree nodes.
//!
//! Nodes store lengths, never absolute offsets, so a subtree is valid at any
//! position and can be shared between tree versions after the text before it
//! changed length. Absolute ranges are computed while descending.

use std::sync::Arc;

use text_size::TextSize;

use crate::lexicon::LexState;

/// A leaf: one lexed token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenNode<K, C> {
    kind: K,
    len: TextSize,
    state: LexState<C>,
}

impl<K: Copy, C> TokenNode<K, C> {
    pub fn new(kind: K, len: TextSize, state: LexState<C>) -> Self {
        Self { kind, len, state }
    }

    pub fn kind(&self) -> K {
        self.kind
    }

    pub fn len(&self) -> TextSize {
        self.len
    }

    /// The lexicon state this token was lexed in.
    pub fn state(&self) -> &LexState<C> {
        &self.state
    }
}

/// An internal node: a run of tokens lexed inside one lexicon context.
#[derive(Debug, Clone)]
pub struct GroupNode<K, C> {
    context: C,
    len: TextSize,
    token_count: usize,
    children: Vec<Element<K, C>>,
}

impl<K: Copy, C> GroupNode<K, C> {
    pub fn new(context: C, children: Vec<Element<K, C>>) -> Self {
        let len = children.iter().map(Element::len).sum();
        let token_count = children.iter().map(Element::token_count).sum();
        Self {
            context,
            len,
            token_count,
            children,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn len(&self) -> TextSize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of tokens in this subtree.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn children(&self) -> &[Element<K, C>] {
        &self.children
    }

    pub(crate) fn into_children(self) -> Vec<Element<K, C>> {
        self.children
    }
}

/// A child of a group: a token or a nested group.
#[derive(Debug)]
pub enum Element<K, C> {
    Token(Arc<TokenNode<K, C>>),
    Group(Arc<GroupNode<K, C>>),
}

impl<K, C> Clone for Element<K, C> {
    fn clone(&self) -> Self {
        match self {
            Self::Token(token) => Self::Token(Arc::clone(token)),
            Self::Group(group) => Self::Group(Arc::clone(group)),
        }
    }
}

impl<K: Copy, C> Element<K, C> {
    pub fn len(&self) -> TextSize {
        match self {
            Self::Token(token) => token.len(),
            Self::Group(group) => group.len(),
        }
    }

    pub fn token_count(&self) -> usize {
        match self {
            Self::Token(_) => 1,
            Self::Group(group) => group.token_count(),
        }
    }
}

impl<K, C> Element<K, C> {
    pub fn as_token(&self) -> Option<&Arc<TokenNode<K, C>>> {
        match self {
            Self::Token(token) => Some(token),
            Self::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Arc<GroupNode<K, C>>> {
        match self {
            Self::Group(group) => Some(group),
            Self::Token(_) => None,
        }
    }

    /// Whether both elements are the very same shared node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Token(a), Self::Token(b)) => Arc::ptr_eq(a, b),
            (Self::Group(a), Self::Group(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<K: Copy + PartialEq, C: PartialEq> Element<K, C> {
    /// Node-for-node comparison of kinds, lengths, states and contexts.
    pub fn same_structure(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Token(a), Self::Token(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Group(a), Self::Group(b)) => Arc::ptr_eq(a, b) || a.same_structure(b),
            _ => false,
        }
    }
}

impl<K: Copy + PartialEq, C: PartialEq> GroupNode<K, C> {
    /// Node-for-node comparison of kinds, lengths, states and contexts.
    pub fn same_structure(&self, other: &Self) -> bool {
        self.context == other.context
            && self.len == other.len
            && self.token_count == other.token_count
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_structure(b))
    }
}
