//! Descent and traversal over immutable trees.

use std::sync::Arc;

use text_size::{TextRange, TextSize};

use super::node::{Element, GroupNode, TokenNode};
use crate::lexicon::LexState;

/// A token together with its absolute range.
#[derive(Debug)]
pub struct TokenRef<'a, K, C> {
    pub node: &'a Arc<TokenNode<K, C>>,
    pub range: TextRange,
}

impl<K, C> Clone for TokenRef<'_, K, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, C> Copy for TokenRef<'_, K, C> {}

impl<'a, K: Copy, C> TokenRef<'a, K, C> {
    pub fn kind(&self) -> K {
        self.node.kind()
    }

    pub fn state(&self) -> &'a LexState<C> {
        self.node.state()
    }
}

/// A group together with its absolute range.
#[derive(Debug)]
pub struct GroupRef<'a, K, C> {
    pub node: &'a GroupNode<K, C>,
    pub range: TextRange,
}

impl<K, C> Clone for GroupRef<'_, K, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, C> Copy for GroupRef<'_, K, C> {}

impl<'a, K: Copy, C> GroupRef<'a, K, C> {
    pub fn context(&self) -> &'a C {
        self.node.context()
    }
}

/// One step of a preorder traversal.
#[derive(Debug, Clone, Copy)]
pub enum WalkEvent<'a, K, C> {
    Enter(GroupRef<'a, K, C>),
    Token(TokenRef<'a, K, C>),
    Leave(GroupRef<'a, K, C>),
}

/// A step along the path from the root to a token: a group and the index of
/// the child the path continues through.
pub struct PathStep<'a, K, C> {
    pub group: &'a GroupNode<K, C>,
    pub index: usize,
}

/// The path to the token with index `index`, root first. The last step's
/// child is the token. Empty when the index is past the last token.
pub fn path_to_index<K: Copy, C>(
    root: &GroupNode<K, C>,
    index: usize,
) -> Vec<PathStep<'_, K, C>> {
    let mut path = Vec::new();
    if index >= root.token_count() {
        return path;
    }
    let mut group = root;
    let mut remaining = index;
    loop {
        let mut next = None;
        for (i, child) in group.children().iter().enumerate() {
            let count = child.token_count();
            if remaining < count {
                next = Some((i, child));
                break;
            }
            remaining -= count;
        }
        let Some((i, child)) = next else {
            return path;
        };
        path.push(PathStep { group, index: i });
        match child {
            Element::Token(_) => return path,
            Element::Group(inner) => group = inner,
        }
    }
}

/// Index and start offset of the token containing `offset`.
pub fn token_index_at<K: Copy, C>(
    root: &GroupNode<K, C>,
    offset: TextSize,
) -> Option<(usize, TextSize)> {
    if offset >= root.len() {
        return None;
    }
    let mut group = root;
    let mut index = 0;
    let mut start = TextSize::from(0);
    loop {
        let mut found = None;
        for child in group.children() {
            let end = start + child.len();
            if offset < end {
                found = Some(child);
                break;
            }
            start = end;
            index += child.token_count();
        }
        match found? {
            Element::Token(_) => return Some((index, start)),
            Element::Group(inner) => group = inner,
        }
    }
}

/// In-order iterator over tokens with their absolute ranges.
pub struct Tokens<'a, K, C> {
    stack: Vec<(&'a GroupNode<K, C>, usize)>,
    offset: TextSize,
}

impl<'a, K: Copy, C> Tokens<'a, K, C> {
    pub fn new(root: &'a GroupNode<K, C>) -> Self {
        Self {
            stack: vec![(root, 0)],
            offset: TextSize::from(0),
        }
    }

    /// Start at the token with index `index`.
    pub fn at_index(root: &'a GroupNode<K, C>, index: usize) -> Self {
        let path = path_to_index(root, index);
        if path.is_empty() {
            return Self {
                stack: Vec::new(),
                offset: root.len(),
            };
        }
        let mut offset = TextSize::from(0);
        let mut stack = Vec::with_capacity(path.len());
        let last = path.len() - 1;
        for (depth, step) in path.into_iter().enumerate() {
            offset += step.group.children()[..step.index]
                .iter()
                .map(Element::len)
                .sum::<TextSize>();
            // Groups on the path resume after the child being descended into;
            // the innermost one resumes at the token itself.
            let resume = if depth == last { step.index } else { step.index + 1 };
            stack.push((step.group, resume));
        }
        Self { stack, offset }
    }

    /// Start at the token containing `offset`.
    pub fn at_offset(root: &'a GroupNode<K, C>, offset: TextSize) -> Self {
        match token_index_at(root, offset) {
            Some((index, _)) => Self::at_index(root, index),
            None => Self {
                stack: Vec::new(),
                offset: root.len(),
            },
        }
    }

    /// Offset of the next token.
    pub fn offset(&self) -> TextSize {
        self.offset
    }
}

impl<'a, K: Copy, C> Iterator for Tokens<'a, K, C> {
    type Item = TokenRef<'a, K, C>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            let group = top.0;
            let index = top.1;
            if index >= group.children().len() {
                self.stack.pop();
                continue;
            }
            top.1 += 1;
            match &group.children()[index] {
                Element::Token(token) => {
                    let range = TextRange::at(self.offset, token.len());
                    self.offset = range.end();
                    return Some(TokenRef { node: token, range });
                }
                Element::Group(inner) => self.stack.push((inner, 0)),
            }
        }
    }
}

/// Preorder traversal yielding enter/leave events for groups and tokens in
/// between. The root group is entered first and left last.
pub struct Preorder<'a, K, C> {
    stack: Vec<(GroupRef<'a, K, C>, usize)>,
    offset: TextSize,
    pending: Option<GroupRef<'a, K, C>>,
}

impl<'a, K: Copy, C> Preorder<'a, K, C> {
    pub fn new(root: &'a GroupNode<K, C>) -> Self {
        let root = GroupRef {
            node: root,
            range: TextRange::up_to(root.len()),
        };
        Self {
            stack: Vec::new(),
            offset: TextSize::from(0),
            pending: Some(root),
        }
    }
}

impl<'a, K: Copy, C> Iterator for Preorder<'a, K, C> {
    type Item = WalkEvent<'a, K, C>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(group) = self.pending.take() {
            self.stack.push((group, 0));
            return Some(WalkEvent::Enter(group));
        }
        let top = self.stack.last_mut()?;
        let group = top.0;
        let index = top.1;
        if index >= group.node.children().len() {
            self.stack.pop();
            return Some(WalkEvent::Leave(group));
        }
        top.1 += 1;
        match &group.node.children()[index] {
            Element::Token(token) => {
                let range = TextRange::at(self.offset, token.len());
                self.offset = range.end();
                Some(WalkEvent::Token(TokenRef { node: token, range }))
            }
            Element::Group(inner) => {
                let inner = GroupRef {
                    node: inner,
                    range: TextRange::at(self.offset, inner.len()),
                };
                self.stack.push((inner, 0));
                Some(WalkEvent::Enter(inner))
            }
        }
    }
}

/// Groups containing `offset`, outermost first, root included.
pub fn groups_at<K: Copy, C>(
    root: &GroupNode<K, C>,
    offset: TextSize,
) -> Vec<GroupRef<'_, K, C>> {
    let mut groups = vec![GroupRef {
        node: root,
        range: TextRange::up_to(root.len()),
    }];
    let mut group = root;
    let mut start = TextSize::from(0);
    'descend: loop {
        for child in group.children() {
            let range = TextRange::at(start, child.len());
            if offset < range.end() {
                match child {
                    Element::Group(inner) => {
                        groups.push(GroupRef { node: inner, range });
                        group = inner;
                        continue 'descend;
                    }
                    Element::Token(_) => break 'descend,
                }
            }
            start = range.end();
        }
        break;
    }
    groups
}
