//! Stack builder producing canonical trees.
//!
//! Works like rowan's `GreenNodeBuilder`, except that groups are opened and
//! closed implicitly: each pushed token carries its lexicon state, and the
//! builder keeps one open group per context above the root. A token whose
//! path shares a prefix with the open groups continues them; the rest are
//! closed and new ones opened. Consecutive siblings never end up as two groups
//! with the same context: opening a group right after a closed one with that
//! context reopens it instead.
//!
//! Whole prebuilt subtrees can be pushed as well. They are shared as-is unless
//! they have to be merged with the group open before them.

use std::sync::Arc;

use super::node::{Element, GroupNode, TokenNode};

#[derive(Clone)]
struct Frame<K, C> {
    context: C,
    children: Vec<Element<K, C>>,
}

#[derive(Clone)]
pub struct TreeBuilder<K, C> {
    frames: Vec<Frame<K, C>>,
}

impl<K: Copy, C: Clone + PartialEq> TreeBuilder<K, C> {
    /// An empty builder for a tree whose root has `root` as context.
    pub fn new(root: C) -> Self {
        Self {
            frames: vec![Frame {
                context: root,
                children: Vec::new(),
            }],
        }
    }

    /// A builder with groups already open, root first, each holding the
    /// children that precede the insertion point.
    pub fn with_open_groups(
        root: (C, Vec<Element<K, C>>),
        open: Vec<(C, Vec<Element<K, C>>)>,
    ) -> Self {
        let mut frames = Vec::with_capacity(open.len() + 1);
        frames.push(Frame {
            context: root.0,
            children: root.1,
        });
        frames.extend(
            open.into_iter()
                .map(|(context, children)| Frame { context, children }),
        );
        Self { frames }
    }

    /// Append a token inside the groups named by its state's path.
    pub fn token(&mut self, token: Arc<TokenNode<K, C>>) {
        self.align(token.state().path());
        self.top().children.push(Element::Token(token));
    }

    /// Append a prebuilt element whose parent groups have contexts `parent_path`
    /// (root excluded).
    pub fn element(&mut self, element: Element<K, C>, parent_path: &[C]) {
        self.align(parent_path);
        match element {
            Element::Token(token) => self.top().children.push(Element::Token(token)),
            Element::Group(group) => {
                let merges = matches!(
                    self.top().children.last(),
                    Some(Element::Group(last)) if last.context() == group.context()
                );
                if !merges {
                    self.top().children.push(Element::Group(group));
                    return;
                }
                self.open(group.context().clone());
                let mut path = parent_path.to_vec();
                path.push(group.context().clone());
                for child in group.children() {
                    self.element(child.clone(), &path);
                }
            }
        }
    }

    pub fn finish(mut self) -> GroupNode<K, C> {
        while self.frames.len() > 1 {
            self.close();
        }
        let root = self.frames.remove(0);
        GroupNode::new(root.context, root.children)
    }

    /// The tree built so far, with every open group closed. The builder
    /// itself stays open.
    pub fn snapshot(&self) -> GroupNode<K, C> {
        self.clone().finish()
    }

    fn top(&mut self) -> &mut Frame<K, C> {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn align(&mut self, path: &[C]) {
        let common = self.frames[1..]
            .iter()
            .zip(path)
            .take_while(|(frame, context)| frame.context == **context)
            .count();
        while self.frames.len() > common + 1 {
            self.close();
        }
        for context in &path[common..] {
            self.open(context.clone());
        }
    }

    fn open(&mut self, context: C) {
        let top = self.top();
        let reopen = matches!(
            top.children.last(),
            Some(Element::Group(last)) if *last.context() == context
        );
        let children = match top.children.pop() {
            Some(Element::Group(last)) if reopen => Arc::unwrap_or_clone(last).into_children(),
            Some(other) => {
                top.children.push(other);
                Vec::new()
            }
            None => Vec::new(),
        };
        self.frames.push(Frame { context, children });
    }

    fn close(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        // Groups left empty by a splice are dropped.
        if frame.children.is_empty() {
            return;
        }
        let group = GroupNode::new(frame.context, frame.children);
        self.top().children.push(Element::Group(Arc::new(group)));
    }
}
