//! Lexicon state: an immutable stack of contexts.

use std::fmt;
use std::sync::Arc;

/// The state a lexicon is in at some buffer offset.
///
/// A stack of contexts whose bottom is always the root context. Cloning is a
/// reference-count bump; `push` and `pop` return new states and never modify
/// the receiver, so a state recorded in a published tree can be compared
/// against freshly lexed states at any later time.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LexState<C> {
    contexts: Arc<[C]>,
}

impl<C: Clone> LexState<C> {
    /// A state holding only the root context.
    pub fn new(root: C) -> Self {
        Self {
            contexts: Arc::from(vec![root]),
        }
    }

    /// A state entering `context` on top of the current stack.
    pub fn push(&self, context: C) -> Self {
        let mut contexts = Vec::with_capacity(self.contexts.len() + 1);
        contexts.extend_from_slice(&self.contexts);
        contexts.push(context);
        Self {
            contexts: contexts.into(),
        }
    }

    /// A state leaving the innermost context. The root context is never popped.
    pub fn pop(&self) -> Self {
        self.pop_n(1)
    }

    /// A state leaving up to `n` contexts, keeping at least the root.
    pub fn pop_n(&self, n: usize) -> Self {
        let keep = self.contexts.len().saturating_sub(n).max(1);
        if keep == self.contexts.len() {
            return self.clone();
        }
        Self {
            contexts: self.contexts[..keep].to_vec().into(),
        }
    }

    /// A state with the innermost context swapped for `context`.
    ///
    /// Replacing the root yields a state with the new root.
    pub fn replace(&self, context: C) -> Self {
        let mut contexts = self.contexts.to_vec();
        if let Some(top) = contexts.last_mut() {
            *top = context;
        }
        Self {
            contexts: contexts.into(),
        }
    }
}

impl<C> LexState<C> {
    /// The innermost context.
    pub fn top(&self) -> &C {
        // The stack is never empty.
        &self.contexts[self.contexts.len() - 1]
    }

    pub fn root(&self) -> &C {
        &self.contexts[0]
    }

    /// Number of contexts above the root.
    pub fn depth(&self) -> usize {
        self.contexts.len() - 1
    }

    /// All contexts, root first.
    pub fn contexts(&self) -> &[C] {
        &self.contexts
    }

    /// Contexts above the root; the group path of a token lexed in this state.
    pub fn path(&self) -> &[C] {
        &self.contexts[1..]
    }

    /// Whether both states share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.contexts, &other.contexts)
    }
}

impl<C: fmt::Debug> fmt::Debug for LexState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.contexts.iter()).finish()
    }
}
