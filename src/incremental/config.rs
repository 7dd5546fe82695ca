//! Builder options

use text_size::TextSize;

use crate::lexicon::DEFAULT_WINDOW;

pub const DEFAULT_PEEK_THRESHOLD: usize = 5000;

/// Options for full and incremental builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Extra tokens re-lexed in front of the anchor token
    pub backtrack: usize,
    /// Number of re-lexed tokens between two cancellation checks
    pub poll_interval: usize,
    /// Minimum number of bytes copied out of the rope per lexing window
    pub window: usize,
    /// Bytes re-lexed in one build before a provisional tree is offered to
    /// the preview hook; `None` disables previews
    pub peek_threshold: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            backtrack: 0,
            poll_interval: 64,
            window: DEFAULT_WINDOW,
            peek_threshold: Some(DEFAULT_PEEK_THRESHOLD),
        }
    }
}

impl BuildConfig {
    pub fn with_backtrack(mut self, backtrack: usize) -> Self {
        self.backtrack = backtrack;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: usize) -> Self {
        self.poll_interval = poll_interval.max(1);
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn with_peek_threshold(mut self, peek_threshold: Option<usize>) -> Self {
        self.peek_threshold = peek_threshold;
        self
    }

    /// Whether a build that started lexing at `start` and has reached `offset`
    /// is due for its preview.
    pub(crate) fn should_peek(&self, start: TextSize, offset: TextSize) -> bool {
        self.peek_threshold
            .is_some_and(|threshold| usize::from(offset - start) >= threshold)
    }

    /// Whether the cancellation token is due for a check after `relexed`
    /// tokens.
    pub(crate) fn should_poll(&self, relexed: usize) -> bool {
        relexed % self.poll_interval.max(1) == 0
    }
}
