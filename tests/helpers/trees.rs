//! Reference trees built from scratch.

use ropey::Rope;
use tokio_util::sync::CancellationToken;
use treesync::{BuildConfig, Lexicon, Tree, full_parse};

pub fn parse<L: Lexicon>(lexicon: &L, text: &str) -> Tree<L> {
    parse_with(lexicon, text, &BuildConfig::default())
}

pub fn parse_with<L: Lexicon>(lexicon: &L, text: &str, config: &BuildConfig) -> Tree<L> {
    full_parse(lexicon, Rope::from_str(text), config, &CancellationToken::new())
        .expect("full parse")
        .into_reparse()
        .expect("not cancelled")
        .tree
}
