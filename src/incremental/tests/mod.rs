
use ropey::Rope;
use tokio_util::sync::CancellationToken;

use super::{BuildConfig, Reparse, apply_edit, full_parse};
use crate::base::Edit;
use crate::lexicon::Lexicon;
use crate::tree::Tree;

fn parse<L: Lexicon>(lexicon: &L, text: &str) -> Tree<L> {
    full_parse(
        lexicon,
        Rope::from_str(text),
        &BuildConfig::default(),
        &CancellationToken::new(),
    )
    .expect("full parse")
    .into_reparse()
    .expect("not cancelled")
    .tree
}

fn rebuild<L: Lexicon>(lexicon: &L, tree: &Tree<L>, edit: &Edit) -> Reparse<L> {
    rebuild_with(lexicon, tree, edit, &BuildConfig::default())
}

fn rebuild_with<L: Lexicon>(
    lexicon: &L,
    tree: &Tree<L>,
    edit: &Edit,
    config: &BuildConfig,
) -> Reparse<L> {
    apply_edit(lexicon, tree, edit, config, &CancellationToken::new())
        .expect("edit fits")
        .into_reparse()
        .expect("rebuilt")
}

/// `text` with `edit` applied, as a plain string.
fn edited(text: &str, edit: &Edit) -> String {
    let mut out = text.to_string();
    let range = edit.removed_range();
    out.replace_range(usize::from(range.start())..usize::from(range.end()), edit.inserted());
    out
}
