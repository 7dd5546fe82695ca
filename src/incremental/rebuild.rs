//! Full and single-edit builds.

use std::sync::Arc;

use ropey::Rope;
use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;

use super::{BuildConfig, Outcome, Preview, Reparse};
use crate::base::{Edit, is_char_boundary, rope_len};
use crate::error::{Result, SyncError};
use crate::lexicon::{Lexicon, Relexer, StateOf};
use crate::tree::{Group, TokenNode, Tokens, Tree, TreeBuilder, path_to_index, token_index_at};

/// How a lexing pass ended.
enum Stop {
    /// Fresh output lined up with the old token at this index.
    Merged(usize),
    End,
    Cancelled,
}

type Builder<L> = TreeBuilder<<L as Lexicon>::Kind, <L as Lexicon>::Context>;

/// Lex tokens into `builder` until `merge` finds a re-merge point or the text
/// runs out. `merge` is asked before every token, including the first.
///
/// `peek` is called once, with the builder and the lex position, as soon as
/// the pass has covered the configured preview threshold.
fn lex_pass<L: Lexicon>(
    builder: &mut Builder<L>,
    relexer: &mut Relexer<'_, L>,
    config: &BuildConfig,
    cancel: &CancellationToken,
    relexed: &mut usize,
    mut merge: impl FnMut(TextSize, &StateOf<L>) -> Option<usize>,
    mut peek: impl FnMut(&Builder<L>, TextSize),
) -> Stop {
    let start = relexer.offset();
    let mut peeked = false;
    loop {
        if let Some(index) = merge(relexer.offset(), relexer.state()) {
            return Stop::Merged(index);
        }
        if config.should_poll(*relexed) && cancel.is_cancelled() {
            return Stop::Cancelled;
        }
        let Some(lexed) = relexer.next() else {
            return Stop::End;
        };
        builder.token(Arc::new(TokenNode::new(
            lexed.kind,
            lexed.range.len(),
            lexed.state,
        )));
        *relexed += 1;
        if !peeked && config.should_peek(start, relexer.offset()) {
            peeked = true;
            peek(&*builder, relexer.offset());
        }
    }
}

/// A preview holding everything `builder` has so far, over the first `end`
/// bytes of `text`.
fn provisional<L: Lexicon>(
    builder: &Builder<L>,
    text: &Rope,
    start: TextSize,
    end: TextSize,
    version: u64,
) -> Preview<L> {
    let end = text.byte_to_char(usize::from(end));
    let tree = Tree::new(Arc::new(builder.snapshot()), Rope::from(text.slice(..end)), version);
    Preview { start, tree }
}

/// Lex `text` from scratch.
///
/// The resulting tree has version 0 and the whole text as changed span.
pub fn full_parse<L: Lexicon>(
    lexicon: &L,
    text: Rope,
    config: &BuildConfig,
    cancel: &CancellationToken,
) -> Result<Outcome<L>> {
    full_parse_with_preview(lexicon, text, config, cancel, |_| {})
}

/// [`full_parse`], handing `preview` a provisional tree once
/// [`BuildConfig::peek_threshold`] bytes have been lexed.
pub fn full_parse_with_preview<L: Lexicon>(
    lexicon: &L,
    text: Rope,
    config: &BuildConfig,
    cancel: &CancellationToken,
    mut preview: impl FnMut(Preview<L>),
) -> Result<Outcome<L>> {
    let len = rope_len(&text).ok_or(SyncError::TooLarge {
        len: text.len_bytes(),
    })?;

    let mut builder = TreeBuilder::new(lexicon.root_context());
    let mut relexed = 0;
    let stop = {
        let mut relexer = Relexer::new(
            lexicon,
            &text,
            TextSize::from(0),
            lexicon.initial_state(),
            config.window,
        );
        let stop = lex_pass(
            &mut builder,
            &mut relexer,
            config,
            cancel,
            &mut relexed,
            |_, _| None,
            |builder, end| preview(provisional(builder, &text, TextSize::from(0), end, 0)),
        );
        if relexer.errors() > 0 {
            tracing::trace!(errors = relexer.errors(), "recovered from grammar errors");
        }
        stop
    };
    if matches!(stop, Stop::Cancelled) {
        return Ok(Outcome::Cancelled);
    }

    tracing::trace!(len = u32::from(len), tokens = relexed, "full parse");
    let tree = Tree::new(Arc::new(builder.finish()), text, 0);
    Ok(Outcome::Rebuilt(Reparse {
        tree,
        changed: TextRange::up_to(len),
        relexed,
        reused_from: None,
    }))
}

/// Derive the tree for the text after `edit` from `prev`.
///
/// Only the tokens from the anchor to the first stable re-merge point are
/// re-lexed. Everything left and right of them is shared with `prev`.
pub fn apply_edit<L: Lexicon>(
    lexicon: &L,
    prev: &Tree<L>,
    edit: &Edit,
    config: &BuildConfig,
    cancel: &CancellationToken,
) -> Result<Outcome<L>> {
    apply_edit_with_preview(lexicon, prev, edit, config, cancel, |_| {})
}

/// [`apply_edit`], handing `preview` a provisional tree once
/// [`BuildConfig::peek_threshold`] bytes have been re-lexed. The preview
/// starts at the anchor and ends at the last re-lexed token.
pub fn apply_edit_with_preview<L: Lexicon>(
    lexicon: &L,
    prev: &Tree<L>,
    edit: &Edit,
    config: &BuildConfig,
    cancel: &CancellationToken,
    mut preview: impl FnMut(Preview<L>),
) -> Result<Outcome<L>> {
    if edit.is_noop() {
        return Ok(Outcome::Unchanged);
    }
    let text = edited_text(prev, edit)?;
    let root = prev.root();

    let anchor = anchor_index(lexicon, root, edit.position()).saturating_sub(config.backtrack);
    let (anchor_start, anchor_state) = match Tokens::at_index(root, anchor).next() {
        Some(token) => (token.range.start(), token.state().clone()),
        None => (TextSize::from(0), lexicon.initial_state()),
    };

    let mut builder = left_fringe::<L>(root, anchor);

    // Re-merge is only possible once the re-lex position has passed the
    // inserted text; from there on, new offsets map back to old ones.
    let inserted_end = edit.inserted_range().end();
    let shift_back = |offset: TextSize| offset - edit.inserted_len() + edit.removed_len();
    let mut old = Tokens::at_index(root, anchor).peekable();
    let mut old_index = anchor;

    let version = prev.version() + 1;
    let mut relexed = 0;
    let (stop, merge_offset) = {
        let mut relexer = Relexer::new(lexicon, &text, anchor_start, anchor_state, config.window);
        let stop = lex_pass(
            &mut builder,
            &mut relexer,
            config,
            cancel,
            &mut relexed,
            |offset, state| {
                if offset < inserted_end {
                    return None;
                }
                let old_offset = shift_back(offset);
                while old.next_if(|t| t.range.start() < old_offset).is_some() {
                    old_index += 1;
                }
                let candidate = old.peek()?;
                (candidate.range.start() == old_offset && candidate.state() == state)
                    .then_some(old_index)
            },
            |builder, end| preview(provisional(builder, &text, anchor_start, end, version)),
        );
        (stop, relexer.offset())
    };

    let reused_from = match stop {
        Stop::Cancelled => return Ok(Outcome::Cancelled),
        Stop::End => None,
        Stop::Merged(index) => {
            right_fringe::<L>(&mut builder, root, index);
            Some(index)
        }
    };
    let changed = TextRange::new(anchor_start, merge_offset);
    tracing::trace!(
        ?edit,
        anchor,
        ?changed,
        relexed,
        ?reused_from,
        "incremental rebuild"
    );

    let tree = Tree::new(Arc::new(builder.finish()), text, version);
    Ok(Outcome::Rebuilt(Reparse {
        tree,
        changed,
        relexed,
        reused_from,
    }))
}

/// The text of `prev` with `edit` applied, or a desync error when the edit
/// does not fit that text.
fn edited_text<L: Lexicon>(prev: &Tree<L>, edit: &Edit) -> Result<Rope> {
    let text = prev.text();
    let len = prev.len();
    let removed = edit.removed_range();
    if removed.end() > len
        || !is_char_boundary(text, removed.start())
        || !is_char_boundary(text, removed.end())
    {
        return Err(SyncError::desync(edit, len));
    }
    let new_len = u64::from(u32::from(len)) + u64::from(u32::from(edit.inserted_len()))
        - u64::from(u32::from(edit.removed_len()));
    if new_len > u64::from(u32::MAX) {
        return Err(SyncError::TooLarge {
            len: new_len as usize,
        });
    }

    let mut text = text.clone();
    let start = text.byte_to_char(usize::from(removed.start()));
    let end = text.byte_to_char(usize::from(removed.end()));
    text.remove(start..end);
    text.insert(start, edit.inserted());
    Ok(text)
}

/// Index of the first token whose end plus the lexicon's lookahead passes
/// `position`.
fn anchor_index<L: Lexicon>(lexicon: &L, root: &Group<L>, position: TextSize) -> usize {
    let lookahead = lexicon.lookahead().max(1);
    let reach = (u64::from(u32::from(position)) + 1).saturating_sub(lookahead as u64);
    if reach == 0 {
        return 0;
    }
    // The first token ending at or after `reach` is the one containing the
    // byte right before it.
    let last = TextSize::from((reach - 1) as u32);
    match token_index_at(root, last) {
        Some((index, _)) => index,
        None => root.token_count().saturating_sub(1),
    }
}

/// A builder holding every element left of the token at `anchor`, with the
/// groups on the path to it still open.
fn left_fringe<L: Lexicon>(root: &Group<L>, anchor: usize) -> Builder<L> {
    let path = path_to_index(root, anchor);
    let Some((first, rest)) = path.split_first() else {
        return TreeBuilder::new(root.context().clone());
    };
    let open = rest
        .iter()
        .map(|step| {
            (
                step.group.context().clone(),
                step.group.children()[..step.index].to_vec(),
            )
        })
        .collect();
    TreeBuilder::with_open_groups(
        (
            first.group.context().clone(),
            first.group.children()[..first.index].to_vec(),
        ),
        open,
    )
}

/// Push every old element from the token at `index` to the end, sharing whole
/// subtrees wherever the path allows.
fn right_fringe<L: Lexicon>(
    builder: &mut Builder<L>,
    root: &Group<L>,
    index: usize,
) {
    let path = path_to_index(root, index);
    let Some(deepest) = path.len().checked_sub(1) else {
        return;
    };
    let contexts: Vec<L::Context> = path[1..]
        .iter()
        .map(|step| step.group.context().clone())
        .collect();

    // The deepest group keeps the token itself; every group above resumes
    // after the child that led down.
    for depth in (0..=deepest).rev() {
        let step = &path[depth];
        let skip = if depth == deepest { step.index } else { step.index + 1 };
        let parents = &contexts[..depth];
        for element in &step.group.children()[skip..] {
            builder.element(element.clone(), parents);
        }
    }
}
