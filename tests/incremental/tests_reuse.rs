//! Tokens outside the changed span are carried over from the previous tree.

use std::sync::Arc;

use proptest::prelude::*;
use rstest::rstest;
use tokio_util::sync::CancellationToken;
use treesync::{BuildConfig, Edit, Outcome, TextRange, TextSize, Tree, apply_edit};

use crate::helpers::edits::{EditSeed, edit_seeds};
use crate::helpers::lexicons::Brackets;
use crate::helpers::trees;

fn parse(text: &str) -> Tree<Brackets> {
    trees::parse(&Brackets::default(), text)
}

/// Check that the prefix before and the suffix after the changed span are
/// the old token nodes themselves, the suffix shifted by the edit's delta.
fn check_reuse(text: &str, seed: &EditSeed) -> Result<(), TestCaseError> {
    let before = parse(text);
    let edit = seed.resolve(text);
    let outcome = apply_edit(
        &Brackets::default(),
        &before,
        &edit,
        &BuildConfig::default(),
        &CancellationToken::new(),
    )
    .map_err(|err| TestCaseError::fail(err.to_string()))?;
    let Outcome::Rebuilt(reparse) = outcome else {
        return Ok(());
    };
    let old: Vec<_> = before.tokens().collect();
    let delta = edit.delta();
    let shift = |offset: TextSize| TextSize::from((i64::from(u32::from(offset)) - delta) as u32);

    for token in reparse.tree.tokens() {
        let range = token.range;
        let old_range = if range.end() <= reparse.changed.start() {
            range
        } else if range.start() >= reparse.changed.end() {
            TextRange::new(shift(range.start()), shift(range.end()))
        } else {
            continue;
        };
        let shared = old.iter().find(|old| old.range == old_range);
        prop_assert!(
            shared.is_some_and(|old| Arc::ptr_eq(old.node, token.node)),
            "token {:?} {:?} is not shared with the old tree",
            token.kind(),
            range
        );
    }
    Ok(())
}

proptest! {
    #[test]
    fn test_tokens_outside_changed_span_are_reused(
        text in "[ab1 <'>\\]\\[]{1,40}",
        seeds in edit_seeds("[ab1 <'>\\]\\[]{0,4}", 2),
    ) {
        for seed in &seeds {
            check_reuse(&text, seed)?;
        }
    }
}

#[rstest]
#[case::inside_list("[aa bb] cc [dd]", 3, "x", 1)]
#[case::inside_tag("<a 1> <b 2>", 8, "c", 1)]
#[case::appended_word("aa bb cc", 8, "d", 1)]
fn test_local_edit_relexes_one_token(
    #[case] text: &str,
    #[case] at: u32,
    #[case] inserted: &str,
    #[case] relexed: usize,
) {
    let before = parse(text);
    let reparse = apply_edit(
        &Brackets::default(),
        &before,
        &Edit::insert(TextSize::from(at), inserted),
        &BuildConfig::default(),
        &CancellationToken::new(),
    )
    .expect("edit fits")
    .into_reparse()
    .expect("rebuilt");
    assert_eq!(reparse.relexed, relexed);
}

#[test]
fn test_opening_quote_relexes_to_closing_quote() {
    let text = "aa bb 'cc dd' ee";
    let before = parse(text);
    let reparse = apply_edit(
        &Brackets::default(),
        &before,
        &Edit::insert(TextSize::from(4), "'"),
        &BuildConfig::default(),
        &CancellationToken::new(),
    )
    .expect("edit fits")
    .into_reparse()
    .expect("rebuilt");

    // Everything after the new quote flips between quoted and unquoted.
    assert_eq!(reparse.changed.start(), TextSize::from(3));
    assert_eq!(reparse.changed.end(), reparse.tree.len());
    assert_eq!(reparse.reused_from, None);
}
