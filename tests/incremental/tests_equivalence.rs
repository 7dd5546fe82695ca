//! Random edit scripts: every incremental tree must equal a full parse.

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;
use treesync::lexicon::clike::CLike;
use treesync::{BuildConfig, Lexicon, Outcome, apply_edit};

use crate::helpers::edits::{EditSeed, apply, edit_seeds};
use crate::helpers::lexicons::Brackets;
use crate::helpers::trees::parse_with;

/// Apply every seed in turn, checking the incremental tree after each one.
fn run_script<L: Lexicon>(
    lexicon: &L,
    initial: &str,
    seeds: &[EditSeed],
    config: &BuildConfig,
) -> Result<(), TestCaseError> {
    let mut text = initial.to_string();
    let mut tree = parse_with(lexicon, &text, config);
    for seed in seeds {
        let edit = seed.resolve(&text);
        let outcome = apply_edit(lexicon, &tree, &edit, config, &CancellationToken::new())
            .map_err(|err| TestCaseError::fail(format!("{edit:?} on {text:?}: {err}")))?;
        text = apply(&text, &edit);
        let reparse = match outcome {
            Outcome::Rebuilt(reparse) => reparse,
            Outcome::Unchanged => {
                prop_assert!(edit.is_noop());
                continue;
            }
            Outcome::Cancelled => return Err(TestCaseError::fail("cancelled without request")),
        };

        let expected = parse_with(lexicon, &text, config);
        prop_assert!(
            reparse.tree.same_structure(&expected),
            "after {:?} on {:?}\nincremental:\n{}\nfull:\n{}",
            edit,
            text,
            reparse.tree.debug_dump(),
            expected.debug_dump()
        );
        prop_assert_eq!(String::from(reparse.tree.text()), text.clone());
        prop_assert_eq!(reparse.tree.version(), tree.version() + 1);
        prop_assert!(reparse.changed.end() <= reparse.tree.len());
        tree = reparse.tree;
    }
    Ok(())
}

const BRACKET_TEXT: &str = "[ab1 <>'\\[\\]]{0,40}";
const BRACKET_INSERT: &str = "[ab1 <'>\\]\\[]{0,5}";
const CLIKE_TEXT: &str = "[a-z0-9 {}\"/*\\\\\n;]{0,60}";
const CLIKE_INSERT: &str = "[a-z {}\"/*\\\\\n]{0,6}";

proptest! {
    #[test]
    fn test_brackets_edit_scripts_match_full_parse(
        initial in BRACKET_TEXT,
        seeds in edit_seeds(BRACKET_INSERT, 8),
    ) {
        run_script(&Brackets::default(), &initial, &seeds, &BuildConfig::default())?;
    }

    #[test]
    fn test_brackets_without_quotes_match_full_parse(
        initial in BRACKET_TEXT,
        seeds in edit_seeds(BRACKET_INSERT, 8),
    ) {
        run_script(&Brackets { quotes: false }, &initial, &seeds, &BuildConfig::default())?;
    }

    #[test]
    fn test_clike_edit_scripts_match_full_parse(
        initial in CLIKE_TEXT,
        seeds in edit_seeds(CLIKE_INSERT, 8),
    ) {
        run_script(&CLike, &initial, &seeds, &BuildConfig::default())?;
    }

    #[test]
    fn test_clike_small_window_with_backtrack_matches_full_parse(
        initial in CLIKE_TEXT,
        seeds in edit_seeds(CLIKE_INSERT, 6),
        backtrack in 0usize..4,
    ) {
        let config = BuildConfig::default()
            .with_window(8)
            .with_backtrack(backtrack)
            .with_poll_interval(1);
        run_script(&CLike, &initial, &seeds, &config)?;
    }
}
