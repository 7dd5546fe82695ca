//! Edits that do not fit the tree, and recovering from them.

use std::sync::Arc;
use std::time::Duration;

use treesync::{
    Document, Edit, SyncConfig, SyncError, SyncEvent, SyncHandle, SyncState, TextRange,
    TextSize, attach,
};

use crate::helpers::lexicons::{Brackets, Gated};
use crate::helpers::trees::parse;

const TIMEOUT: Duration = Duration::from_secs(10);

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

fn standalone(text: &str) -> SyncHandle<Brackets> {
    SyncHandle::new(Brackets::default(), text, SyncConfig::default()).expect("start")
}

#[test]
fn test_edit_past_end_fails_the_engine() {
    let sync = standalone("abc");
    let (_, events) = sync.events();

    sync.submit(Edit::delete(range(5, 9))).expect("submit");
    let err = sync.wait_timeout(TIMEOUT).expect_err("desync");

    assert!(matches!(err, SyncError::Desync { .. }));
    assert_eq!(sync.state(), SyncState::Failed);
    assert!(matches!(sync.error(), Some(SyncError::Desync { .. })));
    assert!(
        events
            .try_iter()
            .any(|event| matches!(event, SyncEvent::Desynced(SyncError::Desync { .. })))
    );
    assert_eq!(String::from(sync.current().text()), "abc");
}

#[test]
fn test_edits_after_desync_are_dropped() {
    let sync = standalone("abc");
    sync.submit(Edit::delete(range(5, 9))).expect("submit");
    sync.submit(Edit::insert(TextSize::from(0), "x")).expect("submit");

    assert!(sync.wait_timeout(TIMEOUT).is_err());
    assert_eq!(String::from(sync.current().text()), "abc");
    assert_eq!(sync.state(), SyncState::Failed);
}

#[test]
fn test_edit_splitting_a_character_fails_the_engine() {
    let sync = standalone("añb");
    sync.submit(Edit::insert(TextSize::from(2), "x")).expect("submit");

    let err = sync.wait_timeout(TIMEOUT).expect_err("desync");
    assert!(matches!(err, SyncError::Desync { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_work_before_the_bad_edit_is_published() {
    let sync = standalone("abc");
    let (_, events) = sync.events();

    sync.submit(Edit::insert(TextSize::from(3), " d")).expect("submit");
    sync.submit(Edit::delete(range(10, 12))).expect("submit");
    assert!(sync.wait_timeout(TIMEOUT).is_err());

    assert_eq!(String::from(sync.current().text()), "abc d");
    assert!(
        events
            .try_iter()
            .any(|event| matches!(event, SyncEvent::Updated(update) if update.edits == 1))
    );
}

#[test]
fn test_reinitialize_standalone_reparses_last_text() {
    let sync = standalone("abc");
    sync.submit(Edit::delete(range(5, 9))).expect("submit");
    assert!(sync.wait_timeout(TIMEOUT).is_err());

    sync.reinitialize().expect("reinitialize");
    let tree = sync.wait_timeout(TIMEOUT).expect("recovered");
    assert_eq!(sync.state(), SyncState::Idle);
    assert!(sync.error().is_none());
    assert!(tree.same_structure(&parse(&Brackets::default(), "abc")));

    sync.submit(Edit::insert(TextSize::from(0), "x")).expect("submit");
    let tree = sync.wait_timeout(TIMEOUT).expect("synced");
    assert_eq!(String::from(tree.text()), "xabc");
}

#[test]
fn test_reinitialize_standalone_keeps_queued_edits() {
    let lexicon = Gated::default();
    let gate = Arc::clone(&lexicon.gate);
    let sync = SyncHandle::new(lexicon, "abc", SyncConfig::default()).expect("start");

    // Neither command is built before both are queued.
    gate.close();
    sync.submit(Edit::insert(TextSize::from(3), " d")).expect("submit");
    sync.reinitialize().expect("reinitialize");
    gate.open();

    let tree = sync.wait_timeout(TIMEOUT).expect("synced");
    assert_eq!(String::from(tree.text()), "abc d");
    assert!(tree.same_structure(&parse(&Gated::default(), "abc d")));
}

#[test]
fn test_reinitialize_attached_reads_the_document() {
    let doc = Document::new("aa [bb]");
    let sync = attach(&doc, Brackets::default()).expect("attach");

    // An edit the document never saw puts the engine out of step.
    sync.submit(Edit::delete(range(40, 41))).expect("submit");
    assert!(sync.wait_timeout(TIMEOUT).is_err());

    doc.insert(TextSize::from(7), " cc").expect("insert");
    sync.reinitialize().expect("reinitialize");
    let tree = sync.wait_timeout(TIMEOUT).expect("recovered");

    assert_eq!(String::from(tree.text()), "aa [bb] cc");
    assert!(tree.same_structure(&parse(&Brackets::default(), "aa [bb] cc")));
    assert_eq!(sync.state(), SyncState::Idle);
}
