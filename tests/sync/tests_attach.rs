//! Following a document.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use treesync::{
    Document, Edit, SyncConfig, SyncError, SyncHandle, SyncState, TextRange, TextSize, attach,
    attach_with_config,
};

use crate::helpers::lexicons::Brackets;
use crate::helpers::trees::parse;

const TIMEOUT: Duration = Duration::from_secs(10);

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

fn assert_synced(sync: &SyncHandle<Brackets>, doc: &Document) {
    let tree = sync.wait_timeout(TIMEOUT).expect("synced");
    let text = String::from(doc.text());
    assert_eq!(String::from(tree.text()), text);
    let expected = parse(&Brackets::default(), &text);
    assert!(
        tree.same_structure(&expected),
        "engine:\n{}\nfull:\n{}",
        tree.debug_dump(),
        expected.debug_dump()
    );
}

#[test]
fn test_attach_parses_initial_text() {
    let doc = Document::new("aa [bb] cc");
    let sync = attach(&doc, Brackets::default()).expect("attach");

    let tree = sync.current();
    assert_eq!(tree.version(), 0);
    assert!(tree.same_structure(&parse(&Brackets::default(), "aa [bb] cc")));
    assert_eq!(sync.state(), SyncState::Idle);
}

#[test]
fn test_attach_to_empty_document() {
    let doc = Document::default();
    let sync = attach(&doc, Brackets::default()).expect("attach");
    assert!(sync.current().is_empty());

    doc.insert(TextSize::from(0), "[a]").expect("insert");
    assert_synced(&sync, &doc);
}

#[test]
fn test_document_edits_reach_the_tree() {
    let doc = Document::new("aa [bb] cc");
    let sync = attach(&doc, Brackets::default()).expect("attach");

    doc.insert(TextSize::from(4), "<x ").expect("insert");
    doc.remove(range(0, 3)).expect("remove");
    doc.replace(range(0, 1), "'").expect("replace");

    assert_synced(&sync, &doc);
    assert!(sync.current().version() >= 1);
    assert_eq!(sync.state(), SyncState::Idle);
}

#[test]
fn test_edits_from_another_thread_are_applied_in_order() {
    let doc = Document::new("start");
    let sync = attach(&doc, Brackets::default()).expect("attach");
    let versions = Arc::new(Mutex::new(Vec::new()));
    let edits = Arc::new(Mutex::new(0usize));
    {
        let versions = Arc::clone(&versions);
        let edits = Arc::clone(&edits);
        sync.subscribe(move |update| {
            versions.lock().push(update.tree.version());
            *edits.lock() += update.edits;
        });
    }

    let writer = {
        let doc = doc.clone();
        std::thread::spawn(move || {
            let pieces = ["a", "1", " ", "[", "]", "<", ">", "'"];
            for i in 0..200u32 {
                let len = u32::from(doc.len());
                let at = TextSize::from((i * 7) % (len + 1));
                doc.insert(at, pieces[i as usize % pieces.len()]).expect("insert");
            }
        })
    };
    writer.join().expect("writer");

    assert_synced(&sync, &doc);
    let versions = versions.lock();
    assert!(!versions.is_empty());
    assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(*edits.lock(), 200);
}

#[test]
fn test_batch_edits_are_forwarded_back_to_front() {
    let doc = Document::new("aa bb cc");
    let sync = attach(&doc, Brackets::default()).expect("attach");

    doc.apply_batch([
        Edit::insert(TextSize::from(0), "["),
        Edit::insert(TextSize::from(8), "]"),
        Edit::replace(range(3, 5), "<1>"),
    ])
    .expect("batch");

    assert_eq!(String::from(doc.text()), "[aa <1> cc]");
    assert_synced(&sync, &doc);
}

#[test]
fn test_rejected_batch_changes_nothing() {
    let doc = Document::new("aa bb cc");
    let sync = attach(&doc, Brackets::default()).expect("attach");

    let err = doc
        .apply_batch([Edit::delete(range(0, 4)), Edit::delete(range(3, 6))])
        .expect_err("overlapping");
    assert!(matches!(err, SyncError::Overlap { .. }));

    assert_eq!(String::from(doc.text()), "aa bb cc");
    let tree = sync.wait_timeout(TIMEOUT).expect("synced");
    assert_eq!(tree.version(), 0);
}

#[test]
fn test_set_lexicon_reparses_current_text() {
    let text = "a 'b [c' d]";
    let doc = Document::new(text);
    let sync = attach(&doc, Brackets::default()).expect("attach");
    assert!(sync.root_lexicon().quotes);

    sync.set_lexicon(Brackets { quotes: false }).expect("relex");
    // The new lexicon is reported before the reparse finishes.
    assert!(!sync.root_lexicon().quotes);
    let tree = sync.wait_timeout(TIMEOUT).expect("synced");

    assert!(tree.same_structure(&parse(&Brackets { quotes: false }, text)));
    assert!(!tree.same_structure(&parse(&Brackets::default(), text)));

    // Later edits keep using the new lexicon.
    doc.insert(TextSize::from(0), "'").expect("insert");
    let tree = sync.wait_timeout(TIMEOUT).expect("synced");
    let text = String::from(doc.text());
    assert!(tree.same_structure(&parse(&Brackets { quotes: false }, &text)));
}

#[test]
fn test_worker_runs_on_named_thread() {
    let doc = Document::new("aa");
    let config = SyncConfig::default().with_thread_name("highlighter");
    let sync = attach_with_config(&doc, Brackets::default(), config).expect("attach");
    let seen = Arc::new(Mutex::new(None));
    {
        let seen = Arc::clone(&seen);
        sync.subscribe(move |_| {
            *seen.lock() = std::thread::current().name().map(str::to_string);
        });
    }

    doc.insert(TextSize::from(2), " bb").expect("insert");
    sync.wait_timeout(TIMEOUT).expect("synced");
    assert_eq!(seen.lock().as_deref(), Some("highlighter"));
}

#[test]
fn test_detach_stops_following_the_document() {
    let doc = Document::new("aa bb");
    let sync = attach(&doc, Brackets::default()).expect("attach");
    let (_, events) = sync.events();

    sync.detach().expect("detach");
    doc.insert(TextSize::from(0), "cc ").expect("document still editable");

    assert!(matches!(
        events.recv_timeout(TIMEOUT),
        Err(RecvTimeoutError::Disconnected)
    ));
}

#[test]
fn test_standalone_engine_follows_submitted_edits() {
    let sync = SyncHandle::new(Brackets::default(), "aa bb", SyncConfig::default())
        .expect("start");

    sync.submit(Edit::insert(TextSize::from(2), " [x]")).expect("submit");
    let tree = sync.wait_timeout(TIMEOUT).expect("synced");
    assert_eq!(String::from(tree.text()), "aa [x] bb");

    sync.reset("<fresh>").expect("reset");
    let tree = sync.wait_timeout(TIMEOUT).expect("synced");
    assert_eq!(String::from(tree.text()), "<fresh>");
    assert!(tree.same_structure(&parse(&Brackets::default(), "<fresh>")));
}
