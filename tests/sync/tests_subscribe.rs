//! Subscriptions and event channels.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use treesync::{Document, Edit, SyncEvent, TextRange, TextSize, attach};

use crate::helpers::lexicons::Brackets;

const TIMEOUT: Duration = Duration::from_secs(10);

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

#[test]
fn test_each_settled_edit_is_one_update() {
    let doc = Document::new("aa bb cc");
    let sync = attach(&doc, Brackets::default()).expect("attach");
    let updates = Arc::new(Mutex::new(Vec::new()));
    {
        let updates = Arc::clone(&updates);
        sync.subscribe(move |update| {
            updates
                .lock()
                .push((update.tree.version(), update.changed, update.edits));
        });
    }

    doc.insert(TextSize::from(4), "x").expect("insert");
    sync.wait_timeout(TIMEOUT).expect("synced");
    doc.remove(range(0, 3)).expect("remove");
    sync.wait_timeout(TIMEOUT).expect("synced");

    let updates = updates.lock();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0], (1, range(3, 6), 1));
    assert_eq!(updates[1].0, 2);
    assert_eq!(updates[1].1.start(), TextSize::from(0));
}

#[test]
fn test_channel_sees_started_then_updated() {
    let doc = Document::new("aa");
    let sync = attach(&doc, Brackets::default()).expect("attach");
    let (_, events) = sync.events();

    doc.insert(TextSize::from(2), " [b]").expect("insert");
    let tree = sync.wait_timeout(TIMEOUT).expect("synced");

    let events: Vec<_> = events.try_iter().collect();
    assert_eq!(events.len(), 2, "{events:?}");
    assert!(matches!(events[0], SyncEvent::Started));
    match &events[1] {
        SyncEvent::Updated(update) => {
            assert!(Arc::ptr_eq(&update.tree, &tree));
            assert_eq!(update.edits, 1);
        }
        other => panic!("expected an update, got {other:?}"),
    }
}

#[test]
fn test_noop_edits_publish_nothing() {
    let doc = Document::new("aa bb");
    let sync = attach(&doc, Brackets::default()).expect("attach");
    let (_, events) = sync.events();

    doc.insert(TextSize::from(2), "").expect("insert");
    doc.remove(range(1, 1)).expect("remove");
    sync.submit(Edit::insert(TextSize::from(0), "")).expect("submit");

    let tree = sync.wait_timeout(TIMEOUT).expect("synced");
    assert_eq!(tree.version(), 0);
    assert!(events.try_recv().is_err());
}

#[test]
fn test_unsubscribed_callback_is_not_called() {
    let doc = Document::new("aa");
    let sync = attach(&doc, Brackets::default()).expect("attach");
    let calls = Arc::new(Mutex::new(0));
    let id = {
        let calls = Arc::clone(&calls);
        sync.subscribe(move |_| *calls.lock() += 1)
    };

    doc.insert(TextSize::from(0), "b").expect("insert");
    sync.wait_timeout(TIMEOUT).expect("synced");
    assert!(sync.unsubscribe(id));
    assert!(!sync.unsubscribe(id));

    doc.insert(TextSize::from(0), "c").expect("insert");
    sync.wait_timeout(TIMEOUT).expect("synced");
    assert_eq!(*calls.lock(), 1);
}

#[test]
fn test_dropped_receiver_does_not_stall_the_engine() {
    let doc = Document::new("aa");
    let sync = attach(&doc, Brackets::default()).expect("attach");
    let (_, events) = sync.events();
    drop(events);

    for i in 0..5u32 {
        doc.insert(TextSize::from(i), "x").expect("insert");
        sync.wait_timeout(TIMEOUT).expect("synced");
    }
    assert_eq!(String::from(sync.current().text()), "xxxxxaa");
}
