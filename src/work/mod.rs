//! Change scheduling: the worker thread and the handle that owns it.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──edit──▶ Building ──done, queue empty──▶ Publishing ──▶ Idle
//!                  │  ▲
//!           newer edit  └── restart or resume
//!                  ▼  │
//!               Superseded
//! ```
//!
//! A build interrupted by a newer edit publishes nothing. Only a pass that
//! finds the queue empty when it completes publishes, so readers see one tree
//! covering every edit of a burst, and published trees follow edit order. An
//! edit that does not fit the tree moves the engine to
//! [`SyncState::Failed`] until [`SyncHandle::reinitialize`] is called.
//!
//! ## Usage
//!
//! ```ignore
//! let doc = Document::new("fn main() {}");
//! let sync = attach(&doc, CLike)?;
//! let id = sync.subscribe(|update| repaint(update.changed));
//!
//! doc.insert(TextSize::from(11), " x ")?;
//! let tree = sync.wait()?;
//! ```

mod config;
mod handle;
mod state;
mod subscription;
mod worker;

pub use config::{SupersedePolicy, SyncConfig};
pub use handle::{SyncHandle, attach, attach_with_config};
pub use state::SyncState;
pub use subscription::{SubscriptionId, SyncEvent, TreeUpdate};
