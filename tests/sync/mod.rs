//! Synchronization engine tests
//!
//! Tests for:
//! - Attaching to a document and following its edits
//! - Subscriptions and event channels
//! - Desync and re-initialization
//! - Supersession of in-flight builds

pub mod tests_attach;
pub mod tests_desync;
pub mod tests_subscribe;
