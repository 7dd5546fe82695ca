//! Scheduler state shared between the handle and the worker thread.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, SyncError};

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Nothing to do; the published tree matches every edit seen.
    Idle,
    /// A build is running.
    Building,
    /// A newer edit arrived; the running build is being abandoned.
    Superseded,
    /// A completed build is being installed and announced.
    Publishing,
    /// An edit did not fit the tree; edits are dropped until re-initialized.
    Failed,
    /// The worker has stopped.
    Detached,
}

struct Inner {
    state: SyncState,
    /// Commands handed to the worker
    submitted: u64,
    /// Commands whose effect is published or that were dropped
    processed: u64,
    error: Option<SyncError>,
}

/// State, progress counters and the last fatal error, with a condition
/// variable for waiters.
pub(crate) struct Status {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl Status {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SyncState::Idle,
                submitted: 0,
                processed: 0,
                error: None,
            }),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> SyncState {
        self.inner.lock().state
    }

    /// Move to `state` unless the scheduler has failed or stopped.
    pub(crate) fn enter(&self, state: SyncState) {
        let mut inner = self.inner.lock();
        if !matches!(inner.state, SyncState::Failed | SyncState::Detached) {
            inner.state = state;
        }
    }

    /// Count one more submitted command and return the running total.
    pub(crate) fn submit(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.submitted += 1;
        inner.submitted
    }

    pub(crate) fn submitted(&self) -> u64 {
        self.inner.lock().submitted
    }

    /// Record `count` commands as done and wake waiters.
    pub(crate) fn complete(&self, count: u64) {
        let mut inner = self.inner.lock();
        inner.processed += count;
        if inner.processed >= inner.submitted && inner.state != SyncState::Detached {
            inner.state = if inner.error.is_some() {
                SyncState::Failed
            } else {
                SyncState::Idle
            };
        }
        self.changed.notify_all();
    }

    pub(crate) fn fail(&self, error: SyncError) {
        let mut inner = self.inner.lock();
        inner.error = Some(error);
        if inner.state != SyncState::Detached {
            inner.state = SyncState::Failed;
        }
        self.changed.notify_all();
    }

    /// Clear a previous failure after a successful full reparse.
    pub(crate) fn recover(&self) {
        let mut inner = self.inner.lock();
        inner.error = None;
        if inner.state == SyncState::Failed {
            inner.state = SyncState::Building;
        }
    }

    pub(crate) fn error(&self) -> Option<SyncError> {
        self.inner.lock().error.clone()
    }

    pub(crate) fn detach(&self) {
        let mut inner = self.inner.lock();
        inner.state = SyncState::Detached;
        self.changed.notify_all();
    }

    /// Block until `target` commands are processed, the worker stops, or
    /// `deadline` passes.
    pub(crate) fn wait_for(&self, target: u64, deadline: Option<Instant>) -> Result<()> {
        let mut inner = self.inner.lock();
        loop {
            if inner.processed >= target {
                return Ok(());
            }
            if inner.state == SyncState::Detached {
                return Err(match &inner.error {
                    Some(SyncError::WorkerPanicked) => SyncError::WorkerPanicked,
                    _ => SyncError::Detached,
                });
            }
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut inner, deadline).timed_out()
                        && inner.processed < target
                    {
                        return Err(SyncError::Timeout);
                    }
                }
                None => self.changed.wait(&mut inner),
            }
        }
    }
}
