//! Status publication
//!
//! A single published snapshot behind a blocking mutex. Publishing
//! replaces it wholesale, so a reader sees either the previous or the next
//! snapshot and never a mix of both.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use super::snapshot::StatusSnapshot;

/// Holder of the latest published snapshot
pub struct StatusReporter<M: RawMutex> {
    published: Mutex<M, RefCell<StatusSnapshot>>,
    /// Raised with the snapshot time on every publish
    updated: Signal<M, u64>,
}

impl<M: RawMutex> Default for StatusReporter<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> StatusReporter<M> {
    /// Create a reporter holding an idle snapshot
    pub fn new() -> Self {
        Self {
            published: Mutex::new(RefCell::new(StatusSnapshot::idle(0))),
            updated: Signal::new(),
        }
    }

    /// Replace the published snapshot
    pub fn publish(&self, snapshot: StatusSnapshot) {
        let taken_at = snapshot.taken_at;
        self.published.lock(|cell| {
            *cell.borrow_mut() = snapshot;
        });
        self.updated.signal(taken_at);
    }

    /// Copy of the latest published snapshot
    pub fn snapshot(&self) -> StatusSnapshot {
        self.published.lock(|cell| cell.borrow().clone())
    }

    /// Whether a snapshot was published since the last wait
    pub fn has_update(&self) -> bool {
        self.updated.signaled()
    }

    /// Wait for the next publish, returning its snapshot time
    pub async fn wait_update(&self) -> u64 {
        self.updated.wait().await
    }
}
