//! Snapshot coordination across partition tasks
//!
//! Exactly one bucket execution per read runs without a point-in-time value.
//! The timestamp its response carries is published once and every other
//! execution binds it verbatim.
//!
//! # Protocol
//!
//! 1. A bucket execution calls [`SnapshotCoordinator::acquire`]
//! 2. If a timestamp is published it gets [`SnapshotLease::Bound`]
//! 3. If nobody holds the establishing claim it gets
//!    [`SnapshotLease::Establish`] and must call [`EstablishGuard::publish`]
//! 4. Otherwise it blocks on the condition variable until publication,
//!    claim release or cancellation
//!
//! A guard dropped without publishing releases the claim and wakes the
//! waiters, so a failed establishing call hands the role to the next one.

use std::sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError};

use uuid::Uuid;

use crate::executor::{ReadError, ReadResult};
use crate::observability::{log_event_with_fields, Event};

use super::cancel::CancelToken;
use super::timestamp::SnapshotTimestamp;

/// Lifecycle of one read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// No bucket has reached execution yet
    Unstarted,
    /// One execution holds the establishing claim
    EstablishingSnapshot,
    /// Timestamp published, no bucket bound to it yet
    SnapshotReady,
    /// Buckets are executing at the published timestamp
    Draining,
    /// Every partition finished
    Done,
    /// Read cancelled by the host
    Cancelled,
}

impl ReadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadState::Unstarted => "UNSTARTED",
            ReadState::EstablishingSnapshot => "ESTABLISHING_SNAPSHOT",
            ReadState::SnapshotReady => "SNAPSHOT_READY",
            ReadState::Draining => "DRAINING",
            ReadState::Done => "DONE",
            ReadState::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug)]
struct CoordinatorInner {
    /// Some execution currently holds the establishing claim
    claimed: bool,
    /// Bound leases handed out after publication
    bound_executions: u64,
    /// Per-partition completion
    finished: Vec<bool>,
}

/// Set-once snapshot cell shared by every partition task of one read.
#[derive(Debug)]
pub struct SnapshotCoordinator {
    read_id: Uuid,
    timestamp: OnceLock<SnapshotTimestamp>,
    inner: Mutex<CoordinatorInner>,
    changed: Condvar,
    cancel: CancelToken,
}

/// What a bucket execution must do with respect to the snapshot
#[derive(Debug)]
pub enum SnapshotLease<'a> {
    /// Run without a point-in-time value and publish the server's timestamp
    Establish(EstablishGuard<'a>),
    /// Run at this timestamp
    Bound {
        timestamp: SnapshotTimestamp,
        /// The execution blocked before the timestamp was available
        waited: bool,
    },
}

impl SnapshotCoordinator {
    pub fn new(read_id: Uuid, partition_count: usize) -> Self {
        Self {
            read_id,
            timestamp: OnceLock::new(),
            inner: Mutex::new(CoordinatorInner {
                claimed: false,
                bound_executions: 0,
                finished: vec![false; partition_count],
            }),
            changed: Condvar::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn read_id(&self) -> Uuid {
        self.read_id
    }

    /// Returns the published timestamp, if any
    pub fn timestamp(&self) -> Option<&SnapshotTimestamp> {
        self.timestamp.get()
    }

    /// Returns the token polled by in-flight remote calls
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels the read and wakes every waiter.
    ///
    /// Cancellation must go through here rather than through a cloned token,
    /// otherwise blocked waiters are not woken.
    pub fn cancel(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        // Taking the lock orders the flag before any waiter's next check
        drop(self.lock());
        self.changed.notify_all();

        let read_id = self.read_id.to_string();
        log_event_with_fields(Event::ReadCancelled, &[("read_id", read_id.as_str())]);
    }

    /// Decides how the calling bucket execution relates to the snapshot.
    ///
    /// Blocks while another execution holds the establishing claim.
    pub fn acquire(&self) -> ReadResult<SnapshotLease<'_>> {
        if self.cancel.is_cancelled() {
            return Err(ReadError::Cancelled);
        }

        let mut inner = self.lock();
        let mut waited = false;

        loop {
            if self.cancel.is_cancelled() {
                return Err(ReadError::Cancelled);
            }

            if let Some(ts) = self.timestamp.get() {
                inner.bound_executions += 1;
                return Ok(SnapshotLease::Bound {
                    timestamp: ts.clone(),
                    waited,
                });
            }

            if !inner.claimed {
                inner.claimed = true;
                drop(inner);

                let read_id = self.read_id.to_string();
                log_event_with_fields(Event::SnapshotClaimed, &[("read_id", read_id.as_str())]);

                return Ok(SnapshotLease::Establish(EstablishGuard {
                    coordinator: self,
                    published: false,
                }));
            }

            waited = true;
            inner = self
                .changed
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Records that a partition task drained all of its buckets.
    ///
    /// Returns true once every partition has finished.
    pub fn mark_partition_done(&self, index: usize) -> bool {
        let mut inner = self.lock();
        if let Some(slot) = inner.finished.get_mut(index) {
            *slot = true;
        }
        inner.finished.iter().all(|done| *done)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ReadState {
        if self.cancel.is_cancelled() {
            return ReadState::Cancelled;
        }

        let inner = self.lock();
        if !inner.finished.is_empty() && inner.finished.iter().all(|done| *done) {
            return ReadState::Done;
        }

        match (self.timestamp.get(), inner.claimed) {
            (Some(_), _) if inner.bound_executions > 0 => ReadState::Draining,
            (Some(_), _) => ReadState::SnapshotReady,
            (None, true) => ReadState::EstablishingSnapshot,
            (None, false) => ReadState::Unstarted,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The establishing claim held by one bucket execution.
///
/// Dropping it without publishing releases the claim.
#[derive(Debug)]
pub struct EstablishGuard<'a> {
    coordinator: &'a SnapshotCoordinator,
    published: bool,
}

impl EstablishGuard<'_> {
    /// Publishes the server's timestamp and wakes every waiter.
    ///
    /// Returns the published value.
    pub fn publish(mut self, timestamp: SnapshotTimestamp) -> SnapshotTimestamp {
        let coordinator = self.coordinator;
        {
            let mut inner = coordinator.lock();
            // The claim is exclusive, so the cell is still empty here
            let _ = coordinator.timestamp.set(timestamp.clone());
            inner.claimed = false;
        }
        self.published = true;
        coordinator.changed.notify_all();

        let published = coordinator.timestamp.get().cloned().unwrap_or(timestamp);

        let read_id = coordinator.read_id.to_string();
        log_event_with_fields(
            Event::SnapshotEstablished,
            &[("read_id", read_id.as_str()), ("timestamp", published.as_str())],
        );

        published
    }
}

impl Drop for EstablishGuard<'_> {
    fn drop(&mut self) {
        if self.published {
            return;
        }

        let coordinator = self.coordinator;
        coordinator.lock().claimed = false;
        coordinator.changed.notify_all();

        let read_id = coordinator.read_id.to_string();
        log_event_with_fields(Event::SnapshotClaimReleased, &[("read_id", read_id.as_str())]);
    }
}
