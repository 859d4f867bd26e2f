//! Live query subscription engine.
//!
//! # Responsibility
//! - Keep a registry of active live queries keyed by the record kinds they
//!   cover.
//! - Re-evaluate affected queries after every mutation and push complete
//!   snapshots (never diffs) to subscribers.
//!
//! # Invariants
//! - Delivery to a single subscriber is strictly ordered: snapshots are
//!   produced and sent under the registry lock in mutation order.
//! - Cancellation never takes the registry lock; it flips a flag that is
//!   honored on the next notification pass.
//! - A failed re-evaluation skips one delivery and keeps the subscription.

pub mod queries;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::model::RecordKind;
use crate::repo::RepoResult;

/// Outcome of pushing one snapshot to one subscriber.
enum Push {
    Delivered,
    Disconnected,
    Skipped,
}

struct Registration {
    id: u64,
    kinds: Vec<RecordKind>,
    cancelled: Arc<AtomicBool>,
    push: Box<dyn Fn(&Connection) -> Push + Send>,
}

/// Query evaluator captured by a subscription.
///
/// Wraps the closure so [`ChangeHub::register`] stays object-safe about
/// the row type while the registry stores type-erased entries.
pub struct SnapshotFn<T>(Box<dyn Fn(&Connection) -> RepoResult<Vec<T>> + Send>);

impl<T> SnapshotFn<T> {
    pub(crate) fn new<F>(eval: F) -> Self
    where
        F: Fn(&Connection) -> RepoResult<Vec<T>> + Send + 'static,
    {
        Self(Box::new(eval))
    }
}

/// Registry of live queries, re-driven on every mutation.
pub struct ChangeHub {
    registry: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ChangeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHub").finish_non_exhaustive()
    }
}

impl ChangeHub {
    pub(crate) fn new() -> Self {
        Self {
            registry: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a subscriber and seeds its channel with `initial`.
    pub(crate) fn register<T: Send + 'static>(
        &self,
        kinds: &[RecordKind],
        snapshot: SnapshotFn<T>,
        initial: Vec<T>,
    ) -> Live<T> {
        let (tx, rx) = unbounded();
        // Receiver is not handed out yet, so this send cannot fail.
        let _ = tx.send(initial);

        let cancelled = Arc::new(AtomicBool::new(false));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let push = make_push(snapshot, tx, id);

        self.registry.lock().push(Registration {
            id,
            kinds: kinds.to_vec(),
            cancelled: Arc::clone(&cancelled),
            push,
        });
        debug!("event=live_subscribe module=live status=ok subscription_id={id}");

        Live { rx, cancelled, id }
    }

    /// Re-evaluates every registration covering any of `kinds`.
    ///
    /// Runs under the caller-held connection lock; registrations found
    /// cancelled or disconnected are reaped in the same pass.
    pub(crate) fn notify(&self, conn: &Connection, kinds: &[RecordKind]) {
        let mut registry = self.registry.lock();
        registry.retain(|registration| {
            if registration.cancelled.load(Ordering::Acquire) {
                debug!(
                    "event=live_unsubscribe module=live status=ok reason=cancelled subscription_id={}",
                    registration.id
                );
                return false;
            }
            if !registration.kinds.iter().any(|kind| kinds.contains(kind)) {
                return true;
            }
            match (registration.push)(conn) {
                Push::Delivered | Push::Skipped => true,
                Push::Disconnected => {
                    debug!(
                        "event=live_unsubscribe module=live status=ok reason=disconnected subscription_id={}",
                        registration.id
                    );
                    false
                }
            }
        });
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }
}

fn make_push<T: Send + 'static>(
    snapshot: SnapshotFn<T>,
    tx: Sender<Vec<T>>,
    id: u64,
) -> Box<dyn Fn(&Connection) -> Push + Send> {
    Box::new(move |conn| match (snapshot.0)(conn) {
        Ok(rows) => {
            if tx.send(rows).is_ok() {
                Push::Delivered
            } else {
                Push::Disconnected
            }
        }
        Err(err) => {
            warn!(
                "event=live_refresh module=live status=error subscription_id={id} error={err}"
            );
            Push::Skipped
        }
    })
}

/// Subscriber handle for one live query.
///
/// Every received item is a complete, ordered result-set. Dropping the
/// handle cancels the subscription.
pub struct Live<T> {
    rx: Receiver<Vec<T>>,
    cancelled: Arc<AtomicBool>,
    id: u64,
}

impl<T> Live<T> {
    /// Blocks for the next snapshot. `None` once the subscription is gone.
    pub fn recv(&self) -> Option<Vec<T>> {
        self.rx.recv().ok()
    }

    /// Returns an already-delivered snapshot without blocking.
    pub fn try_recv(&self) -> Option<Vec<T>> {
        self.rx.try_recv().ok()
    }

    /// Blocks up to `timeout` for the next snapshot.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<T>> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Stops further deliveries. Non-blocking: already-queued snapshots
    /// stay readable, the registration is reaped on the next notification.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Stable id of this subscription, for diagnostics.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Drop for Live<T> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
