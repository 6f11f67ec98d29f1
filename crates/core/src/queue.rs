//! The in-flight request queue.
//!
//! Tracks every live call by its request id and group tags, so callers
//! can ask "is X loading" and cancel single requests, whole groups or
//! everything at once.

use flightdeck_api::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A cancel executor. Receives the cancellation message.
pub type DynCancel = Arc<dyn Fn(&str) -> FdResult<()> + 'static + Send + Sync>;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// One live call.
#[derive(Clone)]
pub struct PendingEntry {
    /// The request id.
    pub request_id: RequestId,
    /// The request's group tags.
    pub request_group: Vec<RequestId>,
    /// Eligible for bulk cancellation on route change.
    pub cancel_when_route_change: bool,
    serial: u64,
    cancel: DynCancel,
}

impl std::fmt::Debug for PendingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEntry")
            .field("request_id", &self.request_id)
            .field("request_group", &self.request_group)
            .field("cancel_when_route_change", &self.cancel_when_route_change)
            .finish()
    }
}

impl PendingEntry {
    /// Construct a new entry.
    pub fn new(
        request_id: RequestId,
        request_group: Vec<RequestId>,
        cancel: DynCancel,
    ) -> Self {
        Self {
            request_id,
            request_group,
            cancel_when_route_change: true,
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            cancel,
        }
    }

    /// Construct an entry for a dispatched request.
    pub fn from_config(config: &RequestConfig, cancel: DynCancel) -> Self {
        let mut out = Self::new(
            config.request_id.clone(),
            config.request_group.clone(),
            cancel,
        );
        out.cancel_when_route_change = config.cancel_when_route_change;
        out
    }

    /// Matches by own id or by group membership.
    pub fn matches(&self, id: &str) -> bool {
        &*self.request_id == id
            || self.request_group.iter().any(|g| &**g == id)
    }

    /// Invoke the cancel executor.
    pub fn cancel(&self, message: &str) -> FdResult<()> {
        (self.cancel)(message)
    }

    /// Distinguishes separate calls that share a request id.
    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }
}

/// The in-flight request queue.
///
/// There is at most one entry per request id. Entries are kept in
/// insertion order.
#[derive(Debug, Default)]
pub struct PendingQueue(Mutex<Vec<PendingEntry>>);

impl PendingQueue {
    /// Construct a new, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries.
    pub fn list(&self) -> Vec<PendingEntry> {
        self.0.lock().unwrap().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// True if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }

    /// The first entry whose id is `id` or whose group contains `id`.
    pub fn find(&self, id: &str) -> Option<PendingEntry> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.matches(id))
            .cloned()
    }

    /// Every entry whose id is `id` or whose group contains `id`.
    pub fn find_all(&self, id: &str) -> Vec<PendingEntry> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.matches(id))
            .cloned()
            .collect()
    }

    /// True while a request with this id (or in this group) is in flight.
    pub fn is_loading(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Register an entry. First writer wins: if an entry with the same
    /// request id exists this is a no-op, and false is returned.
    pub fn add(&self, entry: PendingEntry) -> bool {
        let mut lock = self.0.lock().unwrap();
        if lock.iter().any(|e| e.request_id == entry.request_id) {
            return false;
        }
        lock.push(entry);
        true
    }

    /// Remove the entry with this request id, if any.
    pub fn remove(&self, id: &str) {
        self.0.lock().unwrap().retain(|e| &*e.request_id != id);
    }

    /// Same as [PendingQueue::remove].
    pub fn delete(&self, id: &str) {
        self.remove(id)
    }

    /// Remove the entry for one specific call. A newer call that
    /// registered under the same id is left alone.
    pub(crate) fn remove_call(&self, id: &str, serial: u64) {
        self.0
            .lock()
            .unwrap()
            .retain(|e| !(&*e.request_id == id && e.serial == serial));
    }

    fn matching(&self, target: &Target) -> Vec<PendingEntry> {
        let lock = self.0.lock().unwrap();
        match target {
            Target::All => lock.clone(),
            _ => lock
                .iter()
                .filter(|e| target.ids().iter().any(|id| e.matches(id)))
                .cloned()
                .collect(),
        }
    }

    /// Cancel every entry matching the target.
    ///
    /// Each matched executor is invoked once. Entries whose executor
    /// succeeded are removed. If any executor fails the whole operation
    /// fails with the first error, without reporting which entries were
    /// cancelled. Unknown ids are a silent no-op.
    pub fn cancel(
        &self,
        target: impl Into<Target>,
        message: &str,
    ) -> BoxFut<'_, FdResult<()>> {
        let target = target.into();
        let matched = self.matching(&target);

        let mut first_err = None;
        let mut cancelled = Vec::with_capacity(matched.len());
        for entry in matched {
            match entry.cancel(message) {
                Ok(()) => cancelled.push(entry.serial),
                Err(err) => {
                    tracing::warn!(
                        request_id = %entry.request_id,
                        ?err,
                        "cancel executor failed"
                    );
                    if first_err.is_none() {
                        first_err = Some(FdError::cancel_failed(
                            entry.request_id.clone(),
                            err,
                        ));
                    }
                }
            }
        }

        if !cancelled.is_empty() {
            tracing::debug!(
                count = cancelled.len(),
                ?target,
                reason = message,
                "cancelled in-flight requests"
            );
            self.0
                .lock()
                .unwrap()
                .retain(|e| !cancelled.contains(&e.serial));
        }

        Box::pin(async move {
            match first_err {
                None => Ok(()),
                Some(err) => Err(err),
            }
        })
    }
}
