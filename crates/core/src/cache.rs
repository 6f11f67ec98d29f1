//! The result cache.
//!
//! Maps a request id to the shared future of its outcome, together with
//! the config that produced it. The future is stored as soon as the call
//! is started, so concurrent `from_cache` lookups observe the in-flight
//! call rather than issuing a second one.

use flightdeck_api::*;
use futures::future::{FutureExt, Shared};
use std::sync::{Arc, Mutex};

/// A cloneable handle to a (possibly still pending) outcome.
pub type SharedOutcome = Shared<BoxFut<'static, Outcome>>;

/// Wrap an already settled outcome.
pub fn ready_outcome(outcome: Outcome) -> SharedOutcome {
    let fut: BoxFut<'static, Outcome> =
        Box::pin(futures::future::ready(outcome));
    fut.shared()
}

#[derive(Debug)]
struct CacheEntry {
    request_id: RequestId,
    outcome: SharedOutcome,
    config: Arc<RequestConfig>,
}

/// The result cache. Entries are kept in insertion order; overwriting an
/// id keeps its original position.
#[derive(Debug, Default)]
pub struct ResultCache(Mutex<Vec<CacheEntry>>);

impl ResultCache {
    /// Construct a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached outcome for `id`, if any.
    pub fn get(&self, id: &str) -> Option<SharedOutcome> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|e| &*e.request_id == id)
            .map(|e| e.outcome.clone())
    }

    /// Every cached outcome.
    pub fn get_all(&self) -> Vec<SharedOutcome> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.outcome.clone())
            .collect()
    }

    /// The config stored with `id`, if any.
    pub fn get_config(&self, id: &str) -> Option<Arc<RequestConfig>> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|e| &*e.request_id == id)
            .map(|e| e.config.clone())
    }

    /// Cached ids, in insertion order.
    pub fn ids(&self) -> Vec<RequestId> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.request_id.clone())
            .collect()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }

    /// Store an outcome, unconditionally overwriting any existing entry.
    pub fn set(
        &self,
        id: RequestId,
        outcome: SharedOutcome,
        config: impl Into<Arc<RequestConfig>>,
    ) {
        let config = config.into();
        let mut lock = self.0.lock().unwrap();
        match lock.iter_mut().find(|e| e.request_id == id) {
            Some(e) => {
                e.outcome = outcome;
                e.config = config;
            }
            None => lock.push(CacheEntry {
                request_id: id,
                outcome,
                config,
            }),
        }
    }

    /// With `reuse`, return the cached outcome for `id` if there is one.
    /// Otherwise store the outcome produced by `start`, overwriting any
    /// existing entry. The returned flag is true if a cached outcome was
    /// reused.
    ///
    /// `start` runs while the cache is locked and must not call back into
    /// this cache.
    pub fn get_or_set_with<F>(
        &self,
        id: RequestId,
        reuse: bool,
        config: impl Into<Arc<RequestConfig>>,
        start: F,
    ) -> (SharedOutcome, bool)
    where
        F: FnOnce() -> SharedOutcome,
    {
        let mut lock = self.0.lock().unwrap();
        let pos = lock.iter().position(|e| e.request_id == id);

        if reuse {
            if let Some(pos) = pos {
                return (lock[pos].outcome.clone(), true);
            }
        }

        let outcome = start();
        let config = config.into();
        match pos {
            Some(pos) => {
                lock[pos].outcome = outcome.clone();
                lock[pos].config = config;
            }
            None => lock.push(CacheEntry {
                request_id: id,
                outcome: outcome.clone(),
                config,
            }),
        }
        (outcome, false)
    }

    /// Store an already settled outcome.
    pub fn set_outcome(
        &self,
        id: RequestId,
        outcome: Outcome,
        config: impl Into<Arc<RequestConfig>>,
    ) {
        self.set(id, ready_outcome(outcome), config)
    }

    /// Ids of every entry whose config groups it under `tag`.
    pub fn grouped_ids(&self, tag: &str) -> Vec<RequestId> {
        let mut out: Vec<RequestId> = Vec::new();
        for e in self.0.lock().unwrap().iter() {
            if e.config.in_group(tag) && !out.contains(&e.request_id) {
                out.push(e.request_id.clone());
            }
        }
        out
    }

    /// The ids [ResultCache::delete] removes for `id`: its grouped ids,
    /// plus `id` itself if it is a direct key.
    pub fn delete_ids(&self, id: &str) -> Vec<RequestId> {
        let mut out = self.grouped_ids(id);
        if self.get(id).is_some() && !out.iter().any(|o| &**o == id) {
            out.push(id.into());
        }
        out
    }

    /// Evict entries. [Target::All] clears the cache; otherwise the union
    /// of [ResultCache::delete_ids] for each id is removed.
    ///
    /// Never fails. Resolves with the target it was given.
    pub fn delete(&self, target: impl Into<Target>) -> BoxFut<'_, Target> {
        let target = target.into();

        let removed = match &target {
            Target::All => {
                let mut lock = self.0.lock().unwrap();
                let count = lock.len();
                lock.clear();
                count
            }
            _ => {
                let mut ids: Vec<RequestId> = Vec::new();
                for id in target.ids() {
                    for d in self.delete_ids(id) {
                        if !ids.contains(&d) {
                            ids.push(d);
                        }
                    }
                }
                let mut lock = self.0.lock().unwrap();
                let before = lock.len();
                lock.retain(|e| !ids.contains(&e.request_id));
                before - lock.len()
            }
        };

        if removed > 0 {
            tracing::debug!(removed, ?target, "evicted cached results");
        }

        Box::pin(async move { target })
    }
}
