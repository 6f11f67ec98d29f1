//! A scripted, in-process [Transport] for tests.
//!
//! Replies are registered per url. Calls to a url marked with
//! [ScriptedTransport::hold] stay pending until that url is released,
//! which lets tests observe requests while they are in flight.

use flightdeck_api::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Reply = Result<Response, TransportError>;

#[derive(Debug, Default)]
struct Inner {
    replies: HashMap<String, Reply>,
    held: HashMap<String, tokio::sync::watch::Sender<bool>>,
    calls: Vec<TransportRequest>,
}

/// A scripted transport. Unscripted urls fail with a 404 status error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    inner: Mutex<Inner>,
    dropped: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// Construct a new scripted transport.
    pub fn create() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register the reply for calls to `url`.
    pub fn respond(&self, url: &str, reply: Reply) {
        self.inner
            .lock()
            .unwrap()
            .replies
            .insert(url.to_string(), reply);
    }

    /// Reply to `url` with a successful envelope carrying `data`.
    pub fn respond_data(&self, url: &str, data: serde_json::Value) {
        self.respond(url, Ok(Response::ok(Envelope::success(data))));
    }

    /// Calls to `url` stay pending until [ScriptedTransport::release].
    pub fn hold(&self, url: &str) {
        let (send, _) = tokio::sync::watch::channel(false);
        self.inner
            .lock()
            .unwrap()
            .held
            .insert(url.to_string(), send);
    }

    /// Let pending and future calls to `url` complete.
    pub fn release(&self, url: &str) {
        if let Some(send) = self.inner.lock().unwrap().held.remove(url) {
            send.send_replace(true);
        }
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<TransportRequest> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    /// Number of calls made to `url` so far.
    pub fn calls_to(&self, url: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.url == url)
            .count()
    }

    /// Number of calls whose future was dropped before completing,
    /// i.e. calls that were aborted.
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct DropGuard {
    dropped: Arc<AtomicUsize>,
    armed: bool,
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        if self.armed {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Transport for ScriptedTransport {
    fn call(
        &self,
        request: TransportRequest,
    ) -> BoxFut<'static, Result<Response, TransportError>> {
        let (reply, gate) = {
            let mut lock = self.inner.lock().unwrap();
            let reply = lock
                .replies
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| Err(TransportError::status(404, None)));
            let gate = lock.held.get(&request.url).map(|s| s.subscribe());
            lock.calls.push(request);
            (reply, gate)
        };
        let dropped = self.dropped.clone();

        Box::pin(async move {
            let mut guard = DropGuard {
                dropped,
                armed: true,
            };
            if let Some(mut gate) = gate {
                let _ = gate.wait_for(|open| *open).await;
            }
            guard.armed = false;
            reply
        })
    }
}
