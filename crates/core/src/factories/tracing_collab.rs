//! Collaborators that only log.
//!
//! Useful where no user interface is attached, such as in services and
//! command line tools.

use flightdeck_api::*;
use std::sync::Arc;

/// A [Notifier] that emits each message as a warning event.
#[derive(Debug)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Construct a new TracingNotifier.
    pub fn create() -> DynNotifier {
        let out: DynNotifier = Arc::new(TracingNotifier);
        out
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(notification = message, "request failed");
    }
}

/// A [Navigator] that logs each redirect.
#[derive(Debug)]
pub struct TracingNavigator;

impl TracingNavigator {
    /// Construct a new TracingNavigator.
    pub fn create() -> DynNavigator {
        let out: DynNavigator = Arc::new(TracingNavigator);
        out
    }
}

impl Navigator for TracingNavigator {
    fn redirect(&self, location: &str) {
        tracing::info!(location, "redirect requested");
    }
}
