//! Recording implementations of the notification and navigation
//! collaborators.

use flightdeck_api::*;
use std::sync::{Arc, Mutex};

/// A [Notifier] that records every message.
#[derive(Debug, Default)]
pub struct RecordingNotifier(Mutex<Vec<String>>);

impl RecordingNotifier {
    /// Construct a new recording notifier.
    pub fn create() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All messages notified so far.
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        tracing::debug!(notification = message, "recorded notification");
        self.0.lock().unwrap().push(message.to_string());
    }
}

/// A [Navigator] that records every redirect.
#[derive(Debug, Default)]
pub struct RecordingNavigator(Mutex<Vec<String>>);

impl RecordingNavigator {
    /// Construct a new recording navigator.
    pub fn create() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All locations redirected to so far.
    pub fn redirects(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, location: &str) {
        self.0.lock().unwrap().push(location.to_string());
    }
}
