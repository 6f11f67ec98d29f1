//! External collaborators the orchestrator reports to.

use std::sync::Arc;

/// The global, user-visible error sink.
pub trait Notifier: 'static + Send + Sync + std::fmt::Debug {
    /// Surface a message to the user.
    fn notify(&self, message: &str);
}

/// Trait-object [Notifier].
pub type DynNotifier = Arc<dyn Notifier>;

/// Navigation, used to send the user to the login location when the
/// session has expired.
pub trait Navigator: 'static + Send + Sync + std::fmt::Debug {
    /// Navigate to `location`.
    fn redirect(&self, location: &str);
}

/// Trait-object [Navigator].
pub type DynNavigator = Arc<dyn Navigator>;
