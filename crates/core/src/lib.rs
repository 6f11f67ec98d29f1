#![deny(missing_docs)]
//! Flightdeck request orchestration core.
//!
//! Wraps an http transport with request identity, an in-flight queue for
//! cancellation, a result cache for deduplication and a normalizer that
//! turns transport results into an [Outcome](flightdeck_api::Outcome).

use flightdeck_api::{builder::Builder, config::Config};

pub mod cache;
pub use cache::{ready_outcome, ResultCache, SharedOutcome};

pub mod factories;

pub mod normalize;
pub use normalize::ResponseNormalizer;

pub mod orchestrator;
pub use orchestrator::{Orchestrator, OrchestratorConfig};

pub mod queue;
pub use queue::{DynCancel, PendingEntry, PendingQueue};

/// Construct a production-ready default builder.
///
/// - `transport` - The default transport is [factories::HttpTransportFactory].
/// - `notifier` - The default notifier is [factories::TracingNotifier].
/// - `navigator` - The default navigator is [factories::TracingNavigator].
///
/// The config already holds the orchestrator and transport defaults.
pub fn default_builder() -> flightdeck_api::FdResult<Builder> {
    let mut config = Config::default();
    Orchestrator::default_config(&mut config)?;
    Builder {
        config,
        transport: factories::HttpTransportFactory::create(),
        notifier: factories::TracingNotifier::create(),
        navigator: factories::TracingNavigator::create(),
    }
    .with_default_config()
}
