//! Builder-related types.

use crate::*;
use std::sync::Arc;

/// The general flightdeck builder.
/// This contains both configuration and collaborator instances,
/// allowing construction of an orchestrator.
#[derive(Debug)]
pub struct Builder {
    /// The module configuration to be used when building modules.
    /// This can be loaded from disk or modified before freezing the builder.
    pub config: crate::config::Config,

    /// The [TransportFactory] used to create the transport.
    pub transport: DynTransportFactory,

    /// Where global errors are surfaced.
    pub notifier: DynNotifier,

    /// Where session expiry redirects go.
    pub navigator: DynNavigator,
}

impl Builder {
    /// Construct a default config given the configured module factories.
    /// Note, this should be called before freezing the Builder instance
    /// in an Arc<>.
    pub fn with_default_config(mut self) -> FdResult<Self> {
        self.set_default_config()?;
        Ok(self)
    }

    /// Construct a default config given the configured module factories.
    pub fn set_default_config(&mut self) -> FdResult<()> {
        let Self {
            config,
            transport,
            notifier: _,
            navigator: _,
        } = self;

        transport.default_config(config)?;

        Ok(())
    }

    /// Freeze the builder.
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }
}
