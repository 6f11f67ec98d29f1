//! Flightdeck transport related types.

use crate::*;
use std::sync::Arc;

/// One outgoing call as handed to a [Transport].
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Http method.
    pub method: Method,
    /// Target url, absolute or relative to the transport's base url.
    pub url: String,
    /// Json body. Always `None` for methods without a body.
    pub body: Option<serde_json::Value>,
    /// The final config of the request.
    pub config: Arc<RequestConfig>,
}

/// The capability that performs the actual network call.
///
/// The returned future is driven on its own task and may be dropped
/// before completion when the request is cancelled; implementations
/// should abort the underlying call on drop.
///
/// `call` itself runs while the orchestrator holds its cache lock, so it
/// must only start the work and never dispatch through the same
/// orchestrator before returning the future.
pub trait Transport: 'static + Send + Sync + std::fmt::Debug {
    /// Perform the call.
    fn call(
        &self,
        request: TransportRequest,
    ) -> BoxFut<'static, Result<Response, TransportError>>;
}

/// Trait-object [Transport].
pub type DynTransport = Arc<dyn Transport>;

/// A factory for constructing [Transport] instances.
pub trait TransportFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> FdResult<()>;

    /// Construct a transport instance.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, FdResult<DynTransport>>;
}

/// Trait-object [TransportFactory].
pub type DynTransportFactory = Arc<dyn TransportFactory>;

/// A factory handing out an already constructed transport.
#[derive(Debug)]
pub struct PreparedTransportFactory(pub DynTransport);

impl PreparedTransportFactory {
    /// Wrap an existing transport.
    pub fn create(transport: DynTransport) -> DynTransportFactory {
        let out: DynTransportFactory = Arc::new(Self(transport));
        out
    }
}

impl TransportFactory for PreparedTransportFactory {
    fn default_config(&self, _config: &mut config::Config) -> FdResult<()> {
        Ok(())
    }

    fn create(
        &self,
        _builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, FdResult<DynTransport>> {
        let out = self.0.clone();
        Box::pin(async move { Ok(out) })
    }
}
