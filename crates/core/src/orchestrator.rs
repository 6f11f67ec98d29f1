//! The request orchestrator, the dispatch entry point.
//!
//! Dispatching a request:
//!
//! - merges the caller's [RequestOptions] over the defaults,
//! - with `cancel_previous`, cancels and evicts any call with the same id,
//! - with `clear_cache`, evicts the cached result, otherwise looks it up,
//! - with `from_cache` and a cached result, returns that result without
//!   calling the transport,
//! - otherwise registers the call in the [PendingQueue], starts the
//!   transport call on its own task and stores the shared, still pending,
//!   outcome in the [ResultCache] before returning it.
//!
//! The queue entry is removed exactly once when the call settles, whether
//! it succeeded, failed or was cancelled. The cache entry stays until it is
//! explicitly evicted.

use crate::{
    cache::{ResultCache, SharedOutcome},
    normalize::ResponseNormalizer,
    queue::{DynCancel, PendingEntry, PendingQueue},
};
use flightdeck_api::{builder::Builder, config::*, *};
use futures::future::{AbortHandle, Abortable, FutureExt};
use std::sync::{Arc, Mutex};

const MOD_NAME: &str = "orchestrator";

/// Orchestrator configuration types.
pub mod config {
    /// Configuration parameters for the
    /// [Orchestrator](super::Orchestrator).
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    pub struct OrchestratorConfig {
        /// Where to send the user when a request returns 401.
        /// Default: "/login".
        pub login_url: String,

        /// User-facing message for server errors (status >= 500) that
        /// carry no message of their own.
        /// Default: "System error, please try again later".
        pub server_error_message: String,

        /// Message attached to cancelled requests.
        /// Default: "Request cancelled".
        pub cancel_message: String,

        /// Message attached to requests cancelled by a route change.
        /// Default: "Request cancelled by route change".
        pub route_change_message: String,

        /// Business error code marking a permission-denied failure.
        /// Default: 9900403.
        pub permission_denied_code: i64,
    }

    impl Default for OrchestratorConfig {
        fn default() -> Self {
            Self {
                login_url: "/login".into(),
                server_error_message: "System error, please try again later"
                    .into(),
                cancel_message: "Request cancelled".into(),
                route_change_message: "Request cancelled by route change"
                    .into(),
                permission_denied_code: 9900403,
            }
        }
    }

    impl flightdeck_api::config::ModConfig for OrchestratorConfig {}
}

pub use config::*;

/// The request orchestrator. Owns its own queue and cache, so separate
/// instances are fully isolated.
#[derive(Debug)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    transport: DynTransport,
    normalizer: Arc<ResponseNormalizer>,
    queue: Arc<PendingQueue>,
    cache: Arc<ResultCache>,
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            tracing::debug!(
                pending = self.queue.len(),
                "Orchestrator is being dropped, cancelling in-flight requests"
            );
            // executors run synchronously, the returned future only
            // carries the result
            drop(self.queue.cancel(Target::All, &self.config.cancel_message));
        }
    }
}

impl Orchestrator {
    /// Construct a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        transport: DynTransport,
        notifier: DynNotifier,
        navigator: DynNavigator,
    ) -> Self {
        let normalizer = Arc::new(ResponseNormalizer::new(
            config.clone(),
            notifier,
            navigator,
        ));
        Self {
            config,
            transport,
            normalizer,
            queue: Arc::new(PendingQueue::new()),
            cache: Arc::new(ResultCache::new()),
        }
    }

    /// Add the orchestrator's default config.
    pub fn default_config(config: &mut Config) -> FdResult<()> {
        config.add_default_module_config::<OrchestratorConfig>(
            MOD_NAME.into(),
        )
    }

    /// Construct an orchestrator from a builder.
    pub fn create(builder: Arc<Builder>) -> BoxFut<'static, FdResult<Self>> {
        Box::pin(async move {
            let config: OrchestratorConfig =
                builder.config.get_module_config(MOD_NAME)?;
            let transport = builder.transport.create(builder.clone()).await?;
            Ok(Self::new(
                config,
                transport,
                builder.notifier.clone(),
                builder.navigator.clone(),
            ))
        })
    }

    /// The orchestrator config in use.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The in-flight queue, for "is X loading" state.
    pub fn queue(&self) -> &Arc<PendingQueue> {
        &self.queue
    }

    /// The result cache, for manual invalidation.
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Dispatch a request and wait for its outcome.
    pub async fn dispatch(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> Outcome {
        self.submit(method, url, body, options).await.await
    }

    /// Dispatch a request, returning as soon as it is registered.
    ///
    /// The returned future resolves with the outcome. It is the same
    /// future that is stored in the cache, so every `from_cache` caller
    /// observes the same outcome.
    pub async fn submit(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> SharedOutcome {
        let config = Arc::new(RequestConfig::merge(method, url, options));
        let id = config.request_id.clone();

        tracing::trace!(request_id = %id, %method, url, ?config, "dispatch");

        if config.cancel_previous {
            let (cancelled, _) = futures::join!(
                self.queue.cancel(
                    Target::Id(id.clone()),
                    &self.config.cancel_message
                ),
                self.cache.delete(Target::Id(id.clone())),
            );
            if let Err(err) = cancelled {
                tracing::warn!(
                    request_id = %id,
                    ?err,
                    "failed to cancel previous request"
                );
            }
        }

        if config.clear_cache {
            self.cache.delete(Target::Id(id.clone())).await;
        }

        // lookup and registration happen under one cache lock, so two
        // concurrent `from_cache` dispatches cannot both start a call
        let reuse = config.from_cache && !config.clear_cache;
        let (shared, reused) =
            self.cache.get_or_set_with(id.clone(), reuse, config.clone(), || {
                self.start_call(method, url, body, config.clone())
            });

        if reused {
            tracing::debug!(request_id = %id, "reusing cached result");
        }

        shared
    }

    /// Register the call in the queue and start it on its own task.
    fn start_call(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
        config: Arc<RequestConfig>,
    ) -> SharedOutcome {
        let (abort_handle, abort_reg) = AbortHandle::new_pair();
        let reason: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let cancel: DynCancel = Arc::new({
            let reason = reason.clone();
            move |message: &str| {
                *reason.lock().unwrap() = Some(message.to_string());
                abort_handle.abort();
                Ok(())
            }
        });

        // register before the call can settle, so the finalizer below
        // always finds its own entry
        let entry = PendingEntry::from_config(&config, cancel);
        let serial = entry.serial();
        if !self.queue.add(entry) {
            tracing::debug!(
                request_id = %config.request_id,
                "a call with this id is already in flight"
            );
        }

        let call = self.transport.call(TransportRequest {
            method,
            url: url.to_string(),
            body: if method.has_body() { body } else { None },
            config: config.clone(),
        });

        let task = tokio::task::spawn({
            let queue = self.queue.clone();
            let normalizer = self.normalizer.clone();
            let fallback = self.config.cancel_message.clone();
            async move {
                let outcome = match Abortable::new(call, abort_reg).await {
                    Ok(result) => normalizer.normalize(result, &config),
                    Err(_aborted) => {
                        let message =
                            reason.lock().unwrap().take().unwrap_or(fallback);
                        tracing::debug!(
                            request_id = %config.request_id,
                            reason = %message,
                            "request cancelled"
                        );
                        Outcome::Cancelled(Cancelled::new(message))
                    }
                };
                queue.remove_call(&config.request_id, serial);
                outcome
            }
        });

        let fut: BoxFut<'static, Outcome> = Box::pin(async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(?err, "dispatch task failed");
                    Outcome::TransportFailure(TransportError::network(
                        format!("dispatch task failed: {err}"),
                    ))
                }
            }
        });
        fut.shared()
    }

    /// Dispatch a GET request.
    pub async fn get(&self, url: &str, options: RequestOptions) -> Outcome {
        self.dispatch(Method::Get, url, None, options).await
    }

    /// Dispatch a HEAD request.
    pub async fn head(&self, url: &str, options: RequestOptions) -> Outcome {
        self.dispatch(Method::Head, url, None, options).await
    }

    /// Dispatch an OPTIONS request.
    pub async fn options(&self, url: &str, options: RequestOptions) -> Outcome {
        self.dispatch(Method::Options, url, None, options).await
    }

    /// Dispatch a DELETE request.
    pub async fn delete(&self, url: &str, options: RequestOptions) -> Outcome {
        self.dispatch(Method::Delete, url, None, options).await
    }

    /// Dispatch a POST request.
    pub async fn post(
        &self,
        url: &str,
        body: serde_json::Value,
        options: RequestOptions,
    ) -> Outcome {
        self.dispatch(Method::Post, url, Some(body), options).await
    }

    /// Dispatch a PUT request.
    pub async fn put(
        &self,
        url: &str,
        body: serde_json::Value,
        options: RequestOptions,
    ) -> Outcome {
        self.dispatch(Method::Put, url, Some(body), options).await
    }

    /// Dispatch a PATCH request.
    pub async fn patch(
        &self,
        url: &str,
        body: serde_json::Value,
        options: RequestOptions,
    ) -> Outcome {
        self.dispatch(Method::Patch, url, Some(body), options).await
    }

    /// Cancel in-flight requests matching the target.
    pub fn cancel_request(
        &self,
        target: impl Into<Target>,
    ) -> BoxFut<'_, FdResult<()>> {
        self.queue.cancel(target, &self.config.cancel_message)
    }

    /// Evict cached results matching the target.
    pub fn cancel_cache(
        &self,
        target: impl Into<Target>,
    ) -> BoxFut<'_, Target> {
        self.cache.delete(target)
    }

    /// Cancel in-flight requests and evict cached results matching the
    /// target.
    pub async fn cancel(&self, target: impl Into<Target>) -> FdResult<()> {
        let target = target.into();
        let (cancelled, _) = futures::join!(
            self.cancel_request(target.clone()),
            self.cancel_cache(target),
        );
        cancelled
    }

    /// Called by the navigation observer before each route change.
    /// Cancels every in-flight request with `cancel_when_route_change`.
    pub async fn cancel_on_route_change(&self) -> FdResult<()> {
        let ids: Vec<RequestId> = self
            .queue
            .list()
            .into_iter()
            .filter(|e| e.cancel_when_route_change)
            .map(|e| e.request_id)
            .collect();

        if ids.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = ids.len(), "route change, cancelling requests");

        self.queue
            .cancel(Target::Ids(ids), &self.config.route_change_message)
            .await
    }
}
