//! Classification of settled transport results.

use crate::orchestrator::OrchestratorConfig;
use flightdeck_api::*;
use std::sync::Arc;

/// Turns a transport result into an [Outcome], surfacing failures through
/// the [Notifier] and session expiry through the [Navigator].
#[derive(Debug)]
pub struct ResponseNormalizer {
    config: OrchestratorConfig,
    notifier: DynNotifier,
    navigator: DynNavigator,
}

impl ResponseNormalizer {
    /// Construct a new normalizer.
    pub fn new(
        config: OrchestratorConfig,
        notifier: DynNotifier,
        navigator: DynNavigator,
    ) -> Self {
        Self {
            config,
            notifier,
            navigator,
        }
    }

    /// Classify a settled transport result.
    pub fn normalize(
        &self,
        result: Result<Response, TransportError>,
        config: &RequestConfig,
    ) -> Outcome {
        match result {
            Ok(response) => self.on_response(response, config),
            Err(err) => self.on_error(err, config),
        }
    }

    fn on_response(
        &self,
        response: Response,
        config: &RequestConfig,
    ) -> Outcome {
        if response.envelope.is_success() {
            let payload = if config.original_response {
                Payload::Response(Arc::new(response))
            } else {
                Payload::Data(response.envelope.data)
            };
            return Outcome::Success(payload);
        }

        let err = ApplicationError::from_envelope(response.envelope);

        if err.code == self.config.permission_denied_code {
            tracing::debug!(
                request_id = %config.request_id,
                permission = ?err.permission,
                "permission denied"
            );
        } else {
            tracing::debug!(
                request_id = %config.request_id,
                code = err.code,
                reason = %err.message,
                "application failure"
            );
        }

        if config.global_error {
            self.notifier.notify(&err.message);
        }

        Outcome::AppFailure(err)
    }

    fn on_error(
        &self,
        err: TransportError,
        config: &RequestConfig,
    ) -> Outcome {
        if err.kind == TransportErrorKind::Cancelled {
            return Outcome::Cancelled(Cancelled {
                message: err.message,
            });
        }

        if err.status == Some(401) {
            tracing::info!(
                request_id = %config.request_id,
                login_url = %self.config.login_url,
                "session expired, redirecting to login"
            );
            self.navigator.redirect(&self.config.login_url);
            return Outcome::TransportFailure(err);
        }

        let server_message = err
            .body
            .as_ref()
            .map(|b| b.message.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        let message = match (server_message, err.status) {
            (Some(m), _) => m,
            (None, Some(s)) if s >= 500 => {
                self.config.server_error_message.clone()
            }
            (None, _) => err.message.to_string(),
        };
        let err = err.with_message(message);

        tracing::warn!(
            request_id = %config.request_id,
            status = ?err.status,
            reason = %err.message,
            "transport failure"
        );

        if config.global_error {
            self.notifier.notify(&err.message);
        }

        Outcome::TransportFailure(err)
    }
}
