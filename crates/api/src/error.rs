//! Flightdeck error types.

use std::sync::Arc;

/// A clonable trait-object inner error.
#[derive(Clone, Default)]
pub struct DynInnerError(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for DynInnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.as_ref().map(|s| {
            let out: &(dyn std::error::Error + 'static) = &**s;
            out
        })
    }
}

impl DynInnerError {
    /// Construct a new DynInnerError from a source error.
    pub fn new<E: std::error::Error + 'static + Send + Sync>(e: E) -> Self {
        Self(Some(Arc::new(e)))
    }
}

/// The general flightdeck error type, used for configuration, construction
/// and bookkeeping failures.
///
/// Failures of a dispatched request are not reported with this type, see
/// [crate::Outcome] and [crate::DispatchError] instead.
///
/// This type is required to implement `Clone` so it can travel through
/// shared futures, which require the entire output to be `Clone`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FdError {
    /// Generic flightdeck error.
    #[error("{ctx} (src: {src})")]
    Other {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },

    /// A module config section could not be read or written.
    #[error("invalid config for module {module} (src: {src})")]
    Config {
        /// The module name the section is stored under.
        module: Arc<str>,

        /// The serialization error.
        #[source]
        src: DynInnerError,
    },

    /// The cancel executor of an in-flight request failed.
    #[error("failed to cancel request {request_id} (src: {src})")]
    CancelFailed {
        /// The request whose executor failed.
        request_id: crate::RequestId,

        /// The executor's error.
        #[source]
        src: DynInnerError,
    },
}

impl FdError {
    /// Construct an "other" error with an inner source error.
    pub fn other_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "other" error.
    pub fn other<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::default(),
        }
    }

    /// Construct a [FdError::Config] error.
    pub fn config<S: std::error::Error + 'static + Send + Sync>(
        module: &str,
        src: S,
    ) -> Self {
        Self::Config {
            module: module.into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct a [FdError::CancelFailed] error.
    pub fn cancel_failed(request_id: crate::RequestId, src: FdError) -> Self {
        Self::CancelFailed {
            request_id,
            src: DynInnerError::new(src),
        }
    }
}

/// The flightdeck result type.
pub type FdResult<T> = Result<T, FdError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            "bla (src: None)",
            FdError::other("bla").to_string().as_str(),
        );
        assert_eq!(
            "foo (src: bar)",
            FdError::other_src("foo", std::io::Error::other("bar"))
                .to_string()
                .as_str(),
        );
    }

    #[test]
    fn domain_error_display() {
        let err = FdError::cancel_failed(
            "hosts".into(),
            FdError::other("handle gone"),
        );
        assert_eq!(
            "failed to cancel request hosts (src: handle gone (src: None))",
            err.to_string(),
        );
        assert!(matches!(
            &err,
            FdError::CancelFailed { request_id, .. } if &**request_id == "hosts"
        ));

        let err = FdError::config("orchestrator", std::io::Error::other("x"));
        assert_eq!(
            "invalid config for module orchestrator (src: x)",
            err.to_string(),
        );
    }

    #[test]
    fn error_source_is_exposed() {
        use std::error::Error;

        let err = FdError::other_src("ctx", std::io::Error::other("inner"));
        let src = err.source().expect("source should be present");
        assert_eq!("inner", src.to_string());
        assert!(FdError::other("ctx").source().unwrap().source().is_none());
    }

    #[test]
    fn ensure_fd_error_type_is_send_sync_and_clone() {
        fn ensure<T: std::fmt::Display + Send + Sync + Clone>(_t: T) {}
        ensure(FdError::other("bla"));
    }
}
