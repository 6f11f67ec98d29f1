//! The default http transport, backed by reqwest.

use flightdeck_api::{config::*, *};
use std::sync::Arc;

const MOD_NAME: &str = "httpTransport";

/// HttpTransport configuration types.
pub mod config {
    /// Configuration parameters for
    /// [HttpTransportFactory](super::HttpTransportFactory).
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    pub struct HttpTransportConfig {
        /// Relative request urls are resolved against this url.
        /// Default: None, only absolute urls can be requested.
        pub base_url: Option<String>,

        /// Per request timeout in seconds, zero disables it.
        /// Default: 0, a hung call stays in flight until cancelled.
        pub timeout_s: u64,

        /// The user agent header value.
        /// Default: "flightdeck/<crate version>".
        pub user_agent: String,
    }

    impl Default for HttpTransportConfig {
        fn default() -> Self {
            Self {
                base_url: None,
                timeout_s: 0,
                user_agent: concat!("flightdeck/", env!("CARGO_PKG_VERSION"))
                    .into(),
            }
        }
    }

    impl flightdeck_api::config::ModConfig for HttpTransportConfig {}
}

pub use config::*;

/// The default http transport factory.
#[derive(Debug)]
pub struct HttpTransportFactory {}

impl HttpTransportFactory {
    /// Construct a new HttpTransportFactory.
    pub fn create() -> DynTransportFactory {
        let out: DynTransportFactory = Arc::new(HttpTransportFactory {});
        out
    }
}

impl TransportFactory for HttpTransportFactory {
    fn default_config(&self, config: &mut Config) -> FdResult<()> {
        config.add_default_module_config::<HttpTransportConfig>(
            MOD_NAME.into(),
        )
    }

    fn create(
        &self,
        builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, FdResult<DynTransport>> {
        Box::pin(async move {
            let config: HttpTransportConfig =
                builder.config.get_module_config(MOD_NAME)?;
            let out: DynTransport = Arc::new(HttpTransport::new(config)?);
            Ok(out)
        })
    }
}

/// A [Transport] speaking json over http.
///
/// Success responses must carry an [Envelope] body. An empty body is
/// read as an empty envelope. Error responses are decoded as an envelope
/// when possible so the server's message can be surfaced.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Option<url::Url>,
}

impl HttpTransport {
    /// Construct a new http transport.
    pub fn new(config: HttpTransportConfig) -> FdResult<Self> {
        let base_url = match &config.base_url {
            None => None,
            Some(u) => Some(
                url::Url::parse(u)
                    .map_err(|e| FdError::other_src("invalid baseUrl", e))?,
            ),
        };

        let mut builder =
            reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if config.timeout_s > 0 {
            builder = builder
                .timeout(std::time::Duration::from_secs(config.timeout_s));
        }
        let client = builder.build().map_err(|e| {
            FdError::other_src("failed to build http client", e)
        })?;

        Ok(Self { client, base_url })
    }

    fn resolve(&self, url: &str) -> Result<url::Url, TransportError> {
        use url::ParseError::RelativeUrlWithoutBase;

        match (url::Url::parse(url), &self.base_url) {
            (Ok(u), _) => Ok(u),
            (Err(RelativeUrlWithoutBase), Some(base)) => {
                base.join(url).map_err(TransportError::network)
            }
            (Err(RelativeUrlWithoutBase), None) => Err(
                TransportError::network(format!(
                    "relative url without a base url: {url}"
                )),
            ),
            (Err(err), _) => Err(TransportError::network(err)),
        }
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

impl Transport for HttpTransport {
    fn call(
        &self,
        request: TransportRequest,
    ) -> BoxFut<'static, Result<Response, TransportError>> {
        let url = self.resolve(&request.url);
        let client = self.client.clone();

        Box::pin(async move {
            let url = url?;
            tracing::trace!(%url, method = %request.method, "http call");

            let mut req = client.request(method(request.method), url.clone());
            if let Some(body) = &request.body {
                req = req.json(body);
            }

            let res = req.send().await.map_err(|err| {
                tracing::debug!(%url, ?err, "http request failed");
                TransportError::network(err)
            })?;

            let status = res.status();
            let bytes = res.bytes().await.map_err(TransportError::network)?;

            if !status.is_success() {
                let body = serde_json::from_slice::<Envelope>(&bytes).ok();
                return Err(TransportError::status(status.as_u16(), body));
            }

            let envelope = if bytes.is_empty() {
                Envelope::default()
            } else {
                serde_json::from_slice(&bytes).map_err(|err| {
                    TransportError::network(format!(
                        "invalid response body: {err}"
                    ))
                })?
            };

            Ok(Response {
                status: status.as_u16(),
                envelope,
            })
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn transport(base_url: Option<&str>) -> HttpTransport {
        HttpTransport::new(HttpTransportConfig {
            base_url: base_url.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn resolve_absolute_and_relative() {
        let t = transport(Some("http://api.example.com/v1/"));
        assert_eq!(
            "http://other.example.com/x",
            t.resolve("http://other.example.com/x").unwrap().as_str()
        );
        assert_eq!(
            "http://api.example.com/v1/hosts",
            t.resolve("hosts").unwrap().as_str()
        );
        assert_eq!(
            "http://api.example.com/hosts",
            t.resolve("/hosts").unwrap().as_str()
        );
    }

    #[test]
    fn relative_without_base_fails() {
        let err = transport(None).resolve("/hosts").unwrap_err();
        assert_eq!(TransportErrorKind::Network, err.kind);
        assert!(err.message.contains("/hosts"));
    }

    #[test]
    fn invalid_base_url_fails() {
        HttpTransport::new(HttpTransportConfig {
            base_url: Some("not a url".into()),
            ..Default::default()
        })
        .unwrap_err();
    }

    #[test]
    fn default_config_is_written() {
        let mut config = Config::default();
        HttpTransportFactory::create()
            .default_config(&mut config)
            .unwrap();
        let c: HttpTransportConfig =
            config.get_module_config(MOD_NAME).unwrap();
        assert_eq!(0, c.timeout_s);
        assert!(c.user_agent.starts_with("flightdeck/"));
    }
}
