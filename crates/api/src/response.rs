//! Response envelope and the settled outcome of a dispatched request.

use std::sync::Arc;

/// The server's response wrapper. It distinguishes business-level success
/// (`result`) from transport success.
#[derive(
    Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize,
)]
pub struct Envelope {
    /// Business result flag. Absent counts as success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,

    /// Business error code, zero on success.
    #[serde(
        default,
        alias = "bk_error_code",
        deserialize_with = "or_default"
    )]
    pub code: i64,

    /// Business error message. A `null` message decodes as empty.
    #[serde(
        default,
        alias = "bk_error_msg",
        deserialize_with = "or_default"
    )]
    pub message: String,

    /// The payload subtree.
    #[serde(default)]
    pub data: serde_json::Value,

    /// Permission details accompanying a permission-denied failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<serde_json::Value>,
}

fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    let v: Option<T> = serde::Deserialize::deserialize(deserializer)?;
    Ok(v.unwrap_or_default())
}

impl Envelope {
    /// Envelope of a successful call carrying `data`.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            result: Some(true),
            data,
            ..Default::default()
        }
    }

    /// Envelope of a business-level failure.
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            result: Some(false),
            code,
            message: message.into(),
            ..Default::default()
        }
    }

    /// True if the business result flag is truthy or absent.
    pub fn is_success(&self) -> bool {
        self.result.unwrap_or(true)
    }
}

/// A transport level response.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Response {
    /// Http status code.
    pub status: u16,
    /// The decoded envelope.
    pub envelope: Envelope,
}

impl Response {
    /// A 200 response with the given envelope.
    pub fn ok(envelope: Envelope) -> Self {
        Self {
            status: 200,
            envelope,
        }
    }
}

/// What a successful request resolves with.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Only the envelope's payload subtree (the default).
    Data(serde_json::Value),
    /// The full response (`original_response`).
    Response(Arc<Response>),
}

impl Payload {
    /// The payload subtree, whichever form this is.
    pub fn data(&self) -> &serde_json::Value {
        match self {
            Self::Data(d) => d,
            Self::Response(r) => &r.envelope.data,
        }
    }
}

/// Http succeeded but the business result flag was false.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApplicationError {
    /// The envelope's message.
    pub message: Arc<str>,
    /// The envelope's business error code.
    pub code: i64,
    /// Permission details, set for permission-denied failures.
    pub permission: Option<serde_json::Value>,
    /// The structured envelope, for callers handling errors themselves.
    pub envelope: Arc<Envelope>,
}

impl ApplicationError {
    /// Build from a failed envelope.
    pub fn from_envelope(envelope: Envelope) -> Self {
        Self {
            message: envelope.message.as_str().into(),
            code: envelope.code,
            permission: envelope.permission.clone(),
            envelope: Arc::new(envelope),
        }
    }
}

/// Classes of transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// No response was received (connect, io, decode).
    Network,
    /// A response with a non-success http status.
    Status,
    /// The transport itself reports the call as aborted.
    Cancelled,
}

/// A network or http layer failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    /// Failure class.
    pub kind: TransportErrorKind,
    /// User-facing (after normalization) or raw transport message.
    pub message: Arc<str>,
    /// Http status, if a response was received.
    pub status: Option<u16>,
    /// The decoded error body, if the server sent an envelope.
    pub body: Option<Arc<Envelope>>,
}

impl TransportError {
    /// A failure without a response.
    pub fn network(message: impl std::fmt::Display) -> Self {
        Self {
            kind: TransportErrorKind::Network,
            message: message.to_string().into_boxed_str().into(),
            status: None,
            body: None,
        }
    }

    /// A non-success http status, with an optional decoded body.
    pub fn status(status: u16, body: Option<Envelope>) -> Self {
        Self {
            kind: TransportErrorKind::Status,
            message: format!("Request failed with status code {status}")
                .into_boxed_str()
                .into(),
            status: Some(status),
            body: body.map(Arc::new),
        }
    }

    /// A transport-reported abort.
    pub fn cancelled(message: impl std::fmt::Display) -> Self {
        Self {
            kind: TransportErrorKind::Cancelled,
            message: message.to_string().into_boxed_str().into(),
            status: None,
            body: None,
        }
    }

    /// Replace the message, keeping everything else.
    pub fn with_message(mut self, message: impl std::fmt::Display) -> Self {
        self.message = message.to_string().into_boxed_str().into();
        self
    }
}

/// The call was aborted through the in-flight queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Cancelled {
    /// The cancellation message.
    pub message: Arc<str>,
}

impl Cancelled {
    /// Construct with a message.
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self {
            message: message.to_string().into_boxed_str().into(),
        }
    }
}

/// The settled result of one dispatched request.
///
/// This is `Clone` so one in-flight future can be shared by every caller
/// that reuses it.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Transport and business success.
    Success(Payload),
    /// Transport success, business failure.
    AppFailure(ApplicationError),
    /// Network or http failure.
    TransportFailure(TransportError),
    /// Aborted, never user-facing.
    Cancelled(Cancelled),
}

impl Outcome {
    /// True for [Outcome::Success].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// True for [Outcome::Cancelled].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Convert into a `Result` for use with `?`.
    pub fn into_result(self) -> Result<Payload, DispatchError> {
        match self {
            Self::Success(p) => Ok(p),
            Self::AppFailure(e) => Err(DispatchError::Application(e)),
            Self::TransportFailure(e) => Err(DispatchError::Transport(e)),
            Self::Cancelled(e) => Err(DispatchError::Cancelled(e)),
        }
    }
}

/// The error side of [Outcome::into_result].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// See [ApplicationError].
    #[error(transparent)]
    Application(#[from] ApplicationError),
    /// See [TransportError].
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// See [Cancelled].
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl DispatchError {
    /// The message of the underlying error.
    pub fn message(&self) -> &str {
        match self {
            Self::Application(e) => &e.message,
            Self::Transport(e) => &e.message,
            Self::Cancelled(e) => &e.message,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn envelope_result_flag() {
        assert!(Envelope::default().is_success());
        assert!(Envelope::success(serde_json::json!(1)).is_success());
        assert!(!Envelope::failure(1, "no").is_success());
    }

    #[test]
    fn envelope_decode_tolerates_missing_fields() {
        let e: Envelope =
            serde_json::from_str(r#"{"result":false,"message":"bad"}"#)
                .unwrap();
        assert!(!e.is_success());
        assert_eq!("bad", e.message);
        assert_eq!(0, e.code);
        assert!(e.data.is_null());
    }

    #[test]
    fn envelope_decode_server_field_names() {
        let e: Envelope = serde_json::from_str(
            r#"{
              "result": false,
              "bk_error_code": 9900403,
              "bk_error_msg": "no permission",
              "data": null,
              "permission": [{"action": "edit"}]
            }"#,
        )
        .unwrap();
        assert_eq!(9900403, e.code);
        assert_eq!("no permission", e.message);
        assert!(e.permission.is_some());

        let e: Envelope = serde_json::from_str(
            r#"{"result":true,"bk_error_code":0,
                "bk_error_msg":null,"data":1}"#,
        )
        .unwrap();
        assert!(e.is_success());
        assert_eq!("", e.message);
        assert_eq!(serde_json::json!(1), e.data);

        let e: Envelope =
            serde_json::from_str(r#"{"result":true,"message":null}"#).unwrap();
        assert_eq!("", e.message);
    }

    #[test]
    fn outcome_into_result() {
        let ok = Outcome::Success(Payload::Data(serde_json::json!([1])));
        assert_eq!(serde_json::json!([1]), *ok.into_result().unwrap().data());

        let err = Outcome::AppFailure(ApplicationError::from_envelope(
            Envelope::failure(7, "nope"),
        ))
        .into_result()
        .unwrap_err();
        assert_eq!("nope", err.message());
        assert!(matches!(err, DispatchError::Application(e) if e.code == 7));

        let err = Outcome::Cancelled(Cancelled::new("stop"))
            .into_result()
            .unwrap_err();
        assert_eq!("stop", err.to_string());
    }

    #[test]
    fn transport_status_message() {
        let e = TransportError::status(404, None);
        assert_eq!(Some(404), e.status);
        assert_eq!("Request failed with status code 404", &*e.message);
        assert_eq!("x", &*e.with_message("x").message);
    }
}
