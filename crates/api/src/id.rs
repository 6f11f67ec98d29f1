//! Request identity.

use crate::request::Method;
use std::sync::Arc;

/// The deduplication, cache and cancellation key of a request.
///
/// Group tags share this type, since an id lookup against the in-flight
/// queue matches either an entry's own id or one of its group tags.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub Arc<str>);

impl std::ops::Deref for RequestId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::borrow::Borrow<str> for RequestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RequestId").field(&&*self.0).finish()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s.into_boxed_str().into())
    }
}

/// Compute the identity of a request.
///
/// An explicit id is returned verbatim. Otherwise the id is the sha256
/// digest of the method name followed by the url, base64 (url safe, no pad)
/// encoded, so identical calls always produce the same id.
pub fn compute_id(
    method: Method,
    url: &str,
    explicit: Option<RequestId>,
) -> RequestId {
    if let Some(id) = explicit {
        return id;
    }

    use base64::prelude::*;
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(url.as_bytes());
    BASE64_URL_SAFE_NO_PAD.encode(hasher.finalize()).into()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derived_id_is_deterministic() {
        let a = compute_id(Method::Get, "/api/hosts", None);
        let b = compute_id(Method::Get, "/api/hosts", None);
        assert_eq!(a, b);
        // 32 byte digest, base64 without padding
        assert_eq!(43, a.len());
    }

    #[test]
    fn derived_id_differs_by_method_and_url() {
        let get = compute_id(Method::Get, "/api/hosts", None);
        let post = compute_id(Method::Post, "/api/hosts", None);
        let other = compute_id(Method::Get, "/api/hosts/1", None);
        assert_ne!(get, post);
        assert_ne!(get, other);
        assert_ne!(post, other);
    }

    #[test]
    fn explicit_id_is_verbatim() {
        let id = compute_id(Method::Get, "/api/hosts", Some("hosts".into()));
        assert_eq!("hosts", &*id);
    }

    #[test]
    fn display_and_debug() {
        let id = RequestId::from("abc");
        assert_eq!("abc", id.to_string());
        assert_eq!("RequestId(\"abc\")", format!("{id:?}"));
    }

    #[test]
    fn serde_transparent() {
        let id: RequestId = serde_json::from_str("\"xyz\"").unwrap();
        assert_eq!("xyz", &*id);
        assert_eq!("\"xyz\"", serde_json::to_string(&id).unwrap());
    }
}
