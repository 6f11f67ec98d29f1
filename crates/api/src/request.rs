//! Request method, caller options and the merged per-request config.

use crate::*;

/// Http method of a dispatched request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl Method {
    /// The upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method send a body.
    /// For the other methods a supplied body is dropped.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero or more group tags, accepting either a single tag or a list.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(RequestId),
    Many(Vec<RequestId>),
}

fn one_or_many<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<RequestId>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v: Option<OneOrMany> = serde::Deserialize::deserialize(deserializer)?;
    Ok(v.map(|v| match v {
        OneOrMany::One(id) => vec![id],
        OneOrMany::Many(ids) => ids,
    }))
}

/// Caller supplied per-request options. Every unset option falls back to
/// its documented default when merged into a [RequestConfig].
///
/// Unknown keys are rejected when deserializing.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestOptions {
    /// Identity override. Default: digest of method + url.
    #[serde(default)]
    pub request_id: Option<RequestId>,

    /// Group tags for bulk cancel / eviction. Default: none.
    #[serde(default, deserialize_with = "one_or_many")]
    pub request_group: Option<Vec<RequestId>>,

    /// Surface failures as global notifications. Default: true.
    #[serde(default)]
    pub global_error: Option<bool>,

    /// Reuse a cached result if present. Default: false.
    #[serde(default)]
    pub from_cache: Option<bool>,

    /// Evict the cached result before dispatch. Default: false.
    #[serde(default)]
    pub clear_cache: Option<bool>,

    /// Resolve with the full response instead of the payload.
    /// Default: false.
    #[serde(default)]
    pub original_response: Option<bool>,

    /// Eligible for bulk cancellation on route change. Default: true.
    #[serde(default)]
    pub cancel_when_route_change: Option<bool>,

    /// Cancel and evict an in-flight call with the same id before
    /// dispatching. Default: false.
    #[serde(default)]
    pub cancel_previous: Option<bool>,
}

impl RequestOptions {
    /// Parse options from a json object.
    pub fn from_json(json: &str) -> FdResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| FdError::other_src("invalid request options", e))
    }

    /// Set an explicit request id.
    pub fn with_request_id(mut self, id: impl Into<RequestId>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Add a group tag.
    pub fn with_group(mut self, tag: impl Into<RequestId>) -> Self {
        self.request_group
            .get_or_insert_with(Vec::new)
            .push(tag.into());
        self
    }

    /// Set `from_cache`.
    pub fn from_cache(mut self, v: bool) -> Self {
        self.from_cache = Some(v);
        self
    }

    /// Set `clear_cache`.
    pub fn clear_cache(mut self, v: bool) -> Self {
        self.clear_cache = Some(v);
        self
    }

    /// Set `global_error`.
    pub fn global_error(mut self, v: bool) -> Self {
        self.global_error = Some(v);
        self
    }

    /// Set `original_response`.
    pub fn original_response(mut self, v: bool) -> Self {
        self.original_response = Some(v);
        self
    }

    /// Set `cancel_when_route_change`.
    pub fn cancel_when_route_change(mut self, v: bool) -> Self {
        self.cancel_when_route_change = Some(v);
        self
    }

    /// Set `cancel_previous`.
    pub fn cancel_previous(mut self, v: bool) -> Self {
        self.cancel_previous = Some(v);
        self
    }
}

/// The final configuration of one dispatched request.
/// Immutable once dispatched.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    /// Identity for dedup, cache and cancel.
    pub request_id: RequestId,
    /// Group tags for bulk operations.
    pub request_group: Vec<RequestId>,
    /// Surface failures as global notifications.
    pub global_error: bool,
    /// Reuse a cached result if present.
    pub from_cache: bool,
    /// Evict the cached result before dispatch.
    pub clear_cache: bool,
    /// Resolve with the full response instead of the payload.
    pub original_response: bool,
    /// Eligible for bulk cancellation on route change.
    pub cancel_when_route_change: bool,
    /// Cancel and evict a same-id call before dispatching.
    pub cancel_previous: bool,
}

impl RequestConfig {
    /// Merge caller options over the defaults.
    pub fn merge(method: Method, url: &str, options: RequestOptions) -> Self {
        let RequestOptions {
            request_id,
            request_group,
            global_error,
            from_cache,
            clear_cache,
            original_response,
            cancel_when_route_change,
            cancel_previous,
        } = options;

        Self {
            request_id: compute_id(method, url, request_id),
            request_group: request_group.unwrap_or_default(),
            global_error: global_error.unwrap_or(true),
            from_cache: from_cache.unwrap_or(false),
            clear_cache: clear_cache.unwrap_or(false),
            original_response: original_response.unwrap_or(false),
            cancel_when_route_change: cancel_when_route_change
                .unwrap_or(true),
            cancel_previous: cancel_previous.unwrap_or(false),
        }
    }

    /// Whether `id` names this request or one of its groups.
    pub fn matches(&self, id: &str) -> bool {
        &*self.request_id == id || self.in_group(id)
    }

    /// Whether `tag` is one of this request's group tags.
    pub fn in_group(&self, tag: &str) -> bool {
        self.request_group.iter().any(|g| &**g == tag)
    }
}

/// Which entries a bulk queue or cache operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every entry.
    All,
    /// Entries matching one id or group tag.
    Id(RequestId),
    /// The union of entries matching any of these ids or group tags.
    Ids(Vec<RequestId>),
}

impl Target {
    /// The ids named by this target, empty for [Target::All].
    pub fn ids(&self) -> &[RequestId] {
        match self {
            Self::All => &[],
            Self::Id(id) => std::slice::from_ref(id),
            Self::Ids(ids) => ids,
        }
    }
}

impl From<RequestId> for Target {
    fn from(id: RequestId) -> Self {
        Self::Id(id)
    }
}

impl From<&RequestId> for Target {
    fn from(id: &RequestId) -> Self {
        Self::Id(id.clone())
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Self::Id(id.into())
    }
}

impl From<Vec<RequestId>> for Target {
    fn from(ids: Vec<RequestId>) -> Self {
        Self::Ids(ids)
    }
}

impl From<Option<RequestId>> for Target {
    fn from(id: Option<RequestId>) -> Self {
        match id {
            None => Self::All,
            Some(id) => Self::Id(id),
        }
    }
}
